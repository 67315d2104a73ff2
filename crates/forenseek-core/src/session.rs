//! Authentication context and role capabilities.
//!
//! The session is resolved once at login and threaded explicitly to whatever
//! needs it. Role-dependent behaviour is expressed as [`Capability`] checks
//! against the [`Permissions`] derived from the user's [`Role`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};

use crate::{Error, Result};

/// The user's role as reported by `GET /user/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
  #[serde(rename = "admin")]
  Admin,
  #[serde(rename = "perito")]
  Expert,
  #[serde(rename = "assistente")]
  Assistant,
  /// Any role this client does not recognise.
  #[serde(other, rename = "desconhecido")]
  Unknown,
}

impl Role {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Admin => "admin",
      Self::Expert => "perito",
      Self::Assistant => "assistente",
      Self::Unknown => "desconhecido",
    }
  }

  pub fn parse(s: &str) -> Self {
    match s.trim().to_lowercase().as_str() {
      "admin" => Self::Admin,
      "perito" => Self::Expert,
      "assistente" => Self::Assistant,
      _ => Self::Unknown,
    }
  }
}

/// An action the client may offer to a user.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
  ViewCases,
  RegisterCase,
  EditCase,
  RegisterEvidence,
  RegisterVictim,
  GenerateReport,
  ManageUsers,
}

impl Capability {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::ViewCases => "view_cases",
      Self::RegisterCase => "register_case",
      Self::EditCase => "edit_case",
      Self::RegisterEvidence => "register_evidence",
      Self::RegisterVictim => "register_victim",
      Self::GenerateReport => "generate_report",
      Self::ManageUsers => "manage_users",
    }
  }
}

/// The set of capabilities granted to a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Permissions(BTreeSet<Capability>);

impl Permissions {
  pub fn for_role(role: Role) -> Self {
    use Capability::*;
    let granted: BTreeSet<_> = match role {
      Role::Admin => Capability::iter().collect(),
      Role::Expert => Capability::iter().filter(|c| *c != ManageUsers).collect(),
      // Assistants may record material but not edit cases or issue reports.
      Role::Assistant => [ViewCases, RegisterCase, RegisterEvidence, RegisterVictim]
        .into_iter()
        .collect(),
      Role::Unknown => [ViewCases].into_iter().collect(),
    };
    Self(granted)
  }

  pub fn contains(&self, cap: Capability) -> bool { self.0.contains(&cap) }

  pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ { self.0.iter().copied() }
}

/// What is persisted between runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
  pub token:    String,
  pub user_id:  String,
  pub role:     Role,
  pub saved_at: DateTime<Utc>,
}

/// The authenticated user, resolved once per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
  pub token:       String,
  pub user_id:     String,
  pub role:        Role,
  pub permissions: Permissions,
}

impl AuthContext {
  pub fn new(token: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
    Self {
      token: token.into(),
      user_id: user_id.into(),
      role,
      permissions: Permissions::for_role(role),
    }
  }

  pub fn can(&self, cap: Capability) -> bool { self.permissions.contains(cap) }

  /// Fail with [`Error::Forbidden`] unless `cap` is granted.
  pub fn require(&self, cap: Capability) -> Result<()> {
    if self.can(cap) { Ok(()) } else { Err(Error::Forbidden(cap)) }
  }

  /// Value for the `Authorization` header.
  pub fn bearer(&self) -> String { format!("Bearer {}", self.token) }

  /// Snapshot for persistence.
  pub fn to_stored(&self) -> StoredSession {
    StoredSession {
      token:    self.token.clone(),
      user_id:  self.user_id.clone(),
      role:     self.role,
      saved_at: Utc::now(),
    }
  }
}

impl From<StoredSession> for AuthContext {
  fn from(s: StoredSession) -> Self { Self::new(s.token, s.user_id, s.role) }
}
