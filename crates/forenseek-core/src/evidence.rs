//! Evidence items collected for a case.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
  Error, Result,
  case::{CaseDate, Location, Responsible},
};

/// A file attached to an evidence item. Binary data is never held here; the
/// file stays where it was captured and is referenced by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
  pub filename: String,
  pub path:     String,
  pub mimetype: String,
  pub size:     u64,
  /// SHA-256 hex digest; used locally to spot duplicate captures. The API
  /// ignores it.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub sha256:   Option<String>,
}

impl Attachment {
  /// Describe a captured file, recording its size and digest.
  pub fn from_bytes(
    filename: impl Into<String>,
    path: impl Into<String>,
    mimetype: impl Into<String>,
    bytes: &[u8],
  ) -> Self {
    Self {
      filename: filename.into(),
      path:     path.into(),
      mimetype: mimetype.into(),
      size:     bytes.len() as u64,
      sha256:   Some(hex::encode(Sha256::digest(bytes))),
    }
  }
}

/// Input to `POST /evidence`. Field names follow the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEvidence {
  #[serde(rename = "idCaso")]
  pub case_id:      String,
  #[serde(rename = "tipo")]
  pub kind:         String,
  #[serde(rename = "descricao")]
  pub description:  String,
  #[serde(rename = "dataColeta")]
  pub collected_at: DateTime<Utc>,
  /// User id of the collecting investigator.
  #[serde(rename = "coletadoPor")]
  pub collected_by: String,
  #[serde(rename = "localColeta")]
  pub location:     Option<Location>,
  #[serde(rename = "arquivos", default)]
  pub attachments:  Vec<Attachment>,
}

impl NewEvidence {
  /// Convenience constructor; location and attachments start empty.
  pub fn new(
    case_id: impl Into<String>,
    kind: impl Into<String>,
    description: impl Into<String>,
    collected_by: impl Into<String>,
  ) -> Self {
    Self {
      case_id:      case_id.into(),
      kind:         kind.into(),
      description:  description.into(),
      collected_at: Utc::now(),
      collected_by: collected_by.into(),
      location:     None,
      attachments:  Vec::new(),
    }
  }

  /// Every field the registration form marks as required must be present.
  pub fn validate(&self) -> Result<()> {
    let required = [
      ("idCaso", &self.case_id),
      ("tipo", &self.kind),
      ("descricao", &self.description),
      ("coletadoPor", &self.collected_by),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
      return Err(Error::MissingField(*field));
    }
    if self.location.is_none() {
      return Err(Error::MissingField("localColeta"));
    }
    if self.attachments.is_empty() {
      return Err(Error::MissingField("arquivos"));
    }
    Ok(())
  }
}

/// An evidence record as stored by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
  #[serde(rename = "_id")]
  pub id:           String,
  #[serde(rename = "idCaso", default)]
  pub case_id:      Option<String>,
  #[serde(rename = "tipo", default)]
  pub kind:         String,
  #[serde(rename = "descricao", default)]
  pub description:  String,
  /// Written either as a day or as a timestamp.
  #[serde(rename = "dataColeta", default, deserialize_with = "crate::case::lenient")]
  pub collected_at: Option<CaseDate>,
  /// Either a bare user id or the embedded user, depending on the endpoint.
  #[serde(rename = "coletadoPor", default, deserialize_with = "crate::case::lenient")]
  pub collected_by: Option<Responsible>,
  #[serde(rename = "localColeta", default, deserialize_with = "crate::case::lenient")]
  pub location:     Option<Location>,
  #[serde(rename = "arquivos", default)]
  pub attachments:  Vec<Attachment>,
}
