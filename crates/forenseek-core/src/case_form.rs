//! Payloads for registering a case (`POST /case`) and editing one
//! (`PUT /case/{id}`).

use chrono::{Local, NaiveDate};
use serde::Serialize;

use crate::{
  Error, Result,
  case::{Case, CaseStatus, Location},
};

// ─── Registration ────────────────────────────────────────────────────────────

/// Input to `POST /case`. The responsible party is the registering user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCase {
  #[serde(rename = "titulo")]
  pub title:       String,
  #[serde(rename = "descricao")]
  pub description: String,
  pub status:      CaseStatus,
  /// User id of the responsible investigator.
  #[serde(rename = "responsavel")]
  pub responsible: String,
  #[serde(rename = "dataAbertura")]
  pub opened_on:   NaiveDate,
  #[serde(rename = "dataOcorrencia")]
  pub occurred_on: NaiveDate,
  #[serde(rename = "localidade", skip_serializing_if = "Option::is_none")]
  pub location:    Option<Location>,
  /// Id of an already-registered victim.
  #[serde(rename = "vitima", skip_serializing_if = "Option::is_none")]
  pub victim:      Option<String>,
}

impl NewCase {
  /// A case opened today, in progress, owned by `responsible`.
  pub fn new(
    title: impl Into<String>,
    description: impl Into<String>,
    responsible: impl Into<String>,
    occurred_on: NaiveDate,
  ) -> Self {
    Self {
      title: title.into(),
      description: description.into(),
      status: CaseStatus::Open,
      responsible: responsible.into(),
      opened_on: Local::now().date_naive(),
      occurred_on,
      location: None,
      victim: None,
    }
  }

  pub fn validate(&self) -> Result<()> {
    let required = [
      ("titulo", &self.title),
      ("descricao", &self.description),
      ("responsavel", &self.responsible),
    ];
    if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
      return Err(Error::MissingField(*field));
    }
    if self.occurred_on > self.opened_on {
      return Err(Error::OccurredAfterOpened(self.title.clone()));
    }
    Ok(())
  }
}

// ─── Editing ─────────────────────────────────────────────────────────────────

/// Input to `PUT /case/{id}`. Only the fields that are set are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CaseUpdate {
  #[serde(rename = "titulo", skip_serializing_if = "Option::is_none")]
  pub title:       Option<String>,
  #[serde(rename = "descricao", skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub status:      Option<CaseStatus>,
  #[serde(rename = "dataOcorrencia", skip_serializing_if = "Option::is_none")]
  pub occurred_on: Option<NaiveDate>,
  #[serde(rename = "dataFechamento", skip_serializing_if = "Option::is_none")]
  pub closed_on:   Option<NaiveDate>,
  #[serde(rename = "localidade", skip_serializing_if = "Option::is_none")]
  pub location:    Option<Location>,
}

impl CaseUpdate {
  pub fn is_empty(&self) -> bool { self == &Self::default() }

  /// `current` with this update applied.
  pub fn apply(&self, current: &Case) -> Case {
    let mut next = current.clone();
    if let Some(title) = &self.title {
      next.title = title.clone();
    }
    if let Some(description) = &self.description {
      next.description = description.clone();
    }
    if let Some(status) = self.status {
      next.status = Some(status);
    }
    if let Some(day) = self.occurred_on {
      next.occurred_at = Some(day.into());
    }
    if let Some(day) = self.closed_on {
      next.closed_at = Some(day.into());
    }
    if let Some(location) = self.location {
      next.location = Some(location);
    }
    next
  }

  /// Refuse updates that change nothing or would leave `current` in a state
  /// ingestion rejects.
  pub fn check_against(&self, current: &Case) -> Result<()> {
    if self.is_empty() {
      return Err(Error::EmptyUpdate);
    }
    if self.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
      return Err(Error::MissingField("titulo"));
    }
    self.apply(current).validate()
  }
}
