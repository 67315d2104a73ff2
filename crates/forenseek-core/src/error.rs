//! Error types for `forenseek-core`.

use thiserror::Error;

use crate::session::Capability;

#[derive(Debug, Error)]
pub enum Error {
  #[error("case has no identifier")]
  MissingId,

  #[error("unparseable {field} date: {value:?}")]
  UnparseableDate { field: &'static str, value: String },

  #[error("case {0} was closed before it was opened")]
  ClosedBeforeOpened(String),

  #[error("case {0} occurred after it was opened")]
  OccurredAfterOpened(String),

  #[error("case {0} has a closing date but is still open")]
  ClosedAtOnOpenCase(String),

  #[error("update changes nothing")]
  EmptyUpdate,

  #[error("missing required field: {0}")]
  MissingField(&'static str),

  #[error("unknown case status: {0:?}")]
  UnknownStatus(String),

  #[error("not permitted: {0:?}")]
  Forbidden(Capability),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
