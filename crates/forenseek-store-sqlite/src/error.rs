//! Error type for `forenseek-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown outbox state: {0:?}")]
  UnknownState(String),

  #[error("outbox entry not found: {0}")]
  EntryNotFound(uuid::Uuid),

  /// Attempted to transition an entry that was already sent or rejected.
  #[error("outbox entry {0} is no longer pending")]
  NotPending(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
