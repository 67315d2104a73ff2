//! Client-side storage traits and the evidence outbox types.
//!
//! Implemented by storage backends (e.g. `forenseek-store-sqlite`). The CLI
//! depends on these abstractions, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{evidence::NewEvidence, session::StoredSession};

// ─── Outbox types ────────────────────────────────────────────────────────────

/// Where a locally-recorded evidence item stands with respect to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutboxState {
  /// Not yet accepted by the server; will be retried.
  Pending,
  /// Accepted by the server. `remote_id` is absent when the response did
  /// not name the created record.
  Sent { remote_id: Option<String>, at: DateTime<Utc> },
  /// Refused by the server; never retried.
  Rejected { reason: String, at: DateTime<Utc> },
}

impl OutboxState {
  pub fn is_pending(&self) -> bool { matches!(self, Self::Pending) }
}

/// An evidence item held in the local outbox.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedEvidence {
  pub queue_id:   Uuid,
  pub evidence:   NewEvidence,
  /// Set by the store on enqueue.
  pub queued_at:  DateTime<Utc>,
  /// Failed upload attempts so far.
  pub attempts:   u32,
  pub last_error: Option<String>,
  pub state:      OutboxState,
}

// ─── Traits ──────────────────────────────────────────────────────────────────

/// Persistence for the single signed-in session.
pub trait SessionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Replace any stored session with `session`.
  fn save_session(
    &self,
    session: StoredSession,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// The stored session, if any.
  fn load_session(
    &self,
  ) -> impl Future<Output = Result<Option<StoredSession>, Self::Error>> + Send + '_;

  /// Forget the stored session. Succeeds when none is stored.
  fn clear_session(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

/// Local-first queue of evidence awaiting upload.
///
/// Items enter as [`OutboxState::Pending`] and leave that state exactly once,
/// either to `Sent` or to `Rejected`. Transitions on a non-pending item fail.
pub trait EvidenceOutbox: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Record `evidence` locally and return the queued entry.
  fn enqueue(
    &self,
    evidence: NewEvidence,
  ) -> impl Future<Output = Result<QueuedEvidence, Self::Error>> + Send + '_;

  /// Retrieve an entry by id. Returns `None` if not found.
  fn get(
    &self,
    queue_id: Uuid,
  ) -> impl Future<Output = Result<Option<QueuedEvidence>, Self::Error>> + Send + '_;

  /// Pending entries, oldest first.
  fn pending(
    &self,
  ) -> impl Future<Output = Result<Vec<QueuedEvidence>, Self::Error>> + Send + '_;

  /// Every entry regardless of state, oldest first.
  fn list_all(
    &self,
  ) -> impl Future<Output = Result<Vec<QueuedEvidence>, Self::Error>> + Send + '_;

  /// The server accepted the entry, under `remote_id` when known.
  fn mark_sent(
    &self,
    queue_id: Uuid,
    remote_id: Option<String>,
  ) -> impl Future<Output = Result<QueuedEvidence, Self::Error>> + Send + '_;

  /// An upload attempt failed transiently; the entry stays pending.
  fn record_failure(
    &self,
    queue_id: Uuid,
    error: String,
  ) -> impl Future<Output = Result<QueuedEvidence, Self::Error>> + Send + '_;

  /// The server refused the entry; it will not be retried.
  fn mark_rejected(
    &self,
    queue_id: Uuid,
    reason: String,
  ) -> impl Future<Output = Result<QueuedEvidence, Self::Error>> + Send + '_;
}
