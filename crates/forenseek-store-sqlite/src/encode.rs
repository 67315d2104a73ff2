//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings, UUIDs hyphenated lowercase, and the
//! evidence payload compact JSON.

use chrono::{DateTime, Utc};
use forenseek_core::{
  evidence::NewEvidence,
  session::{Role, StoredSession},
  store::{OutboxState, QueuedEvidence},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Evidence payload ─────────────────────────────────────────────────────────

pub fn encode_evidence(e: &NewEvidence) -> Result<String> { Ok(serde_json::to_string(e)?) }

pub fn decode_evidence(s: &str) -> Result<NewEvidence> { Ok(serde_json::from_str(s)?) }

// ─── Row types ────────────────────────────────────────────────────────────────

/// Raw strings read directly from an `evidence_outbox` row.
pub struct RawQueued {
  pub queue_id:     String,
  pub payload_json: String,
  pub queued_at:    String,
  pub attempts:     u32,
  pub last_error:   Option<String>,
  pub state:        String,
  pub remote_id:    Option<String>,
  pub reason:       Option<String>,
  pub resolved_at:  Option<String>,
}

/// Column list matching the field order of [`RawQueued`].
pub const QUEUED_COLUMNS: &str = "queue_id, payload_json, queued_at, attempts, last_error, \
                                  state, remote_id, reason, resolved_at";

impl RawQueued {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      queue_id:     row.get(0)?,
      payload_json: row.get(1)?,
      queued_at:    row.get(2)?,
      attempts:     row.get(3)?,
      last_error:   row.get(4)?,
      state:        row.get(5)?,
      remote_id:    row.get(6)?,
      reason:       row.get(7)?,
      resolved_at:  row.get(8)?,
    })
  }

  pub fn into_queued(self) -> Result<QueuedEvidence> {
    let resolved_at = || -> Result<DateTime<Utc>> {
      let raw = self
        .resolved_at
        .as_deref()
        .ok_or_else(|| Error::DateParse("missing resolved_at".into()))?;
      decode_dt(raw)
    };

    let state = match self.state.as_str() {
      "pending" => OutboxState::Pending,
      "sent" => OutboxState::Sent {
        remote_id: self.remote_id.clone(),
        at:        resolved_at()?,
      },
      "rejected" => OutboxState::Rejected {
        reason: self.reason.clone().unwrap_or_default(),
        at:     resolved_at()?,
      },
      other => return Err(Error::UnknownState(other.to_owned())),
    };

    Ok(QueuedEvidence {
      queue_id: decode_uuid(&self.queue_id)?,
      evidence: decode_evidence(&self.payload_json)?,
      queued_at: decode_dt(&self.queued_at)?,
      attempts: self.attempts,
      last_error: self.last_error,
      state,
    })
  }
}

/// Raw strings read directly from the `session` row.
pub struct RawSession {
  pub token:    String,
  pub user_id:  String,
  pub role:     String,
  pub saved_at: String,
}

impl RawSession {
  pub fn into_session(self) -> Result<StoredSession> {
    Ok(StoredSession {
      token:    self.token,
      user_id:  self.user_id,
      role:     Role::parse(&self.role),
      saved_at: decode_dt(&self.saved_at)?,
    })
  }
}
