//! [`SqliteStore`]: the SQLite implementation of [`SessionStore`] and
//! [`EvidenceOutbox`].

use std::path::Path;

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use forenseek_core::{
  evidence::NewEvidence,
  session::StoredSession,
  store::{EvidenceOutbox, OutboxState, QueuedEvidence, SessionStore},
};

use crate::{
  Error, Result,
  encode::{QUEUED_COLUMNS, RawQueued, RawSession, encode_dt, encode_evidence, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Local client state backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// The terminal state an entry is being moved into.
enum Resolution {
  Sent(Option<String>),
  Rejected(String),
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select_queued(&self, where_clause: &'static str) -> Result<Vec<QueuedEvidence>> {
    let raws: Vec<RawQueued> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {QUEUED_COLUMNS} FROM evidence_outbox {where_clause} ORDER BY rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawQueued::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawQueued::into_queued).collect()
  }

  async fn fetch(&self, queue_id: Uuid) -> Result<QueuedEvidence> {
    self.get(queue_id).await?.ok_or(Error::EntryNotFound(queue_id))
  }

  /// Move a pending entry into a terminal state.
  async fn resolve(&self, queue_id: Uuid, resolution: Resolution) -> Result<QueuedEvidence> {
    let id_str = encode_uuid(queue_id);
    let at_str = encode_dt(Utc::now());
    let (state, remote_id, reason) = match resolution {
      Resolution::Sent(remote_id) => ("sent", remote_id, None),
      Resolution::Rejected(reason) => ("rejected", None, Some(reason)),
    };

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE evidence_outbox
              SET state = ?2, remote_id = ?3, reason = ?4, resolved_at = ?5
            WHERE queue_id = ?1 AND state = 'pending'",
          rusqlite::params![id_str, state, remote_id, reason, at_str],
        )?)
      })
      .await?;

    self.after_update(queue_id, changed).await
  }

  /// Interpret the row count of a pending-only `UPDATE`.
  async fn after_update(&self, queue_id: Uuid, changed: usize) -> Result<QueuedEvidence> {
    let entry = self.fetch(queue_id).await?;
    if changed == 0 {
      return Err(Error::NotPending(queue_id));
    }
    tracing::debug!(%queue_id, state = ?entry.state, attempts = entry.attempts, "outbox entry updated");
    Ok(entry)
  }
}

// ─── SessionStore impl ───────────────────────────────────────────────────────

impl SessionStore for SqliteStore {
  type Error = Error;

  async fn save_session(&self, session: StoredSession) -> Result<()> {
    let saved_at = encode_dt(session.saved_at);
    let role = session.role.as_str();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO session (id, token, user_id, role, saved_at)
           VALUES (1, ?1, ?2, ?3, ?4)
           ON CONFLICT(id) DO UPDATE SET
             token = excluded.token,
             user_id = excluded.user_id,
             role = excluded.role,
             saved_at = excluded.saved_at",
          rusqlite::params![session.token, session.user_id, role, saved_at],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn load_session(&self) -> Result<Option<StoredSession>> {
    let raw: Option<RawSession> = self
      .conn
      .call(|conn| {
        Ok(
          conn
            .query_row(
              "SELECT token, user_id, role, saved_at FROM session WHERE id = 1",
              [],
              |row| {
                Ok(RawSession {
                  token:    row.get(0)?,
                  user_id:  row.get(1)?,
                  role:     row.get(2)?,
                  saved_at: row.get(3)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSession::into_session).transpose()
  }

  async fn clear_session(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute("DELETE FROM session", [])?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── EvidenceOutbox impl ─────────────────────────────────────────────────────

impl EvidenceOutbox for SqliteStore {
  type Error = Error;

  async fn enqueue(&self, evidence: NewEvidence) -> Result<QueuedEvidence> {
    let entry = QueuedEvidence {
      queue_id:   Uuid::new_v4(),
      evidence,
      queued_at:  Utc::now(),
      attempts:   0,
      last_error: None,
      state:      OutboxState::Pending,
    };

    let id_str      = encode_uuid(entry.queue_id);
    let case_id     = entry.evidence.case_id.clone();
    let payload     = encode_evidence(&entry.evidence)?;
    let queued_at   = encode_dt(entry.queued_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO evidence_outbox (queue_id, case_id, payload_json, queued_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, case_id, payload, queued_at],
        )?;
        Ok(())
      })
      .await?;

    tracing::debug!(queue_id = %entry.queue_id, case_id = %entry.evidence.case_id, "evidence queued");
    Ok(entry)
  }

  async fn get(&self, queue_id: Uuid) -> Result<Option<QueuedEvidence>> {
    let id_str = encode_uuid(queue_id);

    let raw: Option<RawQueued> = self
      .conn
      .call(move |conn| {
        let sql = format!("SELECT {QUEUED_COLUMNS} FROM evidence_outbox WHERE queue_id = ?1");
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawQueued::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawQueued::into_queued).transpose()
  }

  async fn pending(&self) -> Result<Vec<QueuedEvidence>> {
    self.select_queued("WHERE state = 'pending'").await
  }

  async fn list_all(&self) -> Result<Vec<QueuedEvidence>> { self.select_queued("").await }

  async fn mark_sent(
    &self,
    queue_id: Uuid,
    remote_id: Option<String>,
  ) -> Result<QueuedEvidence> {
    self.resolve(queue_id, Resolution::Sent(remote_id)).await
  }

  async fn record_failure(&self, queue_id: Uuid, error: String) -> Result<QueuedEvidence> {
    let id_str = encode_uuid(queue_id);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE evidence_outbox
              SET attempts = attempts + 1, last_error = ?2
            WHERE queue_id = ?1 AND state = 'pending'",
          rusqlite::params![id_str, error],
        )?)
      })
      .await?;

    self.after_update(queue_id, changed).await
  }

  async fn mark_rejected(&self, queue_id: Uuid, reason: String) -> Result<QueuedEvidence> {
    self.resolve(queue_id, Resolution::Rejected(reason)).await
  }
}
