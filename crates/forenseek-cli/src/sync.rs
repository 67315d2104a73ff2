//! Local-first evidence submission.
//!
//! Every item is written to the outbox before any network traffic. An upload
//! that fails for a reason that might go away (no connectivity, 5xx, 408, 429)
//! leaves the item pending for the next [`flush`]; any other refusal by the
//! server rejects it for good. A success status always counts as sent, even
//! when the response does not say which record was created.

use anyhow::Context as _;
use forenseek_core::{
  evidence::NewEvidence,
  store::{EvidenceOutbox, QueuedEvidence},
};
use uuid::Uuid;

use crate::client::ApiClient;

/// What happened to a freshly submitted evidence item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
  /// `remote_id` is `None` when the server did not name the new record.
  Uploaded { queue_id: Uuid, remote_id: Option<String> },
  /// Kept locally; will be retried by `evidence sync`.
  Queued { queue_id: Uuid, error: String },
  Rejected { queue_id: Uuid, reason: String },
}

/// Counts from one [`flush`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
  pub sent:          usize,
  pub still_pending: usize,
  pub rejected:      usize,
}

/// Validate `evidence`, queue it, then try to upload it once.
pub async fn submit<O: EvidenceOutbox>(
  client: &ApiClient,
  outbox: &O,
  evidence: NewEvidence,
) -> anyhow::Result<SubmitOutcome> {
  evidence.validate()?;
  let entry = outbox
    .enqueue(evidence)
    .await
    .context("failed to queue evidence locally")?;
  upload(client, outbox, &entry).await
}

/// Replay every pending item, oldest first.
///
/// Stops at the first retryable failure: if the server is unreachable for
/// one item it is for the rest, and later items must not overtake earlier
/// ones.
pub async fn flush<O: EvidenceOutbox>(client: &ApiClient, outbox: &O) -> anyhow::Result<SyncReport> {
  let pending = outbox.pending().await.context("failed to read outbox")?;
  let mut report = SyncReport::default();

  for (i, entry) in pending.iter().enumerate() {
    match upload(client, outbox, entry).await? {
      SubmitOutcome::Uploaded { .. } => report.sent += 1,
      SubmitOutcome::Rejected { .. } => report.rejected += 1,
      SubmitOutcome::Queued { .. } => {
        report.still_pending = pending.len() - i;
        break;
      }
    }
  }

  tracing::info!(
    sent = report.sent,
    rejected = report.rejected,
    still_pending = report.still_pending,
    "outbox flushed"
  );
  Ok(report)
}

async fn upload<O: EvidenceOutbox>(
  client: &ApiClient,
  outbox: &O,
  entry: &QueuedEvidence,
) -> anyhow::Result<SubmitOutcome> {
  let queue_id = entry.queue_id;

  match client.create_evidence(&entry.evidence).await {
    Ok(created) => {
      outbox.mark_sent(queue_id, created.id.clone()).await?;
      tracing::info!(%queue_id, remote_id = ?created.id, "evidence uploaded");
      Ok(SubmitOutcome::Uploaded { queue_id, remote_id: created.id })
    }
    Err(e) if e.is_retryable() => {
      let error = e.to_string();
      let entry = outbox.record_failure(queue_id, error.clone()).await?;
      tracing::warn!(%queue_id, attempts = entry.attempts, %error, "upload failed, keeping evidence queued");
      Ok(SubmitOutcome::Queued { queue_id, error })
    }
    Err(e) => {
      let reason = e.to_string();
      outbox.mark_rejected(queue_id, reason.clone()).await?;
      tracing::warn!(%queue_id, status = ?e.status(), %reason, "server rejected evidence");
      Ok(SubmitOutcome::Rejected { queue_id, reason })
    }
  }
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use axum::http::StatusCode;
  use forenseek_core::{
    case::Location,
    evidence::Attachment,
    session::{AuthContext, Role},
    store::OutboxState,
  };
  use forenseek_store_sqlite::SqliteStore;

  use super::*;
  use crate::client::fake_api::{CreatedBody, FakeApi, TOKEN, spawn, unreachable};

  fn auth() -> AuthContext { AuthContext::new(TOKEN, "7", Role::Expert) }

  async fn online(api: FakeApi) -> ApiClient {
    ApiClient::new(spawn(api).await, Duration::from_secs(5))
      .unwrap()
      .with_auth(auth())
  }

  async fn offline() -> ApiClient {
    ApiClient::new(unreachable().await, Duration::from_secs(2))
      .unwrap()
      .with_auth(auth())
  }

  fn evidence(kind: &str) -> NewEvidence {
    let mut e = NewEvidence::new("c1", kind, "achado", "7");
    e.location = Some(Location { latitude: -8.05, longitude: -34.9 });
    e.attachments
      .push(Attachment::from_bytes("f.jpg", "/tmp/f.jpg", "image/jpeg", b"jpeg"));
    e
  }

  #[tokio::test]
  async fn upload_marks_entry_sent() {
    let api = FakeApi::default();
    let client = online(api.clone()).await;
    let store = SqliteStore::open_in_memory().await.unwrap();

    let outcome = submit(&client, &store, evidence("Dente")).await.unwrap();
    let SubmitOutcome::Uploaded { queue_id, remote_id } = outcome else {
      panic!("expected upload, got {outcome:?}");
    };
    assert_eq!(remote_id.as_deref(), Some("ev-1"));
    assert!(matches!(
      store.get(queue_id).await.unwrap().unwrap().state,
      OutboxState::Sent { .. }
    ));
    assert_eq!(api.posted().len(), 1);
  }

  #[tokio::test]
  async fn wrapped_create_response_still_counts_as_sent() {
    let api = FakeApi::default();
    api.describe_created_as(CreatedBody::Wrapped);
    let client = online(api.clone()).await;
    let store = SqliteStore::open_in_memory().await.unwrap();

    let outcome = submit(&client, &store, evidence("Dente")).await.unwrap();
    let SubmitOutcome::Uploaded { queue_id, remote_id } = outcome else {
      panic!("expected upload, got {outcome:?}");
    };
    assert_eq!(remote_id.as_deref(), Some("ev-1"));
    match store.get(queue_id).await.unwrap().unwrap().state {
      OutboxState::Sent { remote_id, .. } => assert_eq!(remote_id.as_deref(), Some("ev-1")),
      other => panic!("expected Sent, got {other:?}"),
    }
  }

  #[tokio::test]
  async fn success_without_record_id_is_sent_not_rejected() {
    let api = FakeApi::default();
    api.describe_created_as(CreatedBody::Message);
    let client = online(api.clone()).await;
    let store = SqliteStore::open_in_memory().await.unwrap();

    let outcome = submit(&client, &store, evidence("Dente")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Uploaded { remote_id: None, .. }));
    assert!(store.pending().await.unwrap().is_empty());
    assert!(matches!(
      store.list_all().await.unwrap()[0].state,
      OutboxState::Sent { remote_id: None, .. }
    ));
    assert_eq!(api.posted().len(), 1);
  }

  #[tokio::test]
  async fn invalid_evidence_is_never_queued() {
    let client = offline().await;
    let store = SqliteStore::open_in_memory().await.unwrap();

    let mut e = evidence("Dente");
    e.attachments.clear();
    assert!(submit(&client, &store, e).await.is_err());
    assert!(store.list_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn offline_submission_stays_pending() {
    let client = offline().await;
    let store = SqliteStore::open_in_memory().await.unwrap();

    let outcome = submit(&client, &store, evidence("Dente")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Queued { .. }));

    let pending = store.pending().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
  }

  #[tokio::test]
  async fn client_error_rejects_without_retry() {
    let api = FakeApi::default();
    api.answer_evidence_with(StatusCode::UNPROCESSABLE_ENTITY);
    let client = online(api).await;
    let store = SqliteStore::open_in_memory().await.unwrap();

    let outcome = submit(&client, &store, evidence("Dente")).await.unwrap();
    assert!(matches!(outcome, SubmitOutcome::Rejected { .. }));
    assert!(store.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn flush_replays_queue_in_order() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let offline = offline().await;
    for kind in ["primeira", "segunda", "terceira"] {
      submit(&offline, &store, evidence(kind)).await.unwrap();
    }

    let api = FakeApi::default();
    let report = flush(&online(api.clone()).await, &store).await.unwrap();
    assert_eq!(report, SyncReport { sent: 3, still_pending: 0, rejected: 0 });

    let kinds: Vec<_> = api
      .posted()
      .iter()
      .map(|e| e["tipo"].as_str().unwrap().to_string())
      .collect();
    assert_eq!(kinds, ["primeira", "segunda", "terceira"]);
    assert!(store.pending().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn flush_stops_at_first_retryable_failure() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let offline = offline().await;
    submit(&offline, &store, evidence("a")).await.unwrap();
    submit(&offline, &store, evidence("b")).await.unwrap();

    let api = FakeApi::default();
    api.answer_evidence_with(StatusCode::BAD_GATEWAY);
    let report = flush(&online(api.clone()).await, &store).await.unwrap();

    assert_eq!(report, SyncReport { sent: 0, still_pending: 2, rejected: 0 });
    let pending = store.pending().await.unwrap();
    assert_eq!(pending[0].attempts, 2);
    assert_eq!(pending[1].attempts, 1);
  }
}
