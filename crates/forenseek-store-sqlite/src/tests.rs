//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::Utc;
use forenseek_core::{
  case::Location,
  evidence::{Attachment, NewEvidence},
  session::{Role, StoredSession},
  store::{EvidenceOutbox, OutboxState, SessionStore},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn session(token: &str, role: Role) -> StoredSession {
  StoredSession {
    token:    token.into(),
    user_id:  "user-1".into(),
    role,
    saved_at: Utc::now(),
  }
}

fn evidence(case_id: &str, kind: &str) -> NewEvidence {
  let mut e = NewEvidence::new(case_id, kind, "coletado no local", "user-1");
  e.location = Some(Location { latitude: -8.05, longitude: -34.9 });
  e.attachments.push(Attachment::from_bytes(
    "foto.jpg",
    "/sdcard/DCIM/foto.jpg",
    "image/jpeg",
    b"\xff\xd8\xff",
  ));
  e
}

// ─── Session ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_store_has_no_session() {
  let s = store().await;
  assert!(s.load_session().await.unwrap().is_none());
}

#[tokio::test]
async fn save_and_load_session() {
  let s = store().await;
  let saved = session("tok-1", Role::Expert);
  s.save_session(saved.clone()).await.unwrap();

  let loaded = s.load_session().await.unwrap().unwrap();
  assert_eq!(loaded.token, "tok-1");
  assert_eq!(loaded.user_id, "user-1");
  assert_eq!(loaded.role, Role::Expert);
  assert_eq!(loaded.saved_at.timestamp(), saved.saved_at.timestamp());
}

#[tokio::test]
async fn saving_again_replaces_the_session() {
  let s = store().await;
  s.save_session(session("old", Role::Admin)).await.unwrap();
  s.save_session(session("new", Role::Assistant)).await.unwrap();

  let loaded = s.load_session().await.unwrap().unwrap();
  assert_eq!(loaded.token, "new");
  assert_eq!(loaded.role, Role::Assistant);
}

#[tokio::test]
async fn clear_session_is_idempotent() {
  let s = store().await;
  s.save_session(session("tok", Role::Expert)).await.unwrap();
  s.clear_session().await.unwrap();
  assert!(s.load_session().await.unwrap().is_none());
  s.clear_session().await.unwrap();
}

// ─── Outbox ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn enqueue_and_get() {
  let s = store().await;
  let queued = s.enqueue(evidence("case-1", "Dente")).await.unwrap();
  assert_eq!(queued.state, OutboxState::Pending);
  assert_eq!(queued.attempts, 0);

  let fetched = s.get(queued.queue_id).await.unwrap().unwrap();
  assert_eq!(fetched.evidence, queued.evidence);
  assert_eq!(fetched.state, OutboxState::Pending);
}

#[tokio::test]
async fn get_missing_entry_returns_none() {
  let s = store().await;
  assert!(s.get(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn pending_is_fifo() {
  let s = store().await;
  let a = s.enqueue(evidence("case-1", "a")).await.unwrap();
  let b = s.enqueue(evidence("case-2", "b")).await.unwrap();
  let c = s.enqueue(evidence("case-1", "c")).await.unwrap();

  let ids: Vec<_> = s.pending().await.unwrap().iter().map(|q| q.queue_id).collect();
  assert_eq!(ids, [a.queue_id, b.queue_id, c.queue_id]);
}

#[tokio::test]
async fn record_failure_keeps_entry_pending() {
  let s = store().await;
  let q = s.enqueue(evidence("case-1", "Dente")).await.unwrap();

  s.record_failure(q.queue_id, "connection refused".into()).await.unwrap();
  let after = s
    .record_failure(q.queue_id, "timed out".into())
    .await
    .unwrap();

  assert_eq!(after.attempts, 2);
  assert_eq!(after.last_error.as_deref(), Some("timed out"));
  assert!(after.state.is_pending());
  assert_eq!(s.pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn mark_sent_leaves_the_pending_set() {
  let s = store().await;
  let q = s.enqueue(evidence("case-1", "Dente")).await.unwrap();

  let sent = s.mark_sent(q.queue_id, Some("ev-99".into())).await.unwrap();
  match sent.state {
    OutboxState::Sent { ref remote_id, .. } => assert_eq!(remote_id.as_deref(), Some("ev-99")),
    other => panic!("expected Sent, got {other:?}"),
  }
  assert!(s.pending().await.unwrap().is_empty());
  assert_eq!(s.list_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn sent_entry_may_lack_a_remote_id() {
  let s = store().await;
  let q = s.enqueue(evidence("case-1", "Dente")).await.unwrap();
  s.mark_sent(q.queue_id, None).await.unwrap();

  let fetched = s.get(q.queue_id).await.unwrap().unwrap();
  assert!(matches!(fetched.state, OutboxState::Sent { remote_id: None, .. }));
}

#[tokio::test]
async fn mark_rejected_records_reason() {
  let s = store().await;
  let q = s.enqueue(evidence("case-1", "Dente")).await.unwrap();

  let rejected = s
    .mark_rejected(q.queue_id, "400 Bad Request".into())
    .await
    .unwrap();
  assert!(matches!(
    rejected.state,
    OutboxState::Rejected { ref reason, .. } if reason == "400 Bad Request"
  ));
  assert!(s.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn terminal_entries_cannot_transition_again() {
  let s = store().await;
  let q = s.enqueue(evidence("case-1", "Dente")).await.unwrap();
  s.mark_sent(q.queue_id, Some("ev-1".into())).await.unwrap();

  let err = s.mark_rejected(q.queue_id, "late".into()).await.unwrap_err();
  assert!(matches!(err, Error::NotPending(id) if id == q.queue_id));

  let err = s.record_failure(q.queue_id, "late".into()).await.unwrap_err();
  assert!(matches!(err, Error::NotPending(_)));

  let err = s.mark_sent(q.queue_id, Some("ev-2".into())).await.unwrap_err();
  assert!(matches!(err, Error::NotPending(_)));
}

#[tokio::test]
async fn transitions_on_unknown_entry_fail() {
  let s = store().await;
  let id = Uuid::new_v4();
  let err = s.mark_sent(id, None).await.unwrap_err();
  assert!(matches!(err, Error::EntryNotFound(missing) if missing == id));
}

#[tokio::test]
async fn attachment_digest_survives_storage() {
  let s = store().await;
  let q = s.enqueue(evidence("case-1", "Dente")).await.unwrap();
  let fetched = s.get(q.queue_id).await.unwrap().unwrap();
  assert_eq!(
    fetched.evidence.attachments[0].sha256,
    q.evidence.attachments[0].sha256
  );
  assert!(fetched.evidence.attachments[0].sha256.is_some());
}
