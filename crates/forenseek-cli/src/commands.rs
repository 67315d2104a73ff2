//! Non-interactive subcommands.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, bail};
use chrono::NaiveDate;
use forenseek_core::{
  CaseFilter, StatusFilter,
  case::{CaseStatus, Location, ingest},
  case_form::{CaseUpdate, NewCase},
  evidence::{Attachment, NewEvidence},
  query,
  session::{AuthContext, Capability, Role},
  store::{EvidenceOutbox, OutboxState, SessionStore},
};
use forenseek_store_sqlite::SqliteStore;

use crate::{
  client::ApiClient,
  sync::{self, SubmitOutcome},
  ui::{day_month_year, opened_on, shown_day},
};

/// The signed-in session, or an error telling the user to log in.
pub async fn require_session(store: &SqliteStore) -> anyhow::Result<AuthContext> {
  match store.load_session().await.context("failed to read session")? {
    Some(stored) => Ok(stored.into()),
    None => bail!("not signed in; run `forenseek login` first"),
  }
}

// ─── Session ──────────────────────────────────────────────────────────────────

/// Authenticate, resolve the user's role, and persist the session.
pub async fn login(
  client: &ApiClient,
  store: &SqliteStore,
  matricula: &str,
  senha: &str,
) -> anyhow::Result<AuthContext> {
  let resp = client
    .login(matricula, senha)
    .await
    .context("login failed")?;

  let provisional = AuthContext::new(&resp.token, &resp.user.id, Role::Unknown);
  let profile = client
    .with_auth(provisional)
    .get_user(&resp.user.id)
    .await
    .context("failed to fetch user profile")?;

  let auth = AuthContext::new(resp.token, resp.user.id, profile.role);
  store.save_session(auth.to_stored()).await?;
  tracing::info!(user_id = %auth.user_id, role = auth.role.as_str(), "signed in");

  let name = if profile.name.is_empty() { profile.id.as_str() } else { profile.name.as_str() };
  println!("Signed in as {name} ({})", auth.role.as_str());
  Ok(auth)
}

pub async fn logout(store: &SqliteStore) -> anyhow::Result<()> {
  store.clear_session().await?;
  println!("Signed out.");
  Ok(())
}

pub async fn whoami(store: &SqliteStore) -> anyhow::Result<()> {
  let auth = require_session(store).await?;
  println!("user:  {}", auth.user_id);
  println!("role:  {}", auth.role.as_str());
  let caps: Vec<&str> = auth.permissions.iter().map(Capability::as_str).collect();
  println!("can:   {}", caps.join(", "));
  Ok(())
}

// ─── Cases ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct CasesArgs {
  pub responsible: Option<String>,
  pub status:      Option<StatusFilter>,
  pub date:        Option<NaiveDate>,
  pub json:        bool,
}

impl CasesArgs {
  fn filter(&self) -> CaseFilter {
    let filter = CaseFilter::new()
      .status(self.status.unwrap_or_default())
      .opened_on_opt(self.date);
    match &self.responsible {
      Some(needle) => filter.responsible(needle),
      None => filter,
    }
  }
}

/// Fetch, validate, filter and print cases.
pub async fn cases(client: &ApiClient, args: &CasesArgs) -> anyhow::Result<()> {
  let fetched = client.list_cases().await.context("failed to fetch cases")?;
  let ingestion = ingest(fetched);
  let hits = query(&ingestion.accepted, &args.filter());

  if args.json {
    println!("{}", serde_json::to_string_pretty(&hits)?);
    return Ok(());
  }

  if hits.is_empty() {
    println!("No case matches the filters.");
  }
  for (i, case) in hits.iter().enumerate() {
    println!(
      "{:>3}  {:<24}  {:<10}  {:<13}  {}",
      i + 1,
      case.responsible_name().unwrap_or("-"),
      opened_on(case),
      case.status.map_or("?", |s| s.label()),
      case.title,
    );
  }
  if !ingestion.rejected.is_empty() {
    eprintln!(
      "{} inconsistent case record(s) were ignored (run with --verbose for details)",
      ingestion.rejected.len()
    );
  }
  Ok(())
}

/// Print one case with its evidence.
pub async fn show_case(client: &ApiClient, case_id: &str, json: bool) -> anyhow::Result<()> {
  let case = client.get_case(case_id).await.context("failed to fetch case")?;
  let evidence = client
    .list_evidence(case_id)
    .await
    .context("failed to fetch evidence")?;

  if json {
    let out = serde_json::json!({ "case": case, "evidence": evidence });
    println!("{}", serde_json::to_string_pretty(&out)?);
    return Ok(());
  }

  if let Err(e) = case.validate() {
    eprintln!("warning: {e}");
  }
  println!("{}  {}", case.id, case.title);
  println!("  status:       {}", case.status.map_or("?", |s| s.label()));
  println!("  responsible:  {}", case.responsible_name().unwrap_or("-"));
  println!("  opened:       {}", opened_on(&case));
  if !case.description.is_empty() {
    println!("  {}", case.description);
  }
  println!("evidence ({}):", evidence.len());
  for ev in &evidence {
    let collected = shown_day(ev.collected_at.as_ref());
    println!("  {}  {:<16}  {collected}  {} file(s)", ev.id, ev.kind, ev.attachments.len());
  }
  Ok(())
}

fn location(latitude: Option<f64>, longitude: Option<f64>) -> Option<Location> {
  Some(Location { latitude: latitude?, longitude: longitude? })
}

#[derive(Debug, Clone)]
pub struct NewCaseArgs {
  pub title:       String,
  pub description: String,
  pub status:      CaseStatus,
  /// Defaults to today.
  pub opened:      Option<NaiveDate>,
  pub occurred:    NaiveDate,
  pub latitude:    Option<f64>,
  pub longitude:   Option<f64>,
  pub victim:      Option<String>,
}

/// The case the signed-in user is registering; they become its responsible.
pub fn build_case(auth: &AuthContext, args: &NewCaseArgs) -> NewCase {
  let mut case = NewCase::new(&args.title, &args.description, &auth.user_id, args.occurred);
  case.status = args.status;
  if let Some(day) = args.opened {
    case.opened_on = day;
  }
  case.location = location(args.latitude, args.longitude);
  case.victim = args.victim.clone();
  case
}

pub async fn add_case(
  client: &ApiClient,
  auth: &AuthContext,
  args: &NewCaseArgs,
) -> anyhow::Result<()> {
  auth.require(Capability::RegisterCase)?;
  let case = build_case(auth, args);
  case.validate()?;

  let created = client.create_case(&case).await.context("failed to register case")?;
  tracing::info!(case_id = ?created.id, "case registered");
  match created.id {
    Some(id) => println!("Case registered as {id}."),
    None => println!("Case registered."),
  }
  Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct EditCaseArgs {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub status:      Option<CaseStatus>,
  pub occurred:    Option<NaiveDate>,
  pub closed:      Option<NaiveDate>,
  pub latitude:    Option<f64>,
  pub longitude:   Option<f64>,
}

impl EditCaseArgs {
  fn update(&self) -> CaseUpdate {
    CaseUpdate {
      title:       self.title.clone(),
      description: self.description.clone(),
      status:      self.status,
      occurred_on: self.occurred,
      closed_on:   self.closed,
      location:    location(self.latitude, self.longitude),
    }
  }
}

/// Apply `args` to case `case_id`, refusing edits that would leave it
/// inconsistent.
pub async fn edit_case(
  client: &ApiClient,
  auth: &AuthContext,
  case_id: &str,
  args: &EditCaseArgs,
) -> anyhow::Result<()> {
  auth.require(Capability::EditCase)?;
  let update = args.update();
  let current = client.get_case(case_id).await.context("failed to fetch case")?;
  update.check_against(&current)?;

  client
    .update_case(case_id, &update)
    .await
    .context("failed to update case")?;
  tracing::info!(case_id, "case updated");
  println!("Case {case_id} updated.");
  Ok(())
}

// ─── Evidence ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EvidenceArgs {
  pub case_id:     String,
  pub kind:        String,
  pub description: String,
  pub latitude:    f64,
  pub longitude:   f64,
  pub files:       Vec<PathBuf>,
}

async fn attachment(path: &Path) -> anyhow::Result<Attachment> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read {}", path.display()))?;
  let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
  let filename = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_default();
  // Sniffed from the content; the extension is not trusted.
  let mimetype = infer::get(&bytes).map_or("application/octet-stream", |kind| kind.mime_type());
  Ok(Attachment::from_bytes(
    filename,
    absolute.display().to_string(),
    mimetype,
    &bytes,
  ))
}

/// Build the evidence item the signed-in user is registering.
pub async fn build_evidence(auth: &AuthContext, args: &EvidenceArgs) -> anyhow::Result<NewEvidence> {
  let mut evidence = NewEvidence::new(&args.case_id, &args.kind, &args.description, &auth.user_id);
  evidence.location = Some(Location { latitude: args.latitude, longitude: args.longitude });
  for path in &args.files {
    evidence.attachments.push(attachment(path).await?);
  }
  Ok(evidence)
}

pub async fn add_evidence(
  client: &ApiClient,
  store: &SqliteStore,
  auth: &AuthContext,
  args: &EvidenceArgs,
) -> anyhow::Result<()> {
  auth.require(Capability::RegisterEvidence)?;
  let evidence = build_evidence(auth, args).await?;

  match sync::submit(client, store, evidence).await? {
    SubmitOutcome::Uploaded { queue_id, remote_id: Some(remote_id) } => {
      println!("Evidence {queue_id} registered as {remote_id}.")
    }
    SubmitOutcome::Uploaded { queue_id, remote_id: None } => {
      println!("Evidence {queue_id} registered.")
    }
    SubmitOutcome::Queued { queue_id, error } => {
      println!("Evidence saved locally as {queue_id}; upload will be retried ({error}).")
    }
    SubmitOutcome::Rejected { queue_id, reason } => {
      bail!("server rejected evidence {queue_id}: {reason}")
    }
  }
  Ok(())
}

pub async fn list_outbox(store: &SqliteStore, all: bool) -> anyhow::Result<()> {
  let entries = if all { store.list_all().await? } else { store.pending().await? };
  if entries.is_empty() {
    println!("Outbox is empty.");
  }
  for entry in entries {
    let state = match &entry.state {
      OutboxState::Pending => format!("pending ({} attempt(s))", entry.attempts),
      OutboxState::Sent { remote_id: Some(remote_id), .. } => format!("sent as {remote_id}"),
      OutboxState::Sent { remote_id: None, .. } => "sent".to_string(),
      OutboxState::Rejected { reason, .. } => format!("rejected: {reason}"),
    };
    println!(
      "{}  {}  case {:<10}  {:<16}  {state}",
      entry.queue_id,
      day_month_year(entry.queued_at.date_naive()),
      entry.evidence.case_id,
      entry.evidence.kind,
    );
    if let (OutboxState::Pending, Some(err)) = (&entry.state, &entry.last_error) {
      println!("    last error: {err}");
    }
  }
  Ok(())
}

pub async fn sync_outbox(client: &ApiClient, store: &SqliteStore) -> anyhow::Result<()> {
  let report = sync::flush(client, store).await?;
  println!(
    "sent {}, rejected {}, still pending {}",
    report.sent, report.rejected, report.still_pending
  );
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;
  use crate::client::fake_api::{FakeApi, MATRICULA, SENHA, TOKEN, spawn};

  const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
  const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

  fn temp_file(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("forenseek-{}-{name}", uuid::Uuid::new_v4()));
    std::fs::write(&path, bytes).unwrap();
    path
  }

  fn evidence_args(files: Vec<PathBuf>) -> EvidenceArgs {
    EvidenceArgs {
      case_id: "c1".into(),
      kind: "Dente".into(),
      description: "Canino".into(),
      latitude: -8.05,
      longitude: -34.9,
      files,
    }
  }

  fn new_case_args() -> NewCaseArgs {
    NewCaseArgs {
      title:       "Ossada no canavial".into(),
      description: "Restos mortais".into(),
      status:      CaseStatus::Open,
      opened:      NaiveDate::from_ymd_opt(2024, 1, 10),
      occurred:    NaiveDate::from_ymd_opt(2024, 1, 8).unwrap(),
      latitude:    Some(-8.05),
      longitude:   Some(-34.9),
      victim:      None,
    }
  }

  async fn setup(api: FakeApi) -> (ApiClient, SqliteStore) {
    let client = ApiClient::new(spawn(api).await, Duration::from_secs(5)).unwrap();
    (client, SqliteStore::open_in_memory().await.unwrap())
  }

  #[tokio::test]
  async fn login_persists_session_with_server_role() {
    let api = FakeApi { role: "assistente", ..FakeApi::default() };
    let (client, store) = setup(api).await;

    let auth = login(&client, &store, MATRICULA, SENHA).await.unwrap();
    assert_eq!(auth.role, Role::Assistant);
    assert!(!auth.can(Capability::EditCase));

    let restored = require_session(&store).await.unwrap();
    assert_eq!(restored, auth);

    logout(&store).await.unwrap();
    assert!(require_session(&store).await.is_err());
  }

  #[tokio::test]
  async fn failed_login_stores_nothing() {
    let (client, store) = setup(FakeApi::default()).await;
    assert!(login(&client, &store, MATRICULA, "errada").await.is_err());
    assert!(store.load_session().await.unwrap().is_none());
  }

  #[tokio::test]
  async fn evidence_requires_capability() {
    let (client, store) = setup(FakeApi::default()).await;
    let reader = AuthContext::new(TOKEN, "7", Role::Unknown);
    let args = evidence_args(vec![]);
    let err = add_evidence(&client.with_auth(reader.clone()), &store, &reader, &args)
      .await
      .unwrap_err();
    assert!(err.to_string().contains("not permitted"));
    assert!(store.list_all().await.unwrap().is_empty());
  }

  #[tokio::test]
  async fn evidence_files_are_described_from_disk() {
    let path = temp_file("molar", JPEG);

    let auth = AuthContext::new(TOKEN, "7", Role::Expert);
    let evidence = build_evidence(&auth, &evidence_args(vec![path.clone()]))
      .await
      .unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(evidence.collected_by, "7");
    let file = &evidence.attachments[0];
    assert_eq!(file.mimetype, "image/jpeg");
    assert_eq!(file.size, JPEG.len() as u64);
    assert!(evidence.validate().is_ok());
  }

  #[tokio::test]
  async fn attachment_type_comes_from_content_not_extension() {
    let png_named_jpg = temp_file("photo.jpg", PNG);
    let text_named_jpg = temp_file("notes.jpg", b"plain text");

    let auth = AuthContext::new(TOKEN, "7", Role::Expert);
    let args = evidence_args(vec![png_named_jpg.clone(), text_named_jpg.clone()]);
    let evidence = build_evidence(&auth, &args).await.unwrap();
    std::fs::remove_file(&png_named_jpg).ok();
    std::fs::remove_file(&text_named_jpg).ok();

    assert_eq!(evidence.attachments[0].mimetype, "image/png");
    assert_eq!(evidence.attachments[1].mimetype, "application/octet-stream");
  }

  #[tokio::test]
  async fn assistant_registers_cases_but_cannot_edit_them() {
    let api = FakeApi::default();
    let (client, _store) = setup(api.clone()).await;
    let assistant = AuthContext::new(TOKEN, "7", Role::Assistant);
    let client = client.with_auth(assistant.clone());

    add_case(&client, &assistant, &new_case_args()).await.unwrap();
    let posted = api.new_cases();
    assert_eq!(posted[0]["responsavel"], "7");
    assert_eq!(posted[0]["dataAbertura"], "2024-01-10");
    assert_eq!(posted[0]["localidade"]["latitude"], -8.05);

    let edit = EditCaseArgs { status: Some(CaseStatus::Archived), ..EditCaseArgs::default() };
    let err = edit_case(&client, &assistant, "c1", &edit).await.unwrap_err();
    assert!(err.to_string().contains("not permitted"));
    assert!(api.case_updates().is_empty());
  }

  #[tokio::test]
  async fn inconsistent_new_case_is_not_sent() {
    let api = FakeApi::default();
    let (client, _store) = setup(api.clone()).await;
    let expert = AuthContext::new(TOKEN, "7", Role::Expert);

    let mut args = new_case_args();
    args.occurred = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
    assert!(add_case(&client.with_auth(expert.clone()), &expert, &args).await.is_err());
    assert!(api.new_cases().is_empty());
  }

  #[tokio::test]
  async fn expert_edit_is_checked_against_current_case() {
    let api = FakeApi::default();
    let (client, _store) = setup(api.clone()).await;
    let expert = AuthContext::new(TOKEN, "7", Role::Expert);
    let client = client.with_auth(expert.clone());

    // c1 is in progress; a closing date alone would contradict its status.
    let close_only = EditCaseArgs {
      closed: NaiveDate::from_ymd_opt(2024, 3, 1),
      ..EditCaseArgs::default()
    };
    assert!(edit_case(&client, &expert, "c1", &close_only).await.is_err());
    assert!(api.case_updates().is_empty());

    let close = EditCaseArgs { status: Some(CaseStatus::Closed), ..close_only };
    edit_case(&client, &expert, "c1", &close).await.unwrap();
    let updates = api.case_updates();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].1["status"], "Finalizado");
    assert_eq!(updates[0].1["dataFechamento"], "2024-03-01");
    assert!(updates[0].1.get("titulo").is_none());
  }

  #[test]
  fn cases_args_build_the_expected_filter() {
    let args = CasesArgs {
      responsible: Some("ANA".into()),
      status: Some(StatusFilter::Only(CaseStatus::Open)),
      date: NaiveDate::from_ymd_opt(2024, 1, 10),
      json: false,
    };
    let filter = args.filter();
    assert_eq!(filter.responsible_needle(), Some("ana"));
    assert_eq!(filter.status_filter(), StatusFilter::Only(CaseStatus::Open));
    assert_eq!(filter.opened_on_date(), NaiveDate::from_ymd_opt(2024, 1, 10));
    assert!(CasesArgs::default().filter().is_unconstrained());
  }
}
