//! Application state machine and event dispatcher.

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use forenseek_core::{
  CaseFilter, StatusFilter,
  case::{Case, ingest},
  evidence::Evidence,
  query,
  session::AuthContext,
};

use crate::client::ApiClient;

// ─── Screen ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
  /// Focus on the case table.
  CaseList,
  /// Focus on the detail pane of `App::selected`.
  CaseDetail,
}

/// Which text filter is receiving keystrokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Editing {
  Responsible,
  Date,
}

// ─── App ──────────────────────────────────────────────────────────────────────

/// Top-level application state.
pub struct App {
  pub screen: Screen,

  /// Every case accepted at the last load, in server order.
  pub cases: Vec<Case>,

  /// Responsible-name filter text, as typed.
  pub responsible: String,

  pub status_filter: StatusFilter,

  /// Opening-date filter text, auto-formatted as `YYYY-MM-DD` while typing.
  pub date_input: String,

  pub editing: Option<Editing>,

  /// Cursor position within the *visible* case list.
  pub list_cursor: usize,

  /// Scroll offset within the evidence list of the detail pane.
  pub detail_scroll: usize,

  pub selected: Option<Case>,

  /// Evidence recorded for `selected`.
  pub evidence: Vec<Evidence>,

  /// One-line status message shown in the status bar.
  pub status_msg: String,

  pub auth: AuthContext,

  pub client: Arc<ApiClient>,
}

impl App {
  /// `client` must already carry `auth`.
  pub fn new(client: ApiClient, auth: AuthContext) -> Self {
    Self {
      screen: Screen::CaseList,
      cases: Vec::new(),
      responsible: String::new(),
      status_filter: StatusFilter::All,
      date_input: String::new(),
      editing: None,
      list_cursor: 0,
      detail_scroll: 0,
      selected: None,
      evidence: Vec::new(),
      status_msg: String::new(),
      auth,
      client: Arc::new(client),
    }
  }

  // ── Data loading ──────────────────────────────────────────────────────────

  /// Fetch all cases and keep the consistent ones.
  pub async fn load_cases(&mut self) -> anyhow::Result<()> {
    self.status_msg = "Loading cases…".into();
    match self.client.list_cases().await {
      Ok(cases) => {
        let ingestion = ingest(cases);
        self.cases = ingestion.accepted;
        self.list_cursor = 0;
        self.status_msg = match ingestion.rejected.len() {
          0 => String::new(),
          n => format!("{n} inconsistent case record(s) ignored"),
        };
        Ok(())
      }
      Err(e) => {
        self.status_msg = format!("Error: {e}");
        Err(e.into())
      }
    }
  }

  async fn load_evidence(&mut self, case_id: &str) {
    self.evidence.clear();
    self.detail_scroll = 0;
    match self.client.list_evidence(case_id).await {
      Ok(evidence) => {
        self.evidence = evidence;
        self.status_msg = String::new();
      }
      Err(e) => self.status_msg = format!("Error loading evidence: {e}"),
    }
  }

  // ── Filtered list ─────────────────────────────────────────────────────────

  /// The date filter, once `date_input` holds a complete valid date.
  pub fn date_filter(&self) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&self.date_input, "%Y-%m-%d").ok()
  }

  pub fn filter(&self) -> CaseFilter {
    CaseFilter::new()
      .responsible(&self.responsible)
      .status(self.status_filter)
      .opened_on_opt(self.date_filter())
  }

  /// Cases matching the current filters, recomputed on every call.
  pub fn visible_cases(&self) -> Vec<&Case> { query(&self.cases, &self.filter()) }

  /// The case under the list cursor in the filtered view, if any.
  pub fn cursor_case(&self) -> Option<&Case> {
    self.visible_cases().get(self.list_cursor).copied()
  }

  fn filters_changed(&mut self) { self.list_cursor = 0; }

  // ── Key handling ──────────────────────────────────────────────────────────

  /// Process a key event. Returns `true` to continue, `false` to quit.
  pub async fn handle_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
      return Ok(false);
    }

    if let Some(editing) = self.editing {
      self.handle_edit_key(editing, key);
      return Ok(true);
    }

    match self.screen {
      Screen::CaseList => self.handle_list_key(key).await,
      Screen::CaseDetail => Ok(self.handle_detail_key(key)),
    }
  }

  fn handle_edit_key(&mut self, editing: Editing, key: KeyEvent) {
    match (editing, key.code) {
      (_, KeyCode::Enter) => self.editing = None,
      (Editing::Responsible, KeyCode::Esc) => {
        self.responsible.clear();
        self.editing = None;
      }
      (Editing::Date, KeyCode::Esc) => {
        self.date_input.clear();
        self.editing = None;
      }
      (Editing::Responsible, KeyCode::Backspace) => {
        self.responsible.pop();
      }
      (Editing::Responsible, KeyCode::Char(c)) => self.responsible.push(c),
      (Editing::Date, KeyCode::Backspace) => {
        let mut digits: String = self.date_input.chars().filter(char::is_ascii_digit).collect();
        digits.pop();
        self.date_input = format_date_input(&digits);
      }
      (Editing::Date, KeyCode::Char(c)) if c.is_ascii_digit() => {
        self.date_input = format_date_input(&format!("{}{c}", self.date_input));
      }
      _ => return,
    }
    self.filters_changed();
  }

  async fn handle_list_key(&mut self, key: KeyEvent) -> anyhow::Result<bool> {
    match key.code {
      KeyCode::Char('q') => return Ok(false),

      KeyCode::Down | KeyCode::Char('j') => {
        let len = self.visible_cases().len();
        if len > 0 && self.list_cursor + 1 < len {
          self.list_cursor += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.list_cursor = self.list_cursor.saturating_sub(1);
      }

      KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
        if let Some(case) = self.cursor_case().cloned() {
          self.open_detail(case).await;
        }
      }

      // Filters
      KeyCode::Char('/') | KeyCode::Char('r') => self.editing = Some(Editing::Responsible),
      KeyCode::Char('d') => self.editing = Some(Editing::Date),
      KeyCode::Char('s') => {
        self.status_filter = self.status_filter.cycle();
        self.filters_changed();
      }
      KeyCode::Char('t') => {
        self.date_input = Local::now().date_naive().format("%Y-%m-%d").to_string();
        self.filters_changed();
      }
      KeyCode::Char('c') => {
        self.responsible.clear();
        self.status_filter = StatusFilter::All;
        self.date_input.clear();
        self.filters_changed();
      }

      KeyCode::Char('R') => {
        // A failed reload keeps the previous list; the error is in the status bar.
        let _ = self.load_cases().await;
      }

      _ => {}
    }
    Ok(true)
  }

  fn handle_detail_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('q') => return false,

      KeyCode::Esc | KeyCode::Left | KeyCode::Char('h') => {
        self.screen = Screen::CaseList;
        self.selected = None;
        self.evidence.clear();
      }

      KeyCode::Down | KeyCode::Char('j') => {
        if self.detail_scroll + 1 < self.evidence.len() {
          self.detail_scroll += 1;
        }
      }
      KeyCode::Up | KeyCode::Char('k') => {
        self.detail_scroll = self.detail_scroll.saturating_sub(1);
      }

      _ => {}
    }
    true
  }

  /// Transition to `CaseDetail` for `case`, loading its evidence.
  async fn open_detail(&mut self, case: Case) {
    self.load_evidence(&case.id).await;
    self.selected = Some(case);
    self.screen = Screen::CaseDetail;
  }
}

/// Reformat free-form input as a partial `YYYY-MM-DD` date. Non-digits are
/// dropped and at most eight digits are kept.
pub fn format_date_input(raw: &str) -> String {
  let digits: String = raw.chars().filter(char::is_ascii_digit).take(8).collect();
  match digits.len() {
    0..=4 => digits,
    5..=6 => format!("{}-{}", &digits[..4], &digits[4..]),
    _ => format!("{}-{}-{}", &digits[..4], &digits[4..6], &digits[6..]),
  }
}
