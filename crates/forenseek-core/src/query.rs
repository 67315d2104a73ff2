//! The Case Query Engine.
//!
//! Selects the subset of an in-memory case listing that matches a
//! [`CaseFilter`]. Pure and synchronous: callers may run it on every keystroke
//! of a filter field without memoisation.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  case::{Case, CaseStatus},
};

// ─── Status filter ───────────────────────────────────────────────────────────

/// The status predicate. `All` is the "every status" sentinel and the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusFilter {
  #[default]
  All,
  Only(CaseStatus),
}

impl StatusFilter {
  pub fn matches(self, status: Option<CaseStatus>) -> bool {
    match self {
      Self::All => true,
      Self::Only(wanted) => status == Some(wanted),
    }
  }

  /// Advance through `All → Open → Closed → Archived → All`, the order of the
  /// status selector.
  pub fn cycle(self) -> Self {
    match self {
      Self::All => Self::Only(CaseStatus::Open),
      Self::Only(CaseStatus::Open) => Self::Only(CaseStatus::Closed),
      Self::Only(CaseStatus::Closed) => Self::Only(CaseStatus::Archived),
      Self::Only(CaseStatus::Archived) => Self::All,
    }
  }
}

impl From<CaseStatus> for StatusFilter {
  fn from(status: CaseStatus) -> Self { Self::Only(status) }
}

impl fmt::Display for StatusFilter {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::All => f.write_str("Todos status"),
      Self::Only(status) => f.write_str(status.label()),
    }
  }
}

impl FromStr for StatusFilter {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    if s.trim().eq_ignore_ascii_case("all") {
      return Ok(Self::All);
    }
    s.parse().map(Self::Only)
  }
}

// ─── Filter ──────────────────────────────────────────────────────────────────

/// Three independent, optional predicates, combined with logical AND.
///
/// Built fresh for every query and discarded afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaseFilter {
  /// Case-insensitive substring of the responsible party's name. Stored
  /// lowercased; `None` when absent or empty.
  responsible: Option<String>,
  status:      StatusFilter,
  opened_on:   Option<NaiveDate>,
}

impl CaseFilter {
  /// A filter with every predicate absent; matches every case.
  pub fn new() -> Self { Self::default() }

  /// Require the responsible party's name to contain `needle`, ignoring case.
  /// An empty needle leaves the predicate absent.
  pub fn responsible(mut self, needle: impl AsRef<str>) -> Self {
    let needle = needle.as_ref();
    self.responsible = (!needle.is_empty()).then(|| needle.to_lowercase());
    self
  }

  pub fn status(mut self, status: impl Into<StatusFilter>) -> Self {
    self.status = status.into();
    self
  }

  pub fn opened_on(mut self, day: NaiveDate) -> Self {
    self.opened_on = Some(day);
    self
  }

  /// Replace the date predicate; `None` removes it.
  pub fn opened_on_opt(mut self, day: Option<NaiveDate>) -> Self {
    self.opened_on = day;
    self
  }

  pub fn responsible_needle(&self) -> Option<&str> { self.responsible.as_deref() }

  pub fn status_filter(&self) -> StatusFilter { self.status }

  pub fn opened_on_date(&self) -> Option<NaiveDate> { self.opened_on }

  /// True when no predicate is active.
  pub fn is_unconstrained(&self) -> bool {
    self.responsible.is_none()
      && self.status == StatusFilter::All
      && self.opened_on.is_none()
  }

  /// Whether `case` satisfies every active predicate.
  ///
  /// Never fails: a case missing the data a predicate needs simply does not
  /// match that predicate.
  pub fn matches(&self, case: &Case) -> bool {
    self.matches_responsible(case)
      && self.status.matches(case.status)
      && self.matches_opened_on(case)
  }

  fn matches_responsible(&self, case: &Case) -> bool {
    let Some(needle) = &self.responsible else {
      return true;
    };
    case
      .responsible_name()
      .is_some_and(|name| name.to_lowercase().contains(needle.as_str()))
  }

  fn matches_opened_on(&self, case: &Case) -> bool {
    let Some(day) = self.opened_on else {
      return true;
    };
    case.opened_at.date() == Some(day)
  }
}

/// Select the cases matching `filter`, preserving their input order.
pub fn query<'a>(cases: &'a [Case], filter: &CaseFilter) -> Vec<&'a Case> {
  let hits: Vec<&Case> = cases.iter().filter(|c| filter.matches(c)).collect();
  tracing::debug!(total = cases.len(), matched = hits.len(), ?filter, "case query");
  hits
}

// ─── Presentation ────────────────────────────────────────────────────────────

/// Colour of a status chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
  Amber,
  Green,
  Gray,
  Neutral,
}

impl ColorToken {
  /// Chip background as a `#rrggbb` string.
  pub fn hex(self) -> &'static str {
    match self {
      Self::Amber => "#ffc107",
      Self::Green => "#28a745",
      Self::Gray => "#6c757d",
      Self::Neutral => "#f8f9fa",
    }
  }

  /// Readable text colour on top of [`ColorToken::hex`].
  pub fn text_hex(self) -> &'static str {
    match self {
      Self::Amber | Self::Neutral => "#000000",
      Self::Green | Self::Gray => "#ffffff",
    }
  }

  /// The `(r, g, b)` components of [`ColorToken::hex`].
  pub fn rgb(self) -> (u8, u8, u8) {
    match self {
      Self::Amber => (0xff, 0xc1, 0x07),
      Self::Green => (0x28, 0xa7, 0x45),
      Self::Gray => (0x6c, 0x75, 0x7d),
      Self::Neutral => (0xf8, 0xf9, 0xfa),
    }
  }

  pub fn text_rgb(self) -> (u8, u8, u8) {
    match self {
      Self::Amber | Self::Neutral => (0, 0, 0),
      Self::Green | Self::Gray => (0xff, 0xff, 0xff),
    }
  }
}

pub fn status_color(status: CaseStatus) -> ColorToken {
  match status {
    CaseStatus::Open => ColorToken::Amber,
    CaseStatus::Closed => ColorToken::Green,
    CaseStatus::Archived => ColorToken::Gray,
  }
}

/// Colour for a raw status label; anything outside [`CaseStatus`] is neutral.
pub fn label_color(label: &str) -> ColorToken {
  CaseStatus::from_label(label).map_or(ColorToken::Neutral, status_color)
}

#[cfg(test)]
mod tests {
  use strum::IntoEnumIterator;

  use super::*;
  use crate::case::{CaseDate, Responsible};

  fn day(s: &str) -> NaiveDate { NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap() }

  fn case(id: &str, name: &str, status: CaseStatus, opened: &str) -> Case {
    Case {
      id: id.into(),
      status: Some(status),
      responsible: Some(Responsible::named(name)),
      opened_at: CaseDate::new(opened),
      ..Case::default()
    }
  }

  fn scenario() -> Vec<Case> {
    vec![
      case("1", "Ana Silva", CaseStatus::Open, "2024-01-10"),
      case("2", "Bruno Costa", CaseStatus::Closed, "2024-01-10"),
      case("3", "Ana Paula", CaseStatus::Open, "2024-02-01"),
    ]
  }

  fn ids(hits: &[&Case]) -> Vec<String> { hits.iter().map(|c| c.id.clone()).collect() }

  #[test]
  fn scenario_status_open() {
    let cases = scenario();
    let hits = query(&cases, &CaseFilter::new().status(CaseStatus::Open));
    assert_eq!(ids(&hits), ["1", "3"]);
  }

  #[test]
  fn scenario_responsible_substring() {
    let cases = scenario();
    let hits = query(&cases, &CaseFilter::new().responsible("ana"));
    assert_eq!(ids(&hits), ["1", "3"]);
  }

  #[test]
  fn scenario_opened_on() {
    let cases = scenario();
    let hits = query(&cases, &CaseFilter::new().opened_on(day("2024-01-10")));
    assert_eq!(ids(&hits), ["1", "2"]);
  }

  #[test]
  fn scenario_status_and_date() {
    let cases = scenario();
    let filter = CaseFilter::new()
      .status(CaseStatus::Open)
      .opened_on(day("2024-01-10"));
    assert_eq!(ids(&query(&cases, &filter)), ["1"]);
  }

  #[test]
  fn responsible_match_ignores_case() {
    let cases = vec![case("1", "Silva", CaseStatus::Open, "2024-01-10")];
    let upper = query(&cases, &CaseFilter::new().responsible("SIL"));
    let lower = query(&cases, &CaseFilter::new().responsible("sil"));
    assert_eq!(ids(&upper), ["1"]);
    assert_eq!(upper, lower);
  }

  #[test]
  fn empty_needle_is_absent() {
    let filter = CaseFilter::new().responsible("");
    assert!(filter.is_unconstrained());

    let mut anonymous = case("1", "", CaseStatus::Open, "2024-01-10");
    anonymous.responsible = None;
    assert!(filter.matches(&anonymous));
  }

  #[test]
  fn missing_name_never_matches_active_needle() {
    let mut c = case("1", "x", CaseStatus::Open, "2024-01-10");
    c.responsible = None;
    assert!(!CaseFilter::new().responsible("a").matches(&c));

    c.responsible = Some(Responsible { id: Some("u1".into()), name: None });
    assert!(!CaseFilter::new().responsible("u1").matches(&c));
  }

  #[test]
  fn unparseable_opened_at_only_fails_the_date_predicate() {
    let c = case("1", "Ana", CaseStatus::Open, "em breve");
    assert!(!CaseFilter::new().opened_on(day("2024-01-10")).matches(&c));
    assert!(CaseFilter::new().responsible("an").matches(&c));
    assert!(CaseFilter::new().status(CaseStatus::Open).matches(&c));
  }

  #[test]
  fn date_predicate_ignores_time_of_day() {
    let c = case("1", "Ana", CaseStatus::Open, "2024-01-10T21:45:00-03:00");
    assert!(CaseFilter::new().opened_on(day("2024-01-10")).matches(&c));

    let spaced = case("2", "Ana", CaseStatus::Open, "2024-01-10 18:30:00");
    assert!(CaseFilter::new().opened_on(day("2024-01-10")).matches(&spaced));
  }

  #[test]
  fn unknown_status_matches_only_the_sentinel() {
    let mut c = case("1", "Ana", CaseStatus::Open, "2024-01-10");
    c.status = None;
    assert!(StatusFilter::All.matches(c.status));
    for status in CaseStatus::iter() {
      assert!(!CaseFilter::new().status(status).matches(&c));
    }
  }

  #[test]
  fn empty_input_yields_empty_output() {
    let filter = CaseFilter::new().responsible("a").status(CaseStatus::Closed);
    assert!(query(&[], &filter).is_empty());
  }

  #[test]
  fn status_filter_parses_sentinel_and_labels() {
    assert_eq!("all".parse::<StatusFilter>().unwrap(), StatusFilter::All);
    assert_eq!(
      "Arquivado".parse::<StatusFilter>().unwrap(),
      StatusFilter::Only(CaseStatus::Archived)
    );
    assert!("qualquer".parse::<StatusFilter>().is_err());
  }

  #[test]
  fn status_filter_cycle_visits_every_status_once() {
    let mut seen = vec![];
    let mut f = StatusFilter::All;
    loop {
      f = f.cycle();
      if f == StatusFilter::All {
        break;
      }
      seen.push(f);
    }
    let expected: Vec<_> = CaseStatus::iter().map(StatusFilter::Only).collect();
    assert_eq!(seen, expected);
  }

  #[test]
  fn status_color_covers_every_status() {
    let colors: Vec<_> = CaseStatus::iter().map(status_color).collect();
    assert_eq!(colors, [ColorToken::Amber, ColorToken::Green, ColorToken::Gray]);
    for status in CaseStatus::iter() {
      assert_eq!(label_color(status.label()), status_color(status));
      assert_ne!(status_color(status), ColorToken::Neutral);
    }
    assert_eq!(label_color("Suspenso"), ColorToken::Neutral);
  }

  #[test]
  fn color_hex_and_rgb_agree() {
    for token in [
      ColorToken::Amber,
      ColorToken::Green,
      ColorToken::Gray,
      ColorToken::Neutral,
    ] {
      let (r, g, b) = token.rgb();
      assert_eq!(token.hex(), format!("#{r:02x}{g:02x}{b:02x}"));
    }
    assert_eq!(ColorToken::Amber.text_hex(), "#000000");
    assert_eq!(ColorToken::Green.text_hex(), "#ffffff");
  }
}
