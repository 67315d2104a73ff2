//! Case records as delivered by the ForenSeek REST API.
//!
//! The API speaks Portuguese field names and is loose about types: dates may
//! arrive as plain days or full timestamps, coordinates as numbers or strings,
//! and the responsible party as an embedded object or a bare id. Decoding is
//! lenient so that one malformed record never fails a whole listing; strict
//! checks live in [`Case::validate`] and [`ingest`].

use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::{Error, Result};

// ─── Status ──────────────────────────────────────────────────────────────────

/// Lifecycle status of a case. The wire value is the Portuguese display label.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  EnumIter,
  EnumCount,
)]
pub enum CaseStatus {
  #[serde(rename = "Em andamento")]
  Open,
  #[serde(rename = "Finalizado")]
  Closed,
  #[serde(rename = "Arquivado")]
  Archived,
}

impl CaseStatus {
  /// The label shown to investigators and stored by the API.
  pub fn label(self) -> &'static str {
    match self {
      Self::Open => "Em andamento",
      Self::Closed => "Finalizado",
      Self::Archived => "Arquivado",
    }
  }

  /// Short English name, used on the command line.
  pub fn name(self) -> &'static str {
    match self {
      Self::Open => "open",
      Self::Closed => "closed",
      Self::Archived => "archived",
    }
  }

  /// Resolve either a display label or an English name, ignoring case and
  /// surrounding whitespace.
  pub fn from_label(label: &str) -> Option<Self> {
    let label = label.trim();
    Self::iter().find(|s| {
      s.label().eq_ignore_ascii_case(label) || s.name().eq_ignore_ascii_case(label)
    })
  }

  /// Whether a case in this status may carry a closing date.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Closed | Self::Archived) }
}

impl fmt::Display for CaseStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

impl FromStr for CaseStatus {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    Self::from_label(s).ok_or_else(|| Error::UnknownStatus(s.to_owned()))
  }
}

// ─── Responsible party ───────────────────────────────────────────────────────

/// The investigator who owns a case.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Responsible {
  #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
  pub id:   Option<String>,
  #[serde(rename = "nome", skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
}

impl Responsible {
  pub fn named(name: impl Into<String>) -> Self {
    Self { id: None, name: Some(name.into()) }
  }

  /// The trimmed display name, or `None` when missing or blank.
  pub fn display_name(&self) -> Option<&str> {
    self.name.as_deref().map(str::trim).filter(|n| !n.is_empty())
  }
}

impl<'de> Deserialize<'de> for Responsible {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    // Populated listings embed the user; create payloads carry only its id.
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
      Embedded {
        #[serde(rename = "_id", default)]
        id:   Option<String>,
        #[serde(rename = "nome", default)]
        name: Option<String>,
      },
      Id(String),
    }

    Ok(match Wire::deserialize(d)? {
      Wire::Embedded { id, name } => Self { id, name },
      Wire::Id(id) => Self { id: Some(id), name: None },
    })
  }
}

// ─── Dates ───────────────────────────────────────────────────────────────────

/// A date exactly as the API delivered it. Parsing is deferred so that an
/// unparseable value only matters to the predicates that look at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CaseDate(String);

impl CaseDate {
  pub fn new(raw: impl Into<String>) -> Self { Self(raw.into()) }

  pub fn raw(&self) -> &str { &self.0 }

  /// The calendar day of this value as written. Accepts `YYYY-MM-DD`,
  /// RFC 3339 timestamps and naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]`; any
  /// time-of-day or offset is dropped without converting between zones.
  pub fn date(&self) -> Option<NaiveDate> {
    let raw = self.0.trim();
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
      return Some(day);
    }
    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
      return Some(stamp.date_naive());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
      .into_iter()
      .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
      .map(|dt| dt.date())
  }
}

impl From<NaiveDate> for CaseDate {
  fn from(day: NaiveDate) -> Self { Self(day.format("%Y-%m-%d").to_string()) }
}

impl<'de> Deserialize<'de> for CaseDate {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    Ok(Self(Option::<String>::deserialize(d)?.unwrap_or_default()))
  }
}

// ─── Location ────────────────────────────────────────────────────────────────

/// A WGS-84 coordinate pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Location {
  pub latitude:  f64,
  pub longitude: f64,
}

impl<'de> Deserialize<'de> for Location {
  fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
    #[derive(Deserialize)]
    struct Wire {
      #[serde(default)]
      latitude:  Option<Coordinate>,
      #[serde(default)]
      longitude: Option<Coordinate>,
    }

    let wire = Wire::deserialize(d)?;
    match (
      wire.latitude.and_then(Coordinate::value),
      wire.longitude.and_then(Coordinate::value),
    ) {
      (Some(latitude), Some(longitude)) => Ok(Self { latitude, longitude }),
      _ => Err(serde::de::Error::custom("incomplete coordinate pair")),
    }
  }
}

/// The edit screen stores coordinates as strings; the create screen as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum Coordinate {
  Number(f64),
  Text(String),
}

impl Coordinate {
  fn value(self) -> Option<f64> {
    let v = match self {
      Self::Number(n) => n,
      Self::Text(s) => s.trim().parse().ok()?,
    };
    v.is_finite().then_some(v)
  }
}

// ─── Case ────────────────────────────────────────────────────────────────────

/// A forensic investigation record. Read-only from the client's perspective.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Case {
  #[serde(rename = "_id", default)]
  pub id:          String,
  #[serde(rename = "titulo", default)]
  pub title:       String,
  #[serde(rename = "descricao", default)]
  pub description: String,
  /// `None` when the API sent no status or a label outside [`CaseStatus`].
  #[serde(default, deserialize_with = "lenient_status")]
  pub status:      Option<CaseStatus>,
  #[serde(rename = "responsavel", default, deserialize_with = "lenient")]
  pub responsible: Option<Responsible>,
  #[serde(rename = "dataAbertura", default)]
  pub opened_at:   CaseDate,
  #[serde(rename = "dataOcorrencia", default, deserialize_with = "optional_date")]
  pub occurred_at: Option<CaseDate>,
  #[serde(rename = "dataFechamento", default, deserialize_with = "optional_date")]
  pub closed_at:   Option<CaseDate>,
  #[serde(rename = "localidade", default, deserialize_with = "lenient")]
  pub location:    Option<Location>,
}

impl Case {
  /// The responsible party's display name, if one is known.
  pub fn responsible_name(&self) -> Option<&str> {
    self.responsible.as_ref().and_then(Responsible::display_name)
  }

  /// Ingestion-time consistency check.
  ///
  /// The query engine tolerates every failure reported here; callers that
  /// want to surface bad upstream data must validate before querying.
  pub fn validate(&self) -> Result<()> {
    if self.id.trim().is_empty() {
      return Err(Error::MissingId);
    }

    let opened = parse_required(&self.opened_at, "openedAt")?;
    let occurred = parse_optional(self.occurred_at.as_ref(), "occurredAt")?;
    let closed = parse_optional(self.closed_at.as_ref(), "closedAt")?;

    if let Some(occurred) = occurred
      && occurred > opened
    {
      return Err(Error::OccurredAfterOpened(self.id.clone()));
    }

    if let Some(closed) = closed {
      if !self.status.is_some_and(CaseStatus::is_terminal) {
        return Err(Error::ClosedAtOnOpenCase(self.id.clone()));
      }
      if closed < opened {
        return Err(Error::ClosedBeforeOpened(self.id.clone()));
      }
    }

    Ok(())
  }
}

fn parse_required(date: &CaseDate, field: &'static str) -> Result<NaiveDate> {
  date.date().ok_or_else(|| Error::UnparseableDate {
    field,
    value: date.raw().to_owned(),
  })
}

fn parse_optional(
  date: Option<&CaseDate>,
  field: &'static str,
) -> Result<Option<NaiveDate>> {
  date.map(|d| parse_required(d, field)).transpose()
}

fn lenient_status<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<CaseStatus>, D::Error> {
  let label = Option::<String>::deserialize(d)?;
  Ok(label.as_deref().and_then(CaseStatus::from_label))
}

/// Decode `T`, treating a shape mismatch the same as an absent value.
pub(crate) fn lenient<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: serde::de::DeserializeOwned,
{
  let value = serde_json::Value::deserialize(d)?;
  if value.is_null() {
    return Ok(None);
  }
  Ok(serde_json::from_value(value).ok())
}

fn optional_date<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<CaseDate>, D::Error> {
  let raw = Option::<String>::deserialize(d)?;
  Ok(raw.filter(|r| !r.trim().is_empty()).map(CaseDate))
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

/// A record turned away by [`ingest`], with the reason.
#[derive(Debug)]
pub struct Rejection {
  pub case_id: String,
  pub error:   Error,
}

/// The outcome of validating a freshly-fetched listing.
#[derive(Debug, Default)]
pub struct Ingestion {
  /// Valid records, in input order.
  pub accepted: Vec<Case>,
  /// Invalid records, in input order.
  pub rejected: Vec<Rejection>,
}

/// Split `cases` into valid and invalid records.
pub fn ingest(cases: Vec<Case>) -> Ingestion {
  let mut out = Ingestion::default();
  for case in cases {
    match case.validate() {
      Ok(()) => out.accepted.push(case),
      Err(error) => {
        tracing::warn!(case_id = %case.id, %error, "rejecting case at ingestion");
        out.rejected.push(Rejection { case_id: case.id, error });
      }
    }
  }
  out
}
