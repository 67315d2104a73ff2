//! TUI rendering of the header, case list, detail pane and status bar.

pub mod case_detail;
pub mod case_list;

use chrono::{Local, NaiveDate};
use forenseek_core::{
  ColorToken,
  case::{Case, CaseDate},
};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph},
};

use crate::app::{App, Screen};

// ─── Shared formatting ────────────────────────────────────────────────────────

/// Chip colours for a status token.
pub(crate) fn chip_style(token: ColorToken) -> Style {
  let rgb = |(r, g, b): (u8, u8, u8)| Color::Rgb(r, g, b);
  Style::default()
    .bg(rgb(token.rgb()))
    .fg(rgb(token.text_rgb()))
}

/// `dd/mm/yyyy`, the way dates are shown to users.
pub(crate) fn day_month_year(day: NaiveDate) -> String { day.format("%d/%m/%Y").to_string() }

/// The case's opening day, or the raw value if it does not parse.
pub(crate) fn opened_on(case: &Case) -> String {
  case
    .opened_at
    .date()
    .map_or_else(|| case.opened_at.raw().to_string(), day_month_year)
}

/// An optional date as shown to users: `-` when absent or blank, the raw
/// value when it does not parse.
pub(crate) fn shown_day(date: Option<&CaseDate>) -> String {
  match date {
    Some(d) if !d.raw().trim().is_empty() => {
      d.date().map_or_else(|| d.raw().to_string(), day_month_year)
    }
    _ => "-".into(),
  }
}

// ─── Root draw ────────────────────────────────────────────────────────────────

/// Main draw function called each frame.
pub fn draw(f: &mut Frame, app: &App) {
  let area = f.area();

  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // header
      Constraint::Min(0),    // body
      Constraint::Length(1), // status bar
    ])
    .split(area);

  draw_header(f, rows[0], app);
  draw_body(f, rows[1], app);
  draw_status(f, rows[2], app);
}

// ─── Header ───────────────────────────────────────────────────────────────────

fn draw_header(f: &mut Frame, area: Rect, app: &App) {
  let date = Local::now().format("%d/%m/%Y").to_string();

  let left = Span::styled(
    " forenseek  cases",
    Style::default()
      .fg(Color::White)
      .add_modifier(Modifier::BOLD),
  );
  let right = Span::styled(
    format!("user {} ({})  {date} ", app.auth.user_id, app.auth.role.as_str()),
    Style::default().fg(Color::Gray),
  );

  let left_width = left.content.chars().count() as u16;
  let right_width = right.content.chars().count() as u16;
  let pad = area
    .width
    .saturating_sub(left_width)
    .saturating_sub(right_width);

  let line = Line::from(vec![
    left,
    Span::raw(" ".repeat(pad as usize)),
    right,
  ]);

  let block = Block::default().style(Style::default().bg(Color::DarkGray));
  let inner = block.inner(area);
  f.render_widget(block, area);
  f.render_widget(Paragraph::new(line), inner);
}

// ─── Body ─────────────────────────────────────────────────────────────────────

fn draw_body(f: &mut Frame, area: Rect, app: &App) {
  let cols = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
    .split(area);

  case_list::draw(f, cols[0], app);

  if app.selected.is_some() {
    case_detail::draw(f, cols[1], app);
  } else {
    draw_empty_detail(f, cols[1]);
  }
}

fn draw_empty_detail(f: &mut Frame, area: Rect) {
  let block = Block::default()
    .title(" Detail ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  f.render_widget(
    Paragraph::new("Select a case and press Enter.")
      .style(Style::default().fg(Color::DarkGray))
      .block(block),
    area,
  );
}

// ─── Status bar ───────────────────────────────────────────────────────────────

fn draw_status(f: &mut Frame, area: Rect, app: &App) {
  let (mode_label, hints) = match (&app.screen, app.editing) {
    (_, Some(_)) => ("FILTER", "Type to filter  Enter keep  Esc clear"),
    (Screen::CaseList, None) => (
      "CASES",
      "jk move  Enter open  / name  s status  d date  t today  c clear  R reload  q quit",
    ),
    (Screen::CaseDetail, None) => ("DETAIL", "jk scroll evidence  Esc back  q quit"),
  };

  let status = if app.status_msg.is_empty() {
    hints.to_string()
  } else {
    app.status_msg.clone()
  };

  let line = Line::from(vec![
    Span::styled(
      format!(" {mode_label} "),
      Style::default()
        .fg(Color::Black)
        .bg(Color::Cyan)
        .add_modifier(Modifier::BOLD),
    ),
    Span::styled(format!("  {status}"), Style::default().fg(Color::DarkGray)),
  ]);
  f.render_widget(
    Paragraph::new(line).style(Style::default().bg(Color::Black)),
    area,
  );
}
