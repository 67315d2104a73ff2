//! Case detail pane, right panel: case fields, then its evidence.

use forenseek_core::{
  case::Case,
  evidence::Evidence,
  session::Capability,
  status_color,
};
use ratatui::{
  Frame,
  layout::Rect,
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Paragraph, Wrap},
};

use super::{chip_style, opened_on, shown_day};
use crate::app::App;

// ─── Public entry ─────────────────────────────────────────────────────────────

/// Render the detail pane for `app.selected` into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let Some(case) = &app.selected else {
    return;
  };

  let title = if case.title.is_empty() { case.id.as_str() } else { case.title.as_str() };
  let block = Block::default()
    .title(format!(" {title} "))
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Cyan));

  let mut lines = case_lines(case);
  lines.push(Line::from(""));
  lines.push(actions_line(app));
  lines.push(Line::from(""));
  lines.push(Line::from(Span::styled(
    format!("Evidence ({})", app.evidence.len()),
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
  )));

  if app.evidence.is_empty() {
    lines.push(Line::from(Span::styled(
      "No evidence recorded.",
      Style::default().fg(Color::DarkGray),
    )));
  }
  for (i, ev) in app.evidence.iter().enumerate().skip(app.detail_scroll) {
    lines.extend(evidence_lines(i, ev));
  }

  f.render_widget(
    Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: false }),
    area,
  );
}

// ─── Sections ─────────────────────────────────────────────────────────────────

fn field(label: &str, value: impl Into<String>) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{label:<14}"), Style::default().fg(Color::DarkGray)),
    Span::raw(value.into()),
  ])
}

fn case_lines(case: &Case) -> Vec<Line<'static>> {
  let status = match case.status {
    Some(s) => Span::styled(format!(" {} ", s.label()), chip_style(status_color(s))),
    None => Span::styled("unknown", Style::default().fg(Color::DarkGray)),
  };

  let mut lines = vec![
    Line::from(vec![
      Span::styled(format!("{:<14}", "Status"), Style::default().fg(Color::DarkGray)),
      status,
    ]),
    field("Responsible", case.responsible_name().unwrap_or("-")),
    field("Opened", opened_on(case)),
    field("Occurred", shown_day(case.occurred_at.as_ref())),
    field("Closed", shown_day(case.closed_at.as_ref())),
  ];
  if let Some(loc) = &case.location {
    lines.push(field("Location", format!("{:.5}, {:.5}", loc.latitude, loc.longitude)));
  }
  if !case.description.is_empty() {
    lines.push(Line::from(""));
    lines.push(Line::from(case.description.clone()));
  }
  lines
}

/// What the signed-in role may do with this case.
fn actions_line(app: &App) -> Line<'static> {
  let actions: Vec<&str> = [
    (Capability::EditCase, "edit case"),
    (Capability::RegisterEvidence, "add evidence"),
  ]
  .into_iter()
  .filter(|(cap, _)| app.auth.can(*cap))
  .map(|(_, label)| label)
  .collect();

  let text = if actions.is_empty() { "read only".to_string() } else { actions.join(", ") };
  Line::from(vec![
    Span::styled(format!("{:<14}", app.auth.role.as_str()), Style::default().fg(Color::DarkGray)),
    Span::styled(text, Style::default().fg(Color::Green)),
  ])
}

fn evidence_lines(index: usize, ev: &Evidence) -> Vec<Line<'static>> {
  let collected = shown_day(ev.collected_at.as_ref());
  let by = ev
    .collected_by
    .as_ref()
    .and_then(|r| r.display_name())
    .unwrap_or("unknown")
    .to_string();

  let mut lines = vec![Line::from(vec![
    Span::styled(
      format!("{:>3}. ", index + 1),
      Style::default().fg(Color::DarkGray),
    ),
    Span::styled(ev.kind.clone(), Style::default().add_modifier(Modifier::BOLD)),
    Span::styled(format!("  {collected} by {by}"), Style::default().fg(Color::DarkGray)),
  ])];
  if !ev.description.is_empty() {
    lines.push(Line::from(format!("     {}", ev.description)));
  }
  for file in &ev.attachments {
    lines.push(Line::from(Span::styled(
      format!("     {} ({}, {} bytes)", file.filename, file.mimetype, file.size),
      Style::default().fg(Color::DarkGray),
    )));
  }
  lines
}
