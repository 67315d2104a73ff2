//! Case table with its filter bar, left panel.

use forenseek_core::{ColorToken, case::Case, status_color};
use ratatui::{
  Frame,
  layout::{Constraint, Direction, Layout, Rect},
  style::{Color, Modifier, Style},
  text::{Line, Span},
  widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
};

use super::{chip_style, opened_on};
use crate::app::{App, Editing};

/// Render the filter bar and case table into `area`.
pub fn draw(f: &mut Frame, area: Rect, app: &App) {
  let rows = Layout::default()
    .direction(Direction::Vertical)
    .constraints([Constraint::Length(3), Constraint::Min(0)])
    .split(area);

  draw_filters(f, rows[0], app);
  draw_table(f, rows[1], app);
}

fn draw_filters(f: &mut Frame, area: Rect, app: &App) {
  let field = |label: &'static str, value: String, editing: bool| {
    let style = if editing {
      Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    } else {
      Style::default()
    };
    let text = if editing { format!("{value}_") } else { value };
    vec![
      Span::styled(format!("{label} "), Style::default().fg(Color::DarkGray)),
      Span::styled(text, style),
      Span::raw("   "),
    ]
  };

  let date = match (app.date_input.is_empty(), app.date_filter()) {
    (true, _) => String::new(),
    (false, Some(_)) => app.date_input.clone(),
    (false, None) => format!("{} (incomplete)", app.date_input),
  };

  let mut spans = field(
    "Responsible:",
    app.responsible.clone(),
    app.editing == Some(Editing::Responsible),
  );
  spans.extend(field("Status:", app.status_filter.to_string(), false));
  spans.extend(field("Opened:", date, app.editing == Some(Editing::Date)));

  let block = Block::default()
    .title(" Filters ")
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));
  f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn draw_table(f: &mut Frame, area: Rect, app: &App) {
  let visible = app.visible_cases();
  let total = app.cases.len();

  let title = if app.filter().is_unconstrained() {
    format!(" Cases ({total}) ")
  } else {
    format!(" Cases ({}/{total}) ", visible.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::DarkGray));

  if visible.is_empty() {
    let msg = if total == 0 { "No cases." } else { "No case matches the filters." };
    f.render_widget(
      Paragraph::new(msg)
        .style(Style::default().fg(Color::DarkGray))
        .block(block),
      area,
    );
    return;
  }

  let header = Row::new(["#", "Responsible", "Opened", "Status"])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

  let rows: Vec<Row> = visible
    .iter()
    .enumerate()
    .map(|(i, case)| case_row(i, case))
    .collect();

  let widths = [
    Constraint::Length(4),
    Constraint::Min(12),
    Constraint::Length(10),
    Constraint::Length(14),
  ];

  let mut state = TableState::default();
  state.select(Some(app.list_cursor));

  f.render_stateful_widget(
    Table::new(rows, widths)
      .header(header)
      .block(block)
      .column_spacing(2)
      .row_highlight_style(Style::default().bg(Color::Blue).add_modifier(Modifier::BOLD)),
    area,
    &mut state,
  );
}

fn case_row(index: usize, case: &Case) -> Row<'static> {
  let status = match case.status {
    Some(status) => Cell::from(Span::styled(
      format!(" {} ", status.label()),
      chip_style(status_color(status)),
    )),
    None => Cell::from(Span::styled(" ? ", chip_style(ColorToken::Neutral))),
  };

  Row::new(vec![
    Cell::from((index + 1).to_string()),
    Cell::from(case.responsible_name().unwrap_or("-").to_string()),
    Cell::from(opened_on(case)),
    status,
  ])
}
