pub mod media_slot;
pub mod renderfns;
pub mod slot_list;
pub mod views;

use crate::app::{App, ViewState};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Status bar
    ])
    .split(frame.area());

  match app.current_view() {
    Some(ViewState::Feed(view)) => view.render(frame, chunks[0]),
    Some(ViewState::Detail(view)) => view.render(frame, chunks[0]),
    None => {}
  }

  draw_status_bar(frame, chunks[1], app);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let hint = match app.current_view() {
    Some(ViewState::Detail(_)) => " j/k:nav  r:retry  q:back  Ctrl-C:quit",
    _ => " j/k:nav  Enter:open  r:retry  q:quit",
  };
  let counts = format!(
    "in flight: {}  cached: {} ",
    app.coordinator().in_flight_len(),
    app.coordinator().cache().len()
  );

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Min(1), Constraint::Length(counts.len() as u16)])
    .split(area);

  let style = Style::default().fg(Color::DarkGray);
  frame.render_widget(Paragraph::new(hint).style(style), chunks[0]);
  frame.render_widget(
    Paragraph::new(counts)
      .style(style)
      .alignment(Alignment::Right),
    chunks[1],
  );
}
