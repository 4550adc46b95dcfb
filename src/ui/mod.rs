pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::ListState;
use renderfns::{draw_footer, draw_header};

/// Keep a list selection inside `0..len`, selecting the first row when unset
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(idx) if idx >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Main content
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  let breadcrumb = app.breadcrumb();
  let title = app.title().to_string();

  let Some(view) = app.current_view_mut() else {
    return;
  };

  draw_header(frame, chunks[0], &title, &view.context(), &view.shortcuts());
  view.render(frame, chunks[1]);
  draw_footer(frame, chunks[2], &breadcrumb, view.status());
}
