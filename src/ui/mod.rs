pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::TableState;

/// Clamp the table selection to the current row count
pub fn ensure_valid_selection(state: &mut TableState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    None => state.select(Some(0)),
    Some(i) if i >= len => state.select(Some(len - 1)),
    Some(_) => {}
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

  let shortcuts = app.view().shortcuts();
  renderfns::draw_header(frame, chunks[0], app.title(), app.base_url(), &shortcuts);

  app.view_mut().render(frame, chunks[1]);
  app.command_input().render_overlay(frame, chunks[1]);

  let breadcrumb = app.view_breadcrumb();
  let status = app.view().status();
  renderfns::draw_footer(frame, chunks[2], &breadcrumb, status);
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = TableState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }
}
