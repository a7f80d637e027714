use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::commands::{self, Command};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const MAX_SUGGESTIONS: usize = 8;

/// Events emitted by command input that parent needs to handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandEvent {
  /// Resolved command name (or raw input if nothing matched)
  Submitted(String),
  Cancelled,
}

/// `:` command palette with autocomplete
#[derive(Debug, Clone, Default)]
pub struct CommandInput {
  input: TextInput,
  active: bool,
  selected_suggestion: usize,
}

impl CommandInput {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  fn activate(&mut self) {
    self.active = true;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  fn deactivate(&mut self) {
    self.active = false;
    self.input.clear();
    self.selected_suggestion = 0;
  }

  pub fn suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(self.input.value())
  }

  /// Handle a key event. Also handles activation on `:`.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CommandEvent> {
    if !self.active {
      if key.code == KeyCode::Char(':') {
        self.activate();
        return KeyResult::Handled;
      }
      return KeyResult::NotHandled;
    }

    let count = self.suggestions().len();
    match key.code {
      KeyCode::Esc => {
        self.deactivate();
        KeyResult::Event(CommandEvent::Cancelled)
      }
      KeyCode::Enter => {
        let cmd = self.resolve_command();
        self.deactivate();
        KeyResult::Event(CommandEvent::Submitted(cmd))
      }
      KeyCode::Tab | KeyCode::Down => {
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + 1) % count;
        }
        KeyResult::Handled
      }
      KeyCode::BackTab | KeyCode::Up => {
        if count > 0 {
          self.selected_suggestion = (self.selected_suggestion + count - 1) % count;
        }
        KeyResult::Handled
      }
      _ => {
        if self.input.handle_key(key) == InputResult::Consumed {
          self.selected_suggestion = 0;
        }
        KeyResult::Handled
      }
    }
  }

  fn resolve_command(&self) -> String {
    self
      .suggestions()
      .get(self.selected_suggestion)
      .map(|cmd| cmd.name.to_string())
      .unwrap_or_else(|| self.input.value().trim().to_lowercase())
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let suggestions = self.suggestions();
    let shown = suggestions.len().min(MAX_SUGGESTIONS) as u16;

    let width = (area.width / 10 * 6).clamp(30, 60).min(area.width);
    let height = (3 + shown).min(area.height);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Command ");

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(inner);

    let input_line = Line::from(vec![
      Span::styled(":", Style::default().fg(Color::Yellow)),
      Span::raw(self.input.value()),
    ]);
    frame.render_widget(Paragraph::new(input_line), chunks[0]);
    frame.set_cursor_position(Position::new(
      chunks[0].x + 1 + self.input.cursor_position() as u16,
      chunks[0].y,
    ));

    if suggestions.is_empty() || chunks[1].height == 0 {
      return;
    }

    let items: Vec<ListItem> = suggestions
      .iter()
      .take(MAX_SUGGESTIONS)
      .map(|cmd| {
        ListItem::new(Line::from(vec![
          Span::styled(format!("{:<12}", cmd.name), Style::default().fg(Color::Cyan)),
          Span::styled(cmd.description, Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list =
      List::new(items).highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));

    let mut state = ListState::default();
    state.select(Some(self.selected_suggestion));
    frame.render_stateful_widget(list, chunks[1], &mut state);
  }
}
