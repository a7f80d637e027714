use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

/// Events emitted by the path prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathPromptEvent {
  /// Enter pressed with a non-empty path
  Submitted(String),
  Cancelled,
}

/// One-line overlay asking for a file path
#[derive(Debug, Clone, Default)]
pub struct PathPrompt {
  input: TextInput,
  title: String,
  active: bool,
}

impl PathPrompt {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn activate(&mut self, title: impl Into<String>) {
    self.title = title.into();
    self.active = true;
    self.input.clear();
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<PathPromptEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match self.input.handle_key(key) {
      InputResult::Submitted(value) => {
        let path = value.trim().to_string();
        if path.is_empty() {
          return KeyResult::Handled;
        }
        self.active = false;
        self.input.clear();
        KeyResult::Event(PathPromptEvent::Submitted(path))
      }
      InputResult::Cancelled => {
        self.active = false;
        self.input.clear();
        KeyResult::Event(PathPromptEvent::Cancelled)
      }
      // Modal: swallow everything else while open
      InputResult::Consumed | InputResult::NotHandled => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = (area.width / 10 * 7).clamp(30, 80).min(area.width);
    let overlay_area = Rect::new(area.x + 1, area.y + 1, width, 3.min(area.height));

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title));

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    frame.render_widget(Paragraph::new(self.input.value()), inner);
    frame.set_cursor_position(Position::new(
      inner.x + self.input.cursor_position() as u16,
      inner.y,
    ));
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::{KeyCode, KeyModifiers};

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_passes_through() {
    let mut prompt = PathPrompt::new();
    assert_eq!(
      prompt.handle_key(key(KeyCode::Char('x'))),
      KeyResult::NotHandled
    );
  }

  #[test]
  fn test_submit_trimmed_path() {
    let mut prompt = PathPrompt::new();
    prompt.activate("Upload");
    for c in " a.csv ".chars() {
      prompt.handle_key(key(KeyCode::Char(c)));
    }
    assert_eq!(
      prompt.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(PathPromptEvent::Submitted("a.csv".to_string()))
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_empty_submit_stays_open() {
    let mut prompt = PathPrompt::new();
    prompt.activate("Upload");
    assert_eq!(prompt.handle_key(key(KeyCode::Enter)), KeyResult::Handled);
    assert!(prompt.is_active());

    assert_eq!(
      prompt.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(PathPromptEvent::Cancelled)
    );
    assert!(!prompt.is_active());
  }

  #[test]
  fn test_render_on_very_wide_terminal() {
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    let mut prompt = PathPrompt::new();
    prompt.activate("Upload");
    for c in "a.csv".chars() {
      prompt.handle_key(key(KeyCode::Char(c)));
    }

    let mut terminal = Terminal::new(TestBackend::new(1200, 6)).unwrap();
    terminal
      .draw(|frame| {
        let area = frame.area();
        prompt.render_overlay(frame, area);
      })
      .unwrap();

    let text: String = terminal
      .backend()
      .buffer()
      .content()
      .iter()
      .map(|cell| cell.symbol())
      .collect();
    assert!(text.contains(" Upload "));
    assert!(text.contains("a.csv"));
  }
}
