use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Result of handling a key event in an input component
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputResult {
  /// Key was handled, continue input mode
  Consumed,
  /// Enter pressed, here's the submitted value
  Submitted(String),
  /// Escape pressed, input cancelled
  Cancelled,
  /// Key not handled, pass to next handler
  NotHandled,
}

/// Single-line text input. The cursor is a byte offset on a char boundary.
#[derive(Debug, Clone, Default)]
pub struct TextInput {
  buffer: String,
  cursor: usize,
}

impl TextInput {
  pub fn value(&self) -> &str {
    &self.buffer
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
    self.cursor = 0;
  }

  fn prev_boundary(&self) -> usize {
    self.buffer[..self.cursor]
      .char_indices()
      .next_back()
      .map(|(i, _)| i)
      .unwrap_or(0)
  }

  fn next_boundary(&self) -> usize {
    self.buffer[self.cursor..]
      .chars()
      .next()
      .map(|c| self.cursor + c.len_utf8())
      .unwrap_or(self.cursor)
  }

  /// Handle a key event, returning the result
  pub fn handle_key(&mut self, key: KeyEvent) -> InputResult {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Esc => InputResult::Cancelled,
      KeyCode::Enter => InputResult::Submitted(self.buffer.clone()),
      KeyCode::Backspace => {
        if self.cursor > 0 {
          let start = self.prev_boundary();
          self.buffer.replace_range(start..self.cursor, "");
          self.cursor = start;
        }
        InputResult::Consumed
      }
      KeyCode::Delete => {
        let end = self.next_boundary();
        self.buffer.replace_range(self.cursor..end, "");
        InputResult::Consumed
      }
      KeyCode::Left => {
        self.cursor = self.prev_boundary();
        InputResult::Consumed
      }
      KeyCode::Right => {
        self.cursor = self.next_boundary();
        InputResult::Consumed
      }
      KeyCode::Home => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::End => {
        self.cursor = self.buffer.len();
        InputResult::Consumed
      }
      KeyCode::Char('a') if ctrl => {
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('e') if ctrl => {
        self.cursor = self.buffer.len();
        InputResult::Consumed
      }
      KeyCode::Char('u') if ctrl => {
        // Clear line before cursor
        self.buffer.replace_range(..self.cursor, "");
        self.cursor = 0;
        InputResult::Consumed
      }
      KeyCode::Char('w') if ctrl => {
        // Delete word before cursor
        let before = &self.buffer[..self.cursor];
        let start = before.trim_end().rfind(' ').map(|i| i + 1).unwrap_or(0);
        self.buffer.replace_range(start..self.cursor, "");
        self.cursor = start;
        InputResult::Consumed
      }
      KeyCode::Char(_) if ctrl => InputResult::NotHandled,
      KeyCode::Char(c) => {
        self.buffer.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        InputResult::Consumed
      }
      _ => InputResult::NotHandled,
    }
  }

  /// Cursor position in characters, for rendering
  pub fn cursor_position(&self) -> usize {
    self.buffer[..self.cursor].chars().count()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn ctrl_key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::CONTROL)
  }

  fn type_str(input: &mut TextInput, s: &str) {
    for c in s.chars() {
      input.handle_key(key(KeyCode::Char(c)));
    }
  }

  #[test]
  fn test_basic_input() {
    let mut input = TextInput::default();
    assert_eq!(input.value(), "");

    type_str(&mut input, "hi");
    assert_eq!(input.value(), "hi");
  }

  #[test]
  fn test_submit() {
    let mut input = TextInput::default();
    type_str(&mut input, "test");

    let result = input.handle_key(key(KeyCode::Enter));
    assert_eq!(result, InputResult::Submitted("test".to_string()));
  }

  #[test]
  fn test_cancel() {
    let mut input = TextInput::default();
    type_str(&mut input, "x");

    let result = input.handle_key(key(KeyCode::Esc));
    assert_eq!(result, InputResult::Cancelled);
  }

  #[test]
  fn test_backspace() {
    let mut input = TextInput::default();
    type_str(&mut input, "abc");
    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "ab");
  }

  #[test]
  fn test_cursor_movement() {
    let mut input = TextInput::default();
    type_str(&mut input, "ac");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Char('b')));
    assert_eq!(input.value(), "abc");
  }

  #[test]
  fn test_multibyte_editing() {
    let mut input = TextInput::default();
    type_str(&mut input, "Zoë");
    assert_eq!(input.cursor_position(), 3);

    input.handle_key(key(KeyCode::Backspace));
    assert_eq!(input.value(), "Zo");

    type_str(&mut input, "é");
    input.handle_key(key(KeyCode::Left));
    input.handle_key(key(KeyCode::Delete));
    assert_eq!(input.value(), "Zo");
  }

  #[test]
  fn test_ctrl_u_clear_before_cursor() {
    let mut input = TextInput::default();
    type_str(&mut input, "hello world");
    for _ in 0..5 {
      input.handle_key(key(KeyCode::Left));
    }
    input.handle_key(ctrl_key(KeyCode::Char('u')));
    assert_eq!(input.value(), "world");
  }

  #[test]
  fn test_ctrl_w_delete_word() {
    let mut input = TextInput::default();
    type_str(&mut input, "rust sql");
    input.handle_key(ctrl_key(KeyCode::Char('w')));
    assert_eq!(input.value(), "rust ");
  }

  #[test]
  fn test_unbound_ctrl_key_not_handled() {
    let mut input = TextInput::default();
    assert_eq!(
      input.handle_key(ctrl_key(KeyCode::Char('s'))),
      InputResult::NotHandled
    );
    assert_eq!(input.value(), "");
  }

  #[test]
  fn test_home_end() {
    let mut input = TextInput::default();
    type_str(&mut input, "cv.pdf");
    input.handle_key(key(KeyCode::Home));
    assert_eq!(input.cursor_position(), 0);
    type_str(&mut input, "/tmp/");
    input.handle_key(key(KeyCode::End));
    assert_eq!(input.cursor_position(), 11);
    assert_eq!(input.value(), "/tmp/cv.pdf");
  }
}
