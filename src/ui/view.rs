use crossterm::event::KeyEvent;
use ratatui::prelude::*;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Severity of a status line message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLevel {
  Info,
  Error,
}

/// One-line message shown in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
  pub text: String,
  pub level: StatusLevel,
}

impl StatusMessage {
  pub fn info(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      level: StatusLevel::Info,
    }
  }

  pub fn error(text: impl Into<String>) -> Self {
    Self {
      text: text.into(),
      level: StatusLevel::Error,
    }
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Exit the application
  Quit,
}

/// Trait for view behavior
///
/// Views own their queries and overlays and return actions for the App to
/// execute: App → View → Components.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Run a `:` command. Returns false if the view doesn't know it.
  fn handle_command(&mut self, _command: &str) -> bool {
    false
  }

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to allow views to poll async queries
  fn tick(&mut self) {}

  /// Whether a modal overlay currently owns the keyboard
  fn is_capturing_input(&self) -> bool {
    false
  }

  /// Latest status line message
  fn status(&self) -> Option<&StatusMessage> {
    None
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "quit").with_priority(30),
    ]
  }
}
