use super::input::TextInput;
use super::KeyResult;
use crate::api::types::Record;
use crate::form::{Attachment, FormDraft, FormField};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use std::path::Path;

/// Events emitted by the apply dialog
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyDialogEvent {
  /// Submit pressed; the dialog has already closed and reset
  Submitted { position_id: String, draft: FormDraft },
  Cancelled,
}

/// Focusable elements, in tab order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
  Field(usize),
  Resume,
  Submit,
  Cancel,
}

const FIELD_COUNT: usize = FormField::ALL.len();
const LABEL_WIDTH: u16 = 20;

impl Focus {
  fn index(self) -> usize {
    match self {
      Focus::Field(i) => i,
      Focus::Resume => FIELD_COUNT,
      Focus::Submit => FIELD_COUNT + 1,
      Focus::Cancel => FIELD_COUNT + 2,
    }
  }

  fn from_index(index: usize) -> Self {
    match index % (FIELD_COUNT + 3) {
      i if i < FIELD_COUNT => Focus::Field(i),
      i if i == FIELD_COUNT => Focus::Resume,
      i if i == FIELD_COUNT + 1 => Focus::Submit,
      _ => Focus::Cancel,
    }
  }

  fn next(self) -> Self {
    Self::from_index(self.index() + 1)
  }

  fn prev(self) -> Self {
    Self::from_index(self.index() + FIELD_COUNT + 2)
  }
}

impl Default for Focus {
  fn default() -> Self {
    Focus::Field(0)
  }
}

/// Modal form for applying to one position.
///
/// Holds the single active draft; opening for another record or closing
/// discards whatever was typed.
#[derive(Debug, Clone, Default)]
pub struct ApplyDialog {
  active: bool,
  position_id: String,
  title: String,
  fields: [TextInput; FIELD_COUNT],
  resume_path: TextInput,
  resume: Option<Attachment>,
  /// Path the current attachment was read from
  attached_from: Option<String>,
  focus: Focus,
  error: Option<String>,
}

impl ApplyDialog {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  pub fn title(&self) -> &str {
    &self.title
  }

  /// Open with a fresh draft for `record`.
  pub fn open(&mut self, record: &Record) {
    self.reset();
    self.active = true;
    self.position_id = record.id.clone();
    self.title = format!("Apply for {}", record.display_name());
  }

  /// Close and discard the draft.
  pub fn close(&mut self) {
    self.reset();
  }

  fn reset(&mut self) {
    *self = Self::default();
  }

  /// Current form contents.
  pub fn draft(&self) -> FormDraft {
    let mut draft = FormDraft::default();
    for (field, input) in FormField::ALL.iter().zip(&self.fields) {
      *draft.field_mut(*field) = input.value().to_string();
    }
    draft.resume = self.resume.clone();
    draft
  }

  /// Read the file named in the resume field, if it changed since last read.
  fn attach_resume(&mut self) -> bool {
    let path = self.resume_path.value().trim().to_string();
    if path.is_empty() {
      self.resume = None;
      self.attached_from = None;
      return true;
    }
    if self.attached_from.as_deref() == Some(path.as_str()) {
      return true;
    }

    match Attachment::from_path(Path::new(&path)) {
      Ok(attachment) => {
        self.resume = Some(attachment);
        self.attached_from = Some(path);
        self.error = None;
        true
      }
      Err(e) => {
        self.resume = None;
        self.attached_from = None;
        self.error = Some(e.to_string());
        false
      }
    }
  }

  fn submit(&mut self) -> KeyResult<ApplyDialogEvent> {
    if !self.attach_resume() {
      self.focus = Focus::Resume;
      return KeyResult::Handled;
    }

    let event = ApplyDialogEvent::Submitted {
      position_id: self.position_id.clone(),
      draft: self.draft(),
    };
    self.close();
    KeyResult::Event(event)
  }

  fn cancel(&mut self) -> KeyResult<ApplyDialogEvent> {
    self.close();
    KeyResult::Event(ApplyDialogEvent::Cancelled)
  }

  fn focused_input(&mut self) -> Option<&mut TextInput> {
    match self.focus {
      Focus::Field(i) => self.fields.get_mut(i),
      Focus::Resume => Some(&mut self.resume_path),
      Focus::Submit | Focus::Cancel => None,
    }
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ApplyDialogEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
      return self.submit();
    }

    match key.code {
      KeyCode::Esc => return self.cancel(),
      KeyCode::Tab | KeyCode::Down => {
        self.focus = self.focus.next();
        return KeyResult::Handled;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus.prev();
        return KeyResult::Handled;
      }
      KeyCode::Enter => {
        return match self.focus {
          Focus::Submit => self.submit(),
          Focus::Cancel => self.cancel(),
          Focus::Resume => {
            if self.attach_resume() {
              self.focus = Focus::Submit;
            }
            KeyResult::Handled
          }
          Focus::Field(_) => {
            self.focus = self.focus.next();
            KeyResult::Handled
          }
        };
      }
      _ => {}
    }

    if let Some(input) = self.focused_input() {
      input.handle_key(key);
    } else if let KeyCode::Left | KeyCode::Right = key.code {
      self.focus = if self.focus == Focus::Submit {
        Focus::Cancel
      } else {
        Focus::Submit
      };
    }
    // Modal: everything is consumed while open
    KeyResult::Handled
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let width = 72.min(area.width);
    // Fields + resume + attached line + error + blank + buttons + borders
    let height = (FIELD_COUNT as u16 + 7).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(format!(" {} ", self.title))
      .title_alignment(Alignment::Center);

    let inner = block.inner(overlay_area);
    frame.render_widget(block, overlay_area);

    if inner.height == 0 {
      return;
    }

    let mut lines: Vec<Line> = FormField::ALL
      .iter()
      .zip(&self.fields)
      .enumerate()
      .map(|(i, (field, input))| {
        self.input_line(field.label(), input, self.focus == Focus::Field(i))
      })
      .collect();

    lines.push(self.input_line(
      "Resume (path)",
      &self.resume_path,
      self.focus == Focus::Resume,
    ));

    lines.push(match &self.resume {
      Some(resume) => Line::from(vec![
        Span::raw(" ".repeat(LABEL_WIDTH as usize + 2)),
        Span::styled(
          format!("attached: {} ({} bytes)", resume.file_name, resume.bytes.len()),
          Style::default().fg(Color::Green),
        ),
      ]),
      None => Line::raw(""),
    });

    lines.push(match &self.error {
      Some(e) => Line::styled(e.clone(), Style::default().fg(Color::Red)),
      None => Line::raw(""),
    });

    lines.push(Line::raw(""));
    lines.push(Line::from(vec![
      Span::raw(" ".repeat(LABEL_WIDTH as usize + 2)),
      button("Submit", self.focus == Focus::Submit),
      Span::raw("  "),
      button("Cancel", self.focus == Focus::Cancel),
      Span::styled("   Ctrl-S submit · Esc cancel", Style::default().fg(Color::DarkGray)),
    ]));

    frame.render_widget(Paragraph::new(lines), inner);

    let row = match self.focus {
      Focus::Field(i) => Some(i),
      Focus::Resume => Some(FIELD_COUNT),
      Focus::Submit | Focus::Cancel => None,
    };
    let input = match self.focus {
      Focus::Field(i) => self.fields.get(i),
      Focus::Resume => Some(&self.resume_path),
      Focus::Submit | Focus::Cancel => None,
    };
    if let (Some(row), Some(input)) = (row, input) {
      let x = inner.x + LABEL_WIDTH + 2 + input.cursor_position() as u16;
      if (row as u16) < inner.height && x < inner.right() {
        frame.set_cursor_position(Position::new(x, inner.y + row as u16));
      }
    }
  }

  fn input_line<'a>(&self, label: &'a str, input: &'a TextInput, focused: bool) -> Line<'a> {
    let label_style = if focused {
      Style::default().fg(Color::Yellow).bold()
    } else {
      Style::default().fg(Color::Cyan)
    };

    Line::from(vec![
      Span::styled(format!("{:>width$}: ", label, width = LABEL_WIDTH as usize), label_style),
      Span::raw(input.value()),
    ])
  }
}

fn button(label: &str, focused: bool) -> Span<'static> {
  let style = if focused {
    Style::default().fg(Color::Black).bg(Color::Yellow).bold()
  } else {
    Style::default().fg(Color::White)
  };
  Span::styled(format!("[ {} ]", label), style)
}
