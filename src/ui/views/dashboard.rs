use crate::api::types::Record;
use crate::api::JobBoard;
use crate::export;
use crate::form::{Application, FormDraft};
use crate::import;
use crate::mutation::{Mutation, MutationState};
use crate::query::{Query, QueryClient, QueryKey, QueryState};
use crate::ui::components::{
  ApplyDialog, ApplyDialogEvent, KeyResult, PathPrompt, PathPromptEvent,
};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{role_color, truncate};
use crate::ui::view::{ShortcutInfo, StatusMessage, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Loaded rows older than this are refetched in the background
const STALE_AFTER: Duration = Duration::from_secs(300);

const COLUMNS: [&str; 7] = [
  "",
  "User Name",
  "First Name",
  "Last Name",
  "Role",
  "Date of Admission",
  "Start Date",
];

/// Table of positions with export, bulk upload, and the apply dialog
pub struct DashboardView {
  query: Query<Vec<Record>>,
  apply: Mutation<Application>,
  table_state: TableState,
  /// Ids of rows marked for export
  selected: BTreeSet<String>,
  dialog: ApplyDialog,
  upload: PathPrompt,
  /// Position (id, display name) the pending bulk upload applies to
  upload_target: Option<(String, String)>,
  export_dir: PathBuf,
  status: Option<StatusMessage>,
}

impl DashboardView {
  pub fn new(board: Arc<dyn JobBoard>, queries: QueryClient, export_dir: PathBuf) -> Self {
    let list_board = Arc::clone(&board);
    let mut query = Query::new(move || {
      let jobs = list_board.list_jobs();
      async move { jobs.await.map_err(|e| e.to_string()) }
    })
    .bind(QueryKey::Jobs, queries.clone())
    .with_stale_time(STALE_AFTER);

    let apply = Mutation::new(queries, move |application: Application| {
      let submit = board.apply(application);
      async move { submit.await.map_err(|e| e.to_string()) }
    })
    .invalidates(QueryKey::Jobs);

    // Start fetching immediately
    query.fetch();

    Self {
      query,
      apply,
      table_state: TableState::default(),
      selected: BTreeSet::new(),
      dialog: ApplyDialog::new(),
      upload: PathPrompt::new(),
      upload_target: None,
      export_dir,
      status: None,
    }
  }

  /// Rows currently shown in the table
  pub fn records(&self) -> &[Record] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn current(&self) -> Option<&Record> {
    self
      .table_state
      .selected()
      .and_then(|idx| self.records().get(idx))
  }

  /// Rows marked for export, in table order
  fn selected_records(&self) -> Vec<Record> {
    self
      .records()
      .iter()
      .filter(|r| self.selected.contains(&r.id))
      .cloned()
      .collect()
  }

  fn toggle_current(&mut self) {
    if let Some(id) = self.current().map(|r| r.id.clone()) {
      if !self.selected.remove(&id) {
        self.selected.insert(id);
      }
    }
  }

  fn toggle_all(&mut self) {
    let all: BTreeSet<String> = self.records().iter().map(|r| r.id.clone()).collect();
    if !all.is_empty() && all.is_subset(&self.selected) {
      self.selected.clear();
    } else {
      self.selected = all;
    }
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn open_apply(&mut self) {
    match self.current().cloned() {
      Some(record) => self.dialog.open(&record),
      None => self.status = Some(StatusMessage::error("No position selected")),
    }
  }

  fn submit(&mut self, position_id: String, draft: FormDraft) {
    info!(%position_id, resume = draft.resume.is_some(), "submitting application");
    self
      .apply
      .mutate(Application::from_draft(&draft, &position_id));
    self.status = Some(StatusMessage::info("Submitting application..."));
  }

  fn export_selected(&mut self) {
    let rows = self.selected_records();
    if rows.is_empty() {
      self.status = Some(StatusMessage::error("Select rows to export (space)"));
      return;
    }

    self.status = Some(match export::export_rows(&self.export_dir, &rows) {
      Ok(path) => StatusMessage::info(format!(
        "Exported {} rows to {}",
        rows.len(),
        path.display()
      )),
      Err(e) => {
        warn!(error = %e, "export failed");
        StatusMessage::error(format!("Export failed: {}", e))
      }
    });
  }

  fn export_template(&mut self) {
    self.status = Some(match export::export_template(&self.export_dir) {
      Ok(path) => StatusMessage::info(format!("Template saved to {}", path.display())),
      Err(e) => {
        warn!(error = %e, "template export failed");
        StatusMessage::error(format!("Template export failed: {}", e))
      }
    });
  }

  fn save_description(&mut self) {
    let Some(record) = self.current() else {
      self.status = Some(StatusMessage::error("No position selected"));
      return;
    };

    let status = match export::save_job_description(&self.export_dir, record) {
      Ok(path) => StatusMessage::info(format!("Job description saved to {}", path.display())),
      Err(e) => StatusMessage::error(e.to_string()),
    };
    self.status = Some(status);
  }

  fn start_upload(&mut self) {
    let Some((id, name)) = self.current().map(|r| (r.id.clone(), r.display_name())) else {
      self.status = Some(StatusMessage::error("No position selected"));
      return;
    };

    self.upload_target = Some((id, name.clone()));
    self
      .upload
      .activate(format!("Bulk upload for {}: candidates CSV path", name));
  }

  fn finish_upload(&mut self, path: &Path) {
    let Some((position_id, name)) = self.upload_target.take() else {
      return;
    };

    match import::read_candidates_from_path(path) {
      Ok(drafts) if drafts.is_empty() => {
        self.status = Some(StatusMessage::error(format!(
          "No candidates in {}",
          path.display()
        )));
      }
      Ok(drafts) => {
        for draft in &drafts {
          self
            .apply
            .mutate(Application::from_draft(draft, &position_id));
        }
        info!(%position_id, count = drafts.len(), "bulk upload started");
        self.status = Some(StatusMessage::info(format!(
          "Submitting {} applications for {}",
          drafts.len(),
          name
        )));
      }
      Err(e) => {
        warn!(error = %e, "bulk upload failed");
        self.status = Some(StatusMessage::error(format!("Bulk upload failed: {}", e)));
      }
    }
  }

  fn poll_submissions(&mut self) {
    let outcomes = self.apply.poll();
    if outcomes.is_empty() {
      return;
    }

    let failures: Vec<&String> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    let pending = self.apply.pending();
    let suffix = if pending > 0 {
      format!(" ({} pending)", pending)
    } else {
      String::new()
    };

    self.status = Some(match failures.first() {
      Some(first) => StatusMessage::error(format!(
        "{} of {} applications failed: {}{}",
        failures.len(),
        outcomes.len(),
        first,
        suffix
      )),
      None if outcomes.len() == 1 => StatusMessage::info(format!("Application submitted{}", suffix)),
      None => StatusMessage::info(format!("{} applications submitted{}", outcomes.len(), suffix)),
    });
  }

  fn render_banner(&self, frame: &mut Frame, area: Rect) {
    let detail = self.query.error().unwrap_or_default();
    let line = Line::from(vec![
      Span::styled(" Error loading data ", Style::default().fg(Color::White).bg(Color::Red).bold()),
      Span::styled(format!(" {}", detail), Style::default().fg(Color::Red)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
  }

  fn render_table(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.records().len();
    ensure_valid_selection(&mut self.table_state, len);

    let marked = if self.selected.is_empty() {
      String::new()
    } else {
      format!(", {} selected", self.selected_records().len())
    };
    let submitting = if *self.apply.state() == MutationState::Pending {
      " submitting..."
    } else {
      ""
    };
    let title = match self.query.state() {
      QueryState::Loading => " Positions (loading...) ".to_string(),
      QueryState::Error(_) => " Positions ".to_string(),
      _ if self.query.is_fetching() => {
        format!(" Positions ({}{}) refreshing...{} ", len, marked, submitting)
      }
      _ => format!(" Positions ({}{}){} ", len, marked, submitting),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load data. Press 'r' to retry."
      } else {
        "No positions found."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    // Collect rows first to avoid borrow conflicts with table_state
    let rows: Vec<Row> = self
      .records()
      .iter()
      .map(|record| {
        let mark = if self.selected.contains(&record.id) {
          "[x]"
        } else {
          "[ ]"
        };
        Row::new(vec![
          Cell::from(mark),
          Cell::from(truncate(&record.username, 20)).style(Style::default().fg(Color::Cyan)),
          Cell::from(truncate(&record.firstname, 20)),
          Cell::from(truncate(&record.lastname, 20)),
          Cell::from(truncate(&record.role, 14)).style(Style::default().fg(role_color(&record.role))),
          Cell::from(record.date_of_admission.clone()),
          Cell::from(record.start_date.clone()),
        ])
      })
      .collect();

    let header = Row::new(COLUMNS).style(Style::default().fg(Color::Yellow).bold());
    let widths = [
      Constraint::Length(3),
      Constraint::Fill(2),
      Constraint::Fill(2),
      Constraint::Fill(2),
      Constraint::Fill(1),
      Constraint::Length(18),
      Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
      .header(header)
      .block(block)
      .row_highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(table, area, &mut self.table_state);
  }

  // Key handling helpers for or_else chain pattern
  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.dialog.handle_key(key) {
      KeyResult::Event(ApplyDialogEvent::Submitted { position_id, draft }) => {
        self.submit(position_id, draft);
        return Some(ViewAction::None);
      }
      KeyResult::Event(ApplyDialogEvent::Cancelled) | KeyResult::Handled => {
        return Some(ViewAction::None)
      }
      KeyResult::NotHandled => {}
    }

    match self.upload.handle_key(key) {
      KeyResult::Event(PathPromptEvent::Submitted(path)) => {
        self.finish_upload(Path::new(&path));
        Some(ViewAction::None)
      }
      KeyResult::Event(PathPromptEvent::Cancelled) => {
        self.upload_target = None;
        Some(ViewAction::None)
      }
      KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_navigation(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.table_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.table_state.select_previous(),
      KeyCode::Char('g') | KeyCode::Home => self.table_state.select_first(),
      KeyCode::Char('G') | KeyCode::End => self.table_state.select_last(),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char(' ') => self.toggle_current(),
      KeyCode::Char('A') => self.toggle_all(),
      KeyCode::Esc => self.selected.clear(),
      KeyCode::Enter | KeyCode::Char('a') => self.open_apply(),
      KeyCode::Char('e') => self.export_selected(),
      KeyCode::Char('t') => self.export_template(),
      KeyCode::Char('d') => self.save_description(),
      KeyCode::Char('u') => self.start_upload(),
      KeyCode::Char('r') => self.refresh(),
      KeyCode::Char('q') => return Some(ViewAction::Quit),
      _ => return None,
    }
    Some(ViewAction::None)
  }
}

impl View for DashboardView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_navigation(key))
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn handle_command(&mut self, command: &str) -> bool {
    match command {
      "jobs" => self.refresh(),
      "export" => self.export_selected(),
      "template" => self.export_template(),
      "upload" => self.start_upload(),
      "description" => self.save_description(),
      _ => return false,
    }
    true
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let banner_height = if self.query.is_error() { 1 } else { 0 };
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(banner_height), Constraint::Min(1)])
      .split(area);

    if self.query.is_error() {
      self.render_banner(frame, chunks[0]);
    }
    self.render_table(frame, chunks[1]);

    self.dialog.render_overlay(frame, area);
    self.upload.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Positions".to_string()
  }

  fn tick(&mut self) {
    if self.query.is_stale() && !self.query.is_fetching() {
      debug!("job list is stale, refetching");
      self.query.refetch();
    }
    if self.query.poll() {
      let len = self.records().len();
      ensure_valid_selection(&mut self.table_state, len);
    }
    self.poll_submissions();
  }

  fn is_capturing_input(&self) -> bool {
    self.dialog.is_active() || self.upload.is_active()
  }

  fn status(&self) -> Option<&StatusMessage> {
    self.status.as_ref()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "apply").with_priority(20),
      ShortcutInfo::new("space", "select").with_priority(30),
      ShortcutInfo::new("e", "export").with_priority(40),
      ShortcutInfo::new("t", "template").with_priority(50),
      ShortcutInfo::new("u", "upload").with_priority(60),
      ShortcutInfo::new("r", "refresh").with_priority(70),
      ShortcutInfo::new("q", "quit").with_priority(90),
    ]
  }
}
