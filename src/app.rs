use crate::api::{ApiClient, JobBoard};
use crate::config::Config;
use crate::event::{Event, EventHandler};
use crate::query::QueryClient;
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::DashboardView;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Main application state
pub struct App {
  /// The dashboard; the only screen
  view: Box<dyn View>,

  /// `:` command palette
  command_input: CommandInput,

  /// Application configuration
  config: Config,

  /// Backend base URL shown in the header
  base_url: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let client = ApiClient::new(&config.api)?;
    let base_url = client.base_url().to_string();
    let board: Arc<dyn JobBoard> = Arc::new(client);

    let root = DashboardView::new(board, QueryClient::new(), config.export_dir());
    info!(base_url = %base_url, "starting jobdesk");

    Ok(Self {
      view: Box::new(root),
      command_input: CommandInput::new(),
      config,
      base_url,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = self.main_loop(&mut terminal).await;

    // Cleanup terminal even when the loop failed
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn main_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(Event::Key(key)) => self.handle_key(key),
        Some(Event::Tick) => self.view.tick(),
        Some(Event::Resize) => {}
        None => break,
      }
    }

    info!("shutting down");
    Ok(())
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    if self.command_input.is_active() || !self.view.is_capturing_input() {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    match self.view.handle_key(key) {
      ViewAction::None => {}
      ViewAction::Quit => self.should_quit = true,
    }
  }

  fn execute_command(&mut self, cmd: &str) {
    debug!(command = cmd, "executing command");
    if cmd == "quit" {
      self.should_quit = true;
      return;
    }

    if !self.view.handle_command(cmd) {
      debug!(command = cmd, "unknown command");
    }
  }

  // Accessors for UI rendering
  pub fn view(&self) -> &dyn View {
    self.view.as_ref()
  }

  pub fn view_mut(&mut self) -> &mut dyn View {
    self.view.as_mut()
  }

  pub fn command_input(&self) -> &CommandInput {
    &self.command_input
  }

  pub fn title(&self) -> &str {
    self.config.title()
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    vec![self.view.breadcrumb_label()]
  }
}
