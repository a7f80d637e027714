mod api;
mod app;
mod commands;
mod config;
mod event;
mod export;
mod form;
mod import;
mod logging;
mod mutation;
mod query;
mod ui;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "jobdesk")]
#[command(about = "A terminal UI for browsing job postings and submitting candidates")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/jobdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Backend base URL, overrides the config file
  #[arg(short, long)]
  base_url: Option<String>,

  /// Directory exports are written to
  #[arg(short, long)]
  export_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let mut config = config::Config::load(args.config.as_deref())?;

  // Command line wins over the config file
  if let Some(base_url) = args.base_url {
    config.api.base_url = base_url;
  }
  if let Some(dir) = args.export_dir {
    config.export_dir = Some(dir);
  }

  let _log_guard = logging::init(&config.log_path()?)?;

  // Initialize and run the app
  let mut app = app::App::new(config)?;
  app.run().await?;

  Ok(())
}
