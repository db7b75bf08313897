use std::env;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{ConfigLoader, ENV_CONFIG};
use crate::service::{NoteApi, NoteService};

pub mod commands;

use self::commands::{CreateArgs, DeleteArgs, ListArgs};

#[derive(Parser, Debug)]
#[command(name = "notehub", version, about = "Terminal client for NoteHub notes")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Override the config file location (takes precedence over NOTEHUB_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the API base URL (takes precedence over NOTEHUB_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Launch the interactive TUI (default)
    Tui,
    /// Print one page of notes
    List(ListArgs),
    /// Create a note from the command line
    Create(CreateArgs),
    /// Delete a note by id
    Delete(DeleteArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(ENV_CONFIG, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let command = cli.command.unwrap_or(Commands::Tui);

    // the TUI owns the terminal, so its logs go to a file
    let log_file = matches!(command, Commands::Tui).then(|| loader.paths().log_file());
    init_tracing(&cli.log_level, log_file.as_deref())
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;

    let mut config = loader.load_or_init()?;
    if let Some(base_url) = cli.base_url {
        config.api.base_url = base_url;
    }
    let token = config.require_token()?;
    let service = NoteService::new(&config.api.base_url, token, config.api.timeout())
        .with_context(|| format!("configuring client for {}", config.api.base_url))?;
    tracing::debug!(base_url = %service.base_url(), "note service ready");
    let api: Arc<dyn NoteApi> = Arc::new(service);

    let config = Arc::new(config);
    match command {
        Commands::Tui => commands::run_tui(config, api),
        Commands::List(args) => commands::list_notes(&config, api.as_ref(), &args),
        Commands::Create(args) => commands::create_note(api.as_ref(), args),
        Commands::Delete(args) => commands::delete_note(api.as_ref(), &args),
    }
}

fn init_tracing(level: &str, log_file: Option<&Path>) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        match log_file {
            Some(path) => {
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("opening log file {}", path.display()))?;
                fmt()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file))
                    .init();
            }
            None => {
                fmt()
                    .with_env_filter(env_filter)
                    .with_writer(std::io::stderr)
                    .init();
            }
        }
        Ok(())
    })
    .map(|_| ())
}
