//! `forenseek`: terminal client for the ForenSeek forensic case API.
//!
//! # Usage
//!
//! ```text
//! forenseek login --matricula 20231234
//! forenseek cases --responsible ana --status "Em andamento" --date 2024-01-10
//! forenseek case add --title "Ossada" --description "Margem do rio" --occurred 2024-01-08
//! forenseek case edit c1 --status Finalizado --closed 2024-03-01
//! forenseek evidence add --case c1 --kind Dente --description "Molar" \
//!   --lat -8.05 --lon -34.9 --file molar.jpg
//! forenseek            # interactive case browser
//! ```

mod app;
mod client;
mod commands;
mod settings;
mod sync;
mod ui;

use std::{io, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use app::App;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use client::ApiClient;
use commands::{CasesArgs, EditCaseArgs, EvidenceArgs, NewCaseArgs};
use crossterm::{
  event::{self, Event},
  execute,
  terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use forenseek_core::{StatusFilter, case::CaseStatus, session::AuthContext};
use forenseek_store_sqlite::SqliteStore;
use ratatui::{Terminal, backend::CrosstermBackend};
use settings::{Settings, expand_tilde};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "forenseek", version, about = "Terminal client for the ForenSeek case API")]
struct Cli {
  /// Path to a TOML config file (base_url, store_path, timeout_secs).
  #[arg(short, long, value_name = "FILE", global = true)]
  config: Option<PathBuf>,

  /// API root, e.g. https://backend-forenseek.onrender.com/api.
  #[arg(long, global = true)]
  url: Option<String>,

  /// Local database holding the session and the evidence outbox.
  #[arg(long, value_name = "FILE", global = true)]
  store: Option<PathBuf>,

  /// Log debug output to stderr.
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Sign in and remember the session.
  Login {
    #[arg(long)]
    matricula: String,
    /// Read from stdin when omitted.
    #[arg(long, env = "FORENSEEK_PASSWORD", hide_env_values = true)]
    senha:     Option<String>,
  },
  /// Forget the stored session.
  Logout,
  /// Show the signed-in user and what they may do.
  Whoami,
  /// List cases matching the given filters.
  Cases {
    /// Case-insensitive substring of the responsible investigator's name.
    #[arg(long)]
    responsible: Option<String>,
    /// `all`, or a status label such as "Em andamento".
    #[arg(long)]
    status:      Option<StatusFilter>,
    /// Opening day, `YYYY-MM-DD`.
    #[arg(long)]
    date:        Option<NaiveDate>,
    /// Print matching cases as JSON.
    #[arg(long)]
    json:        bool,
  },
  /// Show, register or edit a case.
  #[command(subcommand)]
  Case(CaseCommand),
  /// Register and synchronise evidence.
  #[command(subcommand)]
  Evidence(EvidenceCommand),
  /// Interactive case browser (the default).
  Tui,
}

#[derive(Subcommand, Debug)]
enum CaseCommand {
  /// Show one case and its evidence.
  Show {
    id:   String,
    #[arg(long)]
    json: bool,
  },
  /// Register a case with yourself as responsible.
  Add {
    #[arg(long)]
    title:       String,
    #[arg(long)]
    description: String,
    /// Status label or name; defaults to "Em andamento".
    #[arg(long, default_value = "Em andamento")]
    status:      CaseStatus,
    /// Opening day, `YYYY-MM-DD`; defaults to today.
    #[arg(long)]
    opened:      Option<NaiveDate>,
    /// Day of the occurrence, `YYYY-MM-DD`.
    #[arg(long)]
    occurred:    NaiveDate,
    #[arg(long = "lat", allow_hyphen_values = true, requires = "longitude")]
    latitude:    Option<f64>,
    #[arg(long = "lon", allow_hyphen_values = true, requires = "latitude")]
    longitude:   Option<f64>,
    /// Id of an already-registered victim.
    #[arg(long)]
    victim:      Option<String>,
  },
  /// Change fields of a case; only the given fields are sent.
  Edit {
    id:          String,
    #[arg(long)]
    title:       Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    status:      Option<CaseStatus>,
    #[arg(long)]
    occurred:    Option<NaiveDate>,
    #[arg(long)]
    closed:      Option<NaiveDate>,
    #[arg(long = "lat", allow_hyphen_values = true, requires = "longitude")]
    latitude:    Option<f64>,
    #[arg(long = "lon", allow_hyphen_values = true, requires = "latitude")]
    longitude:   Option<f64>,
  },
}

#[derive(Subcommand, Debug)]
enum EvidenceCommand {
  /// Record an evidence item and upload it, queueing it if offline.
  Add {
    #[arg(long = "case")]
    case_id:     String,
    #[arg(long)]
    kind:        String,
    #[arg(long)]
    description: String,
    #[arg(long = "lat", allow_hyphen_values = true)]
    latitude:    f64,
    #[arg(long = "lon", allow_hyphen_values = true)]
    longitude:   f64,
    /// Attachment; repeat for several files.
    #[arg(long = "file", required = true)]
    files:       Vec<PathBuf>,
  },
  /// List queued evidence.
  Pending {
    /// Include items already sent or rejected.
    #[arg(long)]
    all: bool,
  },
  /// Upload queued evidence, oldest first.
  Sync,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  let command = cli.command.unwrap_or(Command::Tui);

  // The TUI owns the terminal, so it runs without a subscriber.
  if !matches!(command, Command::Tui) {
    let default = if cli.verbose { LevelFilter::DEBUG } else { LevelFilter::WARN };
    tracing_subscriber::fmt()
      .with_writer(io::stderr)
      .with_env_filter(
        EnvFilter::builder()
          .with_default_directive(default.into())
          .from_env_lossy(),
      )
      .init();
  }

  // CLI flags override the environment, which overrides the config file.
  let mut settings = Settings::load(cli.config.as_deref())?;
  if let Some(url) = cli.url {
    settings.base_url = url;
  }
  if let Some(path) = cli.store {
    settings.store_path = expand_tilde(&path);
  }
  tracing::debug!(?settings, "settings loaded");

  if let Some(parent) = settings.store_path.parent() {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&settings.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store_path))?;
  let client = ApiClient::new(&settings.base_url, settings.timeout())?;

  match command {
    Command::Login { matricula, senha } => {
      let senha = match senha {
        Some(s) => s,
        None => password_from_stdin()?,
      };
      commands::login(&client, &store, &matricula, &senha).await?;
    }
    Command::Logout => commands::logout(&store).await?,
    Command::Whoami => commands::whoami(&store).await?,
    Command::Cases { responsible, status, date, json } => {
      let auth = commands::require_session(&store).await?;
      let args = CasesArgs { responsible, status, date, json };
      commands::cases(&client.with_auth(auth), &args).await?;
    }
    Command::Case(cmd) => {
      let auth = commands::require_session(&store).await?;
      run_case(cmd, &client.with_auth(auth.clone()), &auth).await?;
    }
    Command::Evidence(cmd) => run_evidence(cmd, &client, &store).await?,
    Command::Tui => {
      let auth = commands::require_session(&store).await?;
      run_tui(App::new(client.with_auth(auth.clone()), auth)).await?;
    }
  }

  Ok(())
}

async fn run_case(cmd: CaseCommand, client: &ApiClient, auth: &AuthContext) -> Result<()> {
  match cmd {
    CaseCommand::Show { id, json } => commands::show_case(client, &id, json).await,
    CaseCommand::Add {
      title,
      description,
      status,
      opened,
      occurred,
      latitude,
      longitude,
      victim,
    } => {
      let args = NewCaseArgs {
        title,
        description,
        status,
        opened,
        occurred,
        latitude,
        longitude,
        victim,
      };
      commands::add_case(client, auth, &args).await
    }
    CaseCommand::Edit {
      id,
      title,
      description,
      status,
      occurred,
      closed,
      latitude,
      longitude,
    } => {
      let args = EditCaseArgs { title, description, status, occurred, closed, latitude, longitude };
      commands::edit_case(client, auth, &id, &args).await
    }
  }
}

async fn run_evidence(cmd: EvidenceCommand, client: &ApiClient, store: &SqliteStore) -> Result<()> {
  match cmd {
    EvidenceCommand::Pending { all } => commands::list_outbox(store, all).await,
    EvidenceCommand::Sync => {
      let auth = commands::require_session(store).await?;
      commands::sync_outbox(&client.with_auth(auth), store).await
    }
    EvidenceCommand::Add { case_id, kind, description, latitude, longitude, files } => {
      let auth = commands::require_session(store).await?;
      let args = EvidenceArgs { case_id, kind, description, latitude, longitude, files };
      commands::add_evidence(&client.with_auth(auth.clone()), store, &auth, &args).await
    }
  }
}

/// Read a password from stdin.
fn password_from_stdin() -> Result<String> {
  use std::io::{BufRead, Write};
  eprint!("Senha: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(
    line
      .trim_end_matches('\n')
      .trim_end_matches('\r')
      .to_string(),
  )
}

// ─── Terminal UI ──────────────────────────────────────────────────────────────

async fn run_tui(mut app: App) -> Result<()> {
  enable_raw_mode().context("enabling raw mode")?;
  let mut stdout = io::stdout();
  execute!(stdout, EnterAlternateScreen).context("entering alternate screen")?;
  let backend = CrosstermBackend::new(stdout);
  let mut terminal = Terminal::new(backend).context("creating terminal")?;

  // A failed initial load is shown in the status bar; `R` retries.
  let _ = app.load_cases().await;
  let run_result = run_event_loop(&mut terminal, &mut app).await;

  // Restore terminal regardless of result.
  disable_raw_mode().ok();
  execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
  terminal.show_cursor().ok();

  run_result
}

async fn run_event_loop(
  terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
  app: &mut App,
) -> Result<()> {
  loop {
    terminal.draw(|f| ui::draw(f, app)).context("drawing frame")?;

    // Poll for an event, yielding control to tokio while waiting.
    let maybe_event = tokio::task::block_in_place(|| {
      if event::poll(Duration::from_millis(50))? {
        Ok::<_, io::Error>(Some(event::read()?))
      } else {
        Ok(None)
      }
    })?;

    if let Some(Event::Key(key)) = maybe_event
      && !app.handle_key(key).await?
    {
      break;
    }
  }

  Ok(())
}
