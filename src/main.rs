use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

mod app;
mod chat;
mod config;
mod dashboard;
mod data;
mod handler;
mod reply;
mod tab;
mod tui;
mod ui;

use app::App;
use config::{Config, Overrides, Settings, ENDPOINT_ENV};
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "ecotrack")]
#[command(about = "Terminal dashboard for city waste management, with the EcoBot assistant")]
struct Cli {
    /// Chat reply service URL
    #[arg(short, long)]
    endpoint: Option<String>,
    /// Seconds to wait for a chat reply
    #[arg(short, long)]
    timeout: Option<u64>,
    /// View to open on: admin, worker or citizen
    #[arg(long)]
    tab: Option<String>,
    /// Chart period on the admin view: 3m, 6m or 1y
    #[arg(short, long)]
    period: Option<String>,
    /// Where to write the log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Ignoring unreadable config: {err:#}");
            Config::new()
        }
    };
    let overrides = Overrides {
        endpoint: cli.endpoint,
        env_endpoint: std::env::var(ENDPOINT_ENV).ok(),
        timeout_secs: cli.timeout,
        tab: cli.tab,
        period: cli.period,
        log_file: cli.log_file,
    };
    let settings = Settings::resolve(&config, overrides);

    // The terminal belongs to the UI, so logs go to a file
    if let Err(err) = init_logging(&settings.log_file) {
        eprintln!("Logging disabled: {err:#}");
    }
    info!(
        tab = settings.tab.as_str(),
        period = settings.period.as_str(),
        "starting ecotrack"
    );

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(&settings);

    let result = run(&mut terminal, &mut app).await;

    app.shutdown();
    tui::restore()?;

    if let Err(err) = &result {
        error!(error = %err, "ecotrack exited with an error");
    }
    info!("ecotrack stopped");
    result
}

fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new(tui::TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await?,
            None => break,
        }
    }

    Ok(())
}
