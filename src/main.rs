mod app;
mod config;
mod event;
mod notification;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use config::Config;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;
use washpro::api::http::HttpTransport;
use washpro::api::memory::InMemoryTransport;
use washpro::api::Transport;
use washpro::core::SessionOptions;

/// Terminal console for WASH infrastructure records
#[derive(Parser, Debug)]
#[command(name = "washpro", version, about, long_about = None)]
struct Args {
    /// Base URL of the WASH API (overrides WASHPRO_API_URL and the config file)
    #[arg(long)]
    api_url: Option<String>,

    /// Bearer token (overrides WASHPRO_TOKEN and the config file)
    #[arg(long)]
    token: Option<String>,

    /// Resource to open: dump-sites, gutters, soak-aways, toilet-facilities, open-defecation
    #[arg(short, long)]
    resource: Option<String>,

    /// Rows per page
    #[arg(long)]
    page_size: Option<usize>,

    /// Automatic retries for list fetches (max 3)
    #[arg(long)]
    retries: Option<u32>,

    /// Run against seeded in-memory data instead of the API
    #[arg(long)]
    demo: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,

    /// Run in read-only mode (block all write operations)
    #[arg(long)]
    readonly: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    // The TUI owns the terminal, so without a log file we log nowhere
    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled: cannot open {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    // WASHPRO_LOG narrows per module, e.g. "washpro::core=trace"
    let filter = EnvFilter::try_from_env("WASHPRO_LOG")
        .unwrap_or_else(|_| EnvFilter::new(tracing_level.as_str().to_lowercase()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("washpro started with log level: {:?}", level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("washpro").join("washpro.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".washpro").join("washpro.log");
    }
    PathBuf::from("washpro.log")
}

/// Build the app before touching the terminal so config errors print plainly
fn initialize(args: &Args) -> Result<App> {
    let mut config = Config::load();
    if let Some(size) = args.page_size {
        config.page_size = size;
    }
    if let Some(retries) = args.retries {
        config.fetch_retries = retries;
    }

    let kind = config.effective_resource(args.resource.as_deref())?;
    let options = SessionOptions {
        page_size: config.page_size,
        readonly: args.readonly,
        request_timeout: config.request_timeout(),
        fetch_retries: config.effective_fetch_retries(),
    };

    let (transport, api_label): (Arc<dyn Transport>, String) = if args.demo {
        tracing::info!("Using in-memory demo data");
        (Arc::new(InMemoryTransport::demo()), "demo data".to_string())
    } else {
        let url = config.effective_api_url(args.api_url.as_deref());
        let token = config.effective_token(args.token.as_deref());
        let http = HttpTransport::new(&url, token, config.request_timeout())?;
        let label = http.base_url().to_string();
        tracing::info!("Using API: {}", label);
        (Arc::new(http), label)
    };

    let mut app = App::new(transport, kind, options, config, api_label)?;
    app.persist_config = true;
    Ok(app)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    let mut app = match initialize(&args) {
        Ok(app) => app,
        Err(err) => {
            eprintln!("Initialization error: {err:#}");
            std::process::exit(2);
        }
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    app.refresh();
    let run_result = run_app(&mut terminal, &mut app).await;
    app.shutdown();
    cleanup_terminal(&mut terminal)?;

    if let Err(err) = run_result {
        eprintln!("Error: {err:?}");
    }

    Ok(())
}

fn cleanup_terminal<B: Backend + std::io::Write>(terminal: &mut Terminal<B>) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()>
where
    B::Error: Send + Sync + 'static,
{
    loop {
        app.process_events();
        terminal.draw(|f| ui::render(f, app))?;

        if event::handle_events(app)? {
            return Ok(());
        }

        // Give spawned requests a turn on the runtime
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}
