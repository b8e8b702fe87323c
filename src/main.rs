// ABOUTME: Main entry point for the session-box CLI
// Each invocation restores the persisted session, applies one operation and prints emitted events

//! Command-line front end for the session lifecycle manager.

use anyhow::Result;
use clap::{Parser, Subcommand};
use session_box::{
    AppConfig, ChannelEventSink, EventSink, FileSessionStore, Recovery, SessionConfig,
    SessionLifecycleManager, SessionStore,
};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "session-box", version, about = "Track an application session across pause and resume")]
struct Cli {
    /// Config file (defaults to ~/.session-box/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the persisted session (defaults to ~/.session-box)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start a session (restarts a paused one)
    Start,
    /// Stop the current session
    Stop,
    /// Pause the active session
    Pause,
    /// Resume the paused session, or start a new one if paused too long
    Resume,
    /// Show the current session
    Status,
    /// Record an application event attributed to the current session
    Event {
        event_type: String,
        /// Attribute as key=value, repeatable
        #[arg(long = "attr", value_parser = parse_attribute)]
        attributes: Vec<(String, String)>,
        /// Metric as key=number, repeatable
        #[arg(long = "metric", value_parser = parse_metric)]
        metrics: Vec<(String, f64)>,
    },
}

fn parse_attribute(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    if key.is_empty() {
        return Err(format!("empty key in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_metric(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = parse_attribute(raw)?;
    let value = value
        .parse::<f64>()
        .map_err(|e| format!("metric {key} is not a number: {e}"))?;
    Ok((key, value))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging();
    setup_panic_handler();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };

    let store: Arc<dyn SessionStore> = Arc::new(match &cli.store {
        Some(dir) => FileSessionStore::in_dir(dir)?,
        None => FileSessionStore::new()?,
    });

    let (sink, mut events) = ChannelEventSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => eprintln!("Failed to encode event: {e}"),
            }
        }
    });

    let manager = open_manager(store, Arc::new(sink), config.session)?;

    run_command(&manager, cli.command)?;

    // Dropping the manager closes the channel so the printer drains and exits
    drop(manager);
    printer.await?;

    Ok(())
}

/// Every invocation is a new process, so the stored record is taken as-is:
/// a session started by one call is still active for the next.
fn open_manager(
    store: Arc<dyn SessionStore>,
    sink: Arc<dyn EventSink>,
    config: SessionConfig,
) -> Result<SessionLifecycleManager> {
    let manager = SessionLifecycleManager::builder()
        .event_sink(sink)
        .session_store(store)
        .config(config)
        .recovery(Recovery::AsSaved)
        .build()?;
    Ok(manager)
}

fn run_command(manager: &SessionLifecycleManager, command: Command) -> Result<()> {
    match command {
        Command::Start => report(manager.start()),
        Command::Stop => report(manager.stop()),
        Command::Pause => report(manager.pause()),
        Command::Resume => report(manager.resume()),
        Command::Status => {
            eprintln!("{manager}");
            if let Some(session) = manager.session() {
                println!("{}", serde_json::to_string_pretty(&session)?);
            }
            report(manager.state());
        }
        Command::Event {
            event_type,
            attributes,
            metrics,
        } => {
            let event = attributes
                .into_iter()
                .fold(manager.create_event(event_type), |event, (k, v)| {
                    event.with_attribute(k, v)
                });
            let event = metrics
                .into_iter()
                .fold(event, |event, (k, v)| event.with_metric(k, v));
            manager.record_event(event);
        }
    }
    Ok(())
}

fn report(state: session_box::SessionState) {
    eprintln!("{} {}", state.indicator(), state);
}

fn setup_logging() {
    use std::fs::OpenOptions;
    use tracing_subscriber::fmt::writer::BoxMakeWriter;
    use tracing_subscriber::prelude::*;

    // Create log directory if it doesn't exist
    let log_dir = dirs::home_dir()
        .map(|home| home.join(".session-box").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".session-box/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    // Create log file with timestamp
    let log_file = log_dir.join(format!(
        "session-box-{}.log",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    // Fall back to stderr when the log file can't be opened
    let (writer, ansi) = match OpenOptions::new().create(true).append(true).open(&log_file) {
        Ok(file) => (BoxMakeWriter::new(std::sync::Mutex::new(file)), false),
        Err(_) => (BoxMakeWriter::new(std::io::stderr), true),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(writer)
                .with_ansi(ansi),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "session_box=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs for more details.");
    }));
}
