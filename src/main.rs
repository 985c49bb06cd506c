use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fiberwatch::app::App;
use fiberwatch::config::{
    ExportFormat, Settings, StorageBackend, ViewMode, DEFAULT_DURATION_MINUTES, MAX_DURATION_MINUTES,
};
use fiberwatch::prompt::{self, INVALID_DURATION};
use fiberwatch::ui::Theme;
use fiberwatch::{
    export, shutdown_channel, store, ConsoleView, LiveView, MonitoringSession, NullView,
    ReplaySensor, Sensor, SessionExit, SessionReport, SimulatedSensor, StorePolicy, TerminalView,
    ViewWindow,
};

#[derive(Parser, Debug)]
#[command(name = "fiberwatch")]
#[command(about = "Real-time asbestos fibre concentration monitoring")]
struct Args {
    /// Monitoring location (prompted for when omitted)
    #[arg(short, long)]
    location: Option<String>,

    /// Session length in minutes (prompted for when omitted)
    #[arg(short, long)]
    duration: Option<u64>,

    /// Configuration file (default: fiberwatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Sampling period (e.g., "5s", "500ms")
    #[arg(short, long)]
    tick: Option<String>,

    /// SQLite database file
    #[arg(long, conflicts_with = "memory_store")]
    database: Option<PathBuf>,

    /// Keep readings in memory instead of SQLite
    #[arg(long)]
    memory_store: bool,

    /// Directory for the end-of-session export
    #[arg(short, long)]
    export_dir: Option<PathBuf>,

    /// Export format
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,

    /// Print status lines instead of the live chart
    #[arg(long, conflicts_with = "view")]
    headless: bool,

    /// Presentation mode
    #[arg(long, value_enum)]
    view: Option<ViewMode>,

    /// Seed for the simulated sensor
    #[arg(long, conflicts_with = "replay")]
    seed: Option<u64>,

    /// Replay samples from a file (one value per line) instead of simulating
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset (e.g., "debug", "fiberwatch=trace")
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    apply_overrides(&mut settings, &args);
    init_logging(&settings)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut out = io::stdout();

    let location = match args.location {
        Some(location) => location,
        None => prompt::ask_location(&mut input, &mut out)?,
    };
    let minutes = match args.duration {
        Some(minutes) if (1..=MAX_DURATION_MINUTES).contains(&minutes) => minutes,
        Some(_) => {
            println!("{}", INVALID_DURATION);
            DEFAULT_DURATION_MINUTES
        }
        None => prompt::ask_duration(&mut input, &mut out)?,
    };
    drop(input);

    // Build a tokio runtime
    let rt = tokio::runtime::Runtime::new()?;
    let report = rt.block_on(run(location, minutes, settings))?;

    print_summary(&report);

    match report.exit {
        SessionExit::Faulted(err) => bail!("Monitoring session faulted: {}", err),
        SessionExit::Completed | SessionExit::Cancelled => Ok(()),
    }
}

/// Apply command-line flags on top of the loaded settings.
fn apply_overrides(settings: &mut Settings, args: &Args) {
    if let Some(ref tick) = args.tick {
        settings.sampling.tick = tick.clone();
    }
    if let Some(ref database) = args.database {
        settings.storage.backend = StorageBackend::Sqlite;
        settings.storage.database = database.clone();
    }
    if args.memory_store {
        settings.storage.backend = StorageBackend::Memory;
    }
    if let Some(ref dir) = args.export_dir {
        settings.export.directory = dir.clone();
    }
    if let Some(format) = args.format {
        settings.export.format = format;
    }
    if args.headless {
        settings.view.mode = ViewMode::Console;
    }
    if let Some(mode) = args.view {
        settings.view.mode = mode;
    }
    if let Some(seed) = args.seed {
        settings.sensor.seed = Some(seed);
    }
    if let Some(ref replay) = args.replay {
        settings.sensor.replay = Some(replay.clone());
    }
    if let Some(ref level) = args.log_level {
        settings.logging.level = level.clone();
    }
}

/// Log to stderr, or to a file while the terminal view owns the screen.
fn init_logging(settings: &Settings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.logging.level))
        .with_context(|| format!("Invalid log level: {}", settings.logging.level))?;

    if settings.view.mode == ViewMode::Terminal {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&settings.logging.file)
            .with_context(|| format!("Failed to open log file {}", settings.logging.file.display()))?;
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
            .try_init()?;
    }

    Ok(())
}

/// Wire up the collaborators and run one session to completion.
async fn run(location: String, minutes: u64, settings: Settings) -> Result<SessionReport> {
    let sensor: Box<dyn Sensor> = match settings.sensor.replay {
        Some(ref path) => Box::new(ReplaySensor::from_file(path)?),
        None => Box::new(SimulatedSensor::new(
            settings.sensor.min,
            settings.sensor.max,
            settings.sensor.seed,
        )),
    };

    let store = store::open(&settings.storage)
        .await
        .context("Failed to open persistence store")?;
    let exporter = export::from_settings(&settings.export);
    let policy = StorePolicy {
        retries: settings.storage.retries,
        backoff: settings.retry_backoff()?,
    };

    let (tx, rx) = shutdown_channel();
    let tx = Arc::new(tx);

    let view: Box<dyn LiveView> = match settings.view.mode {
        ViewMode::Terminal => {
            let window = ViewWindow::new(
                settings.view_window()?,
                settings.view.y_margin,
                settings.view.initial_y_max,
            );
            let app = App::new(window, Theme::auto_detect());
            Box::new(TerminalView::enter(app, Arc::clone(&tx))?)
        }
        ViewMode::Console => Box::new(ConsoleView::stdout()),
        ViewMode::None => Box::new(NullView),
    };

    let session = MonitoringSession::builder(location, minutes)
        .tick_period(settings.tick_period()?)
        .call_timeout(settings.call_timeout()?)
        .store_policy(policy)
        .sensor(sensor)
        .store(store)
        .view(view)
        .exporter(exporter)
        .build()?;

    let signals = tokio::spawn(forward_signals(Arc::clone(&tx)));
    let report = session.run(rx).await;
    signals.abort();

    Ok(report)
}

/// Raise the shutdown signal on Ctrl+C or SIGTERM.
async fn forward_signals(shutdown: Arc<watch::Sender<bool>>) {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
    let _ = shutdown.send(true);
}

fn print_summary(report: &SessionReport) {
    println!();
    match (&report.export_path, &report.export_error) {
        (Some(path), _) => println!("Data exported to {}", path.display()),
        (None, Some(err)) => println!("Export failed: {}", err),
        (None, None) => println!("No readings recorded, nothing exported"),
    }
    println!(
        "Readings: {} ({} high risk, {} rejected, {} failed writes)",
        report.readings, report.high_risk, report.rejected, report.persist_failures
    );
    if let Some(ref err) = report.close_error {
        println!("Store did not close cleanly: {}", err);
    }
    match report.exit {
        SessionExit::Completed => println!("Monitoring completed at {}", report.location),
        SessionExit::Cancelled => println!("Monitoring stopped by user at {}", report.location),
        SessionExit::Faulted(ref err) => println!("Error during monitoring: {}", err),
    }
    println!("Monitoring session ended");
}
