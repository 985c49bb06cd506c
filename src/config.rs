//! Layered configuration.
//!
//! Settings are resolved from, lowest priority first:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `fiberwatch.toml` when present)
//! 3. Environment variables prefixed `FIBERWATCH`, e.g.
//!    `FIBERWATCH_STORAGE__DATABASE=/var/lib/fiberwatch.db`
//!
//! Command-line flags are applied on top by the binary.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::data::duration::parse_duration;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "fiberwatch.toml";

/// Session length used when the operator gives no usable duration.
pub const DEFAULT_DURATION_MINUTES: u64 = 60;

/// Longest accepted session (one week).
pub const MAX_DURATION_MINUTES: u64 = 7 * 24 * 60;

/// Fully resolved settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub sampling: SamplingSettings,
    pub sensor: SensorSettings,
    pub storage: StorageSettings,
    pub export: ExportSettings,
    pub view: ViewSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingSettings {
    /// Tick period, e.g. "5s".
    pub tick: String,
    /// Upper bound on each sensor and store call, e.g. "2s". Unbounded when unset.
    pub call_timeout: Option<String>,
}

impl Default for SamplingSettings {
    fn default() -> Self {
        Self {
            tick: "5s".to_string(),
            call_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Lower bound of simulated samples (f/cc).
    pub min: f64,
    /// Upper bound (exclusive) of simulated samples (f/cc).
    pub max: f64,
    /// Seed for reproducible simulation.
    pub seed: Option<u64>,
    /// Replay samples from this file instead of simulating.
    pub replay: Option<PathBuf>,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 0.2,
            seed: None,
            replay: None,
        }
    }
}

/// Which persistence backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    /// SQLite database file.
    pub database: PathBuf,
    /// Extra attempts after a failed write. 0 is best-effort.
    pub retries: u32,
    /// Pause between attempts, e.g. "250ms".
    pub retry_backoff: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database: PathBuf::from("asbestos_monitoring.db"),
            retries: 0,
            retry_backoff: "250ms".to_string(),
        }
    }
}

/// Format of the end-of-session export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExportSettings {
    pub directory: PathBuf,
    pub format: ExportFormat,
    /// File name prefix; a timestamp and extension are appended.
    pub prefix: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            format: ExportFormat::Csv,
            prefix: "asbestos_readings".to_string(),
        }
    }
}

/// How readings are presented while sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    /// Full-screen live chart.
    #[default]
    Terminal,
    /// Plain status lines on stdout.
    Console,
    /// No output besides logs.
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub mode: ViewMode,
    /// Width of the visible time window, e.g. "60s".
    pub window: String,
    /// Factor applied to a new maximum when the y-axis grows.
    pub y_margin: f64,
    /// Initial y-axis upper bound (f/cc).
    pub initial_y_max: f64,
}

impl Default for ViewSettings {
    fn default() -> Self {
        Self {
            mode: ViewMode::Terminal,
            window: "60s".to_string(),
            y_margin: 1.1,
            initial_y_max: 0.15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is unset.
    pub level: String,
    /// Log file used while the terminal view owns the screen.
    pub file: PathBuf,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: PathBuf::from("fiberwatch.log"),
        }
    }
}

impl Settings {
    /// Load settings from defaults, an optional file and the environment.
    ///
    /// An explicitly given file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .add_source(file)
            .add_source(Environment::with_prefix("FIBERWATCH").prefix_separator("_").separator("__"))
            .build()
            .context("Failed to load configuration")?;

        config.try_deserialize().context("Invalid configuration")
    }

    pub fn tick_period(&self) -> Result<Duration> {
        let tick = parse_duration(&self.sampling.tick)
            .with_context(|| format!("Invalid sampling.tick: {}", self.sampling.tick))?;
        anyhow::ensure!(!tick.is_zero(), "sampling.tick must be positive");
        Ok(tick)
    }

    pub fn call_timeout(&self) -> Result<Option<Duration>> {
        self.sampling
            .call_timeout
            .as_deref()
            .map(|s| parse_duration(s).with_context(|| format!("Invalid sampling.call_timeout: {}", s)))
            .transpose()
    }

    pub fn retry_backoff(&self) -> Result<Duration> {
        parse_duration(&self.storage.retry_backoff)
            .with_context(|| format!("Invalid storage.retry_backoff: {}", self.storage.retry_backoff))
    }

    pub fn view_window(&self) -> Result<Duration> {
        parse_duration(&self.view.window)
            .with_context(|| format!("Invalid view.window: {}", self.view.window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.tick_period().unwrap(), Duration::from_secs(5));
        assert_eq!(settings.call_timeout().unwrap(), None);
        assert_eq!(settings.view_window().unwrap(), Duration::from_secs(60));
        assert_eq!(settings.storage.backend, StorageBackend::Sqlite);
        assert_eq!(settings.storage.database, PathBuf::from("asbestos_monitoring.db"));
        assert_eq!(settings.storage.retries, 0);
        assert_eq!(settings.export.format, ExportFormat::Csv);
        assert_eq!(settings.export.prefix, "asbestos_readings");
        assert!((settings.view.y_margin - 1.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[sampling]
tick = "2s"
call_timeout = "500ms"

[storage]
backend = "memory"
retries = 2

[export]
format = "json"
directory = "/tmp/exports"

[view]
mode = "console"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.tick_period().unwrap(), Duration::from_secs(2));
        assert_eq!(settings.call_timeout().unwrap(), Some(Duration::from_millis(500)));
        assert_eq!(settings.storage.backend, StorageBackend::Memory);
        assert_eq!(settings.storage.retries, 2);
        assert_eq!(settings.export.format, ExportFormat::Json);
        assert_eq!(settings.export.directory, PathBuf::from("/tmp/exports"));
        assert_eq!(settings.view.mode, ViewMode::Console);
        // Untouched sections keep their defaults
        assert_eq!(settings.export.prefix, "asbestos_readings");
        assert_eq!(settings.sensor.max, 0.2);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        assert!(Settings::load(Some(Path::new("/nonexistent/fiberwatch.toml"))).is_err());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let mut settings = Settings::default();
        settings.sampling.tick = "0s".to_string();
        assert!(settings.tick_period().is_err());
    }
}
