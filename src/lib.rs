//! # fiberwatch
//!
//! Time-bounded monitoring of airborne asbestos fibre concentration.
//!
//! A [`MonitoringSession`] samples a [`Sensor`] on a fixed tick, classifies
//! each value into a [`RiskTier`], appends it to a [`PersistenceStore`],
//! pushes a snapshot to a [`LiveView`], and on exit exports the session
//! through an [`Exporter`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     MonitoringSession                       │
//! │  ┌─────────┐    ┌──────────┐    ┌─────────┐    ┌─────────┐  │
//! │  │ sensor  │───▶│   data   │───▶│  view   │───▶│ Terminal│  │
//! │  │(sample) │    │(classify,│    │ (live)  │    │ / stdout│  │
//! │  └─────────┘    │ buffer)  │    └─────────┘    └─────────┘  │
//! │                 └────┬─────┘                                │
//! │                      ├──▶ store  (every reading)            │
//! │                      └──▶ export (once, at the end)         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! - **[`session`]**: the tick loop, cancellation and the single flush path
//! - **[`data`]**: [`Reading`], [`classify`] and the per-session [`SessionBuffer`]
//! - **[`sensor`]**: the [`Sensor`] trait with simulated and replay sources
//! - **[`store`]**: the [`PersistenceStore`] trait with SQLite and in-memory backends
//! - **[`view`]**: the [`LiveView`] trait, console output and the chart window
//! - **[`ui`]**: the full-screen ratatui dashboard ([`TerminalView`])
//! - **[`export`]**: CSV and JSON exporters
//! - **[`config`]**: layered settings (defaults, TOML file, environment)
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Prompt for location and duration, show the live chart
//! fiberwatch
//!
//! # Ten minute headless run with a reproducible simulated sensor
//! fiberwatch --location "Boiler room" --duration 10 --headless --seed 7
//! ```
//!
//! ### As a library
//!
//! ```
//! use std::time::Duration;
//! use fiberwatch::{shutdown_channel, MemoryStore, MonitoringSession, ReplaySensor};
//!
//! # tokio_test::block_on(async {
//! let store = MemoryStore::new();
//! let rows = store.handle();
//!
//! let session = MonitoringSession::builder("Boiler room", 1)
//!     .sensor(Box::new(ReplaySensor::new(vec![0.005, 0.02, 0.15])))
//!     .store(Box::new(store))
//!     .tick_period(Duration::from_millis(10))
//!     .build()
//!     .unwrap();
//!
//! let (_stop, shutdown) = shutdown_channel();
//! let report = session.run(shutdown).await;
//!
//! // The replay runs dry after three samples, which ends the session
//! assert!(report.fault().is_some());
//! assert_eq!(report.readings, 3);
//! assert_eq!(rows.close_calls(), 1);
//! # if let Some(path) = report.export_path { std::fs::remove_file(path).unwrap(); }
//! # });
//! ```

pub mod app;
pub mod config;
pub mod data;
pub mod error;
pub mod events;
pub mod export;
pub mod prompt;
pub mod sensor;
pub mod session;
pub mod store;
pub mod ui;
pub mod view;

// Re-export main types for convenience
pub use config::Settings;
pub use data::{classify, Reading, RiskTier, SessionBuffer, HIGH_THRESHOLD, MEDIUM_THRESHOLD};
pub use error::{ExportError, MonitorError, SensorError, StoreError};
pub use export::{CsvExporter, Exporter, JsonExporter};
pub use sensor::{ReplaySensor, Sensor, SimulatedSensor};
pub use session::{
    shutdown_channel, MonitoringSession, SessionExit, SessionInfo, SessionReport, SessionState,
    StorePolicy,
};
pub use store::{MemoryStore, MemoryStoreHandle, PersistenceStore, SqliteStore};
pub use ui::TerminalView;
pub use view::{ConsoleView, LiveView, NullView, ViewWindow};
