//! Error types for the monitoring session and its collaborators.

use thiserror::Error;

/// Errors raised by a sensor collaborator.
#[derive(Debug, Error)]
pub enum SensorError {
    /// A replay source has no more samples.
    #[error("sensor exhausted after {0} samples")]
    Exhausted(usize),

    /// The sample did not arrive within the configured call timeout.
    #[error("sensor read timed out")]
    Timeout,

    /// The underlying device or input failed.
    #[error("sensor read failed: {0}")]
    ReadFailed(String),
}

/// Errors raised by a persistence store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database driver error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The write did not complete within the configured call timeout.
    #[error("store write timed out")]
    Timeout,

    /// The store was already released.
    #[error("store is closed")]
    Closed,

    /// Backend-specific failure.
    #[error("store failure: {0}")]
    Other(String),
}

/// Errors raised while exporting a session.
#[derive(Debug, Error)]
pub enum ExportError {
    /// Nothing to export.
    #[error("no readings to export")]
    Empty,

    /// Filesystem failure.
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization failed.
    #[error("export serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The exporter panicked.
    #[error("exporter panicked: {0}")]
    Panicked(String),
}

/// Top-level error taxonomy of a monitoring session.
///
/// Only [`MonitorError::Unexpected`] (and the collaborator faults that map to
/// it) ends the sampling loop early. Contract violations and store failures
/// are recovered from within the tick.
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The sensor broke its contract (negative or non-finite sample).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// Recoverable persistence failure.
    #[error("persistence fault: {0}")]
    Io(#[from] StoreError),

    /// Sensor failure other than a timeout.
    #[error("sensor fault: {0}")]
    Sensor(#[from] SensorError),

    /// The live view could not render.
    #[error("view fault: {0}")]
    View(String),

    /// Export failed during shutdown.
    #[error("export fault: {0}")]
    Export(#[from] ExportError),

    /// Session parameters were rejected.
    #[error("invalid session input: {0}")]
    InvalidInput(String),

    /// A panic or other unclassified failure inside the loop.
    #[error("unexpected fault: {0}")]
    Unexpected(String),
}

impl MonitorError {
    /// Whether the session keeps sampling after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MonitorError::ContractViolation(_) | MonitorError::Io(_))
    }
}
