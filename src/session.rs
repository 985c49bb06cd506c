//! The monitoring session engine.
//!
//! A [`MonitoringSession`] owns the reading buffer and drives one cooperative
//! tick loop:
//!
//! ```text
//!        ┌──────────── tick (fixed period) ─────────────┐
//!        ▼                                               │
//!  Sensor::sample ─▶ validate ─▶ classify ─▶ SessionBuffer::push
//!                                                  │
//!                    PersistenceStore::append ◀────┤
//!                    LiveView::render/status  ◀────┘
//!
//!  timeout │ shutdown signal │ fault
//!        ▼
//!  Exporter::export (once, if any readings) ─▶ store close ─▶ view close
//! ```
//!
//! The loop ends at the planned end time, when the shutdown channel carries
//! `true`, or when a collaborator fails in a way that cannot be recovered
//! within the tick (including a panic). All three exits run the same flush
//! sequence exactly once.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::MAX_DURATION_MINUTES;
use crate::data::{Reading, SessionBuffer};
use crate::error::{ExportError, MonitorError, SensorError, StoreError};
use crate::export::{CsvExporter, Exporter};
use crate::sensor::{Sensor, SimulatedSensor};
use crate::store::{MemoryStore, PersistenceStore};
use crate::view::{LiveView, NullView};

/// Default time between samples.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_secs(5);

/// Create the channel used to cancel a running session.
///
/// Send `true` to stop the session at the next tick boundary.
pub fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Stopping,
    Ended,
}

/// Why the sampling loop ended.
#[derive(Debug)]
pub enum SessionExit {
    /// The planned duration elapsed.
    Completed,
    /// A shutdown signal was received.
    Cancelled,
    /// A collaborator failed; the session was still flushed.
    Faulted(MonitorError),
}

/// What to do when a store write fails.
///
/// The default is best-effort: no retries, the failure is logged and the
/// reading stays in the buffer (and therefore in the export).
#[derive(Debug, Clone, Default)]
pub struct StorePolicy {
    /// Extra attempts after the first failure.
    pub retries: u32,
    /// Pause before each extra attempt.
    pub backoff: Duration,
}

/// Static facts about a session, handed to the view when sampling starts.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub location: String,
    pub started_at: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub tick_period: Duration,
    pub sensor: String,
    pub store: String,
}

/// Outcome of a finished session.
#[derive(Debug)]
pub struct SessionReport {
    pub location: String,
    pub exit: SessionExit,
    pub state: SessionState,
    pub started_at: DateTime<Utc>,
    pub planned_end: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Readings recorded (and exported, if export succeeded).
    pub readings: usize,
    pub high_risk: usize,
    /// Samples rejected as contract violations.
    pub rejected: usize,
    /// Readings whose durable write failed.
    pub persist_failures: usize,
    pub export_path: Option<PathBuf>,
    pub export_error: Option<ExportError>,
    pub close_error: Option<StoreError>,
}

impl SessionReport {
    /// The fault that ended the session, if any.
    pub fn fault(&self) -> Option<&MonitorError> {
        match &self.exit {
            SessionExit::Faulted(err) => Some(err),
            _ => None,
        }
    }
}

/// Builder for [`MonitoringSession`].
///
/// Collaborators default to a simulated sensor, an in-memory store, no view
/// and a CSV export into the working directory.
pub struct SessionBuilder {
    location: String,
    duration_minutes: u64,
    tick_period: Duration,
    call_timeout: Option<Duration>,
    store_policy: StorePolicy,
    sensor: Option<Box<dyn Sensor>>,
    store: Option<Box<dyn PersistenceStore>>,
    view: Option<Box<dyn LiveView>>,
    exporter: Option<Box<dyn Exporter>>,
}

impl SessionBuilder {
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Bound each sensor and store call.
    pub fn call_timeout(mut self, limit: Option<Duration>) -> Self {
        self.call_timeout = limit;
        self
    }

    pub fn store_policy(mut self, policy: StorePolicy) -> Self {
        self.store_policy = policy;
        self
    }

    pub fn sensor(mut self, sensor: Box<dyn Sensor>) -> Self {
        self.sensor = Some(sensor);
        self
    }

    pub fn store(mut self, store: Box<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn view(mut self, view: Box<dyn LiveView>) -> Self {
        self.view = Some(view);
        self
    }

    pub fn exporter(mut self, exporter: Box<dyn Exporter>) -> Self {
        self.exporter = Some(exporter);
        self
    }

    /// Validate the inputs and build the session.
    pub fn build(self) -> Result<MonitoringSession, MonitorError> {
        let location = self.location.trim().to_string();
        if location.is_empty() {
            return Err(MonitorError::InvalidInput("location must not be empty".into()));
        }
        if self.duration_minutes == 0 {
            return Err(MonitorError::InvalidInput("duration must be at least one minute".into()));
        }
        if self.duration_minutes > MAX_DURATION_MINUTES {
            return Err(MonitorError::InvalidInput(format!(
                "duration must not exceed {} minutes",
                MAX_DURATION_MINUTES
            )));
        }
        if self.tick_period.is_zero() {
            return Err(MonitorError::InvalidInput("tick period must be positive".into()));
        }

        let duration = Duration::from_secs(self.duration_minutes * 60);
        let started_at = Utc::now();

        Ok(MonitoringSession {
            location,
            duration,
            tick_period: self.tick_period,
            call_timeout: self.call_timeout,
            store_policy: self.store_policy,
            sensor: self.sensor.unwrap_or_else(|| Box::new(SimulatedSensor::default())),
            store: self.store.unwrap_or_else(|| Box::new(MemoryStore::new())),
            view: self.view.unwrap_or_else(|| Box::new(NullView)),
            exporter: self
                .exporter
                .unwrap_or_else(|| Box::new(CsvExporter::new(".", "asbestos_readings"))),
            buffer: SessionBuffer::new(),
            state: SessionState::Running,
            started_at,
            planned_end: planned_end(started_at, duration),
            high_risk: 0,
            rejected: 0,
            persist_failures: 0,
        })
    }
}

/// One bounded monitoring run at a single location.
pub struct MonitoringSession {
    location: String,
    duration: Duration,
    tick_period: Duration,
    call_timeout: Option<Duration>,
    store_policy: StorePolicy,

    sensor: Box<dyn Sensor>,
    store: Box<dyn PersistenceStore>,
    view: Box<dyn LiveView>,
    exporter: Box<dyn Exporter>,

    buffer: SessionBuffer,
    state: SessionState,
    started_at: DateTime<Utc>,
    planned_end: DateTime<Utc>,

    high_risk: usize,
    rejected: usize,
    persist_failures: usize,
}

impl MonitoringSession {
    /// Start building a session for `location` lasting `duration_minutes`.
    pub fn builder(location: impl Into<String>, duration_minutes: u64) -> SessionBuilder {
        SessionBuilder {
            location: location.into(),
            duration_minutes,
            tick_period: DEFAULT_TICK_PERIOD,
            call_timeout: None,
            store_policy: StorePolicy::default(),
            sensor: None,
            store: None,
            view: None,
            exporter: None,
        }
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Sample until the planned end, a shutdown signal or a fault, then flush.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> SessionReport {
        let deadline = Instant::now().checked_add(self.duration);
        if deadline.is_none() {
            warn!("Planned end is out of range, running until stopped");
        }
        self.started_at = Utc::now();
        self.planned_end = planned_end(self.started_at, self.duration);

        info!(
            "Starting monitoring at {} for {:?} (tick {:?}, sensor: {}, store: {})",
            self.location,
            self.duration,
            self.tick_period,
            self.sensor.description(),
            self.store.description()
        );
        let info = SessionInfo {
            location: self.location.clone(),
            started_at: self.started_at,
            planned_end: self.planned_end,
            tick_period: self.tick_period,
            sensor: self.sensor.description().to_string(),
            store: self.store.description().to_string(),
        };
        self.view.begin(&info);

        let exit = self.sample_loop(deadline, &mut shutdown).await;
        self.finish(exit).await
    }

    async fn sample_loop(
        &mut self,
        deadline: Option<Instant>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> SessionExit {
        if *shutdown.borrow_and_update() {
            info!("Shutdown requested before the first sample");
            return SessionExit::Cancelled;
        }

        let mut ticker = time::interval(self.tick_period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let expiry = time::sleep_until(deadline.unwrap_or_else(Instant::now));
        tokio::pin!(expiry);
        let bounded = deadline.is_some();
        let mut signal_open = true;

        loop {
            let event = tokio::select! {
                biased;
                changed = shutdown.changed(), if signal_open => LoopEvent::Signal(changed.is_ok()),
                _ = &mut expiry, if bounded => LoopEvent::Expired,
                _ = ticker.tick() => LoopEvent::Tick,
            };

            match event {
                LoopEvent::Signal(true) => {
                    if *shutdown.borrow_and_update() {
                        info!("Monitoring stopped by shutdown signal");
                        return SessionExit::Cancelled;
                    }
                }
                LoopEvent::Signal(false) => {
                    debug!("Shutdown sender dropped, running until the planned end");
                    signal_open = false;
                }
                LoopEvent::Expired => {
                    info!("Planned duration elapsed");
                    return SessionExit::Completed;
                }
                LoopEvent::Tick => match AssertUnwindSafe(self.tick()).catch_unwind().await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) if err.is_recoverable() => {}
                    Ok(Err(err)) => {
                        error!("Error during monitoring: {}", err);
                        return SessionExit::Faulted(err);
                    }
                    Err(panic) => {
                        let err = MonitorError::Unexpected(panic_message(panic.as_ref()));
                        error!("Error during monitoring: {}", err);
                        return SessionExit::Faulted(err);
                    }
                },
            }
        }
    }

    /// One sample, classify, persist, render cycle.
    async fn tick(&mut self) -> Result<(), MonitorError> {
        let concentration = match self.sample().await {
            Ok(value) => value,
            Err(SensorError::Timeout) => {
                return Err(self.reject("sensor read timed out".to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if !concentration.is_finite() || concentration < 0.0 {
            return Err(self.reject(format!("sensor returned {} f/cc", concentration)));
        }

        let reading = self.buffer.push(Utc::now(), &self.location, concentration).clone();

        if let Err(err) = self.persist(&reading).await {
            self.persist_failures += 1;
            warn!(
                "Failed to persist reading #{}: {} (kept in memory for export)",
                reading.sequence_index(),
                err
            );
            self.view.notice(&format!(
                "Storage write failed for reading #{}: {}",
                reading.sequence_index(),
                err
            ));
        }

        self.view
            .render(self.buffer.readings())
            .map_err(|e| MonitorError::View(e.to_string()))?;
        self.view.status(&reading);

        if reading.is_high_risk() {
            self.high_risk += 1;
            warn!(
                "High risk level at {}: {:.4} f/cc (reading #{})",
                reading.location(),
                reading.concentration(),
                reading.sequence_index()
            );
        } else {
            debug!(
                "Reading #{}: {:.4} f/cc ({})",
                reading.sequence_index(),
                reading.concentration(),
                reading.risk_tier()
            );
        }

        Ok(())
    }

    async fn sample(&mut self) -> Result<f64, SensorError> {
        match self.call_timeout {
            Some(limit) => time::timeout(limit, self.sensor.sample())
                .await
                .unwrap_or_else(|_| Err(SensorError::Timeout)),
            None => self.sensor.sample().await,
        }
    }

    fn reject(&mut self, reason: String) -> MonitorError {
        self.rejected += 1;
        warn!("Rejected sample: {}", reason);
        self.view.notice(&format!("Invalid sample rejected: {}", reason));
        MonitorError::ContractViolation(reason)
    }

    async fn persist(&mut self, reading: &Reading) -> Result<(), StoreError> {
        let mut attempt = 0;
        loop {
            let result = match self.call_timeout {
                Some(limit) => time::timeout(limit, self.store.append(reading))
                    .await
                    .unwrap_or_else(|_| Err(StoreError::Timeout)),
                None => self.store.append(reading).await,
            };

            match result {
                Ok(()) => return Ok(()),
                Err(err) if attempt < self.store_policy.retries => {
                    attempt += 1;
                    debug!(
                        "Write of reading #{} failed ({}), retry {}/{}",
                        reading.sequence_index(),
                        err,
                        attempt,
                        self.store_policy.retries
                    );
                    time::sleep(self.store_policy.backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Export, release the store and the view. Runs once, on every exit path.
    async fn finish(mut self, exit: SessionExit) -> SessionReport {
        self.state = SessionState::Stopping;
        debug!("Session stopping after {} readings", self.buffer.len());

        let (export_path, export_error) = if self.buffer.has_readings() {
            let exporter = &self.exporter;
            let readings = self.buffer.readings();
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| exporter.export(readings)))
                .unwrap_or_else(|panic| Err(ExportError::Panicked(panic_message(panic.as_ref()))));
            match result {
                Ok(path) => {
                    info!("Data exported to {}", path.display());
                    (Some(path), None)
                }
                Err(err) => {
                    error!("Export failed: {}", err);
                    (None, Some(err))
                }
            }
        } else {
            info!("No readings recorded, nothing to export");
            (None, None)
        };

        let close_result = match self.call_timeout {
            Some(limit) => time::timeout(limit, self.store.close())
                .await
                .unwrap_or_else(|_| Err(StoreError::Timeout)),
            None => self.store.close().await,
        };
        let close_error = close_result.err();
        if let Some(err) = &close_error {
            error!("Failed to close store: {}", err);
        }

        if let Err(err) = self.view.close() {
            warn!("Failed to close view: {}", err);
        }

        let readings = self.buffer.len();
        self.buffer.clear();
        self.state = SessionState::Ended;
        info!("Monitoring session ended ({} readings)", readings);

        SessionReport {
            location: self.location,
            exit,
            state: self.state,
            started_at: self.started_at,
            planned_end: self.planned_end,
            ended_at: Utc::now(),
            readings,
            high_risk: self.high_risk,
            rejected: self.rejected,
            persist_failures: self.persist_failures,
            export_path,
            export_error,
            close_error,
        }
    }
}

enum LoopEvent {
    /// `true` if the shutdown value changed, `false` if the sender is gone.
    Signal(bool),
    Expired,
    Tick,
}

fn planned_end(start: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| start.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        format!("panic: {}", msg)
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        format!("panic: {}", msg)
    } else {
        "panic with non-string payload".to_string()
    }
}
