//! Sensor abstraction for sampling fibre concentration.
//!
//! The session pulls exactly one sample per tick through the [`Sensor`]
//! trait. Hardware drivers, the random simulator and file replay all sit
//! behind it.

mod replay;
mod simulated;

pub use replay::ReplaySensor;
pub use simulated::SimulatedSensor;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::error::SensorError;

/// Trait for sampling airborne fibre concentration.
///
/// # Example
///
/// ```
/// use fiberwatch::{ReplaySensor, Sensor};
///
/// # tokio_test::block_on(async {
/// let mut sensor = ReplaySensor::new(vec![0.005, 0.02]);
/// assert_eq!(sensor.sample().await.unwrap(), 0.005);
/// # });
/// ```
#[async_trait]
pub trait Sensor: Send + Debug {
    /// Take one sample, in fibres per cubic centimetre.
    ///
    /// The value is passed to the session unchecked. Negative or non-finite
    /// values are rejected there as contract violations.
    async fn sample(&mut self) -> Result<f64, SensorError>;

    /// Returns a human-readable description of the sensor.
    ///
    /// Used for display in the TUI header and in logs.
    fn description(&self) -> &str;
}
