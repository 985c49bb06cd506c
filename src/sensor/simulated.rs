//! Simulated sensor.
//!
//! Draws each sample uniformly from a fixed range. Stands in for a hardware
//! driver during demos and dry runs.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::Sensor;
use crate::error::SensorError;

/// A sensor that draws samples uniformly from `[min, max)`.
#[derive(Debug)]
pub struct SimulatedSensor {
    rng: StdRng,
    min: f64,
    max: f64,
    description: String,
}

impl SimulatedSensor {
    /// Create a simulator over `[min, max)`.
    ///
    /// A `seed` makes the sample sequence reproducible.
    pub fn new(min: f64, max: f64, seed: Option<u64>) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            min,
            max,
            description: format!("simulated: uniform {:.3}..{:.3} f/cc", min, max),
        }
    }
}

impl Default for SimulatedSensor {
    fn default() -> Self {
        Self::new(0.0, 0.2, None)
    }
}

#[async_trait]
impl Sensor for SimulatedSensor {
    async fn sample(&mut self) -> Result<f64, SensorError> {
        if self.min == self.max {
            return Ok(self.min);
        }
        Ok(self.rng.gen_range(self.min..self.max))
    }

    fn description(&self) -> &str {
        &self.description
    }
}
