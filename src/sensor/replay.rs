//! Replay sensor.
//!
//! Feeds a fixed sequence of concentrations, either supplied directly or
//! read from a text file with one value per line.

use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;

use super::Sensor;
use crate::error::SensorError;

/// A sensor that replays recorded samples in order.
///
/// Once every sample has been served, further calls fail with
/// [`SensorError::Exhausted`], which ends the session as a fault.
#[derive(Debug)]
pub struct ReplaySensor {
    samples: VecDeque<f64>,
    served: usize,
    description: String,
}

impl ReplaySensor {
    /// Create a replay source from in-memory samples.
    pub fn new(samples: impl IntoIterator<Item = f64>) -> Self {
        let samples: VecDeque<f64> = samples.into_iter().collect();
        let description = format!("replay: {} samples", samples.len());
        Self {
            samples,
            served: 0,
            description,
        }
    }

    /// Load samples from a file.
    ///
    /// Blank lines and lines starting with `#` are skipped. A value that
    /// does not parse is an error; negative values are kept so the session
    /// can reject them.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Read error: {}", path.display()))?;
        let mut samples = VecDeque::new();

        for (line_no, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let value: f64 = line
                .parse()
                .with_context(|| format!("Parse error at {}:{}", path.display(), line_no + 1))?;
            samples.push_back(value);
        }

        let description = format!("replay: {} ({} samples)", path.display(), samples.len());
        Ok(Self {
            samples,
            served: 0,
            description,
        })
    }

    /// Number of samples not yet served.
    pub fn remaining(&self) -> usize {
        self.samples.len()
    }
}

#[async_trait]
impl Sensor for ReplaySensor {
    async fn sample(&mut self) -> Result<f64, SensorError> {
        match self.samples.pop_front() {
            Some(value) => {
                self.served += 1;
                Ok(value)
            }
            None => Err(SensorError::Exhausted(self.served)),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}
