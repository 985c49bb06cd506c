//! Readings and risk classification.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Concentration (f/cc) at which exposure becomes Medium risk.
pub const MEDIUM_THRESHOLD: f64 = 0.01;

/// Concentration (f/cc) at which exposure becomes High risk.
pub const HIGH_THRESHOLD: f64 = 0.1;

/// Risk tier of a single reading.
///
/// Ordered from least to most severe so tiers can be compared and maxed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    /// Label written to storage, exports and the status line.
    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a fibre concentration to its risk tier.
///
/// Lower bounds are inclusive: exactly 0.01 is Medium and exactly 0.1 is High.
/// Callers must reject negative samples before classifying.
pub fn classify(concentration: f64) -> RiskTier {
    debug_assert!(concentration >= 0.0, "negative concentration {concentration}");
    if concentration < MEDIUM_THRESHOLD {
        RiskTier::Low
    } else if concentration < HIGH_THRESHOLD {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

/// One classified sensor sample.
///
/// Readings are immutable once built. The risk tier is always derived from
/// the concentration by [`classify`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    sequence_index: u64,
    timestamp: DateTime<Utc>,
    location: String,
    concentration: f64,
    risk_tier: RiskTier,
}

impl Reading {
    pub(crate) fn new(
        sequence_index: u64,
        timestamp: DateTime<Utc>,
        location: impl Into<String>,
        concentration: f64,
    ) -> Self {
        Self {
            sequence_index,
            timestamp,
            location: location.into(),
            concentration,
            risk_tier: classify(concentration),
        }
    }

    pub fn sequence_index(&self) -> u64 {
        self.sequence_index
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Concentration in fibres per cubic centimetre.
    pub fn concentration(&self) -> f64 {
        self.concentration
    }

    pub fn risk_tier(&self) -> RiskTier {
        self.risk_tier
    }

    pub fn is_high_risk(&self) -> bool {
        self.risk_tier == RiskTier::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(classify(0.0), RiskTier::Low);
        assert_eq!(classify(0.009999), RiskTier::Low);
        assert_eq!(classify(0.01), RiskTier::Medium);
        assert_eq!(classify(0.099999), RiskTier::Medium);
        assert_eq!(classify(0.1), RiskTier::High);
        assert_eq!(classify(0.2), RiskTier::High);
    }

    #[test]
    fn test_classify_is_monotonic() {
        let samples = [0.0, 0.001, 0.0099, 0.01, 0.05, 0.0999, 0.1, 0.15, 3.0];
        let tiers: Vec<RiskTier> = samples.iter().map(|&c| classify(c)).collect();
        assert!(tiers.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_reading_derives_tier() {
        let reading = Reading::new(1, Utc::now(), "Boiler room", 0.15);
        assert_eq!(reading.risk_tier(), RiskTier::High);
        assert!(reading.is_high_risk());
        assert_eq!(reading.location(), "Boiler room");
    }

    #[test]
    fn test_tier_labels() {
        assert_eq!(RiskTier::Low.to_string(), "Low");
        assert_eq!(RiskTier::Medium.label(), "Medium");
        assert_eq!(format!("{}", RiskTier::High), "High");
    }
}
