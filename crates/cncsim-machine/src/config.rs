//! Simulation settings.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

/// Default rapid traverse rate (mm/min).
pub const DEFAULT_RAPID_FEED_RATE: f64 = 5000.0;

/// Simulation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Simulated time quantum (seconds).
    pub time_slice: f64,
    /// Maximum chord deviation for arc sampling (mm).
    pub arc_tolerance: f64,
    /// Rapid traverse rate used by G0 (mm/min).
    pub rapid_feed_rate: f64,
    /// Log the head position after every command.
    pub trace_moves: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            time_slice: 0.01,
            arc_tolerance: 0.001,
            rapid_feed_rate: DEFAULT_RAPID_FEED_RATE,
            trace_moves: false,
        }
    }
}

impl SimConfig {
    /// Validate settings.
    pub fn validate(&self) -> Result<()> {
        if self.time_slice <= 0.0 || !self.time_slice.is_finite() {
            return Err(SimError::InvalidConfig(
                "time_slice must be positive".into(),
            ));
        }
        if self.arc_tolerance <= 0.0 || !self.arc_tolerance.is_finite() {
            return Err(SimError::InvalidConfig(
                "arc_tolerance must be positive".into(),
            ));
        }
        if self.rapid_feed_rate <= 0.0 || !self.rapid_feed_rate.is_finite() {
            return Err(SimError::InvalidConfig(
                "rapid_feed_rate must be positive".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let bad = [
            SimConfig {
                time_slice: 0.0,
                ..Default::default()
            },
            SimConfig {
                arc_tolerance: -1.0,
                ..Default::default()
            },
            SimConfig {
                rapid_feed_rate: f64::NAN,
                ..Default::default()
            },
        ];
        for config in bad {
            assert!(matches!(
                config.validate(),
                Err(SimError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SimConfig = toml::from_str("time_slice = 0.5\n").unwrap();
        assert_eq!(config.time_slice, 0.5);
        assert_eq!(config.rapid_feed_rate, DEFAULT_RAPID_FEED_RATE);
        assert!(!config.trace_moves);
    }
}
