//! Glucose range thresholds and categorization.
//!
//! # Example
//!
//! ```
//! use cgm_core::{GlucoseRange, Thresholds};
//!
//! let thresholds = Thresholds::default();
//! assert_eq!(thresholds.evaluate(120), GlucoseRange::InRange);
//! assert_eq!(thresholds.evaluate(190), GlucoseRange::High);
//!
//! // The strict preset flags anything above 140 mg/dL.
//! assert_eq!(Thresholds::strict().evaluate(150), GlucoseRange::High);
//! ```

use serde::{Deserialize, Serialize};

use cgm_types::{ForecastSet, Reading};

use crate::error::{Error, Result};

/// Glucose range category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GlucoseRange {
    /// Below the low threshold.
    Low,
    /// Between the thresholds, inclusive.
    InRange,
    /// Above the high threshold.
    High,
}

impl GlucoseRange {
    /// Get a human-readable description of the range.
    pub fn description(&self) -> &'static str {
        match self {
            GlucoseRange::Low => "Low",
            GlucoseRange::InRange => "In range",
            GlucoseRange::High => "High",
        }
    }
}

impl std::fmt::Display for GlucoseRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Configuration for glucose thresholds, in mg/dL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Values strictly below this are low.
    pub low_below: u16,
    /// Values strictly above this are high.
    pub high_above: u16,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            low_below: 70,
            high_above: 180,
        }
    }
}

impl ThresholdConfig {
    /// Tighter upper bound of 140 mg/dL.
    pub fn strict() -> Self {
        Self {
            high_above: 140,
            ..Self::default()
        }
    }

    /// Validate the thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when `low_below` exceeds `high_above`.
    pub fn validate(&self) -> Result<()> {
        if self.low_below > self.high_above {
            return Err(Error::invalid_config(format!(
                "low threshold ({}) must not exceed high threshold ({})",
                self.low_below, self.high_above
            )));
        }
        Ok(())
    }
}

/// Threshold evaluator for glucose values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Thresholds {
    config: ThresholdConfig,
}

impl Thresholds {
    /// Create a new threshold evaluator with the given configuration.
    pub fn new(config: ThresholdConfig) -> Self {
        Self { config }
    }

    /// Create a threshold evaluator with strict thresholds.
    pub fn strict() -> Self {
        Self::new(ThresholdConfig::strict())
    }

    /// Get the configuration.
    pub fn config(&self) -> &ThresholdConfig {
        &self.config
    }

    /// Categorize a glucose value in mg/dL.
    pub fn evaluate(&self, mg_dl: u16) -> GlucoseRange {
        if mg_dl < self.config.low_below {
            GlucoseRange::Low
        } else if mg_dl > self.config.high_above {
            GlucoseRange::High
        } else {
            GlucoseRange::InRange
        }
    }

    /// Categorize a reading.
    pub fn evaluate_reading(&self, reading: &Reading) -> GlucoseRange {
        self.evaluate(reading.value)
    }

    /// First forecast point that leaves the target range, if any.
    pub fn first_excursion(&self, forecast: &ForecastSet) -> Option<(u16, GlucoseRange)> {
        forecast.iter().find_map(|p| match self.evaluate(p.predicted_value) {
            GlucoseRange::InRange => None,
            range => Some((p.offset_minutes, range)),
        })
    }
}
