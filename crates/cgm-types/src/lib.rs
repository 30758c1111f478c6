//! Platform-agnostic types for simulated continuous glucose monitors.
//!
//! This crate provides the shared data model used by the session engine
//! (cgm-core) and its consumers (cgm-cli).
//!
//! # Features
//!
//! - Device identity and connection lifecycle states
//! - Glucose readings with trend classification
//! - Fixed-length forecast sets with decaying confidence
//! - Range clamping and unit conversion helpers
//!
//! # Example
//!
//! ```
//! use cgm_types::{Trend, clamp_glucose};
//!
//! assert_eq!(Trend::between(120, 128), Trend::Rising);
//! assert_eq!(clamp_glucose(301.2), 300);
//! ```

pub mod error;
pub mod types;

pub use error::{ValidationError, ValidationResult};
pub use types::{
    Accuracy, ConnectionState, DeviceDescriptor, FORECAST_LEN, FORECAST_STEP_MINUTES,
    ForecastPoint, ForecastSet, GlucoseUnit, MAX_CONFIDENCE_PERCENT, MAX_GLUCOSE_MG_DL,
    MG_DL_PER_MMOL_L, MIN_CONFIDENCE_PERCENT, MIN_GLUCOSE_MG_DL, Reading,
    TREND_THRESHOLD_MG_DL, Trend, clamp_confidence, clamp_glucose,
};
