//! Core types for simulated CGM data.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;

/// Lowest glucose value (mg/dL) a reading or projection may carry.
pub const MIN_GLUCOSE_MG_DL: u16 = 70;

/// Highest glucose value (mg/dL) a reading or projection may carry.
pub const MAX_GLUCOSE_MG_DL: u16 = 300;

/// Lowest confidence a forecast point may report.
pub const MIN_CONFIDENCE_PERCENT: u8 = 60;

/// Highest confidence a forecast point may report.
pub const MAX_CONFIDENCE_PERCENT: u8 = 95;

/// A change larger than this (in either direction) is a trend.
pub const TREND_THRESHOLD_MG_DL: i32 = 5;

/// Spacing between forecast points, in minutes.
pub const FORECAST_STEP_MINUTES: u16 = 15;

/// Number of points in every [`ForecastSet`].
pub const FORECAST_LEN: usize = 4;

/// Conversion factor between mg/dL and mmol/L for glucose.
pub const MG_DL_PER_MMOL_L: f64 = 18.0182;

/// Round and clamp a glucose value into `[MIN_GLUCOSE_MG_DL, MAX_GLUCOSE_MG_DL]`.
///
/// NaN maps to the lower bound; infinities saturate.
///
/// ```
/// use cgm_types::clamp_glucose;
///
/// assert_eq!(clamp_glucose(120.4), 120);
/// assert_eq!(clamp_glucose(12.0), 70);
/// assert_eq!(clamp_glucose(999.0), 300);
/// ```
#[must_use]
pub fn clamp_glucose(value: f64) -> u16 {
    if value.is_nan() {
        return MIN_GLUCOSE_MG_DL;
    }
    value
        .round()
        .clamp(f64::from(MIN_GLUCOSE_MG_DL), f64::from(MAX_GLUCOSE_MG_DL)) as u16
}

/// Clamp a confidence value into `[MIN_CONFIDENCE_PERCENT, MAX_CONFIDENCE_PERCENT]`.
#[must_use]
pub fn clamp_confidence(value: i32) -> u8 {
    value.clamp(
        i32::from(MIN_CONFIDENCE_PERCENT),
        i32::from(MAX_CONFIDENCE_PERCENT),
    ) as u8
}

/// Identity of a supported CGM device.
///
/// Descriptors are immutable once built; the catalog hands out clones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceDescriptor {
    /// Stable identifier (e.g. `dexcom-g7`).
    pub id: String,
    /// Display name (e.g. `Dexcom G7`).
    pub name: String,
    /// Manufacturer name.
    pub manufacturer: String,
}

impl DeviceDescriptor {
    /// Create a new device descriptor.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        manufacturer: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            manufacturer: manufacturer.into(),
        }
    }

    /// Check that the identifier and name are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptyField`] when `id` or `name` is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyField("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::EmptyField("name"));
        }
        Ok(())
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.manufacturer)
    }
}

/// Connection lifecycle state of a CGM session.
///
/// `Disconnected` is the initial state. `Connecting` is always followed by
/// `Connected` or `Error` (or `Disconnected` if cancelled). `Connected` and
/// `Error` only ever move to `Disconnected`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ConnectionState {
    /// No device selected.
    #[default]
    Disconnected,
    /// Connection attempt in flight.
    Connecting,
    /// Device connected; readings are being produced.
    Connected,
    /// The last connection attempt failed.
    Error,
}

impl ConnectionState {
    /// Whether `connect` is allowed from this state.
    #[must_use]
    pub fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Error)
    }

    /// Human-readable status label, as shown by a status indicator.
    #[must_use]
    pub fn status_label(&self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Connecting => "Connecting...",
            Self::Connected => "Connected",
            Self::Error => "Connection Error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

impl FromStr for ConnectionState {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disconnected" => Ok(Self::Disconnected),
            "connecting" => Ok(Self::Connecting),
            "connected" => Ok(Self::Connected),
            "error" => Ok(Self::Error),
            _ => Err(ValidationError::unknown("connection state", s)),
        }
    }
}

/// Direction of glucose change between two consecutive readings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Trend {
    /// Rose by more than [`TREND_THRESHOLD_MG_DL`].
    Rising,
    /// Fell by more than [`TREND_THRESHOLD_MG_DL`].
    Falling,
    /// Changed by at most [`TREND_THRESHOLD_MG_DL`].
    #[default]
    Stable,
}

impl Trend {
    /// Classify a change in mg/dL.
    ///
    /// ```
    /// use cgm_types::Trend;
    ///
    /// assert_eq!(Trend::from_delta(8), Trend::Rising);
    /// assert_eq!(Trend::from_delta(-7), Trend::Falling);
    /// assert_eq!(Trend::from_delta(5), Trend::Stable);
    /// ```
    #[must_use]
    pub fn from_delta(delta: i32) -> Self {
        if delta > TREND_THRESHOLD_MG_DL {
            Self::Rising
        } else if delta < -TREND_THRESHOLD_MG_DL {
            Self::Falling
        } else {
            Self::Stable
        }
    }

    /// Classify the change from `previous` to `current`.
    #[must_use]
    pub fn between(previous: u16, current: u16) -> Self {
        Self::from_delta(i32::from(current) - i32::from(previous))
    }

    /// Arrow glyph for compact display.
    #[must_use]
    pub fn arrow(&self) -> &'static str {
        match self {
            Self::Rising => "↗",
            Self::Falling => "↘",
            Self::Stable => "→",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Rising => "rising",
            Self::Falling => "falling",
            Self::Stable => "stable",
        };
        f.write_str(s)
    }
}

impl FromStr for Trend {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rising" | "up" => Ok(Self::Rising),
            "falling" | "down" => Ok(Self::Falling),
            "stable" | "flat" => Ok(Self::Stable),
            _ => Err(ValidationError::unknown("trend", s)),
        }
    }
}

/// Reported accuracy of a reading. Simulated devices always report `High`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[non_exhaustive]
pub enum Accuracy {
    /// High accuracy.
    #[default]
    High,
}

impl fmt::Display for Accuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::High => f.write_str("high"),
        }
    }
}

/// Glucose display unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum GlucoseUnit {
    /// Milligrams per decilitre (native unit of every reading).
    #[default]
    #[cfg_attr(feature = "serde", serde(rename = "mg/dL"))]
    MgDl,
    /// Millimoles per litre.
    #[cfg_attr(feature = "serde", serde(rename = "mmol/L"))]
    MmolL,
}

impl GlucoseUnit {
    /// Convert a mg/dL value into this unit.
    #[must_use]
    pub fn convert(&self, mg_dl: u16) -> f64 {
        match self {
            Self::MgDl => f64::from(mg_dl),
            Self::MmolL => f64::from(mg_dl) / MG_DL_PER_MMOL_L,
        }
    }

    /// Format a mg/dL value in this unit, without the unit label.
    #[must_use]
    pub fn format_value(&self, mg_dl: u16) -> String {
        match self {
            Self::MgDl => mg_dl.to_string(),
            Self::MmolL => format!("{:.1}", self.convert(mg_dl)),
        }
    }

    /// Unit label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::MgDl => "mg/dL",
            Self::MmolL => "mmol/L",
        }
    }
}

impl fmt::Display for GlucoseUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for GlucoseUnit {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" | "mg" => Ok(Self::MgDl),
            "mmol/l" | "mmoll" | "mmol" => Ok(Self::MmolL),
            _ => Err(ValidationError::unknown("glucose unit", s)),
        }
    }
}

/// A single glucose reading produced by a (simulated) CGM.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reading {
    /// Glucose value in mg/dL, always within `[70, 300]`.
    pub value: u16,
    /// When the reading was taken.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
    /// Direction of change relative to the previous reading.
    pub trend: Trend,
    /// Name of the device that produced the reading.
    pub device_name: String,
    /// Reported accuracy.
    pub accuracy: Accuracy,
}

impl Reading {
    /// Create a reading with `High` accuracy. The value is clamped into range.
    pub fn new(
        value: u16,
        timestamp: OffsetDateTime,
        trend: Trend,
        device_name: impl Into<String>,
    ) -> Self {
        Self {
            value: value.clamp(MIN_GLUCOSE_MG_DL, MAX_GLUCOSE_MG_DL),
            timestamp,
            trend,
            device_name: device_name.into(),
            accuracy: Accuracy::High,
        }
    }

    /// Value in mmol/L.
    #[must_use]
    pub fn mmol_l(&self) -> f64 {
        GlucoseUnit::MmolL.convert(self.value)
    }
}

/// One projected glucose value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ForecastPoint {
    /// Minutes after the source reading.
    pub offset_minutes: u16,
    /// Projected glucose in mg/dL, always within `[70, 300]`.
    pub predicted_value: u16,
    /// Confidence in percent, always within `[60, 95]`.
    pub confidence_percent: u8,
    /// Absolute time of the projection (reading timestamp + offset).
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub predicted_at: OffsetDateTime,
}

/// The fixed-length forecast computed from one reading.
///
/// Points are ordered by increasing offset (15, 30, 45, 60 minutes).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ForecastSet {
    points: [ForecastPoint; FORECAST_LEN],
}

impl ForecastSet {
    /// Wrap an ordered array of points.
    #[must_use]
    pub fn new(points: [ForecastPoint; FORECAST_LEN]) -> Self {
        Self { points }
    }

    /// The points, ordered by offset.
    #[must_use]
    pub fn points(&self) -> &[ForecastPoint; FORECAST_LEN] {
        &self.points
    }

    /// Iterate over the points.
    pub fn iter(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter()
    }

    /// Predicted values, ordered by offset.
    #[must_use]
    pub fn values(&self) -> [u16; FORECAST_LEN] {
        self.points.map(|p| p.predicted_value)
    }

    /// Confidence values, ordered by offset.
    #[must_use]
    pub fn confidences(&self) -> [u8; FORECAST_LEN] {
        self.points.map(|p| p.confidence_percent)
    }

    /// The furthest projection.
    #[must_use]
    pub fn last(&self) -> &ForecastPoint {
        &self.points[FORECAST_LEN - 1]
    }

    /// Check the ordering and range rules every set must satisfy.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let in_range = self.points.iter().all(|p| {
            (MIN_GLUCOSE_MG_DL..=MAX_GLUCOSE_MG_DL).contains(&p.predicted_value)
                && (MIN_CONFIDENCE_PERCENT..=MAX_CONFIDENCE_PERCENT)
                    .contains(&p.confidence_percent)
        });
        let ordered = self.points.windows(2).all(|w| {
            w[0].offset_minutes < w[1].offset_minutes
                && w[0].confidence_percent >= w[1].confidence_percent
        });
        in_range && ordered
    }
}

impl<'a> IntoIterator for &'a ForecastSet {
    type Item = &'a ForecastPoint;
    type IntoIter = core::slice::Iter<'a, ForecastPoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}
