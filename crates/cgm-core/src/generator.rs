//! Synthetic reading and forecast generation.
//!
//! Readings follow a bounded random walk: each tick moves the previous value
//! by a uniform step in `[-10, +10]` mg/dL and classifies the change as a
//! [`Trend`]. Every reading carries a four-point [`ForecastSet`] projected
//! 15, 30, 45 and 60 minutes ahead, drifting in the direction of the trend
//! while confidence decays by 8 points per step.
//!
//! The generator is synchronous and pure apart from its injected
//! [`RandomSource`]; the session decides when it runs.

use cgm_types::{
    DeviceDescriptor, FORECAST_LEN, FORECAST_STEP_MINUTES, ForecastPoint, ForecastSet, Reading,
    Trend, clamp_confidence, clamp_glucose,
};
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::events::SessionUpdate;
use crate::random::RandomSource;

/// Value assumed when there is no previous reading.
pub const BASELINE_MG_DL: f64 = 120.0;

/// Half-width of the uniform spread applied to the seed reading.
pub const SEED_SPREAD_MG_DL: f64 = 20.0;

/// Half-width of the uniform step between consecutive readings.
pub const STEP_SPREAD_MG_DL: f64 = 10.0;

/// Half-width of the noise added to every forecast step.
pub const FORECAST_NOISE_MG_DL: f64 = 2.5;

/// Per-step drift applied to forecasts of a rising or falling reading.
pub const TREND_SLOPE_MG_DL: f64 = 2.0;

const CONFIDENCE_START: i32 = 95;
const CONFIDENCE_DECAY_PER_STEP: i32 = 8;

/// Confidence for the `step`-th forecast point (1-based): `max(60, 95 - 8*step)`.
///
/// ```
/// use cgm_core::generator::confidence_at;
///
/// assert_eq!(confidence_at(1), 87);
/// assert_eq!(confidence_at(4), 63);
/// assert_eq!(confidence_at(10), 60);
/// ```
pub fn confidence_at(step: usize) -> u8 {
    let step = i32::try_from(step).unwrap_or(i32::MAX);
    clamp_confidence(CONFIDENCE_START.saturating_sub(CONFIDENCE_DECAY_PER_STEP.saturating_mul(step)))
}

/// Per-step drift for a trend.
pub fn trend_factor(trend: Trend) -> f64 {
    match trend {
        Trend::Rising => TREND_SLOPE_MG_DL,
        Trend::Falling => -TREND_SLOPE_MG_DL,
        Trend::Stable => 0.0,
    }
}

/// Produces readings and forecasts from an injected random source.
pub struct ReadingGenerator {
    rng: Box<dyn RandomSource>,
}

impl std::fmt::Debug for ReadingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingGenerator").finish_non_exhaustive()
    }
}

impl ReadingGenerator {
    /// Create a generator drawing from `rng`.
    pub fn new(rng: impl RandomSource + 'static) -> Self {
        Self { rng: Box::new(rng) }
    }

    /// Synthesize the first reading of a session: `round(120 + uniform(-20, 20))`,
    /// trend stable, together with its forecast.
    pub fn seed(&mut self, device: &DeviceDescriptor, now: OffsetDateTime) -> SessionUpdate {
        let offset = self.rng.uniform(-SEED_SPREAD_MG_DL, SEED_SPREAD_MG_DL);
        let value = checked_glucose(BASELINE_MG_DL + offset, "seed");
        let reading = Reading::new(value, now, Trend::Stable, device.name.as_str());
        debug!(value, device = %device.id, "Seeded reading");
        self.publishable(reading)
    }

    /// Produce the next reading and its forecast.
    ///
    /// `previous` is the last reading of the session; 120 mg/dL is assumed
    /// when there is none.
    pub fn tick(
        &mut self,
        previous: Option<&Reading>,
        device_name: &str,
        now: OffsetDateTime,
    ) -> SessionUpdate {
        let reading = self.next_reading(previous, device_name, now);
        self.publishable(reading)
    }

    /// Produce the next reading of the random walk.
    pub fn next_reading(
        &mut self,
        previous: Option<&Reading>,
        device_name: &str,
        now: OffsetDateTime,
    ) -> Reading {
        let prev = previous.map_or(BASELINE_MG_DL, |r| f64::from(r.value));
        let delta = self.rng.uniform(-STEP_SPREAD_MG_DL, STEP_SPREAD_MG_DL);
        let next = checked_glucose(prev + delta, "reading");
        let trend = Trend::from_delta(i32::from(next) - prev.round() as i32);
        Reading::new(next, now, trend, device_name)
    }

    /// Project four points ahead of `reading`.
    pub fn forecast(&mut self, reading: &Reading) -> ForecastSet {
        let drift = trend_factor(reading.trend);
        let mut value = reading.value;
        let points: [ForecastPoint; FORECAST_LEN] = std::array::from_fn(|i| {
            let step = i + 1;
            let noise = self.rng.uniform(-FORECAST_NOISE_MG_DL, FORECAST_NOISE_MG_DL);
            value = checked_glucose(f64::from(value) + drift + noise, "forecast");
            let offset_minutes = FORECAST_STEP_MINUTES * step as u16;
            ForecastPoint {
                offset_minutes,
                predicted_value: value,
                confidence_percent: confidence_at(step),
                predicted_at: reading.timestamp
                    + time::Duration::minutes(i64::from(offset_minutes)),
            }
        });
        ForecastSet::new(points)
    }

    fn publishable(&mut self, reading: Reading) -> SessionUpdate {
        let forecast = self.forecast(&reading);
        SessionUpdate { reading, forecast }
    }
}

fn checked_glucose(raw: f64, stage: &'static str) -> u16 {
    if !raw.is_finite() {
        warn!(stage, raw, "Non-finite glucose value, clamping");
    }
    clamp_glucose(raw)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::random::SeededRandom;
    use cgm_types::{MAX_GLUCOSE_MG_DL, MIN_GLUCOSE_MG_DL};
    use proptest::prelude::*;

    proptest! {
        /// A long random walk never leaves the glucose range and every
        /// forecast it produces is well formed.
        #[test]
        fn random_walk_stays_in_range(seed: u64, ticks in 1usize..200) {
            let mut generator = ReadingGenerator::new(SeededRandom::new(seed));
            let mut last: Option<Reading> = None;
            for _ in 0..ticks {
                let update = generator.tick(last.as_ref(), "Dexcom G7", OffsetDateTime::UNIX_EPOCH);
                prop_assert!((MIN_GLUCOSE_MG_DL..=MAX_GLUCOSE_MG_DL).contains(&update.reading.value));
                prop_assert!(update.forecast.is_well_formed());
                if let Some(prev) = &last {
                    prop_assert_eq!(update.reading.trend, Trend::between(prev.value, update.reading.value));
                }
                last = Some(update.reading);
            }
        }
    }
}
