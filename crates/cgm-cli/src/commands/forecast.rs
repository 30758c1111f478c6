//! Forecast command implementation.
//!
//! Runs the forecast half of the generator once, from a reading supplied on
//! the command line.

use anyhow::Result;
use time::OffsetDateTime;
use tracing::debug;

use cgm_core::{Reading, ReadingGenerator, SeededRandom, Trend};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_forecast_csv, format_forecast_json, format_forecast_text};
use crate::util::write_output;

/// Device name stamped on readings entered by hand.
const MANUAL_DEVICE_NAME: &str = "manual";

/// Arguments for the forecast command.
pub struct ForecastArgs<'a> {
    pub value: u16,
    pub trend: Trend,
    pub seed: Option<u64>,
    pub format: OutputFormat,
    pub opts: &'a FormatOptions,
}

pub fn cmd_forecast(args: ForecastArgs<'_>) -> Result<()> {
    let ForecastArgs {
        value,
        trend,
        seed,
        format,
        opts,
    } = args;

    let rng = seed.map_or_else(SeededRandom::from_entropy, SeededRandom::new);
    let mut generator = ReadingGenerator::new(rng);
    let reading = Reading::new(value, OffsetDateTime::now_utc(), trend, MANUAL_DEVICE_NAME);
    if reading.value != value {
        debug!("Clamped input {} to {} mg/dL", value, reading.value);
    }
    let forecast = generator.forecast(&reading);

    let content = match format {
        OutputFormat::Json => format_forecast_json(&reading, &forecast, opts)?,
        OutputFormat::Csv => format_forecast_csv(&forecast, opts),
        OutputFormat::Text => format_forecast_text(&reading, &forecast, opts),
    };
    write_output(&content)
}
