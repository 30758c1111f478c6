//! Output formatting utilities for text, JSON, and CSV output.

use anyhow::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use cgm_core::{
    ConnectionState, DeviceCatalog, DeviceDescriptor, ForecastPoint, ForecastSet, GlucoseRange,
    GlucoseUnit, Reading, SessionUpdate, Thresholds, Trend,
};

/// Formatting options for output.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatOptions {
    /// Disable colored output.
    pub no_color: bool,
    /// Display unit for glucose values.
    pub unit: GlucoseUnit,
    /// Omit header row in CSV output.
    pub no_header: bool,
    /// Use compact JSON output (no pretty-printing).
    pub compact: bool,
    /// Range thresholds used for color coding.
    pub thresholds: Thresholds,
}

impl FormatOptions {
    pub fn new(no_color: bool, unit: GlucoseUnit) -> Self {
        Self {
            no_color,
            unit,
            ..Self::default()
        }
    }

    /// Create with no_header option for CSV output.
    pub fn with_no_header(mut self, no_header: bool) -> Self {
        self.no_header = no_header;
        self
    }

    /// Create with compact JSON option.
    pub fn with_compact(mut self, compact: bool) -> Self {
        self.compact = compact;
        self
    }

    /// Create with custom range thresholds.
    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Serialize value to JSON string, respecting compact option.
    pub fn as_json<T: serde::Serialize>(&self, value: &T) -> Result<String> {
        let json = if self.compact {
            serde_json::to_string(value)?
        } else {
            serde_json::to_string_pretty(value)?
        };
        Ok(json + "\n")
    }

    /// Format a glucose value with its unit label.
    #[must_use]
    pub fn format_glucose(&self, mg_dl: u16) -> String {
        format!("{} {}", self.unit.format_value(mg_dl), self.unit.label())
    }

    /// Format a glucose value colored by its range.
    #[must_use]
    pub fn format_glucose_colored(&self, mg_dl: u16) -> String {
        let text = self.format_glucose(mg_dl);
        if self.no_color {
            return text;
        }
        match self.thresholds.evaluate(mg_dl) {
            GlucoseRange::Low => text.red().bold().to_string(),
            GlucoseRange::InRange => text.green().to_string(),
            GlucoseRange::High => text.yellow().bold().to_string(),
        }
    }

    /// CSV column name for glucose values.
    #[must_use]
    pub fn glucose_csv_header(&self) -> &'static str {
        match self.unit {
            GlucoseUnit::MgDl => "mg_dl",
            GlucoseUnit::MmolL => "mmol_l",
        }
    }
}

/// Escape a string for CSV output.
/// Wraps the value in quotes if it contains commas, quotes, or newlines.
/// Double quotes are escaped by doubling them.
#[must_use]
pub fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Format a timestamp as RFC 3339.
#[must_use]
pub fn format_timestamp(ts: OffsetDateTime) -> String {
    ts.format(&Rfc3339).unwrap_or_else(|_| "???".to_string())
}

/// Format a range label with color
#[must_use]
pub fn format_range(range: GlucoseRange, no_color: bool) -> String {
    let label = match range {
        GlucoseRange::Low => "LOW",
        GlucoseRange::InRange => "IN RANGE",
        GlucoseRange::High => "HIGH",
    };

    if no_color {
        format!("[{}]", label)
    } else {
        match range {
            GlucoseRange::Low => format!("[{}]", label.red()),
            GlucoseRange::InRange => format!("[{}]", label.green()),
            GlucoseRange::High => format!("[{}]", label.yellow()),
        }
    }
}

/// Format a trend arrow with color
#[must_use]
pub fn format_trend(trend: Trend, no_color: bool) -> String {
    let arrow = trend.arrow();
    if no_color {
        return arrow.to_string();
    }
    match trend {
        Trend::Rising => arrow.yellow().to_string(),
        Trend::Falling => arrow.cyan().to_string(),
        Trend::Stable => arrow.dimmed().to_string(),
    }
}

/// Format a connection state label with color
#[must_use]
pub fn format_state(state: ConnectionState, no_color: bool) -> String {
    let label = state.status_label();
    if no_color {
        return label.to_string();
    }
    match state {
        ConnectionState::Connected => label.green().to_string(),
        ConnectionState::Connecting => label.yellow().to_string(),
        ConnectionState::Error => label.red().to_string(),
        ConnectionState::Disconnected => label.dimmed().to_string(),
    }
}

// ============================================================================
// Device formatting
// ============================================================================

#[must_use]
pub fn format_devices_text(catalog: &DeviceCatalog, opts: &FormatOptions) -> String {
    let mut output = format!("{} device(s) available:\n\n", catalog.len());
    let id_width = catalog.iter().map(|d| d.id.len()).max().unwrap_or(0);
    for device in catalog.iter() {
        let id = format!("{:<width$}", device.id, width = id_width);
        if opts.no_color {
            output.push_str(&format!("  {}  {}\n", id, device));
        } else {
            output.push_str(&format!(
                "  {}  {} ({})\n",
                id.cyan(),
                device.name.bold(),
                device.manufacturer.dimmed()
            ));
        }
    }
    output
}

pub fn format_devices_json(catalog: &DeviceCatalog, opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct DeviceList<'a> {
        count: usize,
        devices: Vec<&'a DeviceDescriptor>,
    }

    opts.as_json(&DeviceList {
        count: catalog.len(),
        devices: catalog.iter().collect(),
    })
}

#[must_use]
pub fn format_devices_csv(catalog: &DeviceCatalog, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        "id,name,manufacturer\n".to_string()
    };
    for device in catalog.iter() {
        output.push_str(&format!(
            "{},{},{}\n",
            csv_escape(&device.id),
            csv_escape(&device.name),
            csv_escape(&device.manufacturer)
        ));
    }
    output
}

// ============================================================================
// Update formatting (watch)
// ============================================================================

/// Format one update as a single line: reading, range, then the forecast.
#[must_use]
pub fn format_update_line(update: &SessionUpdate, opts: &FormatOptions) -> String {
    let reading = &update.reading;
    let range = opts.thresholds.evaluate_reading(reading);

    let forecast = update
        .forecast
        .iter()
        .map(|p| format!("+{}m {}", p.offset_minutes, opts.unit.format_value(p.predicted_value)))
        .collect::<Vec<_>>()
        .join("  ");

    let parts = [
        format_timestamp(reading.timestamp),
        opts.format_glucose_colored(reading.value),
        format_trend(reading.trend, opts.no_color),
        format_range(range, opts.no_color),
        forecast,
    ];
    parts.join("  ") + "\n"
}

/// JSON shape of one update.
#[derive(Debug, Serialize)]
struct UpdateJson<'a> {
    #[serde(flatten)]
    update: &'a SessionUpdate,
    range: GlucoseRange,
    unit: GlucoseUnit,
    display_value: f64,
}

pub fn format_update_json(update: &SessionUpdate, opts: &FormatOptions) -> Result<String> {
    opts.as_json(&UpdateJson {
        update,
        range: opts.thresholds.evaluate_reading(&update.reading),
        unit: opts.unit,
        display_value: round_display(opts.unit.convert(update.reading.value)),
    })
}

/// Get the CSV header for watch output.
#[must_use]
pub fn format_update_csv_header(opts: &FormatOptions) -> String {
    let unit = opts.glucose_csv_header();
    format!(
        "timestamp,device,{unit},trend,range,forecast_15_{unit},forecast_30_{unit},forecast_45_{unit},forecast_60_{unit}\n"
    )
}

/// Format an update as a CSV line (no header).
#[must_use]
pub fn format_update_csv_line(update: &SessionUpdate, opts: &FormatOptions) -> String {
    let reading = &update.reading;
    let forecast = update
        .forecast
        .iter()
        .map(|p| opts.unit.format_value(p.predicted_value))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{},{},{},{},{},{}\n",
        format_timestamp(reading.timestamp),
        csv_escape(&reading.device_name),
        opts.unit.format_value(reading.value),
        reading.trend,
        opts.thresholds.evaluate_reading(reading).description(),
        forecast
    )
}

// ============================================================================
// Forecast formatting
// ============================================================================

#[must_use]
pub fn format_forecast_text(reading: &Reading, forecast: &ForecastSet, opts: &FormatOptions) -> String {
    let mut output = format!(
        "Current: {} {}\n\n",
        opts.format_glucose_colored(reading.value),
        format_trend(reading.trend, opts.no_color)
    );

    let header = format!(
        "{:>7}  {:>12}  {:>10}  {}",
        "Offset", "Predicted", "Confidence", "At"
    );
    if opts.no_color {
        output.push_str(&header);
    } else {
        output.push_str(&header.bold().to_string());
    }
    output.push('\n');

    for point in forecast {
        output.push_str(&format_forecast_row(point, opts));
    }

    if let Some((offset, range)) = opts.thresholds.first_excursion(forecast) {
        output.push_str(&format!(
            "\nProjected {} within {} min\n",
            format_range(range, opts.no_color),
            offset
        ));
    }
    output
}

fn format_forecast_row(point: &ForecastPoint, opts: &FormatOptions) -> String {
    let predicted = format!("{:>12}", opts.format_glucose(point.predicted_value));
    let predicted = if opts.no_color {
        predicted
    } else {
        match opts.thresholds.evaluate(point.predicted_value) {
            GlucoseRange::Low => predicted.red().to_string(),
            GlucoseRange::InRange => predicted.green().to_string(),
            GlucoseRange::High => predicted.yellow().to_string(),
        }
    };
    format!(
        "{:>5} m  {}  {:>9}%  {}\n",
        point.offset_minutes,
        predicted,
        point.confidence_percent,
        format_timestamp(point.predicted_at)
    )
}

pub fn format_forecast_json(reading: &Reading, forecast: &ForecastSet, opts: &FormatOptions) -> Result<String> {
    #[derive(Serialize)]
    struct ForecastJson<'a> {
        reading: &'a Reading,
        forecast: &'a ForecastSet,
        unit: GlucoseUnit,
    }

    opts.as_json(&ForecastJson {
        reading,
        forecast,
        unit: opts.unit,
    })
}

#[must_use]
pub fn format_forecast_csv(forecast: &ForecastSet, opts: &FormatOptions) -> String {
    let mut output = if opts.no_header {
        String::new()
    } else {
        format!(
            "offset_minutes,predicted_{},confidence_percent,predicted_at\n",
            opts.glucose_csv_header()
        )
    };
    for point in forecast {
        output.push_str(&format!(
            "{},{},{},{}\n",
            point.offset_minutes,
            opts.unit.format_value(point.predicted_value),
            point.confidence_percent,
            format_timestamp(point.predicted_at)
        ));
    }
    output
}

fn round_display(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
