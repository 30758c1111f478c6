//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use cgm_types::{GlucoseUnit, Trend};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// Reusable device selection arguments
#[derive(Debug, Clone, Args)]
pub struct DeviceArgs {
    /// Device id or name from the catalog, or use CGM_DEVICE env var
    #[arg(short, long, env = "CGM_DEVICE")]
    pub device: Option<String>,
}

/// Reusable output format arguments
#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Show glucose in mmol/L (overrides --mgdl and config)
    #[arg(long, conflicts_with = "mgdl")]
    pub mmol: bool,

    /// Show glucose in mg/dL (default, overrides config)
    #[arg(long, conflicts_with = "mmol")]
    pub mgdl: bool,

    /// Omit header row in CSV output (useful for appending)
    #[arg(long)]
    pub no_header: bool,
}

impl OutputArgs {
    /// Resolve the display unit: explicit flags override config
    pub fn resolve_unit(&self, config_unit: Option<GlucoseUnit>) -> GlucoseUnit {
        if self.mmol {
            GlucoseUnit::MmolL
        } else if self.mgdl {
            GlucoseUnit::MgDl
        } else {
            config_unit.unwrap_or_default()
        }
    }
}

#[derive(Parser)]
#[command(name = "cgm")]
#[command(author, version, about = "Simulated continuous glucose monitor with short-term forecasts", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output compact JSON (no pretty-printing)
    #[arg(long, global = true)]
    pub compact: bool,

    /// Disable colored output (any non-empty NO_COLOR also disables it)
    #[arg(
        long,
        global = true,
        env = "NO_COLOR",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub no_color: bool,

    /// Use this config file instead of the default location
    #[arg(long, global = true, env = "CGM_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the devices available for simulation
    Devices {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Omit header row in CSV output (useful for appending)
        #[arg(long)]
        no_header: bool,
    },

    /// Connect a simulated device and print every reading with its forecast
    Watch {
        #[command(flatten)]
        device: DeviceArgs,

        #[command(flatten)]
        output: OutputArgs,

        /// Milliseconds between readings (default: 60000)
        #[arg(short, long, value_parser = parse_positive_ms)]
        interval_ms: Option<u64>,

        /// Simulated connection delay in milliseconds (default: 2000)
        #[arg(long)]
        connect_delay_ms: Option<u64>,

        /// Give up connecting after this many milliseconds
        #[arg(long, value_parser = parse_positive_ms)]
        connect_timeout_ms: Option<u64>,

        /// Number of readings to print before exiting (0 for unlimited)
        #[arg(short = 'n', long, default_value = "0")]
        count: u32,

        /// Seed for reproducible readings
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Compute a one-shot forecast from a given reading
    Forecast {
        /// Current glucose value in mg/dL (clamped to 70-300)
        #[arg(long, value_parser = parse_glucose)]
        value: u16,

        /// Trend of the current reading: rising, falling or stable
        #[arg(short, long, default_value = "stable")]
        trend: Trend,

        /// Seed for reproducible forecast noise
        #[arg(long)]
        seed: Option<u64>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Parse a glucose value in mg/dL
fn parse_glucose(s: &str) -> Result<u16, String> {
    let value: u16 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid glucose value", s))?;
    if value == 0 {
        return Err("Glucose value must be greater than 0".to_string());
    }
    Ok(value)
}

/// Parse a non-zero millisecond duration
fn parse_positive_ms(s: &str) -> Result<u64, String> {
    let ms: u64 = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if ms == 0 {
        return Err("Value must be greater than 0".to_string());
    }
    Ok(ms)
}
