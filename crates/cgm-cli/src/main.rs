//! `cgm`: command-line front end for the simulated CGM session engine.

mod cli;
mod commands;
mod config;
mod format;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cgm_core::Thresholds;

use crate::cli::{Cli, Commands};
use crate::commands::{ForecastArgs, WatchArgs, cmd_config, cmd_devices, cmd_forecast, cmd_watch};
use crate::config::{Config, TimingOverrides, resolve_device, resolve_seed, resolve_session_config};
use crate::format::FormatOptions;
use crate::util::require_device;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // When quiet mode is enabled, suppress info-level logging
    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path);
    config.thresholds.validate()?;

    let no_color = cli.no_color || config.no_color;
    let thresholds = Thresholds::new(config.thresholds);

    match cli.command {
        Commands::Devices { format, no_header } => {
            let opts = FormatOptions::new(no_color, Default::default())
                .with_no_header(no_header)
                .with_compact(cli.compact);
            cmd_devices(&config.catalog()?, format, &opts)?;
        }
        Commands::Watch {
            device,
            output,
            interval_ms,
            connect_delay_ms,
            connect_timeout_ms,
            count,
            seed,
        } => {
            let catalog = config.catalog()?;
            let identifier = resolve_device(device.device, &config);
            let device = require_device(identifier.as_deref(), &catalog)?;
            let session = resolve_session_config(
                TimingOverrides {
                    interval_ms,
                    connect_delay_ms,
                    connect_timeout_ms,
                },
                &config,
            );
            let opts = FormatOptions::new(no_color, output.resolve_unit(config.unit))
                .with_no_header(output.no_header)
                .with_compact(cli.compact)
                .with_thresholds(thresholds);
            cmd_watch(WatchArgs {
                device,
                session,
                seed: resolve_seed(seed, &config),
                count,
                format: output.format,
                quiet: cli.quiet,
                opts: &opts,
            })
            .await?;
        }
        Commands::Forecast {
            value,
            trend,
            seed,
            output,
        } => {
            let opts = FormatOptions::new(no_color, output.resolve_unit(config.unit))
                .with_no_header(output.no_header)
                .with_compact(cli.compact)
                .with_thresholds(thresholds);
            cmd_forecast(ForecastArgs {
                value,
                trend,
                seed: resolve_seed(seed, &config),
                format: output.format,
                opts: &opts,
            })?;
        }
        Commands::Config { action } => {
            cmd_config(action, &config_path, cli.quiet)?;
        }
    }

    Ok(())
}
