//! Watch command implementation.
//!
//! Connects a simulated session and prints every update (the seed reading
//! first, then one per tick) until Ctrl+C or the requested count.

use anyhow::{Context, Result, bail};
use futures::StreamExt;
use owo_colors::OwoColorize;

use cgm_core::{
    ConnectOutcome, ConnectionState, DeviceDescriptor, DeviceSession, SeededRandom, SessionConfig,
};

use crate::cli::OutputFormat;
use crate::format::{
    FormatOptions, format_state, format_update_csv_header, format_update_csv_line,
    format_update_json, format_update_line,
};
use crate::util::write_output;

/// Arguments for the watch command.
pub struct WatchArgs<'a> {
    pub device: DeviceDescriptor,
    pub session: SessionConfig,
    pub seed: Option<u64>,
    pub count: u32,
    pub format: OutputFormat,
    pub quiet: bool,
    pub opts: &'a FormatOptions,
}

pub async fn cmd_watch(args: WatchArgs<'_>) -> Result<()> {
    let WatchArgs {
        device,
        session,
        seed,
        count,
        format,
        quiet,
        opts,
    } = args;

    let interval = session.tick_period;
    let mut builder = DeviceSession::builder().config(session);
    if let Some(seed) = seed {
        builder = builder.random(SeededRandom::new(seed));
    }
    let session = builder.build().context("Invalid session settings")?;
    let mut updates = session.subscribe_updates().await;

    if !quiet {
        let header = if opts.no_color {
            format!("Watching: {} ({})", device.name, device.id)
        } else {
            format!("Watching: {} ({})", device.name.green(), device.id.cyan())
        };
        eprintln!("{}", header);
        if count > 0 {
            eprintln!(
                "Interval: {:?} | Count: {} | Press Ctrl+C to stop",
                interval, count
            );
        } else {
            eprintln!("Interval: {:?} | Press Ctrl+C to stop", interval);
        }
        eprintln!("{}", format_state(ConnectionState::Connecting, opts.no_color));
    }

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nShutting down...");
            session.disconnect().await?;
            return Ok(());
        }
        outcome = session.connect(device.clone()) => outcome?,
    };

    match outcome {
        ConnectOutcome::Connected => {
            if !quiet {
                eprintln!("{}", format_state(ConnectionState::Connected, opts.no_color));
                eprintln!("{}", "-".repeat(50));
            }
        }
        ConnectOutcome::Failed(reason) => {
            bail!("Connection to {} failed: {}", device, reason);
        }
        ConnectOutcome::Cancelled => return Ok(()),
    }

    let mut header_written = opts.no_header;
    let mut readings_taken: u32 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                eprintln!("\nShutting down...");
                break;
            }
            update = updates.next() => {
                let Some(update) = update else {
                    break;
                };
                let content = match format {
                    OutputFormat::Json => format_update_json(&update, opts)?,
                    OutputFormat::Csv => {
                        let mut out = String::new();
                        if !header_written {
                            out.push_str(&format_update_csv_header(opts));
                            header_written = true;
                        }
                        out.push_str(&format_update_csv_line(&update, opts));
                        out
                    }
                    OutputFormat::Text => format_update_line(&update, opts),
                };
                write_output(&content)?;

                readings_taken += 1;
                if count > 0 && readings_taken >= count {
                    if !quiet {
                        eprintln!("Completed {} readings.", readings_taken);
                    }
                    break;
                }
            }
        }
    }

    session.disconnect().await?;
    Ok(())
}
