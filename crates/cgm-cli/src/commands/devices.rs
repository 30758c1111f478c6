//! Devices command implementation.

use anyhow::Result;

use cgm_core::DeviceCatalog;

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_devices_csv, format_devices_json, format_devices_text};
use crate::util::write_output;

pub fn cmd_devices(catalog: &DeviceCatalog, format: OutputFormat, opts: &FormatOptions) -> Result<()> {
    let content = match format {
        OutputFormat::Json => format_devices_json(catalog, opts)?,
        OutputFormat::Csv => format_devices_csv(catalog, opts),
        OutputFormat::Text => format_devices_text(catalog, opts),
    };
    write_output(&content)
}
