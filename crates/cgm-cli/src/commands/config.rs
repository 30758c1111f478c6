//! Config command implementation.

use std::path::Path;

use anyhow::{Context, Result, bail};

use crate::cli::ConfigAction;
use crate::config::Config;
use crate::util::write_output;

pub fn cmd_config(action: ConfigAction, path: &Path, quiet: bool) -> Result<()> {
    match action {
        ConfigAction::Path => write_output(&format!("{}\n", path.display())),
        ConfigAction::Show => {
            let config = Config::load(path);
            let content = toml::to_string_pretty(&config).context("Failed to serialize config")?;
            write_output(&content)
        }
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                bail!(
                    "Config already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Config::template().save(path)?;
            if !quiet {
                eprintln!("Wrote default config to {}", path.display());
            }
            Ok(())
        }
    }
}
