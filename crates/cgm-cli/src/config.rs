//! Configuration file management.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use cgm_core::{
    DEFAULT_CONNECT_DELAY, DEFAULT_TICK_PERIOD, DeviceCatalog, DeviceDescriptor, GlucoseUnit,
    SessionConfig, ThresholdConfig,
};

/// Configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default device id or name
    #[serde(default)]
    pub device: Option<String>,

    /// Display unit ("mg/dL" or "mmol/L")
    #[serde(default)]
    pub unit: Option<GlucoseUnit>,

    /// Disable colored output
    #[serde(default)]
    pub no_color: bool,

    /// Milliseconds between readings
    #[serde(default)]
    pub interval_ms: Option<u64>,

    /// Simulated connection delay in milliseconds
    #[serde(default)]
    pub connect_delay_ms: Option<u64>,

    /// Connection timeout in milliseconds
    #[serde(default)]
    pub connect_timeout_ms: Option<u64>,

    /// Seed for reproducible readings
    #[serde(default)]
    pub seed: Option<u64>,

    /// Glucose range thresholds in mg/dL
    #[serde(default)]
    pub thresholds: ThresholdConfig,

    /// Extra devices appended to the built-in catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub devices: Vec<DeviceDescriptor>,
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cgm")
            .join("config.toml")
    }

    /// Load config from file, or return default if not found
    pub fn load(path: &Path) -> Self {
        if path.exists() {
            match fs::read_to_string(path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        eprintln!("Warning: Failed to parse config: {}", e);
                    }
                },
                Err(e) => {
                    eprintln!("Warning: Failed to read config: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    /// A config with every default spelled out, for `config init`.
    pub fn template() -> Self {
        Self {
            device: DeviceCatalog::builtin().first().map(|d| d.id.clone()),
            unit: Some(GlucoseUnit::MgDl),
            interval_ms: Some(DEFAULT_TICK_PERIOD.as_millis() as u64),
            connect_delay_ms: Some(DEFAULT_CONNECT_DELAY.as_millis() as u64),
            ..Self::default()
        }
    }

    /// The built-in catalog plus any devices listed in the config.
    pub fn catalog(&self) -> Result<DeviceCatalog> {
        let mut catalog = DeviceCatalog::builtin();
        for device in &self.devices {
            catalog
                .add(device.clone())
                .with_context(|| format!("Invalid device '{}' in config", device.id))?;
        }
        Ok(catalog)
    }
}

/// Command-line overrides for session timing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimingOverrides {
    pub interval_ms: Option<u64>,
    pub connect_delay_ms: Option<u64>,
    pub connect_timeout_ms: Option<u64>,
}

/// Build session options: command-line values win over config, then defaults.
pub fn resolve_session_config(overrides: TimingOverrides, config: &Config) -> SessionConfig {
    let mut session = SessionConfig::new();
    if let Some(ms) = overrides.interval_ms.or(config.interval_ms) {
        session = session.tick_period(Duration::from_millis(ms));
    }
    if let Some(ms) = overrides.connect_delay_ms.or(config.connect_delay_ms) {
        session = session.connect_delay(Duration::from_millis(ms));
    }
    if let Some(ms) = overrides.connect_timeout_ms.or(config.connect_timeout_ms) {
        session = session.connect_timeout(Duration::from_millis(ms));
    }
    session
}

/// Resolve device from arg, env var, or config.
pub fn resolve_device(device: Option<String>, config: &Config) -> Option<String> {
    device.or_else(|| config.device.clone())
}

/// Resolve seed: command line first, then config.
pub fn resolve_seed(seed: Option<u64>, config: &Config) -> Option<u64> {
    seed.or(config.seed)
}
