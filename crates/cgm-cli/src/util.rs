//! Utility functions for CLI operations.

use std::io::{self, Write};

use anyhow::{Context, Result, bail};

use cgm_core::{DeviceCatalog, DeviceDescriptor};

/// Look up a device in the catalog, falling back to the first entry when
/// none was specified.
pub fn require_device(device: Option<&str>, catalog: &DeviceCatalog) -> Result<DeviceDescriptor> {
    match device {
        Some(identifier) => catalog.get(identifier).cloned().with_context(|| {
            format!("Run 'cgm devices' to list the {} available devices.", catalog.len())
        }),
        None => match catalog.first() {
            Some(first) => Ok(first.clone()),
            None => bail!("The device catalog is empty."),
        },
    }
}

/// Write content to stdout and flush.
pub fn write_output(content: &str) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(content.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_device_by_id() {
        let catalog = DeviceCatalog::builtin();
        let device = require_device(Some("omnipod-5"), &catalog).unwrap();
        assert_eq!(device.name, "Omnipod 5");
    }

    #[test]
    fn test_require_device_defaults_to_first() {
        let catalog = DeviceCatalog::builtin();
        assert_eq!(require_device(None, &catalog).unwrap().id, "dexcom-g7");
    }

    #[test]
    fn test_require_device_unknown() {
        let catalog = DeviceCatalog::builtin();
        let err = require_device(Some("pump-9000"), &catalog).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("cgm devices"));
        assert!(message.contains("pump-9000"));
    }
}
