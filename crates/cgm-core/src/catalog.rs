//! Catalog of supported CGM devices.
//!
//! The catalog is supplied by the caller; [`DeviceCatalog::builtin`] returns
//! the four devices the simulator ships with.

use cgm_types::DeviceDescriptor;

use crate::error::{Error, Result};

/// An ordered, duplicate-free list of device descriptors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceCatalog {
    devices: Vec<DeviceDescriptor>,
}

impl DeviceCatalog {
    /// Build a catalog from descriptors.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidDevice`] for a blank id or name, and
    /// [`Error::InvalidConfig`] when two descriptors share an id.
    pub fn new(devices: impl IntoIterator<Item = DeviceDescriptor>) -> Result<Self> {
        let mut catalog = Self {
            devices: Vec::new(),
        };
        for device in devices {
            catalog.add(device)?;
        }
        Ok(catalog)
    }

    /// The built-in catalog of simulated devices.
    pub fn builtin() -> Self {
        Self {
            devices: vec![
                DeviceDescriptor::new("dexcom-g7", "Dexcom G7", "Dexcom"),
                DeviceDescriptor::new("libre-3", "FreeStyle Libre 3", "Abbott"),
                DeviceDescriptor::new("medtronic-780g", "MiniMed 780G", "Medtronic"),
                DeviceDescriptor::new("omnipod-5", "Omnipod 5", "Insulet"),
            ],
        }
    }

    /// Append a descriptor.
    ///
    /// # Errors
    ///
    /// Same conditions as [`DeviceCatalog::new`].
    pub fn add(&mut self, device: DeviceDescriptor) -> Result<()> {
        device.validate()?;
        if self.devices.iter().any(|d| d.id == device.id) {
            return Err(Error::invalid_config(format!(
                "duplicate device id '{}'",
                device.id
            )));
        }
        self.devices.push(device);
        Ok(())
    }

    /// Look up a device by id, falling back to a case-insensitive name match.
    pub fn find(&self, identifier: &str) -> Option<&DeviceDescriptor> {
        let identifier = identifier.trim();
        self.devices
            .iter()
            .find(|d| d.id == identifier)
            .or_else(|| {
                self.devices
                    .iter()
                    .find(|d| d.name.eq_ignore_ascii_case(identifier))
            })
    }

    /// Like [`find`](Self::find), but returns an error for unknown devices.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeviceNotFound`] if nothing matches.
    pub fn get(&self, identifier: &str) -> Result<&DeviceDescriptor> {
        self.find(identifier)
            .ok_or_else(|| Error::device_not_found(identifier))
    }

    /// The first device, used when the caller names none.
    pub fn first(&self) -> Option<&DeviceDescriptor> {
        self.devices.first()
    }

    /// Iterate over the devices in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceDescriptor> {
        self.devices.iter()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Default for DeviceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
