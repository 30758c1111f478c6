//! Session timing and buffering options.

use std::time::Duration;

use crate::error::{Error, Result};

/// Default simulated connection delay.
pub const DEFAULT_CONNECT_DELAY: Duration = Duration::from_millis(2000);

/// Default period between generated readings.
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(60_000);

/// Options for a [`DeviceSession`](crate::DeviceSession).
///
/// Use the builder-style setters for convenient configuration:
///
/// ```
/// use std::time::Duration;
/// use cgm_core::SessionConfig;
///
/// let config = SessionConfig::new()
///     .tick_period(Duration::from_secs(5))
///     .connect_timeout(Duration::from_secs(10));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Duration of the simulated connect step.
    /// Default: 2 seconds.
    pub connect_delay: Duration,
    /// Interval between generated readings.
    /// Default: 60 seconds.
    pub tick_period: Duration,
    /// Abort the connect step after this long. `None` (default) waits
    /// for the connector indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Capacity of the broadcast event channel.
    /// Default: 100 events.
    pub event_capacity: usize,
    /// Buffer size for update streams. Updates are dropped when a stream
    /// consumer falls this far behind.
    /// Default: 16 updates.
    pub update_buffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_delay: DEFAULT_CONNECT_DELAY,
            tick_period: DEFAULT_TICK_PERIOD,
            connect_timeout: None,
            event_capacity: 100,
            update_buffer: 16,
        }
    }
}

impl SessionConfig {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the simulated connection delay.
    #[must_use]
    pub fn connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Set the tick period.
    #[must_use]
    pub fn tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    /// Set a connect timeout.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Set the event channel capacity.
    #[must_use]
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Set the update stream buffer size.
    #[must_use]
    pub fn update_buffer(mut self, size: usize) -> Self {
        self.update_buffer = size;
        self
    }

    /// Validate the options and return an error if invalid.
    ///
    /// Checks that:
    /// - `tick_period` is > 0
    /// - `connect_timeout`, when set, is > 0
    /// - `event_capacity` and `update_buffer` are > 0
    pub fn validate(&self) -> Result<()> {
        if self.tick_period.is_zero() {
            return Err(Error::invalid_config("tick_period must be > 0"));
        }
        if self.connect_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::invalid_config("connect_timeout must be > 0"));
        }
        if self.event_capacity == 0 {
            return Err(Error::invalid_config("event_capacity must be > 0"));
        }
        if self.update_buffer == 0 {
            return Err(Error::invalid_config("update_buffer must be > 0"));
        }
        Ok(())
    }
}
