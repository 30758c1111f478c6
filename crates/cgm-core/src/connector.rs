//! The connect step of a session.
//!
//! A [`Connector`] performs whatever is needed to reach a device before
//! readings start. [`SimulatedConnector`] just waits and always succeeds.
//! [`MockConnector`] supports failure injection and latency simulation for
//! tests.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use cgm_types::DeviceDescriptor;

use crate::error::ConnectionFailureReason;

/// Establishes a connection to a device.
///
/// Implementations must be cancel-safe: the session drops the future when a
/// `disconnect` arrives mid-connect.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect to `device`.
    async fn connect(&self, device: &DeviceDescriptor) -> Result<(), ConnectionFailureReason>;
}

/// Waits for a fixed delay, then reports success.
#[derive(Debug, Clone, Copy)]
pub struct SimulatedConnector {
    delay: Duration,
}

impl SimulatedConnector {
    /// Create a connector with the given delay.
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// The configured delay.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedConnector {
    fn default() -> Self {
        Self::new(crate::settings::DEFAULT_CONNECT_DELAY)
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    async fn connect(&self, device: &DeviceDescriptor) -> Result<(), ConnectionFailureReason> {
        debug!("Simulating connection to {} ({:?})", device.id, self.delay);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

/// A connector for testing failure paths.
///
/// # Example
///
/// ```
/// use cgm_core::connector::{Connector, MockConnector};
/// use cgm_core::ConnectionFailureReason;
/// use cgm_types::DeviceDescriptor;
///
/// #[tokio::main]
/// async fn main() {
///     let connector = MockConnector::new();
///     connector.set_transient_failures(1);
///
///     let device = DeviceDescriptor::new("libre-3", "FreeStyle Libre 3", "Abbott");
///     assert!(connector.connect(&device).await.is_err());
///     assert!(connector.connect(&device).await.is_ok());
///     assert_eq!(connector.attempts(), 2);
/// }
/// ```
#[derive(Debug)]
pub struct MockConnector {
    /// Simulated connect latency in milliseconds (0 = no delay).
    latency_ms: AtomicU64,
    should_fail: AtomicBool,
    failure: RwLock<ConnectionFailureReason>,
    /// Number of attempts to fail before succeeding.
    remaining_failures: AtomicU32,
    attempts: AtomicU32,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    /// Create a connector that succeeds immediately.
    pub fn new() -> Self {
        Self {
            latency_ms: AtomicU64::new(0),
            should_fail: AtomicBool::new(false),
            failure: RwLock::new(ConnectionFailureReason::DeviceUnavailable),
            remaining_failures: AtomicU32::new(0),
            attempts: AtomicU32::new(0),
        }
    }

    /// Create a connector that always fails with `reason`.
    pub fn failing(reason: ConnectionFailureReason) -> Self {
        Self {
            should_fail: AtomicBool::new(true),
            failure: RwLock::new(reason),
            ..Self::new()
        }
    }

    /// Make every following attempt fail (or succeed again).
    pub async fn set_should_fail(&self, fail: bool, reason: Option<ConnectionFailureReason>) {
        self.should_fail.store(fail, Ordering::Relaxed);
        if let Some(reason) = reason {
            *self.failure.write().await = reason;
        }
    }

    /// Fail the next `count` attempts, then succeed.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_failures.store(count, Ordering::Relaxed);
    }

    /// Set simulated connect latency.
    ///
    /// Set to `Duration::ZERO` to disable latency simulation.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of connect attempts seen so far.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, _device: &DeviceDescriptor) -> Result<(), ConnectionFailureReason> {
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let latency = self.latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.remaining_failures.load(Ordering::Relaxed) > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(self.failure.read().await.clone());
        }

        if self.should_fail.load(Ordering::Relaxed) {
            Err(self.failure.read().await.clone())
        } else {
            Ok(())
        }
    }
}
