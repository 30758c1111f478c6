//! Error types for cgm-core.
//!
//! This module defines the errors the session engine reports to callers.
//!
//! # Error Classes
//!
//! | Error Type | Surfaced as | Core state |
//! |------------|-------------|------------|
//! | [`Error::StateViolation`] | `Err` from the command | Unchanged |
//! | Connection failure | `Ok(ConnectOutcome::Failed)` + state `error` | Device and reading cleared |
//! | [`Error::InvalidDevice`] | `Err` from `connect` | Unchanged |
//! | [`Error::InvalidConfig`] | `Err` from construction | No session built |
//!
//! Connection failures are deliberately *not* `Err` values: a failed connect is
//! an expected outcome that moves the session into
//! [`ConnectionState::Error`](cgm_types::ConnectionState::Error). Callers
//! observe it through the returned [`ConnectOutcome`](crate::ConnectOutcome),
//! [`DeviceSession::current_state`](crate::DeviceSession::current_state), or a
//! [`SessionEvent::StateChanged`](crate::SessionEvent::StateChanged)
//! notification.
//!
//! Reconnection is never automatic. After an error, issue a new `connect`.
//!
//! ## Example
//!
//! ```ignore
//! use cgm_core::{ConnectOutcome, DeviceSession, Error};
//!
//! match session.connect(device).await {
//!     Ok(ConnectOutcome::Connected) => println!("streaming"),
//!     Ok(ConnectOutcome::Failed(reason)) => eprintln!("connection error: {reason}"),
//!     Ok(ConnectOutcome::Cancelled) => eprintln!("disconnected while connecting"),
//!     Err(Error::StateViolation { .. }) => eprintln!("already connected"),
//!     Err(e) => return Err(e),
//! }
//! ```

use std::time::Duration;

use cgm_types::ConnectionState;
use thiserror::Error;

/// Errors that can occur when driving a CGM session.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// Operation is not allowed in the current connection state.
    #[error("Cannot {operation} while {state}")]
    StateViolation {
        /// The rejected operation.
        operation: &'static str,
        /// The state the session was in.
        state: ConnectionState,
    },

    /// The device descriptor failed validation.
    #[error("Invalid device: {0}")]
    InvalidDevice(#[from] cgm_types::ValidationError),

    /// No device with the given identifier exists in the catalog.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Structured reasons for connection failures.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConnectionFailureReason {
    /// The connect step did not finish within the configured timeout.
    Timeout(Duration),
    /// Device rejected the connection.
    Rejected,
    /// Device is not reachable.
    DeviceUnavailable,
    /// Other/unknown error.
    Other(String),
}

impl std::fmt::Display for ConnectionFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout(after) => write!(f, "connection timed out after {:?}", after),
            Self::Rejected => write!(f, "connection rejected by device"),
            Self::DeviceUnavailable => write!(f, "device unavailable"),
            Self::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl Error {
    /// Create a state violation error.
    pub fn state_violation(operation: &'static str, state: ConnectionState) -> Self {
        Self::StateViolation { operation, state }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Create a device not found error for a specific identifier.
    pub fn device_not_found(identifier: impl Into<String>) -> Self {
        Self::DeviceNotFound(identifier.into())
    }
}

/// Result type alias using cgm-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;
