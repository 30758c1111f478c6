//! Session event system for state changes and generated readings.
//!
//! This module provides an event-based system for receiving notifications
//! about connection state transitions and newly generated readings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use cgm_types::{ConnectionState, DeviceDescriptor, ForecastSet, Reading};

use crate::error::ConnectionFailureReason;

/// A reading together with the forecast computed from it.
///
/// Every published update pairs exactly one reading with exactly one
/// forecast set; sets are never merged across ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUpdate {
    /// The newly generated reading.
    pub reading: Reading,
    /// Projections computed from `reading`.
    pub forecast: ForecastSet,
}

/// Synchronous consumer callback, invoked for the seed reading and every tick.
///
/// Callbacks run while the session state is locked: they must return
/// quickly and must not call back into the session.
pub type UpdateCallback = Arc<dyn Fn(&SessionUpdate) + Send + Sync>;

/// Why a session left its previous state.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new reasons
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
#[non_exhaustive]
pub enum TransitionCause {
    /// A `connect` command was accepted.
    ConnectRequested,
    /// The connect step finished successfully.
    ConnectSucceeded,
    /// The connect step failed.
    ConnectFailed(String),
    /// A `disconnect` command was issued.
    UserRequested,
}

impl From<&ConnectionFailureReason> for TransitionCause {
    fn from(reason: &ConnectionFailureReason) -> Self {
        Self::ConnectFailed(reason.to_string())
    }
}

/// Events emitted by a session.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum SessionEvent {
    /// The connection state changed.
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
        device: Option<DeviceDescriptor>,
        cause: TransitionCause,
    },
    /// A reading and its forecast were generated.
    Update(SessionUpdate),
}

/// Sender for session events.
pub type EventSender = broadcast::Sender<SessionEvent>;

/// Receiver for session events.
pub type EventReceiver = broadcast::Receiver<SessionEvent>;

/// Event dispatcher for sending events to multiple receivers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a new event dispatcher.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event. Never blocks; dropped when nobody is listening.
    pub fn send(&self, event: SessionEvent) {
        let _ = self.sender.send(event);
    }

    /// Get the number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
