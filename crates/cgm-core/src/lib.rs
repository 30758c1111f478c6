//! Session engine for simulated continuous glucose monitors.
//!
//! This crate drives a simulated CGM connection: a connection state machine,
//! a periodic tick producing synthetic glucose readings, and a four-point
//! short-horizon forecast attached to every reading.
//!
//! # Features
//!
//! - **Session lifecycle**: connect, disconnect and state snapshots with a
//!   strict `disconnected → connecting → connected | error` state machine
//! - **Readings**: bounded random walk in 70–300 mg/dL with trend
//!   classification
//! - **Forecasts**: projections 15, 30, 45 and 60 minutes ahead with decaying
//!   confidence
//! - **Notifications**: synchronous callbacks, a broadcast event channel and
//!   an async update stream
//! - **Deterministic testing**: injectable random source, clock and connector
//!
//! # Quick Start
//!
//! ```no_run
//! use cgm_core::{DeviceCatalog, DeviceSession, SessionConfig};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = DeviceSession::new(SessionConfig::default())?;
//!     let mut updates = session.subscribe_updates().await;
//!
//!     let device = DeviceCatalog::builtin().get("libre-3")?.clone();
//!     session.connect(device).await?;
//!
//!     while let Some(update) = updates.next().await {
//!         println!(
//!             "{} mg/dL {} (60 min: {})",
//!             update.reading.value,
//!             update.reading.trend.arrow(),
//!             update.forecast.last().predicted_value
//!         );
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod clock;
pub mod connector;
pub mod error;
pub mod events;
pub mod generator;
pub mod random;
pub mod session;
pub mod settings;
pub mod streaming;
pub mod thresholds;

// Re-export types
pub use cgm_types::{
    Accuracy, ConnectionState, DeviceDescriptor, ForecastPoint, ForecastSet, GlucoseUnit, Reading,
    Trend, ValidationError,
};

pub use catalog::DeviceCatalog;
pub use clock::{Clock, ManualClock, SystemClock};
pub use connector::{Connector, MockConnector, SimulatedConnector};
pub use error::{ConnectionFailureReason, Error, Result};
pub use events::{
    EventDispatcher, EventReceiver, EventSender, SessionEvent, SessionUpdate, TransitionCause,
    UpdateCallback,
};
pub use generator::ReadingGenerator;
pub use random::{ConstantRandom, RandomSource, ScriptedRandom, SeededRandom};
pub use session::{ConnectOutcome, DeviceSession, SessionBuilder, SessionSnapshot};
pub use settings::{DEFAULT_CONNECT_DELAY, DEFAULT_TICK_PERIOD, SessionConfig};
pub use streaming::UpdateStream;
pub use thresholds::{GlucoseRange, ThresholdConfig, Thresholds};
