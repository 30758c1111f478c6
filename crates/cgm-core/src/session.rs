//! The device session: connection lifecycle and the periodic reading tick.
//!
//! A [`DeviceSession`] owns one connection state machine and the "current
//! reading" cell. All mutable state lives in a single `SessionState` behind
//! a tokio mutex, so `connect`, `disconnect` and the tick task are serialized.
//!
//! Every connect attempt gets a new generation number and a fresh
//! [`CancellationToken`]. `disconnect` bumps the generation and cancels the
//! token; both the pending connect and the tick task re-check the generation
//! under the lock before touching state, so nothing from a stale attempt is
//! ever published after `disconnect` returns.

use std::sync::{Arc, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use cgm_types::{ConnectionState, DeviceDescriptor, ForecastSet, Reading};

use crate::clock::{Clock, SystemClock};
use crate::connector::{Connector, SimulatedConnector};
use crate::error::{ConnectionFailureReason, Error, Result};
use crate::events::{
    EventDispatcher, EventReceiver, SessionEvent, SessionUpdate, TransitionCause, UpdateCallback,
};
use crate::generator::ReadingGenerator;
use crate::random::{RandomSource, SeededRandom};
use crate::settings::SessionConfig;
use crate::streaming::{UpdateSink, UpdateStream};

/// How a `connect` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectOutcome {
    /// The session is connected and the seed reading was published.
    Connected,
    /// The connect step failed; the session is in the error state.
    Failed(ConnectionFailureReason),
    /// `disconnect` was called while connecting.
    Cancelled,
}

impl ConnectOutcome {
    /// Whether the session ended up connected.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current connection state.
    pub connection_state: ConnectionState,
    /// The active device; set only while connected.
    pub device: Option<DeviceDescriptor>,
    /// Most recent reading.
    pub last_reading: Option<Reading>,
    /// Forecast computed from `last_reading`.
    pub last_forecast: Option<ForecastSet>,
}

impl SessionSnapshot {
    /// Human-readable status, e.g. "Connecting...".
    pub fn status_label(&self) -> &'static str {
        self.connection_state.status_label()
    }
}

/// Mutable session state, guarded by the session mutex.
struct SessionState {
    connection: ConnectionState,
    device: Option<DeviceDescriptor>,
    last_update: Option<SessionUpdate>,
    /// Incremented on every connect and disconnect.
    generation: u64,
    /// Cancels the pending connect or the running tick task.
    cancel: Option<CancellationToken>,
    generator: ReadingGenerator,
    callbacks: Vec<UpdateCallback>,
    sinks: Vec<UpdateSink>,
}

impl SessionState {
    fn new(generator: ReadingGenerator) -> Self {
        Self {
            connection: ConnectionState::Disconnected,
            device: None,
            last_update: None,
            generation: 0,
            cancel: None,
            generator,
            callbacks: Vec::new(),
            sinks: Vec::new(),
        }
    }

    fn clear(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.device = None;
        self.last_update = None;
    }
}

struct Inner {
    state: Mutex<SessionState>,
    events: EventDispatcher,
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    connector: Arc<dyn Connector>,
}

impl Inner {
    fn transition(
        &self,
        state: &mut SessionState,
        to: ConnectionState,
        device: Option<DeviceDescriptor>,
        cause: TransitionCause,
    ) {
        let from = state.connection;
        state.connection = to;
        info!("Session state: {} -> {}", from, to);
        self.events.send(SessionEvent::StateChanged {
            from,
            to,
            device,
            cause,
        });
    }

    /// Deliver an update to callbacks, streams and event subscribers.
    fn publish(&self, state: &mut SessionState, update: SessionUpdate) {
        for callback in &state.callbacks {
            callback(&update);
        }
        state.sinks.retain(|sink| sink.offer(&update));
        self.events.send(SessionEvent::Update(update));
    }

    fn tick(&self, state: &mut SessionState) {
        let Some(device_name) = state.device.as_ref().map(|d| d.name.clone()) else {
            return;
        };
        let now = self.clock.now();
        let previous = state.last_update.as_ref().map(|u| &u.reading);
        let update = state.generator.tick(previous, &device_name, now);
        debug!(
            value = update.reading.value,
            trend = %update.reading.trend,
            "Tick for {}",
            device_name
        );
        state.last_update = Some(update.clone());
        self.publish(state, update);
    }

    async fn attempt(
        &self,
        device: &DeviceDescriptor,
    ) -> std::result::Result<(), ConnectionFailureReason> {
        match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, self.connector.connect(device))
                .await
                .unwrap_or(Err(ConnectionFailureReason::Timeout(limit))),
            None => self.connector.connect(device).await,
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some(token) = self.state.get_mut().cancel.take() {
            token.cancel();
        }
    }
}

/// Spawn the periodic tick task for one connection.
///
/// The task holds only a weak reference, so dropping every session handle
/// stops it.
fn spawn_ticker(inner: &Arc<Inner>, generation: u64, token: CancellationToken) {
    let weak: Weak<Inner> = Arc::downgrade(inner);
    let period = inner.config.tick_period;

    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("Tick task cancelled, stopping");
                    break;
                }
                _ = ticker.tick() => {
                    let Some(inner) = weak.upgrade() else {
                        debug!("Session dropped, stopping tick task");
                        break;
                    };
                    let mut guard = inner.state.lock().await;
                    let state = &mut *guard;
                    if state.generation != generation
                        || state.connection != ConnectionState::Connected
                    {
                        debug!("Stale tick for generation {}, stopping", generation);
                        break;
                    }
                    inner.tick(state);
                }
            }
        }
    });
}

/// A simulated CGM session.
///
/// Cloning is cheap; clones share the same session.
///
/// # Example
///
/// ```
/// use cgm_core::{ConnectOutcome, DeviceCatalog, DeviceSession, SessionConfig};
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> cgm_core::Result<()> {
///     let session = DeviceSession::new(SessionConfig::default())?;
///     session.on_update(|update| println!("{} mg/dL", update.reading.value)).await;
///
///     let device = DeviceCatalog::builtin().get("dexcom-g7")?.clone();
///     assert_eq!(session.connect(device).await?, ConnectOutcome::Connected);
///
///     session.disconnect().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl DeviceSession {
    /// Create a session with the simulated connector, the system clock and
    /// an entropy-seeded random source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` fails validation.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Start building a session with custom seams.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::default()
    }

    /// The session's configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Connect to `device`.
    ///
    /// Valid only from the disconnected or error state. Moves to connecting,
    /// runs the connect step, then moves to connected, publishes a seed
    /// reading and starts the tick task. A failed connect step moves the
    /// session to the error state and is reported as
    /// [`ConnectOutcome::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateViolation`] when already connecting or
    /// connected, and [`Error::InvalidDevice`] for a malformed descriptor.
    /// The state is unchanged in both cases.
    pub async fn connect(&self, device: DeviceDescriptor) -> Result<ConnectOutcome> {
        let (generation, token) = {
            let mut state = self.inner.state.lock().await;
            if !state.connection.can_connect() {
                warn!(
                    "Rejecting connect to {} while {}",
                    device.id, state.connection
                );
                return Err(Error::state_violation("connect", state.connection));
            }
            device.validate()?;

            state.clear();
            state.generation += 1;
            let token = CancellationToken::new();
            state.cancel = Some(token.clone());
            self.inner.transition(
                &mut state,
                ConnectionState::Connecting,
                Some(device.clone()),
                TransitionCause::ConnectRequested,
            );
            (state.generation, token)
        };

        info!("Connecting to {}", device);
        let result = tokio::select! {
            _ = token.cancelled() => {
                debug!("Connect to {} cancelled", device.id);
                return Ok(ConnectOutcome::Cancelled);
            }
            result = self.inner.attempt(&device) => result,
        };

        let mut guard = self.inner.state.lock().await;
        let state = &mut *guard;
        if state.generation != generation || state.connection != ConnectionState::Connecting {
            debug!("Connect to {} superseded", device.id);
            return Ok(ConnectOutcome::Cancelled);
        }

        match result {
            Ok(()) => {
                let update = state.generator.seed(&device, self.inner.clock.now());
                state.device = Some(device.clone());
                state.last_update = Some(update.clone());
                self.inner.transition(
                    state,
                    ConnectionState::Connected,
                    Some(device),
                    TransitionCause::ConnectSucceeded,
                );
                self.inner.publish(state, update);
                spawn_ticker(&self.inner, generation, token);
                Ok(ConnectOutcome::Connected)
            }
            Err(reason) => {
                warn!("Failed to connect to {}: {}", device.id, reason);
                state.clear();
                self.inner.transition(
                    state,
                    ConnectionState::Error,
                    Some(device),
                    TransitionCause::from(&reason),
                );
                Ok(ConnectOutcome::Failed(reason))
            }
        }
    }

    /// Stop the tick task, clear the device and reading, and move to
    /// disconnected.
    ///
    /// Valid from any state and idempotent. Cancels a pending connect.
    pub async fn disconnect(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        state.generation += 1;
        state.clear();
        if state.connection == ConnectionState::Disconnected {
            debug!("Already disconnected");
            return Ok(());
        }
        self.inner.transition(
            &mut state,
            ConnectionState::Disconnected,
            None,
            TransitionCause::UserRequested,
        );
        Ok(())
    }

    /// Snapshot of the current state.
    pub async fn current_state(&self) -> SessionSnapshot {
        let state = self.inner.state.lock().await;
        SessionSnapshot {
            connection_state: state.connection,
            device: state.device.clone(),
            last_reading: state.last_update.as_ref().map(|u| u.reading.clone()),
            last_forecast: state.last_update.as_ref().map(|u| u.forecast),
        }
    }

    /// Current connection state.
    pub async fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().await.connection
    }

    /// Register a callback for the seed reading and every tick.
    ///
    /// The callback runs while the session is locked; it must not call
    /// back into the session.
    pub async fn on_update<F>(&self, callback: F)
    where
        F: Fn(&SessionUpdate) + Send + Sync + 'static,
    {
        let callback: UpdateCallback = Arc::new(callback);
        self.inner.state.lock().await.callbacks.push(callback);
    }

    /// Subscribe to state changes and updates.
    pub fn subscribe(&self) -> EventReceiver {
        self.inner.events.subscribe()
    }

    /// Receive updates as an async stream.
    pub async fn subscribe_updates(&self) -> UpdateStream {
        let (sink, stream) = UpdateStream::channel(self.inner.config.update_buffer);
        self.inner.state.lock().await.sinks.push(sink);
        stream
    }
}

/// Builder for [`DeviceSession`] with injectable connector, clock and
/// random source.
///
/// ```
/// use cgm_core::{ConstantRandom, DeviceSession, MockConnector, SessionConfig};
///
/// let session = DeviceSession::builder()
///     .config(SessionConfig::default())
///     .connector(MockConnector::new())
///     .random(ConstantRandom::zero())
///     .build()
///     .unwrap();
/// # drop(session);
/// ```
#[derive(Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    connector: Option<Arc<dyn Connector>>,
    clock: Option<Arc<dyn Clock>>,
    generator: Option<ReadingGenerator>,
}

impl SessionBuilder {
    /// Set the session configuration.
    #[must_use]
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the simulated connector.
    #[must_use]
    pub fn connector(mut self, connector: impl Connector + 'static) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Share an existing connector, e.g. a [`MockConnector`](crate::MockConnector)
    /// the test keeps a handle to.
    #[must_use]
    pub fn shared_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Set the clock used to timestamp readings.
    #[must_use]
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Set the random source.
    #[must_use]
    pub fn random(mut self, rng: impl RandomSource + 'static) -> Self {
        self.generator = Some(ReadingGenerator::new(rng));
        self
    }

    /// Build the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the configuration is invalid.
    pub fn build(self) -> Result<DeviceSession> {
        self.config.validate()?;
        let connector = self
            .connector
            .unwrap_or_else(|| Arc::new(SimulatedConnector::new(self.config.connect_delay)));
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let generator = self
            .generator
            .unwrap_or_else(|| ReadingGenerator::new(SeededRandom::from_entropy()));

        Ok(DeviceSession {
            inner: Arc::new(Inner {
                state: Mutex::new(SessionState::new(generator)),
                events: EventDispatcher::new(self.config.event_capacity),
                config: self.config,
                clock,
                connector,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::ConstantRandom;
    use std::time::Duration;

    fn device() -> DeviceDescriptor {
        DeviceDescriptor::new("dexcom-g7", "Dexcom G7", "Dexcom")
    }

    fn session() -> DeviceSession {
        DeviceSession::builder()
            .random(ConstantRandom::zero())
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_new_session_is_disconnected() {
        let snapshot = session().current_state().await;
        assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
        assert_eq!(snapshot.status_label(), "Disconnected");
        assert!(snapshot.device.is_none());
        assert!(snapshot.last_reading.is_none());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = DeviceSession::new(SessionConfig::new().tick_period(Duration::ZERO));
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_publishes_seed() {
        let session = session();
        let outcome = session.connect(device()).await.unwrap();
        assert_eq!(outcome, ConnectOutcome::Connected);

        let snapshot = session.current_state().await;
        assert_eq!(snapshot.connection_state, ConnectionState::Connected);
        assert_eq!(snapshot.device, Some(device()));
        let reading = snapshot.last_reading.unwrap();
        assert_eq!(reading.value, 120);
        assert_eq!(reading.device_name, "Dexcom G7");
        assert_eq!(snapshot.last_forecast.unwrap().values(), [120; 4]);
    }

    #[tokio::test]
    async fn test_invalid_device_leaves_state_unchanged() {
        let session = session();
        let err = session
            .connect(DeviceDescriptor::new("  ", "Blank", "Acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDevice(_)));
        assert_eq!(
            session.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_clears_state() {
        let session = session();
        session.connect(device()).await.unwrap();
        session.disconnect().await.unwrap();

        let snapshot = session.current_state().await;
        assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
        assert!(snapshot.device.is_none());
        assert!(snapshot.last_reading.is_none());
        assert!(snapshot.last_forecast.is_none());
    }
}
