//! Integration tests for the session lifecycle.
//!
//! All tests run on tokio's paused clock, so the 2 s connect delay and the
//! 60 s tick period elapse instantly and deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::StreamExt;
use time::macros::datetime;

use cgm_core::{
    ConnectOutcome, ConnectionFailureReason, ConnectionState, ConstantRandom, DeviceCatalog,
    DeviceDescriptor, DeviceSession, Error, ManualClock, MockConnector, ReadingGenerator,
    ScriptedRandom, SeededRandom, SessionConfig, SessionEvent, SessionUpdate, TransitionCause,
    Trend,
};

const DELAY: Duration = Duration::from_secs(2);
const PERIOD: Duration = Duration::from_secs(60);

fn device() -> DeviceDescriptor {
    DeviceCatalog::builtin()
        .get("dexcom-g7")
        .expect("builtin device")
        .clone()
}

fn seeded_session(seed: u64) -> DeviceSession {
    DeviceSession::builder()
        .random(SeededRandom::new(seed))
        .build()
        .expect("valid session")
}

async fn count_updates(session: &DeviceSession) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    session
        .on_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await;
    count
}

async fn collect_updates(session: &DeviceSession) -> Arc<Mutex<Vec<SessionUpdate>>> {
    let updates = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&updates);
    session
        .on_update(move |update| sink.lock().unwrap().push(update.clone()))
        .await;
    updates
}

/// Let spawned tasks run until they block on a timer.
async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_connect_rejected_while_connecting() {
    let session = seeded_session(1);
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.connect(device()).await }
    });
    settle().await;
    assert_eq!(session.connection_state().await, ConnectionState::Connecting);

    let err = session.connect(device()).await.unwrap_err();
    assert!(matches!(
        err,
        Error::StateViolation {
            operation: "connect",
            state: ConnectionState::Connecting
        }
    ));
    assert_eq!(session.connection_state().await, ConnectionState::Connecting);

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome, ConnectOutcome::Connected);
}

#[tokio::test(start_paused = true)]
async fn test_connect_rejected_while_connected_keeps_single_ticker() {
    let session = seeded_session(2);
    let count = count_updates(&session).await;
    session.connect(device()).await.unwrap();
    let before = session.current_state().await;

    let err = session.connect(device()).await.unwrap_err();
    assert!(matches!(err, Error::StateViolation { .. }));
    assert_eq!(session.current_state().await, before);

    tokio::time::sleep(PERIOD * 3 + Duration::from_millis(10)).await;
    // Seed plus exactly one tick per period.
    assert_eq!(count.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn test_connect_takes_configured_delay() {
    let session = seeded_session(3);
    let start = tokio::time::Instant::now();
    session.connect(device()).await.unwrap();
    assert!(start.elapsed() >= DELAY);
}

#[tokio::test(start_paused = true)]
async fn test_ticks_stay_in_range() {
    let session = DeviceSession::builder()
        .config(SessionConfig::new().tick_period(Duration::from_secs(1)))
        .random(SeededRandom::new(99))
        .build()
        .unwrap();
    let updates = collect_updates(&session).await;
    session.connect(device()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300_500)).await;
    session.disconnect().await.unwrap();

    let updates = updates.lock().unwrap();
    assert_eq!(updates.len(), 301);
    for window in updates.windows(2) {
        let (prev, next) = (&window[0].reading, &window[1].reading);
        assert_eq!(next.trend, Trend::between(prev.value, next.value));
    }
    for update in updates.iter() {
        assert!((70..=300).contains(&update.reading.value));
        assert!(update.forecast.is_well_formed());
        let confidences = update.forecast.confidences();
        assert!(confidences.windows(2).all(|w| w[0] >= w[1]));
        assert!(confidences.iter().all(|c| (60..=95).contains(c)));
    }
}

#[tokio::test(start_paused = true)]
async fn test_trend_classification_through_session() {
    // Seed draw and its four forecast draws are zero, then the first tick
    // moves by +8.
    let session = DeviceSession::builder()
        .random(ScriptedRandom::new([0.0, 0.0, 0.0, 0.0, 0.0, 8.0]))
        .build()
        .unwrap();
    let updates = collect_updates(&session).await;
    session.connect(device()).await.unwrap();
    tokio::time::sleep(PERIOD * 2 + Duration::from_millis(10)).await;

    let updates = updates.lock().unwrap();
    let values: Vec<_> = updates.iter().map(|u| (u.reading.value, u.reading.trend)).collect();
    assert_eq!(
        values,
        [(120, Trend::Stable), (128, Trend::Rising), (128, Trend::Stable)]
    );
    assert_eq!(updates[1].forecast.values(), [130, 132, 134, 136]);
    assert_eq!(updates[2].forecast.values(), [128; 4]);
}

#[test]
fn test_zero_noise_forecast() {
    let mut generator = ReadingGenerator::new(ConstantRandom::zero());
    let reading = cgm_core::Reading::new(
        150,
        datetime!(2025-01-01 08:00 UTC),
        Trend::Stable,
        "Dexcom G7",
    );
    let set = generator.forecast(&reading);
    assert_eq!(set.values(), [150, 150, 150, 150]);
    assert_eq!(set.confidences(), [87, 79, 71, 63]);
}

#[tokio::test(start_paused = true)]
async fn test_double_disconnect_is_idempotent() {
    let session = seeded_session(4);
    let mut events = session.subscribe();
    session.connect(device()).await.unwrap();

    session.disconnect().await.unwrap();
    session.disconnect().await.unwrap();
    assert_eq!(
        session.connection_state().await,
        ConnectionState::Disconnected
    );

    let mut disconnects = 0;
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::StateChanged {
            to: ConnectionState::Disconnected,
            ..
        } = event
        {
            disconnects += 1;
        }
    }
    assert_eq!(disconnects, 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_while_disconnected() {
    let session = seeded_session(5);
    session.disconnect().await.unwrap();
    assert_eq!(
        session.connection_state().await,
        ConnectionState::Disconnected
    );
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_during_connect_suppresses_seed() {
    let session = seeded_session(6);
    let count = count_updates(&session).await;
    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.connect(device()).await }
    });
    settle().await;

    session.disconnect().await.unwrap();
    assert_eq!(pending.await.unwrap().unwrap(), ConnectOutcome::Cancelled);

    tokio::time::sleep(DELAY * 2).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
    let snapshot = session.current_state().await;
    assert_eq!(snapshot.connection_state, ConnectionState::Disconnected);
    assert!(snapshot.last_reading.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_no_ticks_after_disconnect() {
    let session = seeded_session(7);
    let count = count_updates(&session).await;
    session.connect(device()).await.unwrap();
    tokio::time::sleep(PERIOD * 2 + Duration::from_millis(10)).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);

    session.disconnect().await.unwrap();
    tokio::time::sleep(PERIOD * 10).await;
    assert_eq!(count.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_disconnect_starts_fresh() {
    let session = seeded_session(8);
    let count = count_updates(&session).await;
    session.connect(device()).await.unwrap();
    session.disconnect().await.unwrap();

    let other = DeviceCatalog::builtin().get("omnipod-5").unwrap().clone();
    assert!(session.connect(other.clone()).await.unwrap().is_connected());
    tokio::time::sleep(PERIOD + Duration::from_millis(10)).await;

    // Two seeds plus one tick from the second connection only.
    assert_eq!(count.load(Ordering::SeqCst), 3);
    let snapshot = session.current_state().await;
    assert_eq!(snapshot.device, Some(other));
    assert_eq!(snapshot.last_reading.unwrap().device_name, "Omnipod 5");
}

#[tokio::test(start_paused = true)]
async fn test_failed_connect_enters_error_state() {
    let connector = Arc::new(MockConnector::failing(ConnectionFailureReason::Rejected));
    let session = DeviceSession::builder()
        .shared_connector(connector.clone())
        .random(SeededRandom::new(9))
        .build()
        .unwrap();
    let count = count_updates(&session).await;
    let mut events = session.subscribe();

    let outcome = session.connect(device()).await.unwrap();
    assert_eq!(
        outcome,
        ConnectOutcome::Failed(ConnectionFailureReason::Rejected)
    );

    let snapshot = session.current_state().await;
    assert_eq!(snapshot.connection_state, ConnectionState::Error);
    assert_eq!(snapshot.status_label(), "Connection Error");
    assert!(snapshot.device.is_none());
    assert!(snapshot.last_reading.is_none());
    assert_eq!(count.load(Ordering::SeqCst), 0);

    match events.try_recv().unwrap() {
        SessionEvent::StateChanged { to, cause, .. } => {
            assert_eq!(to, ConnectionState::Connecting);
            assert_eq!(cause, TransitionCause::ConnectRequested);
        }
        other => panic!("unexpected event: {:?}", other),
    }
    match events.try_recv().unwrap() {
        SessionEvent::StateChanged { to, cause, .. } => {
            assert_eq!(to, ConnectionState::Error);
            assert!(matches!(cause, TransitionCause::ConnectFailed(_)));
        }
        other => panic!("unexpected event: {:?}", other),
    }

    // No auto-recovery, but an explicit connect from error is allowed.
    tokio::time::sleep(PERIOD * 2).await;
    assert_eq!(session.connection_state().await, ConnectionState::Error);

    connector.set_should_fail(false, None).await;
    assert!(session.connect(device()).await.unwrap().is_connected());
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_connect_timeout() {
    let connector = MockConnector::new();
    connector.set_latency(Duration::from_secs(10));
    let session = DeviceSession::builder()
        .config(SessionConfig::new().connect_timeout(Duration::from_secs(1)))
        .connector(connector)
        .build()
        .unwrap();

    let outcome = session.connect(device()).await.unwrap();
    assert_eq!(
        outcome,
        ConnectOutcome::Failed(ConnectionFailureReason::Timeout(Duration::from_secs(1)))
    );
    assert_eq!(session.connection_state().await, ConnectionState::Error);
}

#[tokio::test(start_paused = true)]
async fn test_event_order_on_connect() {
    let session = seeded_session(10);
    let mut events = session.subscribe();
    session.connect(device()).await.unwrap();

    let kinds: Vec<String> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|event| match event {
            SessionEvent::StateChanged { to, .. } => format!("state:{}", to),
            SessionEvent::Update(_) => "update".to_string(),
            _ => "other".to_string(),
        })
        .collect();
    assert_eq!(kinds, ["state:connecting", "state:connected", "update"]);
}

#[tokio::test(start_paused = true)]
async fn test_update_stream() {
    let session = seeded_session(11);
    let mut stream = session.subscribe_updates().await;
    session.connect(device()).await.unwrap();

    let seed = stream.next().await.unwrap();
    assert_eq!(seed.reading.trend, Trend::Stable);
    assert!((100..=140).contains(&seed.reading.value));

    let tick = stream.next().await.unwrap();
    assert_eq!(tick.reading.trend, Trend::between(seed.reading.value, tick.reading.value));
}

#[tokio::test(start_paused = true)]
async fn test_readings_use_injected_clock() {
    let clock = ManualClock::new(datetime!(2025-03-01 12:00 UTC));
    let session = DeviceSession::builder()
        .clock(clock.clone())
        .random(ConstantRandom::zero())
        .build()
        .unwrap();
    let updates = collect_updates(&session).await;
    session.connect(device()).await.unwrap();

    clock.advance(time::Duration::minutes(1));
    tokio::time::sleep(PERIOD + Duration::from_millis(10)).await;

    let updates = updates.lock().unwrap();
    assert_eq!(updates[0].reading.timestamp, datetime!(2025-03-01 12:00 UTC));
    assert_eq!(updates[1].reading.timestamp, datetime!(2025-03-01 12:01 UTC));
    assert_eq!(
        updates[1].forecast.last().predicted_at,
        datetime!(2025-03-01 13:01 UTC)
    );
}
