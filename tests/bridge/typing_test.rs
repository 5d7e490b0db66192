//! Typing indicator lifecycle under paused time.

use std::sync::Arc;
use std::time::Duration;

use relay_bridge::bridge::{DispatchOutcome, TypingGuard};

use crate::doubles::{bridge, CountingIndicator, FakeRelay, RelayMode};
use crate::fixtures::message;

#[tokio::test(start_paused = true)]
async fn refreshes_every_interval_while_relay_is_outstanding() {
    let relay = FakeRelay::new(RelayMode::Accept, Duration::from_secs(12));
    let bridge = bridge(relay);
    let indicator = CountingIndicator::default();

    let outcome = bridge.handle(&message("slow", vec![]), indicator.clone()).await;
    assert!(matches!(outcome, DispatchOutcome::Relayed { .. }));

    // t = 0, 5, 10; the relay returned at t = 12.
    assert_eq!(indicator.count(), 3);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(indicator.count(), 3, "indicator must stop after success");
}

#[tokio::test(start_paused = true)]
async fn stops_after_relay_failure() {
    let relay = FakeRelay::new(RelayMode::Reject, Duration::from_secs(7));
    let bridge = bridge(relay);
    let indicator = CountingIndicator::default();

    let outcome = bridge.handle(&message("slow", vec![]), indicator.clone()).await;
    assert!(matches!(outcome, DispatchOutcome::Failed { .. }));
    assert_eq!(indicator.count(), 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(indicator.count(), 2, "indicator must stop after failure");
}

#[tokio::test(start_paused = true)]
async fn stops_when_dispatch_panics() {
    let relay = FakeRelay::new(RelayMode::Panic, Duration::from_secs(7));
    let bridge = Arc::new(bridge(relay));
    let indicator = CountingIndicator::default();

    let task_bridge = Arc::clone(&bridge);
    let task_indicator = indicator.clone();
    let joined = tokio::spawn(async move {
        task_bridge
            .handle(&message("boom", vec![]), task_indicator)
            .await
    })
    .await;
    assert!(joined.is_err(), "dispatch task should have panicked");

    let after_panic = indicator.count();
    assert_eq!(after_panic, 2);

    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(indicator.count(), after_panic, "indicator must stop after panic");
}

#[tokio::test(start_paused = true)]
async fn guard_pulses_immediately_and_stops_on_drop() {
    let indicator = CountingIndicator::default();
    let guard = TypingGuard::start(indicator.clone(), Duration::from_secs(5));

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(indicator.count(), 1);
    assert!(!guard.is_finished());

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(indicator.count(), 2);

    drop(guard);
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(indicator.count(), 2);
}
