//! Typing indicator kept alive for the duration of one dispatch.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

use super::ActivityIndicator;

/// Shortest refresh period accepted; `tokio::time::interval` rejects zero.
const MIN_REFRESH: Duration = Duration::from_millis(100);

/// Refreshes an [`ActivityIndicator`] on a fixed interval until dropped.
///
/// The first pulse is sent immediately. Dropping the guard aborts the
/// refresh task, so the indicator stops on every exit path of the owning
/// scope, including early returns and panics.
#[derive(Debug)]
pub struct TypingGuard {
    handle: JoinHandle<()>,
}

impl TypingGuard {
    /// Start refreshing `indicator` every `every`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<I: ActivityIndicator>(indicator: I, every: Duration) -> Self {
        let period = every.max(MIN_REFRESH);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(e) = indicator.pulse().await {
                    debug!(error = %e, "typing indicator refresh failed");
                }
            }
        });
        Self { handle }
    }

    /// Whether the refresh task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for TypingGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
