//! Heartbeat watchdog: a cancellable periodic task owned by a claim.

use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::trace;

/// Periodic check bound to one claim.
///
/// The task is aborted when the watchdog is dropped, so whoever owns the
/// claim record owns the timer too: removing the record cancels it.
#[derive(Debug)]
pub struct Watchdog {
    port: u16,
    handle: JoinHandle<()>,
}

impl Watchdog {
    /// Start ticking every `period`, first tick one period from now.
    ///
    /// `tick` returning `Break` ends the task. Must be called from within a
    /// tokio runtime.
    pub fn start<F, Fut>(port: u16, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send,
    {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                trace!(port = port, "heartbeat tick");
                if tick().await.is_break() {
                    break;
                }
            }
        });

        Self { port, handle }
    }

    #[cfg(test)]
    fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            trace!(port = self.port, "heartbeat cancelled");
        }
        self.handle.abort();
    }
}
