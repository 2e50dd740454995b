//! Dispatch glue: an optional `tokio`-backed tick source.
//!
//! [`crate::queue::UtteranceQueue`] is tick-driven and has no opinion on
//! where ticks come from — a game loop, a UI frame callback, or a timer are
//! all equally valid. `TickSource` is a convenience for hosts that just want
//! a periodic `tokio::time::interval` driving `step` at a fixed cadence; it
//! is not required to use the queue.

use crate::queue::UtteranceQueue;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Drives an [`UtteranceQueue`] on a fixed interval using `tokio::time`.
///
/// Dropping the handle (or calling [`TickSource::stop`]) aborts the
/// background task; it does not touch the queue itself.
pub struct TickSource {
    handle: JoinHandle<()>,
}

impl TickSource {
    /// Spawn a task that calls `queue.step(period.as_secs_f64())` on every
    /// tick of `period`, on the current `tokio` runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a `tokio` runtime context, matching
    /// `tokio::spawn`'s own behavior.
    pub fn spawn(queue: UtteranceQueue, period: Duration) -> Self {
        let handle = tokio::task::spawn_local(async move {
            let mut interval = tokio::time::interval(period);
            let dt_secs = period.as_secs_f64();
            loop {
                interval.tick().await;
                queue.step(dt_secs);
            }
        });
        Self { handle }
    }

    /// Abort the background tick task.
    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for TickSource {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
