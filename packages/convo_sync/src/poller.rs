//! Sequential polling with exponential backoff.
//!
//! One in-flight poll at a time: the next attempt is scheduled only after the
//! current one completes, so a slow upstream can never stack requests. A
//! failed attempt doubles the delay up to [`MAX_POLL_INTERVAL`] and polling
//! continues; a success snaps the delay back to the base interval.
//!
//! Visibility drives suspension. While the page is hidden the pending timer is
//! cleared and nothing fires; when visibility returns the poller restarts from
//! the base interval and fires immediately.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5_000);
pub const MAX_POLL_INTERVAL: Duration = Duration::from_millis(60_000);

/// Flags mirrored to clients alongside snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollerStatus {
    pub is_polling: bool,
    pub is_paused: bool,
}

#[derive(Debug, Default)]
struct PollerFlags {
    is_polling: AtomicBool,
    is_paused: AtomicBool,
}

impl PollerFlags {
    fn set(&self, is_polling: bool, is_paused: bool) {
        self.is_polling.store(is_polling, Ordering::Relaxed);
        self.is_paused.store(is_paused, Ordering::Relaxed);
    }
}

/// Handle to a spawned polling task. Dropping the handle stops the task.
#[derive(Debug)]
pub struct BackoffPoller {
    cancel: CancellationToken,
    flags: Arc<PollerFlags>,
}

impl BackoffPoller {
    /// Spawn the polling loop. `enabled` gates the loop as a whole while
    /// `hidden` suspends it; both are sampled again whenever they change.
    ///
    /// The first poll fires as soon as the loop is enabled and visible.
    pub fn spawn<A, Fut>(
        action: A,
        base_interval: Duration,
        enabled: watch::Receiver<bool>,
        hidden: watch::Receiver<bool>,
    ) -> Self
    where
        A: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let flags = Arc::new(PollerFlags::default());
        tokio::spawn(run_poll_loop(
            action,
            base_interval,
            enabled,
            hidden,
            cancel.clone(),
            flags.clone(),
        ));
        Self { cancel, flags }
    }

    pub fn status(&self) -> PollerStatus {
        PollerStatus {
            is_polling: self.flags.is_polling.load(Ordering::Relaxed),
            is_paused: self.flags.is_paused.load(Ordering::Relaxed),
        }
    }

    /// Stop polling permanently. Clears any pending timer; a later engine
    /// session starts over from the base interval.
    pub fn stop(&self) {
        self.cancel.cancel();
        self.flags.set(false, false);
    }
}

impl Drop for BackoffPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_poll_loop<A, Fut>(
    mut action: A,
    base_interval: Duration,
    mut enabled: watch::Receiver<bool>,
    mut hidden: watch::Receiver<bool>,
    cancel: CancellationToken,
    flags: Arc<PollerFlags>,
) where
    A: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    let mut current = base_interval;
    'run: loop {
        // Suspended until the loop is both enabled and visible.
        while !(*enabled.borrow() && !*hidden.borrow()) {
            flags.set(false, *hidden.borrow());
            tokio::select! {
                _ = cancel.cancelled() => break 'run,
                changed = enabled.changed() => {
                    if changed.is_err() {
                        break 'run;
                    }
                }
                changed = hidden.changed() => {
                    if changed.is_err() {
                        break 'run;
                    }
                }
            }
        }
        flags.set(true, false);
        current = base_interval;

        // Active: fire immediately, then delay-after-completion.
        'active: loop {
            match action().await {
                Ok(()) => current = base_interval,
                Err(e) => {
                    current = (current * 2).min(MAX_POLL_INTERVAL);
                    warn!("Poll failed: {:#}; next attempt in {}ms", e, current.as_millis());
                }
            }
            let deadline = Instant::now() + current;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break 'run,
                    _ = tokio::time::sleep_until(deadline) => continue 'active,
                    changed = hidden.changed() => {
                        if changed.is_err() {
                            break 'run;
                        }
                        if *hidden.borrow() {
                            debug!("Page hidden, suspending polls");
                            break 'active;
                        }
                    }
                    changed = enabled.changed() => {
                        if changed.is_err() {
                            break 'run;
                        }
                        if !*enabled.borrow() {
                            break 'active;
                        }
                    }
                }
            }
        }
    }
    flags.set(false, false);
}
