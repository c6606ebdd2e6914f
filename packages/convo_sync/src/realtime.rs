//! Debounced change-feed subscription with reconnect backoff.
//!
//! A [`ChangeFeed`] yields a stream of [`FeedEvent`]s for one subscription.
//! The listener keeps at most one subscription alive, collapses bursts of
//! change events into a single callback invocation, and resubscribes with
//! exponential backoff when the feed reports an error. Visibility loss is
//! deliberately inert; regaining visibility reconnects immediately and fires
//! the callback once, since events may have been missed while hidden.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);
pub const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(3_000);
pub const MAX_RETRY_DELAY: Duration = Duration::from_millis(30_000);

/// Table-level domains the inbox watches for invalidation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ConversationMetadata,
    ContactLabels,
    Contacts,
    Notes,
}

#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// The subscription is live.
    Subscribed,
    /// A watched domain changed.
    Change(Topic),
    /// The channel failed and must be re-established.
    Error,
    /// The channel timed out. Handled like an error.
    TimedOut,
    /// The channel was closed by the other side.
    Closed,
}

/// Source of change events. Each `subscribe` call opens a fresh subscription;
/// dropping the receiver tears it down.
pub trait ChangeFeed: Send + Sync + 'static {
    fn subscribe(&self) -> mpsc::Receiver<FeedEvent>;
}

type Handler = Arc<Mutex<Box<dyn FnMut() + Send>>>;

/// Handle to a spawned listener task. Dropping the handle tears it down.
pub struct RealtimeListener {
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    handler: Handler,
}

impl RealtimeListener {
    pub fn spawn<F>(
        feed: F,
        hidden: watch::Receiver<bool>,
        on_change: impl FnMut() + Send + 'static,
    ) -> Self
    where
        F: ChangeFeed,
    {
        let cancel = CancellationToken::new();
        let connected = Arc::new(AtomicBool::new(false));
        let handler: Handler = Arc::new(Mutex::new(Box::new(on_change)));
        tokio::spawn(run_listener(
            feed,
            hidden,
            cancel.clone(),
            connected.clone(),
            handler.clone(),
        ));
        Self { cancel, connected, handler }
    }

    /// Replace the change callback. The listener reads the cell at fire time,
    /// so a swap takes effect for every later invocation.
    pub fn set_on_change(&self, on_change: impl FnMut() + Send + 'static) {
        if let Ok(mut callback) = self.handler.lock() {
            *callback = Box::new(on_change);
        }
    }

    pub fn connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Tear down: cancels pending debounce and reconnect timers and drops the
    /// live subscription.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.connected.store(false, Ordering::Relaxed);
    }
}

impl Drop for RealtimeListener {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn fire(handler: &Handler) {
    if let Ok(mut callback) = handler.lock() {
        (callback)();
    }
}

async fn maybe_sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn run_listener<F>(
    feed: F,
    mut hidden: watch::Receiver<bool>,
    cancel: CancellationToken,
    connected: Arc<AtomicBool>,
    handler: Handler,
) where
    F: ChangeFeed,
{
    let mut retry_delay = INITIAL_RETRY_DELAY;
    let mut debounce_at: Option<Instant> = None;
    'run: loop {
        debug!("Subscribing to change feed");
        let mut rx = feed.subscribe();
        let reason = loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'run,
                _ = maybe_sleep_until(debounce_at) => {
                    debounce_at = None;
                    fire(&handler);
                }
                event = rx.recv() => match event {
                    Some(FeedEvent::Subscribed) => {
                        debug!("Change feed subscribed");
                        connected.store(true, Ordering::Relaxed);
                        retry_delay = INITIAL_RETRY_DELAY;
                    }
                    Some(FeedEvent::Change(topic)) => {
                        debug!("Change event on {:?}", topic);
                        debounce_at = Some(Instant::now() + DEBOUNCE_WINDOW);
                    }
                    Some(FeedEvent::Error) => break "errored",
                    Some(FeedEvent::TimedOut) => break "timed out",
                    Some(FeedEvent::Closed) | None => break "closed",
                },
                changed = hidden.changed() => {
                    if changed.is_err() {
                        break 'run;
                    }
                    if !*hidden.borrow() {
                        debug!("Page visible again, resubscribing");
                        retry_delay = INITIAL_RETRY_DELAY;
                        debounce_at = None;
                        fire(&handler);
                        continue 'run;
                    }
                }
            }
        };

        connected.store(false, Ordering::Relaxed);
        warn!(
            "Change feed {}; resubscribing in {}ms",
            reason,
            retry_delay.as_millis()
        );
        let retry_at = Instant::now() + retry_delay;
        retry_delay = (retry_delay * 2).min(MAX_RETRY_DELAY);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break 'run,
                _ = tokio::time::sleep_until(retry_at) => continue 'run,
                _ = maybe_sleep_until(debounce_at) => {
                    debounce_at = None;
                    fire(&handler);
                }
                changed = hidden.changed() => {
                    if changed.is_err() {
                        break 'run;
                    }
                    if !*hidden.borrow() {
                        debug!("Page visible again, reconnecting now");
                        retry_delay = INITIAL_RETRY_DELAY;
                        debounce_at = None;
                        fire(&handler);
                        continue 'run;
                    }
                }
            }
        }
    }
    connected.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[derive(Clone, Default)]
    struct ScriptedFeed {
        inner: Arc<Mutex<FeedInner>>,
    }

    #[derive(Default)]
    struct FeedInner {
        senders: Vec<mpsc::Sender<FeedEvent>>,
        subscribe_count: u32,
        auto_subscribe: bool,
    }

    impl ScriptedFeed {
        fn new(auto_subscribe: bool) -> Self {
            let feed = Self::default();
            feed.inner.lock().unwrap().auto_subscribe = auto_subscribe;
            feed
        }

        fn subscribe_count(&self) -> u32 {
            self.inner.lock().unwrap().subscribe_count
        }

        async fn push(&self, event: FeedEvent) {
            let sender = self
                .inner
                .lock()
                .unwrap()
                .senders
                .last()
                .cloned()
                .unwrap();
            sender.send(event).await.unwrap();
        }
    }

    impl ChangeFeed for ScriptedFeed {
        fn subscribe(&self) -> mpsc::Receiver<FeedEvent> {
            let (tx, rx) = mpsc::channel(32);
            let mut inner = self.inner.lock().unwrap();
            if inner.auto_subscribe {
                tx.try_send(FeedEvent::Subscribed).ok();
            }
            inner.senders.push(tx);
            inner.subscribe_count += 1;
            rx
        }
    }

    fn counter_handler(fires: &Arc<AtomicU32>) -> impl FnMut() + Send + 'static {
        let fires = fires.clone();
        move || {
            fires.fetch_add(1, Ordering::SeqCst);
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_fires_once_after_the_window() {
        let feed = ScriptedFeed::new(true);
        let fires = Arc::new(AtomicU32::new(0));
        let (_hidden_tx, hidden_rx) = watch::channel(false);
        let _listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;

        feed.push(FeedEvent::Change(Topic::ConversationMetadata)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        feed.push(FeedEvent::Change(Topic::Notes)).await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        feed.push(FeedEvent::Change(Topic::Contacts)).await;

        // 500ms after the last event, not the first.
        tokio::time::sleep(Duration::from_millis(498)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(4)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(5_000)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_delay_doubles_up_to_the_cap() {
        let feed = ScriptedFeed::new(false);
        let fires = Arc::new(AtomicU32::new(0));
        let (_hidden_tx, hidden_rx) = watch::channel(false);
        let _listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;
        assert_eq!(feed.subscribe_count(), 1);

        let mut expected_count = 1;
        for delay_ms in [3_000u64, 6_000, 12_000, 24_000, 30_000, 30_000] {
            feed.push(FeedEvent::Error).await;
            settle().await;
            tokio::time::sleep(Duration::from_millis(delay_ms - 2)).await;
            assert_eq!(feed.subscribe_count(), expected_count);
            tokio::time::sleep(Duration::from_millis(4)).await;
            expected_count += 1;
            assert_eq!(feed.subscribe_count(), expected_count);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_subscription_resets_the_delay() {
        let feed = ScriptedFeed::new(true);
        let fires = Arc::new(AtomicU32::new(0));
        let (_hidden_tx, hidden_rx) = watch::channel(false);
        let _listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;

        for round in 2..=4u32 {
            feed.push(FeedEvent::Error).await;
            settle().await;
            tokio::time::sleep(Duration::from_millis(3_000)).await;
            settle().await;
            assert_eq!(feed.subscribe_count(), round);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_and_close_also_trigger_resubscribe() {
        let feed = ScriptedFeed::new(true);
        let fires = Arc::new(AtomicU32::new(0));
        let (_hidden_tx, hidden_rx) = watch::channel(false);
        let listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;
        assert!(listener.connected());

        feed.push(FeedEvent::TimedOut).await;
        settle().await;
        assert!(!listener.connected());
        tokio::time::sleep(Duration::from_millis(3_001)).await;
        assert_eq!(feed.subscribe_count(), 2);

        feed.push(FeedEvent::Closed).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(3_001)).await;
        assert_eq!(feed.subscribe_count(), 3);
        settle().await;
        assert!(listener.connected());
    }

    #[tokio::test(start_paused = true)]
    async fn regaining_visibility_reconnects_now_and_fires_once() {
        let feed = ScriptedFeed::new(true);
        let fires = Arc::new(AtomicU32::new(0));
        let (hidden_tx, hidden_rx) = watch::channel(false);
        let _listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;

        feed.push(FeedEvent::Error).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        hidden_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        hidden_tx.send(false).unwrap();
        settle().await;

        // Immediate resubscribe, one callback, pending retry abandoned.
        assert_eq!(feed.subscribe_count(), 2);
        assert_eq!(fires.load(Ordering::SeqCst), 1);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(feed.subscribe_count(), 2);

        // The retry delay was reset as well.
        feed.push(FeedEvent::Error).await;
        settle().await;
        tokio::time::sleep(Duration::from_millis(3_001)).await;
        assert_eq!(feed.subscribe_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn losing_visibility_changes_nothing() {
        let feed = ScriptedFeed::new(true);
        let fires = Arc::new(AtomicU32::new(0));
        let (hidden_tx, hidden_rx) = watch::channel(false);
        let listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;

        hidden_tx.send(true).unwrap();
        tokio::time::sleep(Duration::from_millis(60_000)).await;
        assert_eq!(feed.subscribe_count(), 1);
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        assert!(listener.connected());
    }

    #[tokio::test(start_paused = true)]
    async fn swapped_handler_is_read_at_fire_time() {
        let feed = ScriptedFeed::new(true);
        let first = Arc::new(AtomicU32::new(0));
        let second = Arc::new(AtomicU32::new(0));
        let (_hidden_tx, hidden_rx) = watch::channel(false);
        let listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&first));
        settle().await;

        listener.set_on_change(counter_handler(&second));
        feed.push(FeedEvent::Change(Topic::ContactLabels)).await;
        tokio::time::sleep(Duration::from_millis(501)).await;

        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_work() {
        let feed = ScriptedFeed::new(true);
        let fires = Arc::new(AtomicU32::new(0));
        let (_hidden_tx, hidden_rx) = watch::channel(false);
        let listener = RealtimeListener::spawn(feed.clone(), hidden_rx, counter_handler(&fires));
        settle().await;

        feed.push(FeedEvent::Change(Topic::Notes)).await;
        settle().await;
        listener.shutdown();

        tokio::time::sleep(Duration::from_millis(60_000)).await;
        assert_eq!(fires.load(Ordering::SeqCst), 0);
        assert_eq!(feed.subscribe_count(), 1);
        assert!(!listener.connected());
    }
}
