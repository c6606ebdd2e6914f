//! In-process change feed connecting repository writes to live sync sessions.
//!
//! Every repository mutation of a watched domain publishes a [`ChangeEvent`]
//! here. Each websocket connection subscribes through the [`ChangeFeed`]
//! impl, which bridges the broadcast channel into the per-subscription
//! receiver the listener expects.

use convo_sync::{ChangeFeed, FeedEvent, Topic};
use tokio::sync::{broadcast, mpsc};
use tracing::warn;

const BUS_CAPACITY: usize = 256;
const BRIDGE_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub topic: Topic,
}

#[derive(Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(BUS_CAPACITY);
        Self { tx }
    }

    /// Announce a change in one watched domain. A send error only means no
    /// session is connected right now.
    pub fn publish(&self, topic: Topic) {
        let _ = self.tx.send(ChangeEvent { topic });
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed for ChangeBus {
    fn subscribe(&self) -> mpsc::Receiver<FeedEvent> {
        let mut source = self.tx.subscribe();
        let (tx, rx) = mpsc::channel(BRIDGE_CAPACITY);
        tokio::spawn(async move {
            if tx.send(FeedEvent::Subscribed).await.is_err() {
                return;
            }
            loop {
                match source.recv().await {
                    Ok(event) => {
                        if tx.send(FeedEvent::Change(event.topic)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // The subscriber resubscribes and refetches, so the
                        // missed events are recovered on reconnect.
                        warn!("Change bus subscriber lagged by {} events", missed);
                        let _ = tx.send(FeedEvent::Error).await;
                        break;
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        let _ = tx.send(FeedEvent::Closed).await;
                        break;
                    }
                }
            }
        });
        rx
    }
}
