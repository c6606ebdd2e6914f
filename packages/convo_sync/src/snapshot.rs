//! Diff-gated conversation snapshot cache.
//!
//! Every fetch pulls a full list from the [`ConversationSource`]. The cache
//! only publishes a new snapshot when [`meaningful_change`] says the UI would
//! care; [`SnapshotCache::refresh`] bypasses the diff for user-initiated
//! reloads. Concurrent fetches race benignly: whichever result lands last is
//! the one subscribers see.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tracing::debug;

use crate::model::{Conversation, meaningful_change};

/// Produces the current conversation list, already merged and enriched.
pub trait ConversationSource: Send + Sync + 'static {
    fn list_conversations(&self) -> impl Future<Output = Result<Vec<Conversation>>> + Send;
}

pub struct SnapshotCache<S> {
    source: S,
    updates: watch::Sender<Arc<Vec<Conversation>>>,
}

impl<S: ConversationSource> SnapshotCache<S> {
    pub fn new(source: S) -> Self {
        let (updates, _) = watch::channel(Arc::new(Vec::new()));
        Self { source, updates }
    }

    /// Receiver for snapshot replacements. The current value counts as seen;
    /// `changed()` resolves on the next publish.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Vec<Conversation>>> {
        self.updates.subscribe()
    }

    /// The snapshot most recently published.
    pub fn last(&self) -> Arc<Vec<Conversation>> {
        self.updates.borrow().clone()
    }

    /// Fetch and publish only if the result meaningfully differs from the
    /// cached snapshot. Returns whether subscribers were notified.
    pub async fn fetch(&self) -> Result<bool> {
        let next = Arc::new(self.source.list_conversations().await?);
        let changed = meaningful_change(&self.updates.borrow(), &next);
        if changed {
            debug!("Snapshot changed ({} conversations)", next.len());
            self.updates.send_replace(next);
        }
        Ok(changed)
    }

    /// Fetch and publish unconditionally.
    pub async fn refresh(&self) -> Result<()> {
        let next = Arc::new(self.source.list_conversations().await?);
        self.updates.send_replace(next);
        Ok(())
    }
}
