//! # Conversation Sync
//!
//! Freshness and notification engine for a WhatsApp Business inbox. This crate
//! has no HTTP or database dependencies; it coordinates four cooperating pieces
//! around a shared conversation snapshot:
//!
//! - [`BackoffPoller`]: sequential polling with exponential backoff on failure
//! - [`RealtimeListener`]: debounced invalidation driven by a [`ChangeFeed`]
//! - [`SnapshotCache`]: diff-gated snapshot replacement over a [`ConversationSource`]
//! - [`HandoffDetector`] / [`MessageAlertEngine`]: chime and desktop-notification
//!   decisions derived from consecutive snapshots
//!
//! [`SyncEngine`] wires all of them together for one client session and emits
//! [`EngineEvent`]s that a transport layer forwards to the UI.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use convo_sync::{ChangeFeed, Conversation, ConversationSource, EngineOptions, SyncEngine};
//! use std::future::Future;
//! use tokio::sync::mpsc;
//!
//! struct Source;
//!
//! impl ConversationSource for Source {
//!     fn list_conversations(
//!         &self,
//!     ) -> impl Future<Output = anyhow::Result<Vec<Conversation>>> + Send {
//!         async { Ok(Vec::new()) }
//!     }
//! }
//!
//! struct Feed;
//!
//! impl ChangeFeed for Feed {
//!     fn subscribe(&self) -> mpsc::Receiver<convo_sync::FeedEvent> {
//!         let (tx, rx) = mpsc::channel(16);
//!         tokio::spawn(async move {
//!             let _ = tx.send(convo_sync::FeedEvent::Subscribed).await;
//!         });
//!         rx
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let (engine, mut events) = SyncEngine::spawn(Source, Feed, EngineOptions::default());
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     engine.shutdown();
//! }
//! ```

pub mod alerts;
pub mod chime;
pub mod engine;
pub mod handoff;
pub mod model;
pub mod poller;
pub mod realtime;
pub mod snapshot;
#[cfg(test)]
pub(crate) mod test_support;

pub use alerts::{AlertContext, AlertSink, ChimeCooldown, DesktopNotification, MessageAlertEngine};
pub use chime::ChimeSound;
pub use engine::{EngineCommand, EngineEvent, EngineOptions, SyncEngine, SyncStatus};
pub use handoff::HandoffDetector;
pub use model::{Conversation, Direction, LabelRef, LastMessage};
pub use poller::{BackoffPoller, PollerStatus};
pub use realtime::{ChangeFeed, FeedEvent, RealtimeListener, Topic};
pub use snapshot::{ConversationSource, SnapshotCache};
