//! Per-session wiring of poller, realtime listener, cache and alert engines.
//!
//! One engine serves one connected client. Commands flow in from the
//! transport (visibility, permission, acknowledgements, refresh requests) and
//! [`EngineEvent`]s flow out: snapshot replacements, sync status, handoff
//! sets, chimes and desktop notifications. The transport only forwards
//! frames; every decision lives here or further down.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::alerts::{AlertContext, AlertSink, ChimeCooldown, DesktopNotification, MessageAlertEngine};
use crate::chime::ChimeSound;
use crate::handoff::HandoffDetector;
use crate::model::Conversation;
use crate::poller::BackoffPoller;
use crate::realtime::{ChangeFeed, RealtimeListener};
use crate::snapshot::{ConversationSource, SnapshotCache};

/// Poll cadence for the conversation list.
pub const CONVERSATION_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

const STATUS_TICK: Duration = Duration::from_millis(1_000);
const EVENT_BUFFER: usize = 100;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub poll_interval: Duration,
    pub agent_id: Option<String>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            poll_interval: CONVERSATION_POLL_INTERVAL,
            agent_id: None,
        }
    }
}

/// Client-originated state changes and requests.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    Hello { agent_id: Option<String> },
    Visibility { hidden: bool },
    NotificationPermission { granted: bool },
    NotificationsEnabled { enabled: bool },
    MarkSent,
    AcknowledgeHandoff { conversation_id: String },
    Refresh,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    pub is_polling: bool,
    pub is_paused: bool,
    pub realtime_connected: bool,
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    Snapshot(Arc<Vec<Conversation>>),
    Handoffs {
        all_handoff_ids: Vec<String>,
        alerting_ids: Vec<String>,
    },
    Status(SyncStatus),
    Chime(ChimeSound),
    Notification(DesktopNotification),
}

/// Alert sink that feeds the engine's own event stream. Delivery is
/// best-effort: a full or closed buffer drops the alert.
#[derive(Clone)]
struct EventSink {
    tx: mpsc::Sender<EngineEvent>,
}

impl AlertSink for EventSink {
    fn play_chime(&self, sound: ChimeSound) {
        if self.tx.try_send(EngineEvent::Chime(sound)).is_err() {
            debug!("Dropped chime event");
        }
    }

    fn notify(&self, notification: DesktopNotification) {
        if self.tx.try_send(EngineEvent::Notification(notification)).is_err() {
            debug!("Dropped notification event");
        }
    }
}

/// Handle to a running engine. Dropping it tears the whole session down.
#[derive(Debug)]
pub struct SyncEngine {
    cancel: CancellationToken,
    commands: mpsc::UnboundedSender<EngineCommand>,
}

impl SyncEngine {
    pub fn spawn<S, F>(source: S, feed: F, options: EngineOptions) -> (Self, mpsc::Receiver<EngineEvent>)
    where
        S: ConversationSource,
        F: ChangeFeed,
    {
        let cancel = CancellationToken::new();
        let (events_tx, events_rx) = mpsc::channel(EVENT_BUFFER);
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (hidden_tx, hidden_rx) = watch::channel(false);
        let (enabled_tx, enabled_rx) = watch::channel(true);
        let (nudge_tx, nudge_rx) = mpsc::unbounded_channel();

        let cache = Arc::new(SnapshotCache::new(source));
        let poll_cache = cache.clone();
        let poller = BackoffPoller::spawn(
            move || {
                let cache = poll_cache.clone();
                async move { cache.fetch().await.map(|_| ()) }
            },
            options.poll_interval,
            enabled_rx,
            hidden_rx.clone(),
        );
        let listener = RealtimeListener::spawn(feed, hidden_rx, move || {
            let _ = nudge_tx.send(());
        });

        let sink = EventSink { tx: events_tx.clone() };
        let cooldown = ChimeCooldown::new();
        let state = EngineState {
            cache,
            poller,
            listener,
            hidden_tx,
            enabled_tx,
            ctx: AlertContext {
                agent_id: options.agent_id,
                ..AlertContext::default()
            },
            handoff: HandoffDetector::new(sink.clone(), cooldown.clone()),
            alerts: MessageAlertEngine::new(sink, cooldown),
            events: events_tx,
            last_status: None,
        };
        tokio::spawn(run_engine(state, commands_rx, nudge_rx, cancel.clone()));

        (Self { cancel, commands: commands_tx }, events_rx)
    }

    /// Queue a command. Silently ignored once the engine is gone.
    pub fn command(&self, command: EngineCommand) {
        let _ = self.commands.send(command);
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct EngineState<S: ConversationSource> {
    cache: Arc<SnapshotCache<S>>,
    poller: BackoffPoller,
    listener: RealtimeListener,
    hidden_tx: watch::Sender<bool>,
    enabled_tx: watch::Sender<bool>,
    ctx: AlertContext,
    handoff: HandoffDetector<EventSink>,
    alerts: MessageAlertEngine<EventSink>,
    events: mpsc::Sender<EngineEvent>,
    last_status: Option<SyncStatus>,
}

async fn run_engine<S: ConversationSource>(
    mut state: EngineState<S>,
    mut commands: mpsc::UnboundedReceiver<EngineCommand>,
    mut nudges: mpsc::UnboundedReceiver<()>,
    cancel: CancellationToken,
) {
    let mut snapshots = state.cache.subscribe();
    let mut status_tick = tokio::time::interval(STATUS_TICK);

    // Baseline snapshot so a client has a list before the first poll lands.
    if state.events.send(EngineEvent::Snapshot(state.cache.last())).await.is_err() {
        return;
    }

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => {
                    if !state.apply(command).await {
                        break;
                    }
                }
                None => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if !state.publish_snapshot(snapshot).await {
                    break;
                }
            }
            nudge = nudges.recv() => {
                if nudge.is_none() {
                    break;
                }
                if let Err(e) = state.cache.fetch().await {
                    warn!("Change-triggered fetch failed: {:#}", e);
                }
            }
            _ = status_tick.tick() => {
                if !state.publish_status().await {
                    break;
                }
            }
        }
    }

    let _ = state.enabled_tx.send(false);
    state.poller.stop();
    state.listener.shutdown();
}

impl<S: ConversationSource> EngineState<S> {
    /// Returns false when the event stream is gone and the engine must stop.
    async fn apply(&mut self, command: EngineCommand) -> bool {
        match command {
            EngineCommand::Hello { agent_id } => {
                self.ctx.agent_id = agent_id;
                true
            }
            EngineCommand::Visibility { hidden } => {
                self.ctx.hidden = hidden;
                self.hidden_tx.send_if_modified(|current| {
                    if *current != hidden {
                        *current = hidden;
                        true
                    } else {
                        false
                    }
                });
                true
            }
            EngineCommand::NotificationPermission { granted } => {
                self.ctx.permission_granted = granted;
                true
            }
            EngineCommand::NotificationsEnabled { enabled } => {
                self.ctx.notifications_enabled = enabled;
                true
            }
            EngineCommand::MarkSent => {
                self.alerts.mark_sent();
                if let Err(e) = self.cache.refresh().await {
                    warn!("Post-send refresh failed: {:#}", e);
                }
                true
            }
            EngineCommand::AcknowledgeHandoff { conversation_id } => {
                self.handoff.acknowledge(&conversation_id);
                self.publish_handoffs().await
            }
            EngineCommand::Refresh => {
                if let Err(e) = self.cache.refresh().await {
                    warn!("Manual refresh failed: {:#}", e);
                }
                true
            }
        }
    }

    async fn publish_snapshot(&mut self, snapshot: Arc<Vec<Conversation>>) -> bool {
        self.handoff.on_snapshot(&snapshot, &self.ctx);
        self.alerts.on_snapshot(&snapshot, &self.ctx);
        if self.events.send(EngineEvent::Snapshot(snapshot)).await.is_err() {
            return false;
        }
        self.publish_handoffs().await
    }

    async fn publish_handoffs(&mut self) -> bool {
        let event = EngineEvent::Handoffs {
            all_handoff_ids: self.handoff.all_handoff_ids().to_vec(),
            alerting_ids: self.handoff.alerting_ids(),
        };
        self.events.send(event).await.is_ok()
    }

    async fn publish_status(&mut self) -> bool {
        let poller = self.poller.status();
        let status = SyncStatus {
            is_polling: poller.is_polling,
            is_paused: poller.is_paused,
            realtime_connected: self.listener.connected(),
        };
        if self.last_status.as_ref() == Some(&status) {
            return true;
        }
        self.last_status = Some(status.clone());
        self.events.send(EngineEvent::Status(status)).await.is_ok()
    }
}
