//! Chime and desktop-notification decisions for inbound messages.
//!
//! The engine compares consecutive snapshots and remembers the freshness
//! timestamp it last saw for every conversation id. A conversation is worth
//! alerting on when its last message is inbound, it is unassigned or assigned
//! to the current agent, and its freshness moved. Every pass records the seen
//! timestamps even when an alert is skipped, so a suppressed event never
//! alerts late.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::chime::ChimeSound;
use crate::model::{Conversation, Direction};

/// Minimum spacing between chimes, shared by every alert source.
pub const CHIME_COOLDOWN: Duration = Duration::from_millis(3_000);
/// Window after an agent sends a message during which nothing alerts.
pub const SENT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(5_000);

pub const NOTIFICATION_ICON: &str = "/favicon.ico";
const PREVIEW_CHARS: usize = 60;

/// Per-client state reported over the socket: page visibility, browser
/// notification permission, the user toggle and the signed-in agent.
#[derive(Debug, Clone)]
pub struct AlertContext {
    pub hidden: bool,
    pub permission_granted: bool,
    pub notifications_enabled: bool,
    pub agent_id: Option<String>,
}

impl Default for AlertContext {
    fn default() -> Self {
        Self {
            hidden: false,
            permission_granted: false,
            notifications_enabled: true,
            agent_id: None,
        }
    }
}

/// Desktop notification payload forwarded to the browser. The tag lets the
/// browser collapse repeats for the same conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesktopNotification {
    pub tag: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    pub icon: String,
}

/// Where alert side effects land. Implementations must swallow delivery
/// failures; alerting is best-effort by contract.
pub trait AlertSink: Send + 'static {
    fn play_chime(&self, sound: ChimeSound);
    fn notify(&self, notification: DesktopNotification);
}

/// Shared chime rate limit. Clones share one window, which is what keeps a
/// handoff beep and a message chime from stacking in the same instant.
#[derive(Debug, Clone)]
pub struct ChimeCooldown {
    origin: Instant,
    last_claim_ms: Arc<AtomicU64>,
}

impl ChimeCooldown {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_claim_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Claim the window. Returns true when enough time has passed since the
    /// previous successful claim; a refused claim leaves the window intact.
    pub fn try_claim(&self) -> bool {
        // 0 means "never claimed", so real claims are offset by one.
        let now_ms = self.origin.elapsed().as_millis() as u64 + 1;
        let last = self.last_claim_ms.load(Ordering::Relaxed);
        if last == 0 || now_ms - last >= CHIME_COOLDOWN.as_millis() as u64 {
            self.last_claim_ms.store(now_ms, Ordering::Relaxed);
            true
        } else {
            false
        }
    }
}

impl Default for ChimeCooldown {
    fn default() -> Self {
        Self::new()
    }
}

/// Novelty detector for inbound traffic.
pub struct MessageAlertEngine<K> {
    sink: K,
    cooldown: ChimeCooldown,
    last_active: HashMap<String, String>,
    last_sent_at: Option<Instant>,
}

impl<K: AlertSink> MessageAlertEngine<K> {
    pub fn new(sink: K, cooldown: ChimeCooldown) -> Self {
        Self {
            sink,
            cooldown,
            last_active: HashMap::new(),
            last_sent_at: None,
        }
    }

    /// Record that the agent just sent a message. Alerts are suppressed for
    /// [`SENT_SUPPRESSION_WINDOW`] afterwards regardless of conversation.
    pub fn mark_sent(&mut self) {
        self.last_sent_at = Some(Instant::now());
    }

    pub fn on_snapshot(&mut self, snapshot: &[Conversation], ctx: &AlertContext) {
        let suppressed = self
            .last_sent_at
            .is_some_and(|at| at.elapsed() < SENT_SUPPRESSION_WINDOW);

        let mut fresh: Vec<&Conversation> = Vec::new();
        for conv in snapshot {
            let ts = conv.freshness();
            let novel = match self.last_active.get(&conv.id) {
                Some(prev) => prev != ts,
                // Never seen before: only a real timestamp counts.
                None => !ts.is_empty(),
            };
            let inbound = conv
                .last_message
                .as_ref()
                .is_some_and(|m| m.direction == Direction::Inbound);
            let mine = match (&conv.assigned_agent_id, &ctx.agent_id) {
                (None, _) => true,
                (Some(agent), Some(me)) => agent == me,
                (Some(_), None) => false,
            };
            if novel && inbound && mine && !suppressed {
                fresh.push(conv);
            }
            self.last_active.insert(conv.id.clone(), ts.to_string());
        }

        if fresh.is_empty() || !ctx.notifications_enabled {
            return;
        }
        if self.cooldown.try_claim() {
            self.sink.play_chime(ChimeSound::Message);
        }
        if ctx.permission_granted && ctx.hidden {
            for conv in fresh {
                self.sink.notify(message_notification(conv));
            }
        }
    }
}

fn message_notification(conv: &Conversation) -> DesktopNotification {
    let preview: String = conv
        .last_message
        .as_ref()
        .map(|m| m.content.chars().take(PREVIEW_CHARS).collect())
        .unwrap_or_default();
    DesktopNotification {
        tag: format!("message-{}", conv.id),
        title: format!("{}: {}", conv.display_name(), preview),
        body: None,
        icon: NOTIFICATION_ICON.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingSink, inbound, outbound};

    fn new_engine(sink: &RecordingSink) -> MessageAlertEngine<RecordingSink> {
        MessageAlertEngine::new(sink.clone(), ChimeCooldown::new())
    }

    fn hidden_ctx() -> AlertContext {
        AlertContext {
            hidden: true,
            permission_granted: true,
            ..AlertContext::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn new_inbound_conversation_chimes() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        engine.on_snapshot(&[inbound("a", "t1")], &AlertContext::default());
        assert_eq!(sink.chimes(), vec![ChimeSound::Message]);
        // Visible page: chime only, no desktop notification.
        assert!(sink.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unchanged_snapshot_stays_silent() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        let snapshot = [inbound("a", "t1")];
        engine.on_snapshot(&snapshot, &AlertContext::default());
        tokio::time::sleep(CHIME_COOLDOWN).await;
        engine.on_snapshot(&snapshot, &AlertContext::default());
        assert_eq!(sink.chimes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn outbound_last_message_never_alerts() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        engine.on_snapshot(&[outbound("a", "t1", "le escribimos")], &hidden_ctx());
        assert!(sink.chimes().is_empty());
        assert!(sink.notifications().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn assignment_filter_respects_current_agent() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        let ctx = AlertContext {
            agent_id: Some("agent-1".to_string()),
            ..AlertContext::default()
        };

        let mut foreign = inbound("a", "t1");
        foreign.assigned_agent_id = Some("agent-2".to_string());
        engine.on_snapshot(&[foreign], &ctx);
        assert!(sink.chimes().is_empty());

        let mut mine = inbound("b", "t1");
        mine.assigned_agent_id = Some("agent-1".to_string());
        engine.on_snapshot(&[mine], &ctx);
        assert_eq!(sink.chimes().len(), 1);

        // Assigned conversations stay quiet for anonymous sessions.
        let mut anon = inbound("c", "t1");
        anon.assigned_agent_id = Some("agent-1".to_string());
        let mut engine2 = new_engine(&sink);
        engine2.on_snapshot(&[anon], &AlertContext::default());
        assert_eq!(sink.chimes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_timestamp_is_not_novel_until_it_fills_in() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        engine.on_snapshot(&[inbound("a", "")], &AlertContext::default());
        assert!(sink.chimes().is_empty());

        engine.on_snapshot(&[inbound("a", "t1")], &AlertContext::default());
        assert_eq!(sink.chimes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn sent_suppression_covers_five_seconds() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        engine.mark_sent();

        tokio::time::sleep(Duration::from_millis(4_999)).await;
        engine.on_snapshot(&[inbound("a", "t1")], &AlertContext::default());
        assert!(sink.chimes().is_empty());

        // The suppressed timestamp was still recorded; it never alerts late.
        tokio::time::sleep(Duration::from_millis(2)).await;
        engine.on_snapshot(&[inbound("a", "t1")], &AlertContext::default());
        assert!(sink.chimes().is_empty());

        // New freshness after the window alerts normally.
        engine.on_snapshot(&[inbound("a", "t2")], &AlertContext::default());
        assert_eq!(sink.chimes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn chime_cooldown_collapses_nearby_bursts() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        engine.on_snapshot(&[inbound("a", "t1")], &AlertContext::default());
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        engine.on_snapshot(&[inbound("b", "t1")], &AlertContext::default());
        assert_eq!(sink.chimes().len(), 1);

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        engine.on_snapshot(&[inbound("c", "t1")], &AlertContext::default());
        assert_eq!(sink.chimes().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_require_permission_and_a_hidden_page() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);

        let visible = AlertContext {
            permission_granted: true,
            ..AlertContext::default()
        };
        engine.on_snapshot(&[inbound("a", "t1")], &visible);
        assert!(sink.notifications().is_empty());

        let no_permission = AlertContext {
            hidden: true,
            ..AlertContext::default()
        };
        engine.on_snapshot(&[inbound("a", "t2")], &no_permission);
        assert!(sink.notifications().is_empty());

        engine.on_snapshot(&[inbound("a", "t3")], &hidden_ctx());
        let notes = sink.notifications();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].tag, "message-a");
        assert_eq!(notes[0].icon, NOTIFICATION_ICON);
    }

    #[tokio::test(start_paused = true)]
    async fn notification_title_is_name_and_truncated_preview() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        let mut conv = inbound("a", "t1");
        conv.contact_name = Some("Ana".to_string());
        if let Some(last) = conv.last_message.as_mut() {
            last.content = "x".repeat(80);
        }
        engine.on_snapshot(&[conv], &hidden_ctx());
        let notes = sink.notifications();
        assert_eq!(notes[0].title, format!("Ana: {}", "x".repeat(60)));
        assert_eq!(notes[0].body, None);
    }

    #[tokio::test(start_paused = true)]
    async fn notifications_have_no_cooldown_of_their_own() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        engine.on_snapshot(&[inbound("a", "t1"), inbound("b", "t1")], &hidden_ctx());
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        engine.on_snapshot(
            &[inbound("a", "t1"), inbound("b", "t1"), inbound("c", "t1")],
            &hidden_ctx(),
        );

        // One chime across both bursts, one notification per conversation.
        assert_eq!(sink.chimes().len(), 1);
        let tags: Vec<String> = sink.notifications().iter().map(|n| n.tag.clone()).collect();
        assert_eq!(tags, vec!["message-a", "message-b", "message-c"]);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_toggle_stays_silent_but_records() {
        let sink = RecordingSink::default();
        let mut engine = new_engine(&sink);
        let disabled = AlertContext {
            notifications_enabled: false,
            ..AlertContext::default()
        };
        engine.on_snapshot(&[inbound("a", "t1")], &disabled);
        assert!(sink.chimes().is_empty());

        // Re-enabling does not retroactively alert on what was already seen.
        engine.on_snapshot(&[inbound("a", "t1")], &AlertContext::default());
        assert!(sink.chimes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_refusal_leaves_the_window_intact() {
        let cooldown = ChimeCooldown::new();
        assert!(cooldown.try_claim());
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert!(!cooldown.try_claim());
        tokio::time::sleep(Duration::from_millis(1_000)).await;
        // 3s after the successful claim, not 1s after the refused one.
        assert!(cooldown.try_claim());
    }
}
