//! Detection of conversations where the bot asked for a human takeover.
//!
//! Classification looks only at the newest message: it must be outbound and
//! its lowercased content must contain one of the trigger phrases the bot
//! uses when it escalates. The set of handoff ids is recomputed from scratch
//! on every snapshot; acknowledgements are sticky for the session and may be
//! recorded before the conversation ever shows up.

use std::collections::HashSet;

use tracing::debug;

use crate::alerts::{AlertContext, AlertSink, ChimeCooldown, DesktopNotification, NOTIFICATION_ICON};
use crate::chime::ChimeSound;
use crate::model::{Conversation, Direction};

/// Escalation phrases emitted by the bot flow, already lowercased.
pub const HANDOFF_PATTERNS: [&str; 4] = [
    "conectar con un asesor",
    "conectar con una persona",
    "transferir a un asesor",
    "transferir a una persona",
];

/// Whether the newest message hands the conversation to a human.
pub fn is_handoff_request(conv: &Conversation) -> bool {
    let Some(last) = &conv.last_message else {
        return false;
    };
    if last.direction != Direction::Outbound {
        return false;
    }
    let text = last.content.to_lowercase();
    HANDOFF_PATTERNS.iter().any(|phrase| text.contains(phrase))
}

pub struct HandoffDetector<K> {
    sink: K,
    cooldown: ChimeCooldown,
    current_ids: Vec<String>,
    previous_ids: HashSet<String>,
    acknowledged: HashSet<String>,
}

impl<K: AlertSink> HandoffDetector<K> {
    pub fn new(sink: K, cooldown: ChimeCooldown) -> Self {
        Self {
            sink,
            cooldown,
            current_ids: Vec::new(),
            previous_ids: HashSet::new(),
            acknowledged: HashSet::new(),
        }
    }

    /// Reclassify the snapshot and alert once per conversation that just
    /// entered the handoff set. Alerts fire regardless of page visibility;
    /// desktop notifications still need browser permission.
    pub fn on_snapshot(&mut self, snapshot: &[Conversation], ctx: &AlertContext) {
        let handoffs: Vec<&Conversation> = snapshot
            .iter()
            .filter(|conv| is_handoff_request(conv))
            .collect();

        let brand_new: Vec<&Conversation> = handoffs
            .iter()
            .filter(|conv| {
                !self.previous_ids.contains(&conv.id) && !self.acknowledged.contains(&conv.id)
            })
            .copied()
            .collect();

        if !brand_new.is_empty() {
            debug!("{} conversation(s) now waiting for a human", brand_new.len());
            if self.cooldown.try_claim() {
                self.sink.play_chime(ChimeSound::Handoff);
            }
            if ctx.permission_granted {
                for conv in &brand_new {
                    self.sink.notify(handoff_notification(conv));
                }
            }
        }

        self.previous_ids = handoffs.iter().map(|conv| conv.id.clone()).collect();
        self.current_ids = handoffs.iter().map(|conv| conv.id.clone()).collect();
    }

    /// Silence a conversation for the rest of the session. Idempotent, and
    /// valid for ids that have not appeared yet.
    pub fn acknowledge(&mut self, conversation_id: &str) {
        self.acknowledged.insert(conversation_id.to_string());
    }

    /// Every conversation currently classified as a handoff, in snapshot
    /// order.
    pub fn all_handoff_ids(&self) -> &[String] {
        &self.current_ids
    }

    /// Handoffs that still need attention: the current set minus everything
    /// acknowledged. Recomputed on every read.
    pub fn alerting_ids(&self) -> Vec<String> {
        self.current_ids
            .iter()
            .filter(|id| !self.acknowledged.contains(id.as_str()))
            .cloned()
            .collect()
    }
}

fn handoff_notification(conv: &Conversation) -> DesktopNotification {
    DesktopNotification {
        tag: format!("handoff-{}", conv.id),
        title: format!("{} necesita ayuda de una persona", conv.display_name()),
        body: None,
        icon: NOTIFICATION_ICON.to_string(),
    }
}
