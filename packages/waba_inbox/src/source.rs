//! Provider conversation list merged with local enrichment.
//!
//! The provider owns the conversation list and message history; the inbox
//! layers workflow status, assignment, contact renames and labels on top.
//! One merge path serves both the HTTP list endpoint and the per-session
//! sync engine.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use convo_sync::{Conversation, ConversationSource, Direction, LabelRef, LastMessage};
use tracing::warn;
use waba_client::{ConversationQuery, ConversationRecord};

use crate::models::ConversationMeta;
use crate::provider::ProviderResolver;
use crate::repository::InboxRepository;

pub const DEFAULT_LIST_LIMIT: u32 = 50;
pub const MAX_LIST_LIMIT: u32 = 100;

/// Enrichment fields requested from the provider alongside the base records.
const KAPSO_FIELDS: &str =
    "contact_name,messages_count,last_message_type,last_message_text,last_inbound_at,last_outbound_at";

#[derive(Clone)]
pub struct InboxConversationSource {
    resolver: Arc<ProviderResolver>,
    repository: Arc<InboxRepository>,
}

impl InboxConversationSource {
    pub fn new(resolver: Arc<ProviderResolver>, repository: Arc<InboxRepository>) -> Self {
        Self {
            resolver,
            repository,
        }
    }

    /// Fetch the provider list and merge the local workflow state in.
    ///
    /// A provider failure fails the fetch; an enrichment failure only logs
    /// and degrades to the unenriched provider data.
    pub async fn fetch_merged(
        &self,
        status: Option<&str>,
        limit: Option<u32>,
    ) -> Result<Vec<Conversation>> {
        let client = self.resolver.client().await?;
        let phone_number_id = self.resolver.phone_number_id().await?;

        let query = ConversationQuery {
            status: status.map(str::to_string),
            limit: Some(limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT)),
            fields: Some(KAPSO_FIELDS.to_string()),
        };
        let records = client.list_conversations(&phone_number_id, &query).await?;

        let enrichment = match self.load_enrichment().await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                warn!("Conversation enrichment failed, serving provider data only: {:#}", e);
                Enrichment::default()
            }
        };

        Ok(records
            .into_iter()
            .map(|record| merge_record(record, &enrichment))
            .collect())
    }

    async fn load_enrichment(&self) -> Result<Enrichment> {
        let meta = self
            .repository
            .all_conversation_meta()
            .await?
            .into_iter()
            .map(|m| (m.conversation_id.clone(), m))
            .collect();
        let labels = self.repository.labels_by_phone().await?;
        let contact_names = self
            .repository
            .all_contacts()
            .await?
            .into_iter()
            .map(|c| (c.phone_number, c.display_name))
            .collect();
        let agent_names = self.repository.user_names().await?;

        Ok(Enrichment {
            meta,
            labels,
            contact_names,
            agent_names,
        })
    }
}

impl ConversationSource for InboxConversationSource {
    fn list_conversations(&self) -> impl Future<Output = Result<Vec<Conversation>>> + Send {
        self.fetch_merged(None, None)
    }
}

#[derive(Default)]
struct Enrichment {
    meta: HashMap<String, ConversationMeta>,
    labels: HashMap<String, Vec<LabelRef>>,
    contact_names: HashMap<String, String>,
    agent_names: HashMap<String, String>,
}

fn merge_record(record: ConversationRecord, enrichment: &Enrichment) -> Conversation {
    let phone_number = record.phone_number.unwrap_or_default();
    let kapso = record.kapso.unwrap_or_default();

    let meta = enrichment.meta.get(&record.id);
    let status = meta
        .map(|m| m.status.clone())
        .unwrap_or_else(|| "abierto".to_string());
    let assigned_agent_id = meta.and_then(|m| m.assigned_agent_id.clone());
    let assigned_agent_name = assigned_agent_id
        .as_ref()
        .and_then(|id| enrichment.agent_names.get(id).cloned());

    // A locally edited name wins over what the provider reports.
    let contact_name = enrichment
        .contact_names
        .get(&phone_number)
        .cloned()
        .or(kapso.contact_name);

    let labels = enrichment
        .labels
        .get(&phone_number)
        .cloned()
        .unwrap_or_default();

    let direction = message_direction(
        kapso.last_inbound_at.as_deref(),
        kapso.last_outbound_at.as_deref(),
    );
    let last_message = match (kapso.last_message_text, kapso.last_message_type) {
        (None, None) => None,
        (text, kind) => Some(LastMessage {
            content: text.unwrap_or_default(),
            direction,
            kind,
        }),
    };

    let last_active_at = record.last_active_at.or_else(|| {
        newest(
            kapso.last_inbound_at.as_deref(),
            kapso.last_outbound_at.as_deref(),
        )
    });

    Conversation {
        id: record.id,
        phone_number,
        contact_name,
        last_message,
        last_active_at,
        provider_status: record.status,
        status,
        assigned_agent_id,
        assigned_agent_name,
        labels,
        messages_count: kapso.messages_count,
    }
}

fn parse_ts(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value).ok()
}

/// Direction of the newest message, from the inbound/outbound timestamps.
/// Inbound wins ties and parse failures; an alert that should not have fired
/// beats one that silently did not.
fn message_direction(last_inbound_at: Option<&str>, last_outbound_at: Option<&str>) -> Direction {
    let inbound = last_inbound_at.and_then(parse_ts);
    let outbound = last_outbound_at.and_then(parse_ts);
    match (inbound, outbound) {
        (Some(i), Some(o)) if o > i => Direction::Outbound,
        (None, Some(_)) => Direction::Outbound,
        _ => Direction::Inbound,
    }
}

fn newest(a: Option<&str>, b: Option<&str>) -> Option<String> {
    match (a, b) {
        (Some(a), Some(b)) => {
            let newer = match (parse_ts(a), parse_ts(b)) {
                (Some(ta), Some(tb)) if tb > ta => b,
                _ => a,
            };
            Some(newer.to_string())
        }
        (Some(a), None) => Some(a.to_string()),
        (None, Some(b)) => Some(b.to_string()),
        (None, None) => None,
    }
}
