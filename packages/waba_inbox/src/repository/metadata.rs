use anyhow::{Context, Result};
use convo_sync::Topic;

use super::InboxRepository;
use crate::models::ConversationMeta;

impl InboxRepository {
    pub async fn get_conversation_meta(
        &self,
        conversation_id: &str,
    ) -> Result<Option<ConversationMeta>> {
        let meta = sqlx::query_as::<_, ConversationMeta>(
            "SELECT conversation_id, status, assigned_agent_id, updated_at
             FROM conversation_metadata WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(meta)
    }

    /// All tracked rows, for merging into the provider conversation list.
    pub async fn all_conversation_meta(&self) -> Result<Vec<ConversationMeta>> {
        let rows = sqlx::query_as::<_, ConversationMeta>(
            "SELECT conversation_id, status, assigned_agent_id, updated_at
             FROM conversation_metadata",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn set_conversation_status(
        &self,
        conversation_id: &str,
        status: &str,
    ) -> Result<ConversationMeta> {
        sqlx::query(
            r#"
            INSERT INTO conversation_metadata (conversation_id, status, updated_at)
            VALUES (?, ?, unixepoch())
            ON CONFLICT(conversation_id)
            DO UPDATE SET status = excluded.status, updated_at = unixepoch()
            "#,
        )
        .bind(conversation_id)
        .bind(status)
        .execute(&self.pool)
        .await
        .context("Failed to upsert conversation status")?;

        self.bus.publish(Topic::ConversationMetadata);

        self.get_conversation_meta(conversation_id)
            .await?
            .context("Conversation metadata missing after upsert")
    }

    /// Assign or unassign (None) an agent.
    pub async fn set_conversation_assignment(
        &self,
        conversation_id: &str,
        agent_id: Option<&str>,
    ) -> Result<ConversationMeta> {
        sqlx::query(
            r#"
            INSERT INTO conversation_metadata (conversation_id, assigned_agent_id, updated_at)
            VALUES (?, ?, unixepoch())
            ON CONFLICT(conversation_id)
            DO UPDATE SET assigned_agent_id = excluded.assigned_agent_id, updated_at = unixepoch()
            "#,
        )
        .bind(conversation_id)
        .bind(agent_id)
        .execute(&self.pool)
        .await
        .context("Failed to upsert conversation assignment")?;

        self.bus.publish(Topic::ConversationMetadata);

        self.get_conversation_meta(conversation_id)
            .await?
            .context("Conversation metadata missing after upsert")
    }
}
