use anyhow::{Context, Result};
use convo_sync::Topic;

use super::InboxRepository;
use crate::models::ConversationNote;

impl InboxRepository {
    /// Notes for one conversation, oldest first. Notes are insert-only.
    pub async fn notes_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<ConversationNote>> {
        let notes = sqlx::query_as::<_, ConversationNote>(
            "SELECT id, conversation_id, agent_id, body, created_at
             FROM conversation_notes WHERE conversation_id = ?
             ORDER BY created_at, rowid",
        )
        .bind(conversation_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(notes)
    }

    pub async fn insert_note(
        &self,
        conversation_id: &str,
        agent_id: Option<&str>,
        body: &str,
    ) -> Result<ConversationNote> {
        let note = ConversationNote::new(
            conversation_id.to_string(),
            agent_id.map(str::to_string),
            body.to_string(),
        );

        sqlx::query(
            "INSERT INTO conversation_notes (id, conversation_id, agent_id, body, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&note.id)
        .bind(&note.conversation_id)
        .bind(&note.agent_id)
        .bind(&note.body)
        .bind(note.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert note")?;

        self.bus.publish(Topic::Notes);

        Ok(note)
    }

    pub async fn count_notes(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversation_notes")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
