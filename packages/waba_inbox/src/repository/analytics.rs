use anyhow::Result;

use super::InboxRepository;
use crate::models::{AgentCount, AnalyticsReport, LabelCount, StatusCount};

impl InboxRepository {
    /// Aggregate counts over everything the inbox tracks locally. Only
    /// conversations an agent has touched (status, assignment) appear here.
    pub async fn analytics_report(&self) -> Result<AnalyticsReport> {
        let total_tracked: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM conversation_metadata")
            .fetch_one(&self.pool)
            .await?;

        let by_status = sqlx::query_as::<_, StatusCount>(
            "SELECT status, COUNT(*) as count FROM conversation_metadata
             GROUP BY status ORDER BY count DESC, status",
        )
        .fetch_all(&self.pool)
        .await?;

        let by_agent = sqlx::query_as::<_, AgentCount>(
            r#"
            SELECT m.assigned_agent_id as agent_id, u.display_name as agent_name, COUNT(*) as count
            FROM conversation_metadata m
            LEFT JOIN user_profiles u ON u.id = m.assigned_agent_id
            GROUP BY m.assigned_agent_id
            ORDER BY count DESC, agent_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let by_label = sqlx::query_as::<_, LabelCount>(
            r#"
            SELECT l.id as label_id, l.name as label_name, COUNT(cl.phone_number) as count
            FROM contact_labels l
            LEFT JOIN conversation_contact_labels cl ON cl.label_id = l.id
            GROUP BY l.id
            ORDER BY count DESC, label_name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let notes_count = self.count_notes().await?;

        Ok(AnalyticsReport {
            total_tracked,
            by_status,
            by_agent,
            by_label,
            notes_count,
        })
    }
}
