use std::collections::HashMap;

use anyhow::{Context, Result};
use convo_sync::{LabelRef, Topic};
use sqlx::Row;

use super::InboxRepository;
use crate::models::ContactLabel;

impl InboxRepository {
    pub async fn list_labels(&self) -> Result<Vec<ContactLabel>> {
        let labels = sqlx::query_as::<_, ContactLabel>(
            "SELECT id, name, color, created_at FROM contact_labels ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(labels)
    }

    pub async fn get_label(&self, id: &str) -> Result<Option<ContactLabel>> {
        let label = sqlx::query_as::<_, ContactLabel>(
            "SELECT id, name, color, created_at FROM contact_labels WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(label)
    }

    /// Returns None when the name is already taken.
    pub async fn create_label(&self, name: &str, color: &str) -> Result<Option<ContactLabel>> {
        let label = ContactLabel::new(name.to_string(), color.to_string());

        let result = sqlx::query(
            "INSERT OR IGNORE INTO contact_labels (id, name, color, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&label.id)
        .bind(&label.name)
        .bind(&label.color)
        .bind(label.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert label")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(label))
    }

    /// Returns None when the label does not exist.
    pub async fn update_label(
        &self,
        id: &str,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Option<ContactLabel>> {
        let result = sqlx::query(
            "UPDATE contact_labels SET name = COALESCE(?, name), color = COALESCE(?, color) WHERE id = ?",
        )
        .bind(name)
        .bind(color)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update label")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_label(id).await
    }

    /// Deletes the label and, through the FK cascade, every attachment of it.
    pub async fn delete_label(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM contact_labels WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        let deleted = result.rows_affected() > 0;
        if deleted {
            self.bus.publish(Topic::ContactLabels);
        }
        Ok(deleted)
    }

    pub async fn labels_for_contact(&self, phone_number: &str) -> Result<Vec<ContactLabel>> {
        let labels = sqlx::query_as::<_, ContactLabel>(
            r#"
            SELECT l.id, l.name, l.color, l.created_at
            FROM contact_labels l
            JOIN conversation_contact_labels cl ON cl.label_id = l.id
            WHERE cl.phone_number = ?
            ORDER BY l.name
            "#,
        )
        .bind(phone_number)
        .fetch_all(&self.pool)
        .await?;
        Ok(labels)
    }

    /// Replace the label set attached to a phone number. Unknown label ids
    /// fail the whole replacement.
    pub async fn set_contact_labels(
        &self,
        phone_number: &str,
        label_ids: &[String],
    ) -> Result<Vec<ContactLabel>> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM conversation_contact_labels WHERE phone_number = ?")
            .bind(phone_number)
            .execute(&mut *tx)
            .await?;

        for label_id in label_ids {
            sqlx::query(
                "INSERT INTO conversation_contact_labels (phone_number, label_id) VALUES (?, ?)",
            )
            .bind(phone_number)
            .bind(label_id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Unknown label id: {}", label_id))?;
        }

        tx.commit().await?;
        self.bus.publish(Topic::ContactLabels);

        self.labels_for_contact(phone_number).await
    }

    /// Label attachments for every phone number, for the conversation merge.
    pub async fn labels_by_phone(&self) -> Result<HashMap<String, Vec<LabelRef>>> {
        let rows = sqlx::query(
            r#"
            SELECT cl.phone_number, l.id, l.name, l.color
            FROM conversation_contact_labels cl
            JOIN contact_labels l ON l.id = cl.label_id
            ORDER BY cl.phone_number, l.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut by_phone: HashMap<String, Vec<LabelRef>> = HashMap::new();
        for row in rows {
            by_phone
                .entry(row.get("phone_number"))
                .or_default()
                .push(LabelRef {
                    id: row.get("id"),
                    name: row.get("name"),
                    color: row.get("color"),
                });
        }
        Ok(by_phone)
    }
}
