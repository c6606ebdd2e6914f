use anyhow::{Context, Result};
use convo_sync::Topic;

use super::InboxRepository;
use crate::models::Contact;

impl InboxRepository {
    pub async fn get_contact(&self, phone_number: &str) -> Result<Option<Contact>> {
        let contact = sqlx::query_as::<_, Contact>(
            "SELECT phone_number, display_name, updated_at FROM contacts WHERE phone_number = ?",
        )
        .bind(phone_number)
        .fetch_optional(&self.pool)
        .await?;
        Ok(contact)
    }

    /// Every locally edited contact, for the conversation merge.
    pub async fn all_contacts(&self) -> Result<Vec<Contact>> {
        let contacts = sqlx::query_as::<_, Contact>(
            "SELECT phone_number, display_name, updated_at FROM contacts",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(contacts)
    }

    pub async fn upsert_contact(&self, phone_number: &str, display_name: &str) -> Result<Contact> {
        sqlx::query(
            r#"
            INSERT INTO contacts (phone_number, display_name, updated_at)
            VALUES (?, ?, unixepoch())
            ON CONFLICT(phone_number)
            DO UPDATE SET display_name = excluded.display_name, updated_at = unixepoch()
            "#,
        )
        .bind(phone_number)
        .bind(display_name)
        .execute(&self.pool)
        .await
        .context("Failed to upsert contact")?;

        self.bus.publish(Topic::Contacts);

        self.get_contact(phone_number)
            .await?
            .context("Contact missing after upsert")
    }
}
