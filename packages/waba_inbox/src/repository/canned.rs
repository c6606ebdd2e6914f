use anyhow::{Context, Result};

use super::InboxRepository;
use crate::models::CannedResponse;

impl InboxRepository {
    pub async fn list_canned_responses(&self) -> Result<Vec<CannedResponse>> {
        let responses = sqlx::query_as::<_, CannedResponse>(
            "SELECT id, shortcut, body, created_at FROM canned_responses ORDER BY shortcut",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(responses)
    }

    /// Returns None when the shortcut is already taken.
    pub async fn create_canned_response(
        &self,
        shortcut: &str,
        body: &str,
    ) -> Result<Option<CannedResponse>> {
        let response = CannedResponse::new(shortcut.to_string(), body.to_string());

        let result = sqlx::query(
            "INSERT OR IGNORE INTO canned_responses (id, shortcut, body, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&response.id)
        .bind(&response.shortcut)
        .bind(&response.body)
        .bind(response.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert canned response")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        Ok(Some(response))
    }

    /// Returns None when the id does not exist.
    pub async fn update_canned_response(
        &self,
        id: &str,
        shortcut: Option<&str>,
        body: Option<&str>,
    ) -> Result<Option<CannedResponse>> {
        let result = sqlx::query(
            "UPDATE canned_responses
             SET shortcut = COALESCE(?, shortcut), body = COALESCE(?, body)
             WHERE id = ?",
        )
        .bind(shortcut)
        .bind(body)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to update canned response")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let response = sqlx::query_as::<_, CannedResponse>(
            "SELECT id, shortcut, body, created_at FROM canned_responses WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(response)
    }

    pub async fn delete_canned_response(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM canned_responses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_helpers;

    #[tokio::test]
    async fn create_list_update_delete() {
        let repo = test_helpers::test_repository().await;

        let saludo = repo
            .create_canned_response("/saludo", "¡Hola! ¿En qué puedo ayudarte?")
            .await
            .unwrap()
            .unwrap();

        let listed = repo.list_canned_responses().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].shortcut, "/saludo");

        let updated = repo
            .update_canned_response(&saludo.id, None, Some("Buen día, ¿en qué puedo ayudarte?"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.shortcut, "/saludo");
        assert!(updated.body.starts_with("Buen día"));

        assert!(repo.delete_canned_response(&saludo.id).await.unwrap());
        assert!(!repo.delete_canned_response(&saludo.id).await.unwrap());
        assert!(repo.list_canned_responses().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_shortcut_is_rejected() {
        let repo = test_helpers::test_repository().await;

        repo.create_canned_response("/gracias", "¡Gracias por tu compra!")
            .await
            .unwrap()
            .unwrap();
        let dup = repo
            .create_canned_response("/gracias", "otro texto")
            .await
            .unwrap();
        assert!(dup.is_none());
    }

    #[tokio::test]
    async fn update_missing_id_is_none() {
        let repo = test_helpers::test_repository().await;
        let missing = repo
            .update_canned_response("ghost", Some("/x"), None)
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
