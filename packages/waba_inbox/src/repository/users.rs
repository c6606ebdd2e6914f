use std::collections::HashMap;

use anyhow::{Context, Result};
use sqlx::Row;

use super::InboxRepository;
use crate::models::UserProfile;

impl InboxRepository {
    pub async fn list_users(&self) -> Result<Vec<UserProfile>> {
        let users = sqlx::query_as::<_, UserProfile>(
            "SELECT id, display_name, role, notifications_enabled, created_at
             FROM user_profiles ORDER BY display_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<UserProfile>> {
        let user = sqlx::query_as::<_, UserProfile>(
            "SELECT id, display_name, role, notifications_enabled, created_at
             FROM user_profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    pub async fn create_user(&self, display_name: &str, role: &str) -> Result<UserProfile> {
        let user = UserProfile::new(display_name.to_string(), role.to_string());

        sqlx::query(
            "INSERT INTO user_profiles (id, display_name, role, notifications_enabled, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.display_name)
        .bind(&user.role)
        .bind(user.notifications_enabled)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to insert user profile")?;

        Ok(user)
    }

    /// Returns None when the user does not exist.
    pub async fn update_user(
        &self,
        id: &str,
        display_name: Option<&str>,
        role: Option<&str>,
    ) -> Result<Option<UserProfile>> {
        let result = sqlx::query(
            "UPDATE user_profiles
             SET display_name = COALESCE(?, display_name), role = COALESCE(?, role)
             WHERE id = ?",
        )
        .bind(display_name)
        .bind(role)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    /// Returns None when the user does not exist.
    pub async fn set_notifications_enabled(
        &self,
        id: &str,
        enabled: bool,
    ) -> Result<Option<UserProfile>> {
        let result = sqlx::query("UPDATE user_profiles SET notifications_enabled = ? WHERE id = ?")
            .bind(enabled)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_user(id).await
    }

    /// id → display name, for resolving assignments in the conversation merge.
    pub async fn user_names(&self) -> Result<HashMap<String, String>> {
        let rows = sqlx::query("SELECT id, display_name FROM user_profiles")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| (r.get("id"), r.get("display_name")))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_helpers;

    #[tokio::test]
    async fn create_and_list_users() {
        let repo = test_helpers::test_repository().await;

        let ana = repo.create_user("Ana", "agent").await.unwrap();
        repo.create_user("Benito", "admin").await.unwrap();

        let users = repo.list_users().await.unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].display_name, "Ana");
        assert!(users[0].notifications_enabled);

        let fetched = repo.get_user(&ana.id).await.unwrap().unwrap();
        assert_eq!(fetched.role, "agent");
    }

    #[tokio::test]
    async fn update_user_fields() {
        let repo = test_helpers::test_repository().await;
        let ana = repo.create_user("Ana", "agent").await.unwrap();

        let updated = repo
            .update_user(&ana.id, None, Some("admin"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.display_name, "Ana");
        assert_eq!(updated.role, "admin");

        let missing = repo.update_user("ghost", Some("X"), None).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn toggle_notifications() {
        let repo = test_helpers::test_repository().await;
        let ana = repo.create_user("Ana", "agent").await.unwrap();

        let updated = repo
            .set_notifications_enabled(&ana.id, false)
            .await
            .unwrap()
            .unwrap();
        assert!(!updated.notifications_enabled);

        let updated = repo
            .set_notifications_enabled(&ana.id, true)
            .await
            .unwrap()
            .unwrap();
        assert!(updated.notifications_enabled);

        assert!(
            repo.set_notifications_enabled("ghost", true)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn user_names_maps_ids() {
        let repo = test_helpers::test_repository().await;
        let ana = repo.create_user("Ana", "agent").await.unwrap();

        let names = repo.user_names().await.unwrap();
        assert_eq!(names[&ana.id], "Ana");
    }
}
