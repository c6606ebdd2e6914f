use anyhow::{Context, Result};
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::info;

use crate::config::InboxConfig;

#[derive(Clone)]
pub struct Database {
    pub pool: SqlitePool,
}

impl Database {
    pub async fn new(config: &InboxConfig) -> Result<Self> {
        info!("🗄️  Connecting to database: {}", config.db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .min_connections(1)
            .connect(&config.db_url())
            .await
            .with_context(|| format!("Failed to connect to database: {}", config.db_url()))?;

        info!("Running database migrations...");
        self::run_migrations(&pool).await?;

        // Set pragmas for performance
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA synchronous = NORMAL")
            .execute(&pool)
            .await?;
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await?;

        info!("✅ Database initialized successfully");

        Ok(Self { pool })
    }

    pub async fn get_stats(&self) -> Result<DbStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM conversation_metadata) as tracked_count,
                (SELECT COUNT(*) FROM contact_labels) as label_count,
                (SELECT COUNT(*) FROM contacts) as contact_count,
                (SELECT COUNT(*) FROM conversation_notes) as note_count,
                (SELECT COUNT(*) FROM user_profiles) as user_count,
                (SELECT page_count * page_size FROM pragma_page_count(), pragma_page_size()) as db_size
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(DbStats {
            tracked_conversations: row.try_get::<i64, _>("tracked_count").unwrap_or(0) as u64,
            labels: row.try_get::<i64, _>("label_count").unwrap_or(0) as u64,
            contacts: row.try_get::<i64, _>("contact_count").unwrap_or(0) as u64,
            notes: row.try_get::<i64, _>("note_count").unwrap_or(0) as u64,
            users: row.try_get::<i64, _>("user_count").unwrap_or(0) as u64,
            database_size_bytes: row.try_get::<i64, _>("db_size").unwrap_or(0) as u64,
        })
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct DbStats {
    pub tracked_conversations: u64,
    pub labels: u64,
    pub contacts: u64,
    pub notes: u64,
    pub users: u64,
    pub database_size_bytes: u64,
}

/// Current schema version - increment when adding migrations
const SCHEMA_VERSION: i64 = 3;

// Run migrations manually so the binary needs no migrations directory on disk
pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // Create schema_version table first (if not exists)
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (unixepoch()),
            description TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Check current schema version
    let current_version: i64 =
        sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    if current_version > SCHEMA_VERSION {
        anyhow::bail!(
            "Database schema version {} is newer than supported version {}. Please upgrade the application.",
            current_version,
            SCHEMA_VERSION
        );
    }

    if current_version == SCHEMA_VERSION {
        info!(
            "Database schema is up to date (version {})",
            current_version
        );
        return Ok(());
    }

    info!(
        "Migrating database from version {} to {}",
        current_version, SCHEMA_VERSION
    );

    // v1: Workflow state layered over provider conversations. The provider owns
    // the message history; these tables only hold what the inbox adds on top.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversation_metadata (
            conversation_id TEXT PRIMARY KEY,
            status TEXT NOT NULL DEFAULT 'abierto',
            assigned_agent_id TEXT,
            updated_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_conv_meta_status ON conversation_metadata(status)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_conv_meta_agent ON conversation_metadata(assigned_agent_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contact_labels (
            id TEXT PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            color TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Labels attach to the contact phone number, not the conversation id, so
    // they survive the provider opening a new conversation for the same person.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversation_contact_labels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            phone_number TEXT NOT NULL,
            label_id TEXT NOT NULL REFERENCES contact_labels(id) ON DELETE CASCADE,
            created_at INTEGER NOT NULL DEFAULT (unixepoch()),
            UNIQUE (phone_number, label_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_contact_labels_phone ON conversation_contact_labels(phone_number)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS contacts (
            phone_number TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            updated_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversation_notes (
            id TEXT PRIMARY KEY,
            conversation_id TEXT NOT NULL,
            agent_id TEXT,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_notes_conversation ON conversation_notes(conversation_id, created_at)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS app_settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_profiles (
            id TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'agent',
            created_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    // v2: Canned responses for the composer
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS canned_responses (
            id TEXT PRIMARY KEY,
            shortcut TEXT UNIQUE NOT NULL,
            body TEXT NOT NULL,
            created_at INTEGER NOT NULL DEFAULT (unixepoch())
        )
        "#,
    )
    .execute(pool)
    .await?;

    // v3: Per-agent notification preference
    sqlx::query("ALTER TABLE user_profiles ADD COLUMN notifications_enabled INTEGER NOT NULL DEFAULT 1")
        .execute(pool)
        .await
        .ok(); // .ok() swallows "duplicate column" on re-run

    // Record the schema version
    if current_version < SCHEMA_VERSION {
        sqlx::query("INSERT OR REPLACE INTO schema_version (version, description) VALUES (?, ?)")
            .bind(SCHEMA_VERSION)
            .bind("Inbox workflow: metadata, labels, contacts, notes, settings, users, canned responses")
            .execute(pool)
            .await?;
        info!("Schema upgraded to version {}", SCHEMA_VERSION);
    }

    info!("Database migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    #[tokio::test]
    async fn run_migrations_idempotent() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        // Run migrations twice — should not error
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn schema_version_recorded() {
        let pool = test_pool().await;
        let version: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(version, SCHEMA_VERSION);
    }

    #[tokio::test]
    async fn all_tables_exist_after_migration() {
        let pool = test_pool().await;

        let tables = [
            "conversation_metadata",
            "contact_labels",
            "conversation_contact_labels",
            "contacts",
            "conversation_notes",
            "app_settings",
            "user_profiles",
            "canned_responses",
        ];

        for table in tables {
            let count: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&pool)
                .await
                .unwrap();
            assert_eq!(count.0, 0, "Table {} should exist and be empty", table);
        }
    }

    #[tokio::test]
    async fn label_cascade_deletes_attachments() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO contact_labels (id, name, color) VALUES ('l1', 'vip', '#10B981')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO conversation_contact_labels (phone_number, label_id) VALUES ('5215550001', 'l1')",
        )
        .execute(&pool)
        .await
        .unwrap();

        sqlx::query("DELETE FROM contact_labels WHERE id = 'l1'")
            .execute(&pool)
            .await
            .unwrap();

        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM conversation_contact_labels")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count.0, 0);
    }

    #[tokio::test]
    async fn notifications_enabled_defaults_on() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO user_profiles (id, display_name) VALUES ('u1', 'Ana')")
            .execute(&pool)
            .await
            .unwrap();

        let enabled: (i64,) =
            sqlx::query_as("SELECT notifications_enabled FROM user_profiles WHERE id = 'u1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(enabled.0, 1);
    }

    #[tokio::test]
    async fn get_stats_empty_db() {
        let pool = test_pool().await;
        let db = Database { pool };
        let stats = db.get_stats().await.unwrap();
        assert_eq!(stats.tracked_conversations, 0);
        assert_eq!(stats.labels, 0);
        assert_eq!(stats.contacts, 0);
        assert_eq!(stats.notes, 0);
        assert_eq!(stats.users, 0);
        assert!(stats.database_size_bytes > 0);
    }

    #[tokio::test]
    async fn get_stats_with_data() {
        let pool = test_pool().await;

        sqlx::query("INSERT INTO conversation_metadata (conversation_id, status) VALUES ('c1', 'abierto')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO conversation_notes (id, conversation_id, body) VALUES ('n1', 'c1', 'cliente vip')")
            .execute(&pool)
            .await
            .unwrap();

        let db = Database { pool };
        let stats = db.get_stats().await.unwrap();
        assert_eq!(stats.tracked_conversations, 1);
        assert_eq!(stats.notes, 1);
    }
}
