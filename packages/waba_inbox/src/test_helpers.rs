use std::sync::Arc;
use std::time::Duration;

use crate::AppState;
use crate::bus::ChangeBus;
use crate::config::{InboxConfig, ProviderFileConfig};
use crate::db::Database;
use crate::provider::ProviderResolver;
use crate::repository::InboxRepository;
use crate::source::InboxConversationSource;

/// Build a fully-wired `AppState` backed by an in-memory SQLite database.
/// Suitable for handler tests that exercise real SQL queries without I/O.
///
/// Returns `(AppState, TempDir)` — callers **must** hold the `TempDir` for
/// the lifetime of the test so the config's data directory stays valid.
pub async fn test_app_state() -> (AppState, tempfile::TempDir) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let config = InboxConfig::new(Some(tmp.path().to_path_buf())).expect("config");

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite");

    crate::db::run_migrations(&pool).await.expect("migrations");

    sqlx::query("PRAGMA foreign_keys = ON")
        .execute(&pool)
        .await
        .expect("pragma");

    let db = Arc::new(Database { pool: pool.clone() });
    let bus = ChangeBus::new();
    let repository = Arc::new(InboxRepository::new(pool, bus.clone()));
    let resolver = Arc::new(ProviderResolver::new(
        repository.clone(),
        ProviderFileConfig::default(),
    ));
    let source = InboxConversationSource::new(resolver.clone(), repository.clone());

    let state = AppState {
        config: Arc::new(config),
        db,
        repository,
        resolver,
        source,
        bus,
        poll_interval: Duration::from_millis(10_000),
    };

    (state, tmp)
}

/// Serve an axum router on an ephemeral local port and return its base URL.
///
/// Used to stand in for the hosted WhatsApp API in handler tests: point the
/// provider's `api_base_url` setting at the returned URL.
pub async fn serve_stub(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub");
    let addr = listener.local_addr().expect("stub addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("stub server");
    });
    format!("http://{}", addr)
}

/// Store working provider credentials pointing at a stub server.
pub async fn configure_stub_provider(state: &AppState, base_url: &str) {
    for (key, value) in [
        ("api_key", "test-key"),
        ("api_base_url", base_url),
        ("phone_number_id", "562093780"),
        ("waba_id", "901812354"),
    ] {
        state
            .repository
            .set_setting(key, value)
            .await
            .expect("setting");
    }
}
