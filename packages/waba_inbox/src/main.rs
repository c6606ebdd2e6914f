use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, patch, post},
};
use clap::{Parser, Subcommand};
use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};
use tower_http::cors::CorsLayer;
use tower_http::trace::MakeSpan;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

mod bus;
mod config;
mod db;
mod handlers;
mod models;
mod provider;
mod repository;
mod source;
#[cfg(test)]
mod test_helpers;
mod views;
mod ws;

use crate::bus::ChangeBus;
use crate::config::{FileConfig, InboxConfig, Profile};
use crate::db::Database;
use crate::provider::ProviderResolver;
use crate::repository::InboxRepository;
use crate::source::InboxConversationSource;

/// Custom span maker that adds a unique request ID to each incoming request
#[derive(Clone)]
struct RequestIdMakeSpan;

impl<B> MakeSpan<B> for RequestIdMakeSpan {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> tracing::Span {
        let request_id = Uuid::new_v4().to_string();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    }
}

#[derive(Parser)]
#[command(name = "inbox")]
#[command(about = "WhatsApp Business inbox server with live conversation sync")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Custom data directory (defaults to ~/.waba-inbox)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the inbox server in the foreground
    Serve(ServeArgs),

    /// Delete the local database (labels, notes, assignments, settings)
    ResetDb(ResetDbArgs),
}

#[derive(Parser)]
struct ServeArgs {
    /// Host to bind to (overrides config)
    #[arg(short = 'b', long)]
    host: Option<String>,

    /// Port for the web server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Configuration profile
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// Enable debug logging for the whole stack
    #[arg(short, long)]
    debug: bool,
}

#[derive(Parser)]
struct ResetDbArgs {
    /// Skip confirmation prompt
    #[arg(short, long)]
    force: bool,
}

#[derive(Clone)]
#[allow(dead_code)]
pub(crate) struct AppState {
    pub config: Arc<InboxConfig>,
    pub db: Arc<Database>,
    pub repository: Arc<InboxRepository>,
    pub resolver: Arc<ProviderResolver>,
    pub source: InboxConversationSource,
    pub bus: ChangeBus,
    /// Poll cadence handed to each WebSocket connection's engine
    pub poll_interval: Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = InboxConfig::new(cli.data_dir.clone())?;

    match cli.command {
        Commands::Serve(args) => run_server(args, config).await,
        Commands::ResetDb(args) => reset_db_command(args, config),
    }
}

fn reset_db_command(args: ResetDbArgs, config: InboxConfig) -> Result<()> {
    if !config.db_path.exists() {
        println!("No database at {:?}", config.db_path);
        return Ok(());
    }

    if !args.force {
        println!("This will delete all labels, notes, assignments and stored settings!");
        print!("Are you sure? (yes/no): ");
        use std::io::{self, Write};
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim() != "yes" {
            println!("Cancelled.");
            return Ok(());
        }
    }

    config.reset_database()?;
    println!("Database reset.");
    Ok(())
}

async fn run_server(args: ServeArgs, config: InboxConfig) -> Result<()> {
    // Setup logging
    let default_directive = if args.debug {
        "inbox=debug,convo_sync=debug,waba_client=debug,tower_http=debug,debug"
    } else {
        "inbox=debug,tower_http=debug,info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_directive));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(env_filter)
        .init();

    info!("Starting WhatsApp Inbox server");

    let config = Arc::new(config);

    let file_config: FileConfig = config::load_config(&config.data_dir, args.profile.as_ref())
        .extract()
        .context("Invalid configuration")?;

    // Initialize database
    info!("Initializing database...");
    let db = Arc::new(Database::new(&config).await?);

    let bus = ChangeBus::new();
    let repository = Arc::new(InboxRepository::new(db.pool.clone(), bus.clone()));
    let resolver = Arc::new(ProviderResolver::new(
        repository.clone(),
        file_config.provider.clone(),
    ));
    let source = InboxConversationSource::new(resolver.clone(), repository.clone());

    let poll_interval = Duration::from_millis(file_config.server.poll_interval_ms);

    let provider_ready = resolver
        .settings()
        .await
        .map(|s| s.api_key_set)
        .unwrap_or(false);
    if provider_ready {
        info!("WhatsApp provider configured");
    } else {
        info!(
            "WhatsApp provider not configured; store credentials via PUT /api/settings \
             or [provider] in config.toml"
        );
    }

    let app_state = AppState {
        config: config.clone(),
        db: db.clone(),
        repository,
        resolver,
        source,
        bus,
        poll_interval,
    };

    // Build routes
    let app = Router::new()
        .route("/", get(views::index_page))
        .route("/health", get(handlers::health_handler))
        // Conversation routes
        .route("/api/conversations", get(handlers::list_conversations))
        .route(
            "/api/conversations/{id}/messages",
            get(handlers::get_conversation_messages),
        )
        .route(
            "/api/conversations/{id}/status",
            patch(handlers::update_conversation_status),
        )
        .route(
            "/api/conversations/{id}/assign",
            patch(handlers::assign_conversation),
        )
        .route(
            "/api/conversations/{id}/notes",
            get(handlers::get_conversation_notes).post(handlers::create_conversation_note),
        )
        // Label routes
        .route(
            "/api/labels",
            get(handlers::list_labels).post(handlers::create_label),
        )
        .route(
            "/api/labels/{id}",
            patch(handlers::update_label).delete(handlers::delete_label),
        )
        .route(
            "/api/labels/contacts/{phone}",
            get(handlers::get_contact_labels).put(handlers::set_contact_labels),
        )
        // Contact routes
        .route("/api/contacts/{phone}", patch(handlers::update_contact))
        // Messaging routes
        .route("/api/messages/send", post(handlers::send_message))
        .route("/api/messages/template", post(handlers::send_template))
        .route("/api/templates", get(handlers::list_templates))
        .route("/api/media/{media_id}", get(handlers::get_media))
        // Settings
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        // Admin endpoints
        .route("/api/admin/analytics", get(handlers::get_analytics))
        .route(
            "/api/admin/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/admin/users/{id}", patch(handlers::update_user))
        .route("/api/admin/stats", get(handlers::get_database_stats))
        // Agent preferences
        .route(
            "/api/user/preferences",
            get(handlers::get_preferences).put(handlers::update_preferences),
        )
        // Canned responses
        .route(
            "/api/canned",
            get(handlers::list_canned_responses).post(handlers::create_canned_response),
        )
        .route(
            "/api/canned/{id}",
            patch(handlers::update_canned_response).delete(handlers::delete_canned_response),
        )
        // Alert sounds
        .route("/api/sounds/{name}", get(handlers::get_sound))
        // Live sync
        .route("/ws", get(handlers::websocket_handler));

    let app = app
        .layer(DefaultBodyLimit::max(handlers::messages::MAX_REQUEST_BYTES))
        .layer(TraceLayer::new_for_http().make_span_with(RequestIdMakeSpan))
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Host priority: CLI flag, then config/profile, then localhost
    let host = args
        .host
        .or(file_config.server.host)
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let port = args.port.or(file_config.server.port).unwrap_or(3900);

    let addr = format!("{}:{}", host, port).parse::<SocketAddr>()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    info!("WhatsApp Inbox listening on http://{}", actual_addr);
    info!("");
    info!("Status page: http://{}/", actual_addr);
    info!("API endpoints:");
    info!("  GET    /api/conversations    - Merged conversation list");
    info!("  POST   /api/messages/send    - Send a message (multipart)");
    info!("  GET    /api/admin/analytics  - Workload report (json or csv)");
    info!("  GET    /ws                   - Live sync WebSocket");

    // Create shutdown signal handler
    let shutdown_signal = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Received shutdown signal, shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .context("Server error")
}
