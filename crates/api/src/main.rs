use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warden_api::app::build_app;
use warden_api::config::{LogFormat, ServerConfig};
use warden_api::state::AppState;
use warden_auth::StaticUserDirectory;
use warden_cache::{MemoryKv, RedisKv};
use warden_core::identity::UserDirectory;
use warden_core::kv::KvStore;
use warden_core::session::SessionStore;
use warden_db::{MemorySessionStore, PgSessionStore};
use warden_events::{AuditLog, EventBus};

const DEFAULT_LOG_FILTER: &str = "warden_api=debug,warden_auth=debug,audit=info,tower_http=debug";

/// How often the in-memory KV drops expired entries.
const KV_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    init_tracing(LogFormat::from_env());

    // --- Configuration ---
    let config = ServerConfig::from_env().expect("Invalid configuration");
    tracing::info!(host = %config.host, port = %config.port, auth = ?config.auth, "Loaded server configuration");

    // --- Session store ---
    let sessions: Arc<dyn SessionStore> = match &config.database_url {
        Some(url) => {
            let pool = warden_db::create_pool(url)
                .await
                .expect("Failed to connect to database");
            tracing::info!("Database connection pool created");

            warden_db::health_check(&pool)
                .await
                .expect("Database health check failed");
            warden_db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            tracing::info!("Database migrations applied");
            Arc::new(PgSessionStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, sessions are kept in memory and lost on restart");
            Arc::new(MemorySessionStore::new())
        }
    };

    // --- Key-value store ---
    let mut sweeper = None;
    let kv: Arc<dyn KvStore> = match &config.redis_url {
        Some(url) => {
            let mut redis = RedisKv::connect(url)
                .await
                .expect("Failed to connect to Redis");
            if let Some(namespace) = &config.redis_namespace {
                redis = redis.with_namespace(namespace.clone());
            }
            tracing::info!(namespace = redis.namespace(), "Redis connection established");
            Arc::new(redis)
        }
        None => {
            tracing::warn!("REDIS_URL not set, revocations are only visible to this process");
            let memory = Arc::new(MemoryKv::new());
            sweeper = Some(memory.spawn_sweeper(KV_SWEEP_INTERVAL));
            memory
        }
    };

    // --- User directory ---
    let directory: Arc<dyn UserDirectory> = match &config.users_file {
        Some(path) => {
            let directory =
                StaticUserDirectory::from_file(path).expect("Failed to load user directory");
            tracing::info!(users = directory.len().await, path = %path.display(), "User directory loaded");
            Arc::new(directory)
        }
        None => {
            tracing::warn!("USERS_FILE not set, no user can log in");
            Arc::new(StaticUserDirectory::default())
        }
    };

    // --- Event bus + audit log ---
    let event_bus = Arc::new(EventBus::default());
    let audit_handle = tokio::spawn(AuditLog::run(event_bus.subscribe()));

    // --- App ---
    let shutdown_timeout = Duration::from_secs(config.shutdown_timeout_secs);
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    let state = AppState::new(config, sessions, kv, directory, Arc::clone(&event_bus));
    let app = build_app(state).expect("Invalid CORS configuration");

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    if let Some(handle) = sweeper {
        handle.abort();
    }

    // Dropping the last sender closes the channel and lets the audit log drain.
    drop(event_bus);
    match tokio::time::timeout(shutdown_timeout, audit_handle).await {
        Ok(Ok(written)) => tracing::info!(written, "Audit log drained"),
        Ok(Err(e)) => tracing::error!(error = %e, "Audit log task failed"),
        Err(_) => tracing::warn!("Audit log did not drain before the shutdown timeout"),
    }

    tracing::info!("Graceful shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

/// Wait for SIGINT (Ctrl-C) or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
