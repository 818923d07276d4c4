//! contacts-api - A multi-tenant contacts management backend
//!
//! This is the main entry point for the contacts-api application.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;

use contacts_api::auth::{AuthService, TokenCodec};
use contacts_api::cache::{CacheBackend, MemoryBackend, RedisBackend, SessionCache};
use contacts_api::config::Config;
use contacts_api::database::SqliteDatabase;
use contacts_api::email::LogMailer;
use contacts_api::server::{AppState, Server};

/// contacts-api - A multi-tenant contacts management backend
#[derive(Parser, Debug)]
#[command(name = "contacts-api")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "CONTACTS_API_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    // Initialize tracing/logging
    init_tracing(&config.logging.level, &config.logging.format);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting contacts-api"
    );

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    // Initialize session cache backend
    let backend: Arc<dyn CacheBackend> = match config.cache.backend.as_str() {
        "redis" => {
            let redis_config = config
                .cache
                .redis
                .as_ref()
                .expect("validated: redis backend requires redis settings");
            let backend = RedisBackend::connect(redis_config).await?;
            info!(url = %redis_config.url, "Redis cache backend connected");
            Arc::new(backend)
        }
        _ => {
            info!("In-memory cache backend selected");
            Arc::new(MemoryBackend::new())
        }
    };
    let cache = Arc::new(SessionCache::with_user_ttl(
        backend,
        std::time::Duration::from_secs(config.cache.user_ttl_secs),
    ));

    // Initialize the authentication core
    let codec = TokenCodec::from_config(&config.auth);
    let mailer = Arc::new(LogMailer::new(&config.mail));
    let auth = Arc::new(AuthService::new(
        Arc::clone(&database),
        Arc::clone(&cache),
        codec,
        mailer,
    ));
    info!("Authentication core initialized");

    // Create application state
    let state = AppState { auth };

    // Create and start the HTTP server
    let server = Server::new(config.server.clone(), state);
    let shutdown_signal = shutdown_signal();

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    server.run(shutdown_signal).await?;

    info!("contacts-api shutdown complete");
    Ok(())
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Initialize the tracing subscriber
fn init_tracing(level: &str, format: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    if format == "pretty" {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    }
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
