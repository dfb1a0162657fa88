//! Threadline - Users, Posts and Threaded Comments
//!
//! Serves the thread store over HTTP/JSON on top of either the in-memory
//! or the Postgres backend.
//!
//! Features:
//! - One-level comment listing with a bounded full-thread view
//! - Swappable storage (`--mode memory|postgres`)
//! - Graceful shutdown on SIGINT/SIGTERM, then backend close

pub mod http;
pub mod shutdown;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use threadline_core::{DbConfig, MemoryBackend, PostgresBackend, ServiceConfig, StorageBackend, ThreadService};

// =============================================================================
// TigerStyle Constants
// =============================================================================

/// Default HTTP port
pub const HTTP_PORT_DEFAULT: u16 = 8080;

/// Default HTTP bind host
pub const HTTP_HOST_DEFAULT: &str = "0.0.0.0";

/// Application name
pub const APP_NAME: &str = "threadline";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// CLI
// =============================================================================

/// Storage backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LaunchMode {
    /// Volatile in-process storage
    Memory,
    /// PostgreSQL, configured from POSTGRES_* variables
    Postgres,
}

/// Threadline - users, posts and threaded comments
#[derive(Parser, Debug)]
#[command(name = APP_NAME)]
#[command(about = "Users, posts and threaded comments over swappable storage")]
#[command(version)]
struct Cli {
    /// Storage backend
    #[arg(short, long, value_enum, env = "LAUNCH_MODE", default_value = "memory")]
    mode: LaunchMode,

    /// HTTP port
    #[arg(short, long, env = "APP_PORT", default_value_t = HTTP_PORT_DEFAULT)]
    port: u16,

    /// HTTP bind host
    #[arg(long, default_value = HTTP_HOST_DEFAULT)]
    host: String,

    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Environment first so clap sees LAUNCH_MODE / APP_PORT from .env
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "info,tower_http=debug",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .init();

    tracing::info!("Threadline v{}", APP_VERSION);

    let config = ServiceConfig::from_env().context("invalid service configuration")?;
    let storage = open_storage(cli.mode).await?;
    let service = Arc::new(ThreadService::new(storage, config));

    let addr: SocketAddr = format!("{}:{}", cli.host, cli.port)
        .parse()
        .with_context(|| format!("invalid bind address {}:{}", cli.host, cli.port))?;
    let app = http::router(http::AppState::new(service.clone()));

    tracing::info!("Starting HTTP server on {} ({:?} storage)", addr, cli.mode);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown::signal())
        .await?;

    tracing::info!("HTTP server stopped, closing storage");
    service.close().await.context("failed to close storage")?;

    Ok(())
}

async fn open_storage(mode: LaunchMode) -> anyhow::Result<Arc<dyn StorageBackend>> {
    match mode {
        LaunchMode::Memory => {
            tracing::info!("Using in-memory storage");
            Ok(Arc::new(MemoryBackend::new()))
        }
        LaunchMode::Postgres => {
            let db = DbConfig::from_env().context("invalid database configuration")?;
            tracing::info!(host = %db.host, database = %db.database, "Connecting to Postgres");
            let backend = PostgresBackend::connect(&db)
                .await
                .context("failed to open Postgres storage")?;
            Ok(Arc::new(backend))
        }
    }
}
