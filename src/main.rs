//! ledger_books - personal finance record keeper
//!
//! Serves users, accounts and transactions over HTTP. Account balances
//! are derived from the stored transactions on every read.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger_books::api::{self, AppState, PagingConfig};
use ledger_books::config::StorageBackend;
use ledger_books::storage::{MemoryStorage, PgStorage, Storage};
use ledger_books::{db, Config};

/// Initialize tracing/logging. Production logs are JSON lines.
fn init_tracing(json: bool) {
    let (json_layer, text_layer) = if json {
        (Some(tracing_subscriber::fmt::layer().json()), None)
    } else {
        (None, Some(tracing_subscriber::fmt::layer()))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledger_books=debug,tower_http=debug".into()),
        )
        .with(json_layer)
        .with(text_layer)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(config.is_production());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!(environment = %config.environment, "Starting ledger_books server");

    let (storage, pool) = match config.storage_backend {
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = db::connect(&config).await?;
            db::verify_connection(&pool).await?;

            if !config.is_production() {
                db::run_migrations(&pool).await?;
            }

            if !db::check_schema(&pool).await? {
                tracing::error!("Database schema is not complete. Please run migrations.");
                return Err(anyhow::anyhow!("Database schema incomplete"));
            }

            tracing::info!("Database connected successfully");
            (
                Arc::new(PgStorage::new(pool.clone())) as Arc<dyn Storage>,
                Some(pool),
            )
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; records are lost on shutdown");
            (Arc::new(MemoryStorage::new()) as Arc<dyn Storage>, None)
        }
    };

    let state = AppState::new(storage, PagingConfig::from(&config));
    let app = api::build_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutting down...");
    if let Some(pool) = pool {
        pool.close().await;
        tracing::info!("Database connections closed. Goodbye!");
    }

    Ok(())
}

/// Shutdown signal handler for graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}
