use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use tracing_subscriber::EnvFilter;

use crate::app::app;
use crate::config::AppConfig;
use crate::database::{MealStore, MemoryStore, PgStore};
use crate::state::AppState;

pub const DEFAULT_LOG_FILTER: &str = "fueled_api=info,tower_http=info";

#[derive(Debug, Clone, Default, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Keep all data in memory instead of Postgres
    #[arg(long)]
    pub memory: bool,
}

/// Install the global subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    // A second call (tests, CLI re-entry) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Open the configured store, migrating Postgres when enabled.
pub async fn open_store(config: &AppConfig, memory: bool) -> anyhow::Result<Arc<dyn MealStore>> {
    if memory {
        tracing::warn!("Using in-memory store; data is lost on shutdown");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let store = PgStore::connect(&config.database)
        .await
        .context("failed to connect to Postgres (set DATABASE_URL or pass --memory)")?;

    if config.database.auto_migrate {
        store.migrate().await.context("failed to apply migrations")?;
    }

    Ok(Arc::new(store))
}

pub async fn serve(config: AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    if config.uses_development_secret() {
        tracing::warn!("TOKEN_SEC not set; signing sessions with the development secret");
    }

    let port = args.port.unwrap_or(config.server.port);
    let store = open_store(&config, args.memory).await?;
    tracing::info!("Starting Fueled API in {:?} mode", config.environment);

    let state = AppState::new(config, store).context("invalid session configuration")?;

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
