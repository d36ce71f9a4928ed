//! Book API server. Settings come from the environment (and `.env` when present).

use book_api::{app, install_environment, AppState, BookStore, MemoryBookStore, PgBookStore, Settings, StorageBackend};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("book_api=info,tower_http=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    install_environment(settings.environment);

    let store: Arc<dyn BookStore> = match settings.storage()? {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory store; data is lost on exit");
            Arc::new(MemoryBookStore::new())
        }
        StorageBackend::Postgres(url) => {
            Arc::new(PgBookStore::connect(&url, settings.database_max_connections).await?)
        }
    };

    let router = app(AppState::new(store), &settings);
    let listener = TcpListener::bind(settings.bind_address()).await?;
    tracing::info!(
        environment = ?settings.environment,
        base_path = %settings.books_base_path,
        "listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}
