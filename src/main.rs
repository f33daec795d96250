mod api_doc;
mod app;
mod config;
mod datastore;
mod error;
mod handlers;
mod keys;
mod logging;
mod models;
mod routes;
mod state;
mod storage;

use anyhow::Context;
use std::sync::Arc;

use config::{Config, DatastoreConfig};
use datastore::{Datastore, MemoryDatastore, SpannerDatastore};
use state::AppState;
use storage::CatStorage;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logging::init(config.log_format, config.trace_project().map(str::to_string));

    tracing::info!("cats-api starting");
    config.log_startup();

    let datastore: Arc<dyn Datastore> = match &config.datastore {
        DatastoreConfig::Spanner(spanner) => Arc::new(SpannerDatastore::from_config(spanner).await?),
        DatastoreConfig::Memory => Arc::new(MemoryDatastore::new()),
    };

    let app = app::router(AppState {
        storage: CatStorage::new(datastore),
    });

    let addr = format!("{}:{}", config.service_host, config.service_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("cats-api stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
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
