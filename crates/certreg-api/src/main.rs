//! # certreg-api: Binary Entry Point
//!
//! Reads configuration from the environment, opens the certificate store
//! and serves the API on `0.0.0.0:$PORT` (default 8080).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::EnvFilter;

use certreg_api::state::LogFormat;
use certreg_api::{AppConfig, AppState};
use certreg_registry::{CertificateStore, JsonFileStore, MemoryStore, Registry, StaticCatalog};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;

    // Initialize structured tracing.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(?config, "starting certificate registry");

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    let upkeep = metrics_handle.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5));
        loop {
            interval.tick().await;
            upkeep.run_upkeep();
        }
    });

    let store: Arc<dyn CertificateStore> = match &config.data_file {
        Some(path) => Arc::new(JsonFileStore::open(path).map_err(|e| {
            tracing::error!("failed to open certificate store: {e}");
            e
        })?),
        None => {
            tracing::warn!("CERTREG_DATA_FILE not set; certificates will be lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let mut registry = Registry::new(store);
    if let Some(path) = &config.course_catalog {
        let catalog = StaticCatalog::load(path).map_err(|e| {
            tracing::error!("failed to load course catalog: {e}");
            e
        })?;
        registry = registry.with_catalog(Arc::new(catalog));
    }

    let port = config.port;
    let state = AppState::with_config(config, registry).with_metrics(metrics_handle);
    let app = certreg_api::app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("certificate registry listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}
