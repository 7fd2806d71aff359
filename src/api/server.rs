use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::{info, warn};

use super::{
    services::{get_offering, health, metrics, receive_job_event},
    state::AppState,
};
use crate::config::Config;
use crate::jobs::{ActionSink, HttpActionSink, JobController, JobDispatcher, MemorySink};
use crate::offerings::{DirectorySource, HandlerCatalog, OfferingRegistry};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes served by the ingress
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/jobs/events", post(receive_job_event))
        .route("/offerings/{name}", get(get_offering))
        .route("/operators/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(state)
        // Inflate gzip request bodies before handlers see them
        .layer(RequestDecompressionLayer::new())
}

/// Wire registry, sink, controller and dispatcher from configuration
pub fn build_state(config: Config, catalog: HandlerCatalog) -> Result<AppState, AnyError> {
    info!(dir = %config.seller.offerings_dir.display(), "Serving offerings");
    let source = DirectorySource::new(config.seller.offerings_dir.clone(), catalog);
    let registry = Arc::new(OfferingRegistry::new(Arc::new(source)));

    let sink: Arc<dyn ActionSink> = if config.marketplace.api_key.is_some() {
        info!(api_url = %config.marketplace.api_url, "Posting protocol actions to marketplace");
        Arc::new(HttpActionSink::new(&config.marketplace)?)
    } else {
        warn!("No marketplace API key configured; protocol actions are only recorded in memory");
        Arc::new(MemorySink::new())
    };

    let controller = JobController::new(registry, sink)
        .with_capability_timeout(config.runtime.capability_timeout());
    let dispatcher = JobDispatcher::new(Arc::new(controller))
        .with_in_flight_dedup(config.runtime.dedupe_in_flight);

    Ok(AppState::new(config, dispatcher))
}

pub async fn run(address: Option<SocketAddr>) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let address = address.unwrap_or(config.server.bind_addr);

    if config.seller.wallet_address.is_none() {
        warn!("No seller wallet address configured; accepting events for any provider");
    }

    let state = build_state(config, HandlerCatalog::with_builtins())?;
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "offerbox listening for job events");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received");
}
