use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::{info, warn};

use super::{
    error::ApiError,
    models::{HealthResponse, JobEventAccepted, OfferingResponse},
    state::AppState,
    utils, validation,
};
use crate::jobs::Job;

/// Job event ingress (POST /jobs/events)
///
/// ## Flow:
/// 1. Require `Content-Type: application/json`
/// 2. Read the body (gzip already inflated by middleware), enforce `max_event_bytes`
/// 3. Deserialize into a [`Job`] and run structural checks
/// 4. Ignore events addressed to a different provider wallet
/// 5. Hand the job to the dispatcher, which runs its pipeline on its own task
/// 6. Return 202 Accepted immediately; outcomes are reported through logs and metrics
pub async fn receive_job_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    utils::require_json(&headers)?;

    let body_bytes = utils::read_body(body, state.config.server.max_event_bytes).await?;
    let job: Job = serde_json::from_slice(&body_bytes)?;
    validation::validate_event(&job).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    state.metrics.event_received();

    let job_id = job.id;
    let phase = job.phase;
    let wallet = state.config.seller.wallet_address.as_deref();

    let dispatched = if validation::is_addressed_to(&job, wallet) {
        info!(job_id, %phase, client = %job.client_address, "Job event received");
        state.dispatcher.dispatch(job).await.is_some()
    } else {
        warn!(
            job_id,
            %phase,
            provider = job.provider_address.as_deref().unwrap_or_default(),
            "Job event addressed to another provider, ignoring"
        );
        false
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(JobEventAccepted {
            job_id,
            phase,
            dispatched,
        }),
    ))
}

/// Offering inspection (GET /offerings/{name})
///
/// Resolves through the shared registry, so a successful call also warms the
/// cache for incoming jobs.
pub async fn get_offering(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let offering = state.registry.resolve(&name).await?;

    Ok((
        StatusCode::OK,
        Json(OfferingResponse {
            descriptor: offering.descriptor.clone(),
            capabilities: offering.handlers.capabilities(),
        }),
    ))
}

/// Health check (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = BTreeMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert(
        "registry".to_string(),
        format!("{} offerings cached", state.registry.cached_names().await.len()),
    );

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    (StatusCode::OK, Json(response))
}

/// Counter snapshot (GET /operators/metrics)
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.metrics.snapshot())
}
