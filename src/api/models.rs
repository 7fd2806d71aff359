//! Request and response bodies for the job event ingress.
//!
//! Inbound job events are deserialized straight into [`crate::jobs::Job`]:
//!
//! ```json
//! {
//!   "id": 1042,
//!   "phase": 0,
//!   "clientAddress": "0x5f1c...",
//!   "providerAddress": "0x9a2e...",
//!   "price": 0.5,
//!   "context": { "offeringName": "greeting", "requirement": { "name": "Ada" } },
//!   "memos": [
//!     { "id": 1, "nextPhase": 1, "content": "{\"name\":\"greeting\"}", "createdAt": "2025-01-01T00:00:00Z" }
//!   ]
//! }
//! ```
//!
//! `phase` may be the numeric protocol code or its name (`"REQUEST"`).

use serde::Serialize;
use std::collections::BTreeMap;

use crate::jobs::{JobId, JobPhase};
use crate::offerings::{CapabilitySummary, OfferingDescriptor};

/// Response to `POST /jobs/events`
#[derive(Debug, Serialize)]
pub struct JobEventAccepted {
    pub job_id: JobId,
    pub phase: JobPhase,
    /// False when the event was ignored or dropped as a duplicate
    pub dispatched: bool,
}

/// Response to `GET /offerings/{name}`
#[derive(Debug, Serialize)]
pub struct OfferingResponse {
    pub descriptor: OfferingDescriptor,
    pub capabilities: CapabilitySummary,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: BTreeMap<String, String>,
    pub version: String,
}
