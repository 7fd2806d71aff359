//! Protocol action sink
//!
//! The controller emits three kinds of actions per job: accept/reject, a
//! payment request, and delivery. Each call either succeeds or fails; the
//! controller never interprets a response body.

use std::fmt;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

use super::types::JobId;
use crate::offerings::{Deliverable, DeliverableResult, FundsRequest, PaymentMode, Transfer};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("marketplace API key is not configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(String),

    #[error("marketplace rejected action with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

pub type Result<T> = std::result::Result<T, SinkError>;

/// Kind of protocol action, used in logs and outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AcceptOrReject,
    RequestPayment,
    Deliver,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionKind::AcceptOrReject => "accept_or_reject",
            ActionKind::RequestPayment => "request_payment",
            ActionKind::Deliver => "deliver",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Decision {
    pub accept: bool,
    pub reason: String,
}

impl Decision {
    pub fn accept(reason: impl Into<String>) -> Self {
        Self {
            accept: true,
            reason: reason.into(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        Self {
            accept: false,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    pub amount: f64,
    pub token_contract_address: String,
    pub token_symbol: String,
    pub mode: PaymentMode,
}

impl From<FundsRequest> for PaymentRequest {
    fn from(request: FundsRequest) -> Self {
        Self {
            amount: request.amount,
            token_contract_address: request.token_contract_address,
            token_symbol: request.token_symbol,
            mode: request.mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Delivery {
    pub deliverable: Deliverable,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
}

impl From<DeliverableResult> for Delivery {
    fn from(result: DeliverableResult) -> Self {
        Self {
            deliverable: result.deliverable,
            transfer: result.transfer,
        }
    }
}

/// Receiver of protocol actions, keyed by job id
#[async_trait]
pub trait ActionSink: Send + Sync {
    async fn accept_or_reject(&self, job_id: JobId, decision: Decision) -> Result<()>;

    async fn request_payment(&self, job_id: JobId, request: PaymentRequest) -> Result<()>;

    async fn deliver(&self, job_id: JobId, delivery: Delivery) -> Result<()>;
}

/// Action recorded by [`MemorySink`]
#[derive(Debug, Clone, PartialEq)]
pub enum ProtocolAction {
    AcceptOrReject { job_id: JobId, decision: Decision },
    RequestPayment { job_id: JobId, request: PaymentRequest },
    Deliver { job_id: JobId, delivery: Delivery },
}

impl ProtocolAction {
    pub fn job_id(&self) -> JobId {
        match self {
            ProtocolAction::AcceptOrReject { job_id, .. }
            | ProtocolAction::RequestPayment { job_id, .. }
            | ProtocolAction::Deliver { job_id, .. } => *job_id,
        }
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            ProtocolAction::AcceptOrReject { .. } => ActionKind::AcceptOrReject,
            ProtocolAction::RequestPayment { .. } => ActionKind::RequestPayment,
            ProtocolAction::Deliver { .. } => ActionKind::Deliver,
        }
    }
}

/// Sink that records actions in memory, for development and tests.
///
/// Can be told to fail one kind of action to exercise error paths.
#[derive(Debug, Default)]
pub struct MemorySink {
    actions: Mutex<Vec<ProtocolAction>>,
    failing: Option<ActionKind>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose `kind` actions always fail and are not recorded
    pub fn failing(kind: ActionKind) -> Self {
        Self {
            actions: Mutex::new(Vec::new()),
            failing: Some(kind),
        }
    }

    pub async fn actions(&self) -> Vec<ProtocolAction> {
        self.actions.lock().await.clone()
    }

    /// Actions recorded for one job, in emission order
    pub async fn actions_for(&self, job_id: JobId) -> Vec<ProtocolAction> {
        self.actions
            .lock()
            .await
            .iter()
            .filter(|action| action.job_id() == job_id)
            .cloned()
            .collect()
    }

    async fn record(&self, action: ProtocolAction) -> Result<()> {
        if self.failing == Some(action.kind()) {
            tracing::debug!(job_id = action.job_id(), action = %action.kind(), "Memory sink failing action");
            return Err(SinkError::Transport(format!(
                "{} is configured to fail",
                action.kind()
            )));
        }
        self.actions.lock().await.push(action);
        Ok(())
    }
}

#[async_trait]
impl ActionSink for MemorySink {
    async fn accept_or_reject(&self, job_id: JobId, decision: Decision) -> Result<()> {
        self.record(ProtocolAction::AcceptOrReject { job_id, decision })
            .await
    }

    async fn request_payment(&self, job_id: JobId, request: PaymentRequest) -> Result<()> {
        self.record(ProtocolAction::RequestPayment { job_id, request })
            .await
    }

    async fn deliver(&self, job_id: JobId, delivery: Delivery) -> Result<()> {
        self.record(ProtocolAction::Deliver { job_id, delivery })
            .await
    }
}
