use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::types::{CapabilitySummary, DeliverableResult, FundsRequest, Requirements};

/// Errors raised by offering handler code
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),
    #[error("invalid funds request: {0}")]
    InvalidFundsRequest(String),
    #[error("handler did not finish within {0:?}")]
    TimedOut(Duration),
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

/// Performs the work a client paid for. Every offering must export it.
#[async_trait]
pub trait ExecuteJob: Send + Sync {
    async fn execute_job(
        &self,
        request: &Requirements,
    ) -> Result<DeliverableResult, HandlerError>;
}

/// Screens incoming requirements before the job is accepted.
#[async_trait]
pub trait ValidateRequirements: Send + Sync {
    async fn validate_requirements(&self, request: &Requirements) -> bool;
}

/// Computes the funds to request from the client.
///
/// Exported only by offerings whose descriptor sets `requiredFunds`.
#[async_trait]
pub trait RequestAdditionalFunds: Send + Sync {
    async fn request_additional_funds(
        &self,
        request: &Requirements,
    ) -> Result<FundsRequest, HandlerError>;
}

/// Capabilities a handler module exports, before any contract check.
///
/// This is what an offering author hands to the runtime. Nothing is required
/// at this level; the registry decides whether the exports form a usable
/// [`HandlerSet`] for the offering's descriptor.
#[derive(Clone, Default, bon::Builder)]
pub struct HandlerExports {
    pub execute_job: Option<Arc<dyn ExecuteJob>>,
    pub validate_requirements: Option<Arc<dyn ValidateRequirements>>,
    pub request_additional_funds: Option<Arc<dyn RequestAdditionalFunds>>,
}

impl HandlerExports {
    pub fn capabilities(&self) -> CapabilitySummary {
        CapabilitySummary {
            execute_job: self.execute_job.is_some(),
            validate_requirements: self.validate_requirements.is_some(),
            request_additional_funds: self.request_additional_funds.is_some(),
        }
    }
}

impl fmt::Debug for HandlerExports {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerExports")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}

/// Funding capability of a validated handler set
#[derive(Clone)]
pub enum Funding {
    NotRequired,
    Required(Arc<dyn RequestAdditionalFunds>),
}

/// Handler set that passed the contract check for its descriptor.
///
/// Only the registry builds these, so `Funding::Required` is present exactly
/// when the descriptor sets `requiredFunds`.
#[derive(Clone)]
pub struct HandlerSet {
    execute: Arc<dyn ExecuteJob>,
    validator: Option<Arc<dyn ValidateRequirements>>,
    funding: Funding,
}

impl HandlerSet {
    pub(crate) fn new(
        execute: Arc<dyn ExecuteJob>,
        validator: Option<Arc<dyn ValidateRequirements>>,
        funding: Funding,
    ) -> Self {
        Self {
            execute,
            validator,
            funding,
        }
    }

    pub fn executor(&self) -> &Arc<dyn ExecuteJob> {
        &self.execute
    }

    pub fn validator(&self) -> Option<&Arc<dyn ValidateRequirements>> {
        self.validator.as_ref()
    }

    pub fn funding(&self) -> &Funding {
        &self.funding
    }

    pub fn capabilities(&self) -> CapabilitySummary {
        CapabilitySummary {
            execute_job: true,
            validate_requirements: self.validator.is_some(),
            request_additional_funds: matches!(self.funding, Funding::Required(_)),
        }
    }
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("capabilities", &self.capabilities())
            .finish()
    }
}
