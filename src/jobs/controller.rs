//! Job lifecycle controller
//!
//! Drives one job event through the seller side of the protocol:
//!
//! - REQUEST: resolve offering → validate → accept → request funds → execute → deliver
//! - TRANSACTION: resolve offering → execute → deliver (no accept/reject slot left)
//! - any other phase: acknowledged, no action
//!
//! Handler failures never escape a pipeline. Inside the accept/reject window
//! they become a reject action; after it they are logged and the job is left
//! for external retry.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use super::extract::{RequirementsExtraction, extract_requirements};
use super::sink::{self, ActionKind, ActionSink, Decision, PaymentRequest, SinkError};
use super::types::{Job, JobId, JobPhase};
use crate::observability::Metrics;
use crate::offerings::{
    DeliverableResult, Funding, FundsRequest, HandlerError, OfferingRegistry, PaymentMode,
};

/// Reason sent when a REQUEST job names no offering
pub const FALLBACK_ACCEPT_REASON: &str = "Job accepted";
/// Reason sent when an offering accepts the requirements
pub const ACCEPT_REASON: &str = "Requirements accepted";
/// Reason sent when `validate_requirements` returns false
pub const VALIDATION_FAILED_REASON: &str = "Validation failed";

/// What happened to a job during one processing pass
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    /// REQUEST job accepted without an offering to route it to
    AcceptedUnrouted,
    Rejected { reason: String },
    Delivered { offering: String },
    /// Failure after the accept/reject window; the job is left as-is
    Failed { reason: String },
    /// TRANSACTION job naming no offering; nothing was done
    Unrouted,
    Ignored { phase: JobPhase },
    /// A protocol action failed and the pipeline stopped
    ActionFailed { action: ActionKind, error: String },
}

struct ActionFailure {
    action: ActionKind,
    error: SinkError,
}

impl From<ActionFailure> for JobOutcome {
    fn from(failure: ActionFailure) -> Self {
        JobOutcome::ActionFailed {
            action: failure.action,
            error: failure.error.to_string(),
        }
    }
}

type Step<T> = Result<T, ActionFailure>;

pub struct JobController {
    registry: Arc<OfferingRegistry>,
    sink: Arc<dyn ActionSink>,
    metrics: Arc<Metrics>,
    capability_timeout: Option<Duration>,
}

impl JobController {
    pub fn new(registry: Arc<OfferingRegistry>, sink: Arc<dyn ActionSink>) -> Self {
        Self {
            registry,
            sink,
            metrics: Arc::new(Metrics::new()),
            capability_timeout: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Bound every handler capability call; `None` waits indefinitely
    pub fn with_capability_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.capability_timeout = timeout;
        self
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn registry(&self) -> &Arc<OfferingRegistry> {
        &self.registry
    }

    /// Process one job event to its outcome for this pass
    pub async fn handle(&self, job: &Job) -> JobOutcome {
        let outcome = match job.phase {
            JobPhase::Request => self.on_request(job).await.unwrap_or_else(Into::into),
            JobPhase::Transaction => self.on_transaction(job).await.unwrap_or_else(Into::into),
            phase => JobOutcome::Ignored { phase },
        };

        report(job, &outcome);
        outcome
    }

    async fn on_request(&self, job: &Job) -> Step<JobOutcome> {
        let RequirementsExtraction {
            offering_name,
            requirements,
        } = extract_requirements(job);

        let Some(name) = offering_name else {
            self.decide(job.id, Decision::accept(FALLBACK_ACCEPT_REASON))
                .await?;
            return Ok(JobOutcome::AcceptedUnrouted);
        };

        let offering = match self.registry.resolve(&name).await {
            Ok(offering) => offering,
            Err(err) => {
                return self
                    .reject(job.id, format!("Offering unavailable: {err}"))
                    .await;
            }
        };

        if let Some(validator) = offering.handlers.validator() {
            let valid = self
                .invoke(async { Ok(validator.validate_requirements(&requirements).await) })
                .await
                .unwrap_or_else(|err| {
                    self.metrics.execution_failed();
                    warn!(job_id = job.id, offering = %name, error = %err, "validate_requirements failed");
                    false
                });

            if !valid {
                return self
                    .reject(job.id, VALIDATION_FAILED_REASON.to_string())
                    .await;
            }
        }

        self.decide(job.id, Decision::accept(ACCEPT_REASON)).await?;

        if let Funding::Required(funds) = offering.handlers.funding() {
            let request = self
                .invoke(funds.request_additional_funds(&requirements))
                .await
                .and_then(check_funds_request);

            let request = match request {
                Ok(request) => request,
                Err(err) => {
                    self.metrics.execution_failed();
                    return self.reject(job.id, format!("Job failed: {err}")).await;
                }
            };

            if request.mode != PaymentMode::Request {
                debug!(
                    job_id = job.id,
                    offering = %name,
                    mode = ?request.mode,
                    "Funds handler asked for another mode; sending a payment request"
                );
            }
            // Only request mode is valid before execution
            let payment = PaymentRequest {
                mode: PaymentMode::Request,
                ..request.into()
            };

            info!(
                job_id = job.id,
                offering = %name,
                amount = payment.amount,
                token = %payment.token_symbol,
                "Requesting additional funds"
            );
            self.emit(
                job.id,
                ActionKind::RequestPayment,
                self.sink.request_payment(job.id, payment),
            )
            .await?;
            self.metrics.payment_requested();
        }

        match self
            .invoke(offering.handlers.executor().execute_job(&requirements))
            .await
        {
            Ok(result) => {
                self.deliver(job.id, result).await?;
                Ok(JobOutcome::Delivered { offering: name })
            }
            Err(err) => {
                self.metrics.execution_failed();
                self.reject(job.id, format!("Job failed: {err}")).await
            }
        }
    }

    async fn on_transaction(&self, job: &Job) -> Step<JobOutcome> {
        let RequirementsExtraction {
            offering_name,
            requirements,
        } = extract_requirements(job);

        let Some(name) = offering_name else {
            return Ok(JobOutcome::Unrouted);
        };

        let offering = match self.registry.resolve(&name).await {
            Ok(offering) => offering,
            Err(err) => {
                return Ok(JobOutcome::Failed {
                    reason: format!("Offering unavailable: {err}"),
                });
            }
        };

        match self
            .invoke(offering.handlers.executor().execute_job(&requirements))
            .await
        {
            Ok(result) => {
                self.deliver(job.id, result).await?;
                Ok(JobOutcome::Delivered { offering: name })
            }
            Err(err) => {
                self.metrics.execution_failed();
                Ok(JobOutcome::Failed {
                    reason: format!("Job failed: {err}"),
                })
            }
        }
    }

    async fn decide(&self, job_id: JobId, decision: Decision) -> Step<()> {
        let accepted = decision.accept;
        self.emit(
            job_id,
            ActionKind::AcceptOrReject,
            self.sink.accept_or_reject(job_id, decision),
        )
        .await?;

        if accepted {
            self.metrics.job_accepted();
        } else {
            self.metrics.job_rejected();
        }
        Ok(())
    }

    async fn reject(&self, job_id: JobId, reason: String) -> Step<JobOutcome> {
        self.decide(job_id, Decision::reject(reason.clone())).await?;
        Ok(JobOutcome::Rejected { reason })
    }

    async fn deliver(&self, job_id: JobId, result: DeliverableResult) -> Step<()> {
        self.emit(
            job_id,
            ActionKind::Deliver,
            self.sink.deliver(job_id, result.into()),
        )
        .await?;
        self.metrics.job_delivered();
        Ok(())
    }

    async fn emit(
        &self,
        job_id: JobId,
        action: ActionKind,
        call: impl Future<Output = sink::Result<()>>,
    ) -> Step<()> {
        call.await.map_err(|error| {
            self.metrics.action_failed();
            error!(job_id, %action, %error, "Protocol action failed");
            ActionFailure { action, error }
        })
    }

    /// Run one handler capability, turning panics and timeouts into errors
    async fn invoke<T>(
        &self,
        call: impl Future<Output = Result<T, HandlerError>>,
    ) -> Result<T, HandlerError> {
        let guarded = AssertUnwindSafe(call).catch_unwind();

        let result = match self.capability_timeout {
            Some(limit) => tokio::time::timeout(limit, guarded)
                .await
                .map_err(|_| HandlerError::TimedOut(limit))?,
            None => guarded.await,
        };

        result.unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))))
    }
}

fn check_funds_request(request: FundsRequest) -> Result<FundsRequest, HandlerError> {
    if !request.amount.is_finite() || request.amount < 0.0 {
        return Err(HandlerError::InvalidFundsRequest(format!(
            "amount must be a non-negative number, got {}",
            request.amount
        )));
    }
    Ok(request)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}

fn report(job: &Job, outcome: &JobOutcome) {
    let job_id = job.id;
    let phase = job.phase;
    let client = job.client_address.as_str();

    match outcome {
        JobOutcome::AcceptedUnrouted => warn!(
            job_id,
            %phase,
            client,
            reason = FALLBACK_ACCEPT_REASON,
            "Job accepted without an offering name; no handler will service it"
        ),
        JobOutcome::Rejected { reason } => {
            warn!(job_id, %phase, client, reason = %reason, "Job rejected")
        }
        JobOutcome::Delivered { offering } => {
            info!(job_id, %phase, client, offering = %offering, "Job delivered")
        }
        JobOutcome::Failed { reason } => warn!(
            job_id,
            %phase,
            client,
            reason = %reason,
            "Job failed after acceptance; left in current phase"
        ),
        JobOutcome::Unrouted => {
            info!(job_id, %phase, "No offering name on job; nothing to do")
        }
        JobOutcome::Ignored { .. } => debug!(job_id, %phase, "No action for phase"),
        JobOutcome::ActionFailed { action, error } => error!(
            job_id,
            %phase,
            %action,
            error = %error,
            "Job pipeline stopped after failed protocol action"
        ),
    }
}
