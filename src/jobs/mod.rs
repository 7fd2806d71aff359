//! Job lifecycle: event model, the per-job controller, and protocol actions.
//!
//! ```text
//! job event → JobDispatcher → JobController → OfferingRegistry → HandlerSet
//!                                   ↓
//!                              ActionSink (accept/reject, payment request, deliver)
//! ```

mod controller;
mod dispatcher;
mod extract;
mod http;
mod sink;
mod types;

pub use controller::{
    ACCEPT_REASON, FALLBACK_ACCEPT_REASON, JobController, JobOutcome, VALIDATION_FAILED_REASON,
};
pub use dispatcher::JobDispatcher;
pub use extract::{RequirementsExtraction, extract_requirements};
pub use http::HttpActionSink;
pub use sink::{
    ActionKind, ActionSink, Decision, Delivery, MemorySink, PaymentRequest, ProtocolAction,
    SinkError,
};
pub use types::{Job, JobId, JobPhase, Memo};
