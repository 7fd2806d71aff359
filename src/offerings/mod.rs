//! Offerings: descriptors, handler capabilities, and the registry that binds them.
//!
//! An offering is a named, priced service. Its static configuration lives in an
//! `offering.json` descriptor; its behaviour lives in a handler module exporting
//! up to three capabilities:
//!
//! - [`ExecuteJob`] - required, produces the deliverable
//! - [`ValidateRequirements`] - optional, screens requirements before accepting
//! - [`RequestAdditionalFunds`] - present exactly when `requiredFunds` is true
//!
//! The [`OfferingRegistry`] loads both halves through an [`OfferingSource`],
//! checks the contract between them, and caches the result per name.
//!
//! ## Example
//!
//! ```rust,ignore
//! use offerbox::offerings::{DirectorySource, HandlerCatalog, OfferingRegistry};
//!
//! let source = DirectorySource::new("offerings", HandlerCatalog::with_builtins());
//! let registry = OfferingRegistry::new(Arc::new(source));
//! let greeting = registry.resolve("greeting").await?;
//! ```

mod builtin;
mod registry;
mod source;
mod traits;
pub(crate) mod types;
mod validation;

pub use builtin::{GREETING_OFFERING, GreetingHandler, greeting_exports};
pub use registry::{LoadError, OfferingRegistry, ResolvedOffering};
pub use source::{
    DESCRIPTOR_FILE, DirectorySource, HandlerCatalog, MemorySource, OfferingSource, SourceError,
};
pub use traits::{
    ExecuteJob, Funding, HandlerError, HandlerExports, HandlerSet, RequestAdditionalFunds,
    ValidateRequirements,
};
pub use types::{
    CapabilitySummary, Deliverable, DeliverableResult, FundsRequest, OfferingDescriptor,
    PaymentMode, Requirements, Transfer, empty_requirements,
};
pub use validation::{
    ContractViolation, DescriptorViolation, HandlerViolation, bind_handlers, parse_descriptor,
};
