use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{ExecuteJob, HandlerError, HandlerExports, ValidateRequirements};
use super::types::{DeliverableResult, Requirements};

/// Offering name the greeting handler is registered under
pub const GREETING_OFFERING: &str = "greeting";

/// Built-in handler that thanks the client by name.
///
/// Ships with offerbox so a fresh install can serve `offerings/greeting`
/// without any custom code. It expects requirements of the form
/// `{"name": "<client name>"}`.
#[derive(Debug, Clone, Default)]
pub struct GreetingHandler;

impl GreetingHandler {
    fn client_name(request: &Requirements) -> Option<&str> {
        request
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

#[async_trait]
impl ValidateRequirements for GreetingHandler {
    async fn validate_requirements(&self, request: &Requirements) -> bool {
        Self::client_name(request).is_some()
    }
}

#[async_trait]
impl ExecuteJob for GreetingHandler {
    async fn execute_job(
        &self,
        request: &Requirements,
    ) -> Result<DeliverableResult, HandlerError> {
        let name = Self::client_name(request)
            .ok_or_else(|| HandlerError::failed("requirements must include a non-empty 'name'"))?;

        Ok(DeliverableResult::new(format!("Thank you {name}")))
    }
}

pub fn greeting_exports() -> HandlerExports {
    let handler = Arc::new(GreetingHandler);
    HandlerExports::builder()
        .execute_job(handler.clone())
        .validate_requirements(handler)
        .build()
}
