use serde_json::Value;
use thiserror::Error;

use super::traits::{Funding, HandlerExports, HandlerSet};
use super::types::OfferingDescriptor;

/// Field-level rule broken by an `offering.json` document
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DescriptorViolation {
    #[error("descriptor is not valid JSON: {0}")]
    Malformed(String),
    #[error("descriptor must be a JSON object")]
    NotAnObject,
    #[error("'{0}' is required")]
    Missing(&'static str),
    #[error("'{0}' must be a non-empty string")]
    Empty(&'static str),
    #[error("'requiredFunds' must be a boolean")]
    RequiredFundsNotBoolean,
    #[error("'jobFee' must be a number")]
    JobFeeNotNumber,
    #[error("'jobFee' must not be negative (got {0})")]
    NegativeJobFee(f64),
}

/// Mismatch between `requiredFunds` and the exported funding capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContractViolation {
    #[error("requiredFunds is true but requestAdditionalFunds is not exported")]
    MissingFundsHandler,
    #[error("requiredFunds is false but requestAdditionalFunds is exported")]
    UnexpectedFundsHandler,
}

/// Problem with the capabilities exported for an offering
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HandlerViolation {
    #[error("executeJob is not exported")]
    MissingExecuteJob,
    #[error(transparent)]
    Contract(#[from] ContractViolation),
}

/// Parse an `offering.json` document, collecting every violated rule.
pub fn parse_descriptor(raw: &[u8]) -> Result<OfferingDescriptor, Vec<DescriptorViolation>> {
    let document: Value = serde_json::from_slice(raw)
        .map_err(|e| vec![DescriptorViolation::Malformed(e.to_string())])?;

    let Some(fields) = document.as_object() else {
        return Err(vec![DescriptorViolation::NotAnObject]);
    };

    let mut violations = Vec::new();

    let name = required_text(fields.get("name"), "name", &mut violations);
    let description = required_text(fields.get("description"), "description", &mut violations);

    let required_funds = match fields.get("requiredFunds") {
        None | Some(Value::Null) => {
            violations.push(DescriptorViolation::Missing("requiredFunds"));
            false
        }
        Some(Value::Bool(flag)) => *flag,
        Some(_) => {
            violations.push(DescriptorViolation::RequiredFundsNotBoolean);
            false
        }
    };

    let job_fee = match fields.get("jobFee") {
        // An offering that states no fee is free
        None | Some(Value::Null) => 0.0,
        Some(value) => match value.as_f64() {
            Some(fee) if fee < 0.0 => {
                violations.push(DescriptorViolation::NegativeJobFee(fee));
                fee
            }
            Some(fee) => fee,
            None => {
                violations.push(DescriptorViolation::JobFeeNotNumber);
                0.0
            }
        },
    };

    if !violations.is_empty() {
        return Err(violations);
    }

    Ok(OfferingDescriptor {
        name,
        description,
        job_fee,
        required_funds,
        requirement: fields.get("requirement").filter(|v| !v.is_null()).cloned(),
        deliverable: fields.get("deliverable").filter(|v| !v.is_null()).cloned(),
    })
}

fn required_text(
    value: Option<&Value>,
    field: &'static str,
    violations: &mut Vec<DescriptorViolation>,
) -> String {
    match value {
        None | Some(Value::Null) => {
            violations.push(DescriptorViolation::Missing(field));
            String::new()
        }
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(_) => {
            violations.push(DescriptorViolation::Empty(field));
            String::new()
        }
    }
}

/// Check exported capabilities against the descriptor and build a [`HandlerSet`].
///
/// `validateRequirements` is optional and never produces a violation.
pub fn bind_handlers(
    descriptor: &OfferingDescriptor,
    exports: HandlerExports,
) -> Result<HandlerSet, Vec<HandlerViolation>> {
    let mut violations = Vec::new();

    if exports.execute_job.is_none() {
        violations.push(HandlerViolation::MissingExecuteJob);
    }

    match (descriptor.required_funds, &exports.request_additional_funds) {
        (true, None) => violations.push(ContractViolation::MissingFundsHandler.into()),
        (false, Some(_)) => violations.push(ContractViolation::UnexpectedFundsHandler.into()),
        _ => {}
    }

    let (Some(execute), true) = (exports.execute_job, violations.is_empty()) else {
        return Err(violations);
    };

    let funding = match exports.request_additional_funds {
        Some(funds) => Funding::Required(funds),
        None => Funding::NotRequired,
    };

    Ok(HandlerSet::new(
        execute,
        exports.validate_requirements,
        funding,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::offerings::traits::{ExecuteJob, HandlerError, RequestAdditionalFunds};
    use crate::offerings::types::{DeliverableResult, FundsRequest, PaymentMode, Requirements};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    struct Echo;

    #[async_trait]
    impl ExecuteJob for Echo {
        async fn execute_job(
            &self,
            request: &Requirements,
        ) -> Result<DeliverableResult, HandlerError> {
            Ok(DeliverableResult::new(request.clone()))
        }
    }

    struct FixedFunds;

    #[async_trait]
    impl RequestAdditionalFunds for FixedFunds {
        async fn request_additional_funds(
            &self,
            _request: &Requirements,
        ) -> Result<FundsRequest, HandlerError> {
            Ok(FundsRequest {
                amount: 1.0,
                token_contract_address: "0xtoken".to_string(),
                token_symbol: "USDC".to_string(),
                mode: PaymentMode::Request,
            })
        }
    }

    fn descriptor(required_funds: bool) -> OfferingDescriptor {
        OfferingDescriptor {
            name: "echo".to_string(),
            description: "Echo requirements back".to_string(),
            job_fee: 0.1,
            required_funds,
            requirement: None,
            deliverable: None,
        }
    }

    fn encode(value: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[test]
    fn parse_descriptor_accepts_complete_document() {
        let raw = encode(json!({
            "name": "greeting",
            "description": "Says thank you",
            "jobFee": 0.5,
            "requiredFunds": false,
            "requirement": {"type": "object"},
            "deliverable": "text"
        }));

        let parsed = parse_descriptor(&raw).unwrap();
        assert_eq!(parsed.name, "greeting");
        assert_eq!(parsed.job_fee, 0.5);
        assert!(!parsed.required_funds);
        assert_eq!(parsed.deliverable, Some(json!("text")));
    }

    #[test]
    fn parse_descriptor_reports_every_violation() {
        let raw = encode(json!({
            "name": "",
            "jobFee": -1,
            "requiredFunds": "yes"
        }));

        let violations = parse_descriptor(&raw).unwrap_err();
        assert_eq!(
            violations,
            vec![
                DescriptorViolation::Empty("name"),
                DescriptorViolation::Missing("description"),
                DescriptorViolation::RequiredFundsNotBoolean,
                DescriptorViolation::NegativeJobFee(-1.0),
            ]
        );
    }

    #[test]
    fn parse_descriptor_rejects_missing_required_funds() {
        let raw = encode(json!({"name": "a", "description": "b"}));

        let violations = parse_descriptor(&raw).unwrap_err();
        assert_eq!(violations, vec![DescriptorViolation::Missing("requiredFunds")]);
    }

    #[test]
    fn parse_descriptor_defaults_missing_fee_to_zero() {
        let raw = encode(json!({"name": "a", "description": "b", "requiredFunds": true}));

        let parsed = parse_descriptor(&raw).unwrap();
        assert_eq!(parsed.job_fee, 0.0);

        let raw = encode(json!({"name": "a", "description": "b", "requiredFunds": true, "jobFee": null}));
        assert_eq!(parse_descriptor(&raw).unwrap().job_fee, 0.0);
    }

    #[test]
    fn parse_descriptor_rejects_malformed_json() {
        let violations = parse_descriptor(b"{not json").unwrap_err();
        assert!(matches!(violations[0], DescriptorViolation::Malformed(_)));

        let violations = parse_descriptor(b"[1, 2]").unwrap_err();
        assert_eq!(violations, vec![DescriptorViolation::NotAnObject]);
    }

    #[test]
    fn bind_handlers_requires_execute_job() {
        let exports = HandlerExports::default();
        let violations = bind_handlers(&descriptor(false), exports).unwrap_err();
        assert_eq!(violations, vec![HandlerViolation::MissingExecuteJob]);
    }

    #[test]
    fn bind_handlers_rejects_missing_funds_handler() {
        let exports = HandlerExports::builder()
            .execute_job(Arc::new(Echo))
            .build();

        let violations = bind_handlers(&descriptor(true), exports).unwrap_err();
        assert_eq!(
            violations,
            vec![HandlerViolation::Contract(ContractViolation::MissingFundsHandler)]
        );
    }

    #[test]
    fn bind_handlers_rejects_unexpected_funds_handler() {
        let exports = HandlerExports::builder()
            .execute_job(Arc::new(Echo))
            .request_additional_funds(Arc::new(FixedFunds))
            .build();

        let violations = bind_handlers(&descriptor(false), exports).unwrap_err();
        assert_eq!(
            violations,
            vec![HandlerViolation::Contract(ContractViolation::UnexpectedFundsHandler)]
        );
    }

    #[test]
    fn bind_handlers_collects_missing_execute_and_contract_together() {
        let exports = HandlerExports::builder()
            .request_additional_funds(Arc::new(FixedFunds))
            .build();

        let violations = bind_handlers(&descriptor(false), exports).unwrap_err();
        assert_eq!(violations.len(), 2);
    }

    #[test]
    fn bind_handlers_accepts_matching_funding() {
        let exports = HandlerExports::builder()
            .execute_job(Arc::new(Echo))
            .request_additional_funds(Arc::new(FixedFunds))
            .build();

        let set = bind_handlers(&descriptor(true), exports).unwrap();
        assert!(set.capabilities().request_additional_funds);
        assert!(!set.capabilities().validate_requirements);
        assert!(matches!(set.funding(), Funding::Required(_)));
    }
}
