use thiserror::Error;

use crate::jobs::Job;

#[derive(Debug, Error, PartialEq)]
pub enum EventValidationError {
    #[error("job id must be positive")]
    MissingJobId,
    #[error("clientAddress is required")]
    MissingClientAddress,
}

/// Structural checks on an inbound job event
pub fn validate_event(job: &Job) -> Result<(), EventValidationError> {
    if job.id == 0 {
        return Err(EventValidationError::MissingJobId);
    }
    if job.client_address.trim().is_empty() {
        return Err(EventValidationError::MissingClientAddress);
    }
    Ok(())
}

/// Whether an event is addressed to this seller.
///
/// Events without a provider address, or when no wallet is configured, are
/// taken as ours. Addresses compare case-insensitively.
pub fn is_addressed_to(job: &Job, wallet: Option<&str>) -> bool {
    match (job.provider_address.as_deref(), wallet) {
        (Some(provider), Some(wallet)) => provider.eq_ignore_ascii_case(wallet),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::JobPhase;
    use serde_json::json;

    fn job(provider: Option<&str>) -> Job {
        Job {
            id: 9,
            phase: JobPhase::Request,
            client_address: "0xclient".to_string(),
            provider_address: provider.map(str::to_string),
            price: 0.0,
            context: json!({}),
            memos: vec![],
        }
    }

    #[test]
    fn provider_address_matching() {
        let wallet = "0xAbCd00000000000000000000000000000000EF01";

        assert!(is_addressed_to(&job(None), Some(wallet)));
        assert!(is_addressed_to(&job(Some("0xother")), None));
        assert!(is_addressed_to(
            &job(Some("0xabcd00000000000000000000000000000000ef01")),
            Some(wallet)
        ));
        assert!(!is_addressed_to(&job(Some("0xother")), Some(wallet)));
    }

    #[test]
    fn rejects_incomplete_events() {
        let mut event = job(None);
        assert!(validate_event(&event).is_ok());

        event.client_address = " ".to_string();
        assert_eq!(
            validate_event(&event),
            Err(EventValidationError::MissingClientAddress)
        );

        event.id = 0;
        assert_eq!(validate_event(&event), Err(EventValidationError::MissingJobId));
    }
}
