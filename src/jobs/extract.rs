//! Recover the target offering and service requirements from a job.
//!
//! Lookup order: explicit fields on `Job.context`, then the most recent memo
//! moving the job to NEGOTIATION, then empty requirements.

use serde_json::{Map, Value};

use super::types::{Job, JobPhase};
use crate::offerings::{Requirements, empty_requirements};

const OFFERING_NAME_KEYS: [&str; 3] = ["offeringName", "serviceName", "name"];
const REQUIREMENT_KEYS: [&str; 3] = ["requirement", "requirements", "serviceRequirement"];

/// Offering name and requirements derived from a job; never stored
#[derive(Debug, Clone, PartialEq)]
pub struct RequirementsExtraction {
    pub offering_name: Option<String>,
    pub requirements: Requirements,
}

pub fn extract_requirements(job: &Job) -> RequirementsExtraction {
    let context = job.context.as_object();
    let memo = negotiation_memo(job);

    let offering_name = context
        .and_then(offering_name_in)
        .or_else(|| memo.as_ref().and_then(offering_name_in));

    let requirements = context
        .and_then(requirements_in)
        .or_else(|| memo.as_ref().and_then(requirements_in))
        .unwrap_or_else(empty_requirements);

    RequirementsExtraction {
        offering_name,
        requirements,
    }
}

/// Content of the latest NEGOTIATION memo, when it is a JSON object
fn negotiation_memo(job: &Job) -> Option<Map<String, Value>> {
    job.memos
        .iter()
        .rev()
        .find(|memo| memo.next_phase == JobPhase::Negotiation)
        .and_then(|memo| serde_json::from_str::<Value>(&memo.content).ok())
        .and_then(|content| match content {
            Value::Object(fields) => Some(fields),
            _ => None,
        })
}

fn offering_name_in(fields: &Map<String, Value>) -> Option<String> {
    OFFERING_NAME_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
}

fn requirements_in(fields: &Map<String, Value>) -> Option<Requirements> {
    REQUIREMENT_KEYS
        .iter()
        .filter_map(|key| fields.get(*key))
        .find(|value| !value.is_null())
        .map(decode_embedded_json)
}

// Some clients send requirements as a JSON document inside a string
fn decode_embedded_json(value: &Value) -> Requirements {
    if let Value::String(text) = value {
        if let Ok(parsed @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
            return parsed;
        }
    }
    value.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::types::Memo;
    use serde_json::json;

    fn job(context: Value, memos: Vec<Memo>) -> Job {
        Job {
            id: 7,
            phase: JobPhase::Request,
            client_address: "0xclient".to_string(),
            provider_address: None,
            price: 1.0,
            context,
            memos,
        }
    }

    fn memo(next_phase: JobPhase, content: Value) -> Memo {
        Memo {
            id: None,
            next_phase,
            content: content.to_string(),
            created_at: None,
        }
    }

    #[test]
    fn context_fields_take_priority() {
        let job = job(
            json!({"offeringName": "greeting", "requirement": {"name": "Ada"}}),
            vec![memo(
                JobPhase::Negotiation,
                json!({"name": "other", "requirement": {"name": "Bob"}}),
            )],
        );

        let extraction = extract_requirements(&job);
        assert_eq!(extraction.offering_name.as_deref(), Some("greeting"));
        assert_eq!(extraction.requirements, json!({"name": "Ada"}));
    }

    #[test]
    fn falls_back_to_latest_negotiation_memo() {
        let job = job(
            json!({}),
            vec![
                memo(JobPhase::Negotiation, json!({"name": "old", "requirement": {"n": 1}})),
                memo(JobPhase::Transaction, json!({"name": "wrong-phase"})),
                memo(JobPhase::Negotiation, json!({"name": "greeting", "requirement": {"name": "Ada"}})),
            ],
        );

        let extraction = extract_requirements(&job);
        assert_eq!(extraction.offering_name.as_deref(), Some("greeting"));
        assert_eq!(extraction.requirements, json!({"name": "Ada"}));
    }

    #[test]
    fn context_name_with_memo_requirements() {
        let job = job(
            json!({"serviceName": "greeting"}),
            vec![memo(JobPhase::Negotiation, json!({"serviceRequirement": {"name": "Ada"}}))],
        );

        let extraction = extract_requirements(&job);
        assert_eq!(extraction.offering_name.as_deref(), Some("greeting"));
        assert_eq!(extraction.requirements, json!({"name": "Ada"}));
    }

    #[test]
    fn nothing_to_extract_yields_empty_requirements() {
        let extraction = extract_requirements(&job(json!({}), vec![]));
        assert_eq!(extraction.offering_name, None);
        assert_eq!(extraction.requirements, json!({}));

        let extraction = extract_requirements(&job(Value::Null, vec![]));
        assert_eq!(extraction.offering_name, None);
    }

    #[test]
    fn unparsable_memo_is_ignored() {
        let job = job(
            json!({}),
            vec![Memo {
                id: Some(1),
                next_phase: JobPhase::Negotiation,
                content: "plain text note".to_string(),
                created_at: None,
            }],
        );

        assert_eq!(extract_requirements(&job).offering_name, None);
    }

    #[test]
    fn requirements_embedded_as_json_string_are_decoded() {
        let job = job(
            json!({"offeringName": "greeting", "requirement": "{\"name\":\"Ada\"}"}),
            vec![],
        );

        assert_eq!(extract_requirements(&job).requirements, json!({"name": "Ada"}));
    }

    #[test]
    fn blank_offering_name_is_ignored() {
        let job = job(
            json!({"offeringName": "  "}),
            vec![memo(JobPhase::Negotiation, json!({"name": "greeting"}))],
        );

        assert_eq!(extract_requirements(&job).offering_name.as_deref(), Some("greeting"));
    }
}
