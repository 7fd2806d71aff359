use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service requirements handed to every handler capability.
///
/// Usually a JSON object supplied by the client when the job was created.
pub type Requirements = Value;

/// Returns the requirements value used when nothing could be extracted.
pub fn empty_requirements() -> Requirements {
    Value::Object(Map::new())
}

/// Static configuration of one sellable offering, loaded from `offering.json`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferingDescriptor {
    pub name: String,
    pub description: String,
    pub job_fee: f64,
    pub required_funds: bool,
    /// Input schema shown to clients; advisory only, never enforced here
    pub requirement: Option<Value>,
    /// Deliverable type tag
    pub deliverable: Option<Value>,
}

/// How the seller wants additional funds to move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Request,
    Transfer,
}

/// Funds an offering asks the client for before executing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FundsRequest {
    pub amount: f64,
    pub token_contract_address: String,
    pub token_symbol: String,
    #[serde(default)]
    pub mode: PaymentMode,
}

/// Funds the seller sends back to the client as part of delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub contract_address: String,
    pub amount: f64,
}

/// Deliverable payload: either plain text or a structured document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Deliverable {
    Text(String),
    Structured(Value),
}

impl From<&str> for Deliverable {
    fn from(value: &str) -> Self {
        Deliverable::Text(value.to_string())
    }
}

impl From<String> for Deliverable {
    fn from(value: String) -> Self {
        Deliverable::Text(value)
    }
}

impl From<Value> for Deliverable {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Deliverable::Text(text),
            other => Deliverable::Structured(other),
        }
    }
}

/// Result of a successful `execute_job` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliverableResult {
    pub deliverable: Deliverable,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer: Option<Transfer>,
}

impl DeliverableResult {
    pub fn new(deliverable: impl Into<Deliverable>) -> Self {
        Self {
            deliverable: deliverable.into(),
            transfer: None,
        }
    }

    pub fn with_transfer(mut self, transfer: Transfer) -> Self {
        self.transfer = Some(transfer);
        self
    }
}

/// Which capabilities an offering's handler set exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitySummary {
    pub execute_job: bool,
    pub validate_requirements: bool,
    pub request_additional_funds: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_funds_request_defaults_to_request_mode() {
        let request: FundsRequest = serde_json::from_value(json!({
            "amount": 1.5,
            "tokenContractAddress": "0xabc",
            "tokenSymbol": "USDC"
        }))
        .unwrap();

        assert_eq!(request.mode, PaymentMode::Request);
        assert_eq!(request.token_symbol, "USDC");
    }

    #[test]
    fn test_deliverable_from_json_string_is_text() {
        let deliverable = Deliverable::from(json!("Thank you Ada"));
        assert_eq!(deliverable, Deliverable::Text("Thank you Ada".to_string()));

        let structured = Deliverable::from(json!({"url": "https://example.com/report"}));
        assert!(matches!(structured, Deliverable::Structured(_)));
    }

    #[test]
    fn test_deliverable_result_omits_missing_transfer() {
        let result = DeliverableResult::new("done");
        let encoded = serde_json::to_value(&result).unwrap();
        assert_eq!(encoded, json!({"deliverable": "done"}));

        let with_transfer = DeliverableResult::new("done").with_transfer(Transfer {
            contract_address: "0xdef".to_string(),
            amount: 2.0,
        });
        let encoded = serde_json::to_value(&with_transfer).unwrap();
        assert_eq!(encoded["transfer"]["contractAddress"], "0xdef");
    }
}
