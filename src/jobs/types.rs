use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marketplace-assigned job identifier
pub type JobId = u64;

/// Position of a job in the marketplace negotiation/settlement protocol.
///
/// The wire encodes phases as integers `0..=6`; names are accepted too.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobPhase {
    Request,
    Negotiation,
    Transaction,
    Evaluation,
    Completed,
    Rejected,
    Expired,
}

impl JobPhase {
    pub const ALL: [JobPhase; 7] = [
        JobPhase::Request,
        JobPhase::Negotiation,
        JobPhase::Transaction,
        JobPhase::Evaluation,
        JobPhase::Completed,
        JobPhase::Rejected,
        JobPhase::Expired,
    ];

    pub fn from_code(code: u64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    pub fn code(&self) -> u64 {
        *self as u64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobPhase::Request => "REQUEST",
            JobPhase::Negotiation => "NEGOTIATION",
            JobPhase::Transaction => "TRANSACTION",
            JobPhase::Evaluation => "EVALUATION",
            JobPhase::Completed => "COMPLETED",
            JobPhase::Rejected => "REJECTED",
            JobPhase::Expired => "EXPIRED",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|phase| phase.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for JobPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for JobPhase {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct PhaseVisitor;

        impl serde::de::Visitor<'_> for PhaseVisitor {
            type Value = JobPhase;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a job phase as integer 0-6 or name (e.g. \"REQUEST\")")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                JobPhase::from_code(v)
                    .ok_or_else(|| E::custom(format!("unknown job phase code: {v}")))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                u64::try_from(v)
                    .ok()
                    .and_then(JobPhase::from_code)
                    .ok_or_else(|| E::custom(format!("unknown job phase code: {v}")))
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                JobPhase::from_name(v)
                    .ok_or_else(|| E::custom(format!("unknown job phase: {v}")))
            }
        }

        deserializer.deserialize_any(PhaseVisitor)
    }
}

/// Note attached to a job by the remote side; append-only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Memo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub next_phase: JobPhase,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// One job event as delivered by the transport.
///
/// Built fresh per event and never mutated while it is processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub phase: JobPhase,
    #[serde(default)]
    pub client_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_address: Option<String>,
    #[serde(default)]
    pub price: f64,
    /// Offering name and service requirements; shape is not enforced
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub memos: Vec<Memo>,
}
