//! HTTP action sink posting protocol actions to the marketplace API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use super::sink::{ActionSink, Decision, Delivery, PaymentRequest, Result, SinkError};
use super::types::JobId;
use crate::config::MarketplaceConfig;

const API_KEY_HEADER: &str = "x-api-key";

/// Marketplace client for accept/reject, payment-request, and deliver calls
pub struct HttpActionSink {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpActionSink {
    pub fn new(config: &MarketplaceConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(SinkError::MissingApiKey)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("offerbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn job_url(&self, job_id: JobId, action: &str) -> String {
        format!("{}/acp/providers/jobs/{}/{}", self.base_url, job_id, action)
    }

    async fn post<B: Serialize + Sync>(&self, url: String, body: &B) -> Result<()> {
        debug!(url, "Posting protocol action");

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SinkError::Transport(format!("timed out: {url}"))
                } else {
                    SinkError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ActionSink for HttpActionSink {
    async fn accept_or_reject(&self, job_id: JobId, decision: Decision) -> Result<()> {
        self.post(self.job_url(job_id, "accept"), &decision).await
    }

    async fn request_payment(&self, job_id: JobId, request: PaymentRequest) -> Result<()> {
        self.post(self.job_url(job_id, "requirement"), &request)
            .await
    }

    async fn deliver(&self, job_id: JobId, delivery: Delivery) -> Result<()> {
        self.post(self.job_url(job_id, "deliverable"), &delivery)
            .await
    }
}
