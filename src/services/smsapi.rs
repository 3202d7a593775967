// SMS gateway collaborator (SMSAPI-style REST endpoint)

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::SmsGateway;

pub struct SmsApiGateway {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl SmsApiGateway {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

#[async_trait]
impl SmsGateway for SmsApiGateway {
    async fn send_sms(&self, phone_number: &str, message: &str) -> Result<Option<Value>> {
        info!(phone_number, "Sending SMS notification");

        let response = self
            .http
            .post(format!("{}/sms.do", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "to": phone_number,
                "message": message,
                "normalize": 1,
                "nounicode": 1,
            }))
            .send()
            .await
            .context("SMS gateway request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to send SMS notification to {phone_number}: {status}");
        }

        // Some deployments answer with an empty body; the command layer
        // substitutes a literal ack in that case.
        Ok(response.json().await.ok())
    }
}
