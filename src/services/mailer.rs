// Mail relay collaborator
//
// Delivery goes through an HTTP mail relay rather than raw SMTP; the relay
// owns the template rendering and the actual SMTP session.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::info;

use super::EmailGateway;

pub struct HttpMailer {
    http: reqwest::Client,
    base_url: String,
    token: String,
    from: String,
}

impl HttpMailer {
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        from: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
            base_url: base_url.into(),
            token: token.into(),
            from: from.into(),
        }
    }
}

#[async_trait]
impl EmailGateway for HttpMailer {
    async fn send_email(
        &self,
        recipients: &[String],
        subject: &str,
        message: &str,
    ) -> Result<Option<Value>> {
        info!(recipients = ?recipients, subject, "Sending email notification");

        let response = self
            .http
            .post(format!("{}/messages", self.base_url))
            .bearer_auth(&self.token)
            .json(&json!({
                "from": self.from,
                "to": recipients,
                "subject": subject,
                "text": message,
            }))
            .send()
            .await
            .context("Mail relay request failed")?;

        let status = response.status();
        if !status.is_success() {
            bail!("Failed to send email notification: {status}");
        }

        Ok(response.json().await.ok())
    }
}
