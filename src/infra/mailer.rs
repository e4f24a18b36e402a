use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Transactional email delivery.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends one email and returns the provider's message id.
    async fn send(&self, email: &OutboundEmail) -> Result<String>;
}

/// Resend HTTP API client.
#[derive(Clone)]
pub struct ResendMailer {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct SendResponse {
    id: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    message: Option<String>,
    name: Option<String>,
}

impl ResendMailer {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.mail_timeout_seconds))
            .build()
            .map_err(|err| anyhow!("failed to build mail client: {}", err))?;

        Ok(Self {
            client,
            base_url: config.resend_api_url.trim_end_matches('/').to_string(),
            api_key: config.resend_api_key.clone(),
        })
    }
}

#[async_trait]
impl Mailer for ResendMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(email)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(ErrorResponse {
                    message: Some(message),
                    name,
                }) => match name {
                    Some(name) => format!("{}: {}", name, message),
                    None => message,
                },
                _ => body,
            };
            return Err(anyhow!("email provider returned {}: {}", status.as_u16(), detail));
        }

        let sent: SendResponse = response.json().await?;
        Ok(sent.id)
    }
}
