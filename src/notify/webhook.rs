//! Webhook publisher (Discord-compatible: `payload_json` + `files[0]`).

use std::path::Path;

use reqwest::blocking::{Client, multipart};
use serde::Serialize;

use super::Publisher;
use crate::error::AppError;

/// Environment variable holding the webhook URL (may be set via `.env`).
pub const WEBHOOK_ENV: &str = "COVID_RATES_WEBHOOK_URL";

pub struct WebhookPublisher {
    client: Client,
    url: String,
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    content: &'a str,
}

impl WebhookPublisher {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        let url = std::env::var(WEBHOOK_ENV)
            .map_err(|_| AppError::new(2, format!("Missing {WEBHOOK_ENV} in environment (.env).")))?;
        Ok(Self::new(url))
    }
}

impl Publisher for WebhookPublisher {
    fn verify(&self) -> Result<(), AppError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .map_err(|e| AppError::new(4, format!("Webhook credential check failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Webhook credential check failed with status {}.", resp.status()),
            ));
        }
        tracing::info!(message = "webhook credentials verified");
        Ok(())
    }

    fn publish(&self, text: &str, image: &Path) -> Result<(), AppError> {
        let payload = serde_json::to_string(&Payload { content: text })
            .map_err(|e| AppError::new(4, format!("Failed to encode webhook payload: {e}")))?;

        let form = multipart::Form::new()
            .text("payload_json", payload)
            .file("files[0]", image)
            .map_err(|e| AppError::new(4, format!("Failed to attach chart '{}': {e}", image.display())))?;

        let resp = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .map_err(|e| AppError::new(4, format!("Webhook post failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::new(
                4,
                format!("Webhook post failed with status {}.", resp.status()),
            ));
        }

        tracing::info!(message = "status posted", status = %resp.status());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_is_discord_shaped() {
        let json = serde_json::to_string(&Payload { content: "King County, 14 Mar:\n" }).unwrap();
        assert_eq!(json, r#"{"content":"King County, 14 Mar:\n"}"#);
    }
}
