//! Resend email delivery.
//!
//! # API Reference
//!
//! See: <https://resend.com/docs/api-reference/emails/send-email>

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::{Config, EmailTheme};
use crate::error::{ConfigError, DeliveryError, Result};
use crate::model::{DeliveryResult, Report};

use super::template::render_daily;
use super::{Notifier, subject_for};

/// Sends the digest through the Resend HTTP API.
#[derive(Clone)]
pub struct ResendNotifier {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    from: String,
    to: String,
    theme: EmailTheme,
}

impl ResendNotifier {
    /// Create a notifier from the application configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout)
            .build()
            .map_err(DeliveryError::from)?;

        let notifier = Self {
            client,
            base_url: config.resend_api_url.clone(),
            api_key: config.resend_api_key.clone(),
            from: config.from_email.clone(),
            to: config.recipient_email.clone(),
            theme: config.email_theme,
        };
        notifier.check_addresses()?;
        Ok(notifier)
    }

    /// Create a notifier with a custom base URL (for testing).
    pub fn with_base_url(base_url: &str, api_key: &str, from: &str, to: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            theme: EmailTheme::default(),
        }
    }

    /// Use a different colour scheme.
    pub fn with_theme(mut self, theme: EmailTheme) -> Self {
        self.theme = theme;
        self
    }

    fn check_addresses(&self) -> std::result::Result<(), ConfigError> {
        if self.from.trim().is_empty() {
            return Err(ConfigError::Missing { name: "FROM_EMAIL" });
        }
        if self.to.trim().is_empty() {
            return Err(ConfigError::Missing {
                name: "RECIPIENT_EMAIL",
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for ResendNotifier {
    #[instrument(skip(self, report), fields(to = %self.to))]
    async fn send(&self, report: &Report, period_start: DateTime<Utc>) -> Result<DeliveryResult> {
        self.check_addresses()?;

        let html = render_daily(report, period_start, self.theme).map_err(DeliveryError::from)?;
        let subject = subject_for(period_start);

        let request = SendEmailRequest {
            from: &self.from,
            to: [self.to.as_str()],
            subject: &subject,
            html: &html,
        };

        let response = self
            .client
            .post(format!("{}/emails", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(DeliveryError::from)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ResendErrorBody>(&body)
                .map(|e| e.message)
                .unwrap_or(body);
            warn!(status = status.as_u16(), message = %message, "Resend rejected the email");
            return Err(DeliveryError::Rejected {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        let sent: SendEmailResponse = response.json().await.map_err(DeliveryError::from)?;
        info!(id = %sent.id, subject = %subject, "Analytics email sent");

        Ok(DeliveryResult { id: sent.id })
    }
}

#[derive(Debug, Serialize)]
struct SendEmailRequest<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendEmailResponse {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendErrorBody {
    message: String,
}
