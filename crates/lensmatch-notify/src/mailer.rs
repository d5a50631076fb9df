//! Outbound email transports.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lensmatch_core::AppConfig;
use reqwest::Client;
use serde::Serialize;

use crate::error::NotifyError;
use crate::template::{render_price_alert, PriceAlertEmail};

pub const BREVO_API_BASE_URL: &str = "https://api.brevo.com";
const DEFAULT_FROM_EMAIL: &str = "alerts@lensmatch.in";

/// "Send templated email" capability used by the alert matcher.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// # Errors
    ///
    /// Returns [`NotifyError`] when the email is incomplete or the transport
    /// does not accept it.
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), NotifyError>;
}

#[derive(Debug, Clone)]
pub struct Sender {
    pub email: String,
    pub name: String,
}

impl Sender {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            email: config
                .mail_from_email
                .clone()
                .unwrap_or_else(|| DEFAULT_FROM_EMAIL.to_string()),
            name: config.mail_from_name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Brevo transactional email API
// ---------------------------------------------------------------------------

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoContact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoMessage<'a> {
    sender: BrevoContact<'a>,
    to: [BrevoContact<'a>; 1],
    reply_to: BrevoContact<'a>,
    subject: &'a str,
    html_content: &'a str,
}

pub struct BrevoMailer {
    client: Client,
    base_url: String,
    api_key: String,
    sender: Sender,
}

impl std::fmt::Debug for BrevoMailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrevoMailer")
            .field("base_url", &self.base_url)
            .field("api_key", &"[redacted]")
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}

impl BrevoMailer {
    /// # Errors
    ///
    /// Returns [`NotifyError::Http`] if the HTTP client cannot be constructed.
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        sender: Sender,
    ) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            sender,
        })
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), NotifyError> {
        let rendered = render_price_alert(email)?;

        let message = BrevoMessage {
            sender: BrevoContact {
                email: &self.sender.email,
                name: Some(&self.sender.name),
            },
            to: [BrevoContact {
                email: &email.to,
                name: None,
            }],
            reply_to: BrevoContact {
                email: &self.sender.email,
                name: None,
            },
            subject: &rendered.subject,
            html_content: &rendered.html,
        };

        let response = self
            .client
            .post(format!(
                "{}/v3/smtp/email",
                self.base_url.trim_end_matches('/')
            ))
            .header("api-key", &self.api_key)
            .json(&message)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|v| v.get("messageId").and_then(|m| m.as_str()).map(String::from));
        tracing::info!(to = %email.to, message_id = ?message_id, "price alert email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Log-only transport
// ---------------------------------------------------------------------------

/// Renders and logs instead of sending. Used when no transport key is set.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_price_alert(&self, email: &PriceAlertEmail) -> Result<(), NotifyError> {
        let rendered = render_price_alert(email)?;
        tracing::info!(
            to = %email.to,
            subject = %rendered.subject,
            "mail transport not configured; price alert logged only"
        );
        Ok(())
    }
}

/// Picks the transport for this configuration: Brevo when an API key is set,
/// otherwise the log-only mailer.
///
/// # Errors
///
/// Returns [`NotifyError::Http`] if the Brevo HTTP client cannot be built.
pub fn mailer_from_app_config(config: &AppConfig) -> Result<Arc<dyn Mailer>, NotifyError> {
    match &config.brevo_api_key {
        Some(key) => {
            let sender = Sender::from_app_config(config);
            Ok(Arc::new(BrevoMailer::new(BREVO_API_BASE_URL, key.clone(), sender)?))
        }
        None => {
            tracing::warn!("BREVO_API_KEY not set; price alerts will be logged, not sent");
            Ok(Arc::new(LogMailer))
        }
    }
}
