//! Outbound email transport.
//!
//! `AppState` holds an `Arc<dyn Mailer>`; the default backend is Brevo's transactional API.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

const BREVO_BASE_URL: &str = "https://api.brevo.com";
const SEND_PATH: &str = "/v3/smtp/email";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider rejected message (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid message: {0}")]
    Invalid(String),
}

/// A single-recipient HTML email.
#[derive(Debug, Clone, PartialEq)]
pub struct EmailMessage {
    pub to_email: String,
    pub to_name: String,
    pub subject: String,
    pub html: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError>;
}

#[derive(Debug, Serialize)]
struct Party<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoRequest<'a> {
    sender: Party<'a>,
    to: Vec<Party<'a>>,
    subject: &'a str,
    html_content: &'a str,
}

/// Brevo (ex-Sendinblue) transactional email backend.
pub struct BrevoMailer {
    client: Client,
    api_key: String,
    base_url: String,
    sender_name: String,
    sender_email: String,
}

impl BrevoMailer {
    pub fn new(api_key: String, sender_name: String, sender_email: String) -> Result<Self, MailError> {
        Self::with_base_url(api_key, sender_name, sender_email, BREVO_BASE_URL)
    }

    pub fn with_base_url(
        api_key: String,
        sender_name: String,
        sender_email: String,
        base_url: &str,
    ) -> Result<Self, MailError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(15))
                .build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            sender_name,
            sender_email,
        })
    }
}

#[async_trait]
impl Mailer for BrevoMailer {
    async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
        if message.to_email.trim().is_empty() {
            return Err(MailError::Invalid("recipient email is required".to_string()));
        }

        let body = BrevoRequest {
            sender: Party {
                name: &self.sender_name,
                email: &self.sender_email,
            },
            to: vec![Party {
                name: &message.to_name,
                email: &message.to_email,
            }],
            subject: &message.subject,
            html_content: &message.html,
        };

        let response = self
            .client
            .post(format!("{}{}", self.base_url, SEND_PATH))
            .header("api-key", &self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            // 401: bad key. 400: most often an unverified sender address.
            return Err(MailError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        debug!("Brevo accepted message with status {status}");
        info!(to = %message.to_email, subject = %message.subject, "Email sent");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Captures messages instead of sending them.
    #[derive(Default)]
    pub struct RecordingMailer {
        pub sent: Mutex<Vec<EmailMessage>>,
        pub fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &EmailMessage) -> Result<(), MailError> {
            if self.fail {
                return Err(MailError::Rejected {
                    status: 400,
                    message: "sender not verified".to_string(),
                });
            }
            self.sent.lock().unwrap().push(message.clone());
            Ok(())
        }
    }
}
