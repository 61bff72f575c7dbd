// src/mailer.rs

//! Outbound transactional email.
//!
//! Sends are best-effort: [`dispatch`] runs the send on its own task, logs a
//! failure and never retries. A failed send never undoes the write that
//! triggered it.

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use crate::config::MailConfig;

#[derive(Debug)]
pub enum MailError {
    /// The HTTP client could not be built or the request did not complete.
    Transport(String),
    /// The mail API answered with a non-success status.
    Rejected(StatusCode),
}

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MailError::Transport(msg) => write!(f, "mail transport error: {msg}"),
            MailError::Rejected(status) => write!(f, "mail API rejected message: {status}"),
        }
    }
}

impl std::error::Error for MailError {}

/// A plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub text: String,
}

impl Email {
    pub fn verification_code(to: &str, name: &str, code: &str, ttl_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Verify your email address".to_string(),
            text: format!(
                "Hi {name},\n\nYour verification code is {code}. \
                 It expires in {ttl_minutes} minutes.\n"
            ),
        }
    }

    pub fn login_otp(to: &str, name: &str, otp: &str, ttl_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your login code".to_string(),
            text: format!(
                "Hi {name},\n\nUse {otp} to finish signing in. \
                 The code expires in {ttl_minutes} minutes.\n"
            ),
        }
    }

    pub fn password_reset(to: &str, name: &str, link: &str, ttl_minutes: i64) -> Self {
        Self {
            to: to.to_string(),
            subject: "Reset your password".to_string(),
            text: format!(
                "Hi {name},\n\nOpen the link below to choose a new password:\n{link}\n\n\
                 The link expires in {ttl_minutes} minutes. \
                 If you did not ask for a reset, ignore this email.\n"
            ),
        }
    }
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &Email) -> Result<(), MailError>;
}

/// Sends a message without waiting for the outcome.
pub fn dispatch(mailer: Arc<dyn Mailer>, email: Email) {
    tokio::spawn(async move {
        match mailer.send(&email).await {
            Ok(()) => tracing::info!(to = %email.to, subject = %email.subject, "Email sent"),
            Err(e) => tracing::warn!(to = %email.to, "Failed to send email: {}", e),
        }
    });
}

/// JSON body posted to the mail API.
#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

/// Transactional mail API client: `POST {api_url}` with a bearer key and a JSON message.
#[derive(Debug, Clone)]
pub struct HttpMailer {
    client: Client,
    config: MailConfig,
}

impl HttpMailer {
    pub fn new(config: MailConfig) -> Result<Self, MailError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| MailError::Transport(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        let body = ApiMessage {
            from: &self.config.from,
            to: &email.to,
            subject: &email.subject,
            text: &email.text,
        };
        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| MailError::Transport(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(MailError::Rejected(response.status()))
        }
    }
}

/// Development mailer: writes messages to the log instead of sending them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            "Mail delivery not configured, logging message:\n{}",
            email.text
        );
        Ok(())
    }
}
