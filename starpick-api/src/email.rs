//! Outbound Email Delivery
//!
//! Signup and resend flows deliver one-time passcodes by email. Delivery
//! goes through the `Mailer` trait so the account routes are testable
//! without a network; production uses `HttpMailer` against an HTTP mail
//! relay, development falls back to `LogMailer`.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{ApiError, ApiResult};

// ============================================================================
// MAILER TRAIT
// ============================================================================

/// Delivery of account verification passcodes.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Send a one-time passcode to a registered address.
    async fn send_otp(&self, to: &str, username: &str, otp: &str) -> ApiResult<()>;
}

// ============================================================================
// HTTP MAILER
// ============================================================================

/// Mailer that posts messages to an HTTP mail relay.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
}

#[derive(Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

impl HttpMailer {
    pub fn new(endpoint: String, api_key: String, from: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            api_key,
            from,
        }
    }

    /// Create an HTTP mailer from environment variables, or `None` when the
    /// relay endpoint is not configured.
    ///
    /// # Environment Variables
    /// - `STARPICK_MAIL_ENDPOINT`: Mail relay URL
    /// - `STARPICK_MAIL_API_KEY`: Bearer token for the relay
    /// - `STARPICK_MAIL_FROM`: Sender address (default: no-reply@starpick.app)
    pub fn from_env() -> Option<Self> {
        let endpoint = std::env::var("STARPICK_MAIL_ENDPOINT").ok()?;
        let api_key = std::env::var("STARPICK_MAIL_API_KEY").unwrap_or_default();
        let from = std::env::var("STARPICK_MAIL_FROM")
            .unwrap_or_else(|_| "no-reply@starpick.app".to_string());
        Some(Self::new(endpoint, api_key, from))
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_otp(&self, to: &str, username: &str, otp: &str) -> ApiResult<()> {
        let message = RelayMessage {
            from: &self.from,
            to,
            subject: "Your starpick verification code",
            text: format!(
                "Hi {username},\n\nYour verification code is {otp}. \
                 It expires in 10 minutes.\n"
            ),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&message)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Mail relay request failed: {}", e);
                ApiError::service_unavailable("Failed to send verification email")
            })?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "Mail relay rejected message");
            return Err(ApiError::service_unavailable(
                "Failed to send verification email",
            ));
        }

        tracing::info!(%to, "Verification email delivered");
        Ok(())
    }
}

// ============================================================================
// LOG MAILER
// ============================================================================

/// Development mailer that logs instead of sending.
///
/// The passcode lands in the server log so local signup flows can complete
/// without a relay. Never use in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_otp(&self, to: &str, username: &str, otp: &str) -> ApiResult<()> {
        tracing::warn!(%to, %username, %otp, "LogMailer active - OTP written to log");
        Ok(())
    }
}

/// Build the mailer for this deployment: HTTP relay when configured,
/// log fallback otherwise.
pub fn mailer_from_env() -> std::sync::Arc<dyn Mailer> {
    match HttpMailer::from_env() {
        Some(mailer) => std::sync::Arc::new(mailer),
        None => {
            tracing::warn!("STARPICK_MAIL_ENDPOINT not set - falling back to LogMailer");
            std::sync::Arc::new(LogMailer)
        }
    }
}
