//! Outbound email collaborator
//!
//! The authentication core hands verification and reset tokens to an
//! [`EmailSender`] and moves on: delivery failure never rolls back the
//! state change that triggered the send. The shipped implementation renders
//! the action links into the structured log; wiring a real transport means
//! implementing the trait against an SMTP or API client.

use async_trait::async_trait;
use tracing::info;

use crate::config::MailConfig;
use crate::error::EmailError;

/// Trait for the email delivery collaborator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send the email-verification message for a fresh registration
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError>;

    /// Send the password-reset message
    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError>;
}

/// Log-backed mailer
///
/// Emits the verification and reset URLs as structured log events instead
/// of delivering mail. Always succeeds.
pub struct LogMailer {
    backend_url: String,
    from_name: String,
}

impl LogMailer {
    /// Create a mailer from the mail configuration
    pub fn new(config: &MailConfig) -> Self {
        Self {
            backend_url: config.backend_url.trim_end_matches('/').to_string(),
            from_name: config.from_name.clone(),
        }
    }

    /// URL the recipient follows to verify their email address
    pub fn verification_url(&self, token: &str) -> String {
        format!("{}/auth/verify-email/{}", self.backend_url, token)
    }

    /// URL the recipient follows to reset their password
    pub fn reset_url(&self, token: &str) -> String {
        format!("{}/auth/reset-password/{}", self.backend_url, token)
    }
}

#[async_trait]
impl EmailSender for LogMailer {
    async fn send_verification_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        info!(
            to = %to,
            name = %name,
            from = %self.from_name,
            url = %self.verification_url(token),
            "Verification email"
        );
        Ok(())
    }

    async fn send_password_reset_email(
        &self,
        to: &str,
        name: &str,
        token: &str,
    ) -> Result<(), EmailError> {
        info!(
            to = %to,
            name = %name,
            from = %self.from_name,
            url = %self.reset_url(token),
            "Password reset email"
        );
        Ok(())
    }
}
