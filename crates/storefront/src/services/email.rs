//! Email service for verification links.
//!
//! Uses SMTP via lettre for delivery.

use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use uuid::Uuid;

use shopdrop_core::Email;

use crate::config::EmailConfig;

/// Client path that reads the token and posts it to `/auth/email/verify`.
const VERIFY_EMAIL_PATH: &str = "/auth/verify-email";

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
}

/// Email service for sending transactional emails.
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
    base_url: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured.
    pub fn new(config: &EmailConfig, base_url: &str) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Send the link that confirms `to` for the account holding `token`.
    ///
    /// # Errors
    ///
    /// Returns error if the message cannot be built or sent.
    pub async fn send_email_verification(&self, to: &Email, token: Uuid) -> Result<(), EmailError> {
        let link = verification_link(&self.base_url, token);
        let text = format!(
            "Welcome to ShopDrop!\n\n\
             Confirm your email address by opening this link:\n{link}\n\n\
             The link expires in 24 hours. If you did not sign up, ignore this email."
        );
        let html = format!(
            "<p>Welcome to ShopDrop!</p>\
             <p><a href=\"{link}\">Confirm your email address</a></p>\
             <p>The link expires in 24 hours. If you did not sign up, ignore this email.</p>"
        );

        self.send_multipart_email(to.as_str(), "Confirm your ShopDrop email", &text, &html)
            .await
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: &str,
        html_body: &str,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body.to_string()),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body.to_string()),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(subject = %subject, "Email sent");
        Ok(())
    }
}

fn verification_link(base_url: &str, token: Uuid) -> String {
    format!("{base_url}{VERIFY_EMAIL_PATH}?token={token}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_link() {
        let token = Uuid::nil();
        assert_eq!(
            verification_link("https://shopdrop.co.za", token),
            "https://shopdrop.co.za/auth/verify-email?token=00000000-0000-0000-0000-000000000000"
        );
    }
}
