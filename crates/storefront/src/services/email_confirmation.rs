//! Email-address confirmation.
//!
//! Re-sends the verification link and redeems the token it carries.

use tracing::instrument;
use uuid::Uuid;

use shopdrop_core::AccountId;

use super::session::AuthError;
use crate::ports::{IdentityError, IdentityProvider};

/// Resends and redeems email-verification tokens.
pub struct EmailConfirmation<'a> {
    identity: &'a dyn IdentityProvider,
}

impl<'a> EmailConfirmation<'a> {
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityProvider) -> Self {
        Self { identity }
    }

    /// Mail a fresh verification link unless the email is already verified.
    ///
    /// Returns whether a link was sent.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if the account does not exist.
    /// Returns `AuthError::Provider` if the link could not be sent.
    #[instrument(skip_all, fields(%account_id))]
    pub async fn resend(&self, account_id: &AccountId) -> Result<bool, AuthError> {
        let account = self
            .identity
            .account(account_id)
            .await
            .map_err(provider)?
            .ok_or_else(|| AuthError::AccountNotFound(account_id.clone()))?;

        if account.email_verified {
            tracing::debug!("email already verified, nothing to send");
            return Ok(false);
        }

        self.identity
            .send_email_verification(account_id)
            .await
            .map_err(provider)?;
        Ok(true)
    }

    /// Redeem a token from a verification link. Each token works once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmailToken` if the token is unknown, spent
    /// or expired.
    #[instrument(skip_all)]
    pub async fn confirm(&self, token: Uuid) -> Result<AccountId, AuthError> {
        let account_id = self.identity.confirm_email(token).await.map_err(|e| match e {
            IdentityError::InvalidToken => AuthError::InvalidEmailToken,
            other => provider(other),
        })?;

        tracing::info!(%account_id, "email verified");
        Ok(account_id)
    }
}

fn provider(err: IdentityError) -> AuthError {
    match err {
        IdentityError::Provider(message) => AuthError::Provider(message),
        other => AuthError::Provider(other.to_string()),
    }
}
