//! Session establishment.
//!
//! Credential sign-in, and finalizing a confirmed phone challenge into a
//! role-scoped session.

use secrecy::SecretString;
use thiserror::Error;
use tracing::instrument;

use shopdrop_core::{AccountId, Email};

use crate::models::{AccountRecord, ConfirmResult, Session};
use crate::ports::{IdentityError, IdentityProvider};

/// Errors that can occur while establishing a session.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Sign-in was refused. Never says why.
    #[error("invalid credentials")]
    InvalidCredential,

    /// `finalize` was called with a challenge result that is not verified.
    #[error("phone number has not been verified")]
    PhoneNotVerified,

    /// The policy requires a verified email and the account has none.
    #[error("email address has not been verified")]
    EmailNotVerified,

    /// The email-verification token is unknown, spent or expired.
    #[error("email verification token is invalid or has expired")]
    InvalidEmailToken,

    /// The identity provider has no account with this id.
    #[error("account not found: {0}")]
    AccountNotFound(AccountId),

    /// Transient identity-provider fault.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Which verification flags a session requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VerificationPolicy {
    /// Refuse sessions for accounts whose email is still unverified.
    pub require_email_verified: bool,
}

impl VerificationPolicy {
    fn check(self, account: &AccountRecord) -> Result<(), AuthError> {
        if self.require_email_verified && !account.email_verified {
            return Err(AuthError::EmailNotVerified);
        }
        Ok(())
    }
}

/// Establishes authenticated sessions.
pub struct SessionEstablisher<'a> {
    identity: &'a dyn IdentityProvider,
    policy: VerificationPolicy,
}

impl<'a> SessionEstablisher<'a> {
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityProvider, policy: VerificationPolicy) -> Self {
        Self { identity, policy }
    }

    /// Sign in with an email identifier and password.
    ///
    /// Phone numbers are not accepted as identifiers. An identifier that is
    /// not an email is refused without contacting the provider.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredential` for a non-email identifier or
    /// any provider rejection.
    /// Returns `AuthError::EmailNotVerified` if the policy requires it.
    #[instrument(skip_all)]
    pub async fn sign_in(
        &self,
        identifier: &str,
        password: &SecretString,
    ) -> Result<Session, AuthError> {
        if !identifier.contains('@') {
            tracing::debug!("sign-in refused: identifier is not an email");
            return Err(AuthError::InvalidCredential);
        }
        let email = Email::parse(identifier).map_err(|_| AuthError::InvalidCredential)?;

        let account = self
            .identity
            .sign_in(&email, password)
            .await
            .map_err(|e| match e {
                IdentityError::Provider(message) => AuthError::Provider(message),
                _ => AuthError::InvalidCredential,
            })?;
        self.policy.check(&account)?;

        let session = Session::new(account.id, account.role);
        tracing::info!(account_id = %session.account_id, role = %session.role, "signed in");
        Ok(session)
    }

    /// Turn a confirmed phone challenge into a session for `account_id`.
    ///
    /// The role is read from the account record, never from the caller. The
    /// provider records the phone as verified before the session is built.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::PhoneNotVerified` if `confirm` is not verified.
    /// Returns `AuthError::AccountNotFound` if the account does not exist.
    /// Returns `AuthError::EmailNotVerified` if the policy requires it.
    #[instrument(skip_all, fields(%account_id))]
    pub async fn finalize(
        &self,
        confirm: &ConfirmResult,
        account_id: &AccountId,
    ) -> Result<Session, AuthError> {
        if !confirm.verified {
            return Err(AuthError::PhoneNotVerified);
        }

        let account = self
            .identity
            .account(account_id)
            .await
            .map_err(provider_error)?
            .ok_or_else(|| AuthError::AccountNotFound(account_id.clone()))?;

        self.identity
            .record_phone_verified(account_id, &confirm.phone)
            .await
            .map_err(provider_error)?;
        self.policy.check(&account)?;

        let session = Session::new(account.id, account.role);
        tracing::info!(role = %session.role, "session established after phone verification");
        Ok(session)
    }
}

fn provider_error(err: IdentityError) -> AuthError {
    AuthError::Provider(err.to_string())
}
