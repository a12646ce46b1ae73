//! Account provisioning.
//!
//! Drives a new registrant through account creation, email-verification
//! dispatch and profile persistence, then hands off to phone verification.
//! The steps run in sequence and are not transactional.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use shopdrop_core::{AccountId, Phone, Role};

use crate::forms::MIN_PASSWORD_LENGTH;
use crate::models::{Credentials, Destination, RegistrantProfile};
use crate::ports::{IdentityError, IdentityProvider, ProfileStore};

/// Errors that can occur while provisioning an account.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// The email is already registered.
    #[error("an account with this email already exists")]
    CredentialConflict,

    /// The password does not meet the password policy.
    #[error("password rejected: {0}")]
    WeakCredential(String),

    /// The account was created but its profile could not be saved.
    #[error("account {account_id} was created but its profile could not be saved")]
    PartialProvisionFailure { account_id: AccountId },

    /// Transient identity-provider fault before anything was created.
    #[error("identity provider error: {0}")]
    Provider(String),
}

impl From<IdentityError> for ProvisionError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::CredentialConflict => Self::CredentialConflict,
            IdentityError::WeakCredential(reason) => Self::WeakCredential(reason),
            IdentityError::InvalidCredential | IdentityError::InvalidToken => {
                Self::Provider(err.to_string())
            }
            IdentityError::Provider(message) => Self::Provider(message),
        }
    }
}

/// A provisioned account ready for phone verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResult {
    pub account_id: AccountId,
    pub phone: Phone,
    pub role: Role,
}

impl ProvisionResult {
    /// The phone-verification hand-off for this registrant.
    #[must_use]
    pub fn destination(&self) -> Destination {
        Destination::VerifyOtp {
            kind: self.role.kind(),
            phone: self.phone.clone(),
        }
    }
}

/// Check a password against the sign-up policy: at least
/// [`MIN_PASSWORD_LENGTH`] characters with at least one letter and one digit.
///
/// # Errors
///
/// Returns `ProvisionError::WeakCredential` naming the unmet rule.
pub fn validate_password(password: &SecretString) -> Result<(), ProvisionError> {
    let password = password.expose_secret();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ProvisionError::WeakCredential(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(ProvisionError::WeakCredential(
            "password must contain at least one letter".to_owned(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(ProvisionError::WeakCredential(
            "password must contain at least one digit".to_owned(),
        ));
    }

    Ok(())
}

/// Creates accounts and their profile records.
pub struct AccountProvisioner<'a> {
    identity: &'a dyn IdentityProvider,
    profiles: &'a dyn ProfileStore,
}

impl<'a> AccountProvisioner<'a> {
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityProvider, profiles: &'a dyn ProfileStore) -> Self {
        Self { identity, profiles }
    }

    /// Provision an account for `profile`.
    ///
    /// A failed email-verification dispatch is logged and does not undo the
    /// account; the registrant can ask for another message later.
    ///
    /// # Errors
    ///
    /// Returns `ProvisionError::WeakCredential` before contacting the provider
    /// if the password fails the local policy.
    /// Returns `ProvisionError::CredentialConflict` if the email is taken.
    /// Returns `ProvisionError::PartialProvisionFailure` if the profile could
    /// not be saved after the account was created.
    #[instrument(skip_all, fields(role = %profile.role(), phone = %profile.phone().masked()))]
    pub async fn provision(
        &self,
        profile: RegistrantProfile,
        credentials: Credentials,
    ) -> Result<ProvisionResult, ProvisionError> {
        validate_password(&credentials.password)?;

        let role = profile.role();
        let account_id = self
            .identity
            .create_account(&credentials.email, &credentials.password, role)
            .await?;
        tracing::info!(%account_id, "account created");

        if let Err(e) = self.identity.send_email_verification(&account_id).await {
            tracing::warn!(%account_id, error = %e, "email verification dispatch failed");
        }

        if let Err(e) = self.profiles.save(&account_id, &profile).await {
            tracing::error!(%account_id, error = %e, "profile save failed after account creation");
            return Err(ProvisionError::PartialProvisionFailure { account_id });
        }

        Ok(ProvisionResult {
            account_id,
            phone: profile.phone().clone(),
            role,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopdrop_core::{Email, RegistrantKind};

    use super::*;
    use crate::models::profile::tests::{buyer, supplier};
    use crate::ports::memory::{InMemoryIdentityProvider, InMemoryProfileStore};

    fn credentials(email: &str, password: &str) -> Credentials {
        Credentials {
            email: Email::parse(email).unwrap(),
            password: SecretString::from(password.to_owned()),
        }
    }

    #[test]
    fn test_password_policy() {
        let check = |p: &str| validate_password(&SecretString::from(p.to_owned()));
        assert!(check("abcd1234").is_ok());
        assert!(matches!(check("abc123"), Err(ProvisionError::WeakCredential(_))));
        assert!(matches!(check("abcdefgh"), Err(ProvisionError::WeakCredential(_))));
        assert!(matches!(check("12345678"), Err(ProvisionError::WeakCredential(_))));
    }

    #[tokio::test]
    async fn test_provision_buyer() {
        let identity = InMemoryIdentityProvider::new();
        let profiles = InMemoryProfileStore::new();
        let provisioner = AccountProvisioner::new(&identity, &profiles);

        let result = provisioner
            .provision(buyer(), credentials("john@x.com", "abcd1234"))
            .await
            .unwrap();

        assert_eq!(result.role, Role::Buyer);
        assert_eq!(result.phone.as_str(), "0821234567");
        assert_eq!(identity.verification_emails_sent(), vec![result.account_id.clone()]);

        let record = profiles.load(&result.account_id).await.unwrap().unwrap();
        assert_eq!(record.role, Role::Buyer);
        assert_eq!(
            result.destination(),
            Destination::VerifyOtp {
                kind: RegistrantKind::Customer,
                phone: result.phone.clone(),
            }
        );
    }

    #[tokio::test]
    async fn test_duplicate_email_is_a_conflict() {
        let identity = InMemoryIdentityProvider::new();
        let profiles = InMemoryProfileStore::new();
        let provisioner = AccountProvisioner::new(&identity, &profiles);

        provisioner
            .provision(buyer(), credentials("john@x.com", "abcd1234"))
            .await
            .unwrap();
        let again = provisioner
            .provision(supplier(), credentials("john@x.com", "other9999"))
            .await;

        assert!(matches!(again, Err(ProvisionError::CredentialConflict)));
        assert_eq!(profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_weak_password_never_reaches_provider() {
        let identity = InMemoryIdentityProvider::new();
        let profiles = InMemoryProfileStore::new();
        let provisioner = AccountProvisioner::new(&identity, &profiles);

        let result = provisioner
            .provision(buyer(), credentials("john@x.com", "password"))
            .await;

        assert!(matches!(result, Err(ProvisionError::WeakCredential(_))));
        let email = Email::parse("john@x.com").unwrap();
        let sign_in = identity
            .sign_in(&email, &SecretString::from("password".to_owned()))
            .await;
        assert!(matches!(sign_in, Err(IdentityError::InvalidCredential)));
    }

    #[tokio::test]
    async fn test_email_dispatch_failure_does_not_roll_back() {
        let identity = InMemoryIdentityProvider::new();
        identity.fail_email_dispatch(true);
        let profiles = InMemoryProfileStore::new();
        let provisioner = AccountProvisioner::new(&identity, &profiles);

        let result = provisioner
            .provision(buyer(), credentials("john@x.com", "abcd1234"))
            .await
            .unwrap();

        let account = identity.account(&result.account_id).await.unwrap().unwrap();
        assert!(!account.email_verified);
        assert_eq!(profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_failure_reports_partial_provision() {
        let identity = InMemoryIdentityProvider::new();
        let profiles = InMemoryProfileStore::new();
        profiles.set_unavailable(true);
        let provisioner = AccountProvisioner::new(&identity, &profiles);

        let result = provisioner
            .provision(supplier(), credentials("contact@greenvalley.farm", "harvest2024"))
            .await;

        let Err(ProvisionError::PartialProvisionFailure { account_id }) = result else {
            panic!("expected partial provision failure, got {result:?}");
        };
        assert!(identity.account(&account_id).await.unwrap().is_some());
        assert!(profiles.is_empty());
    }
}
