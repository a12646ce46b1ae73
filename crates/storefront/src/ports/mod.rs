//! Ports to the external authorities the pipeline depends on.
//!
//! Each port is an object-safe async trait. Concrete adapters are built once
//! by the composition root ([`crate::state::AppState`]) and shared as
//! `Arc<dyn Port>`; services borrow them for the duration of one operation.
//!
//! | Port | Adapters |
//! |------|----------|
//! | [`IdentityProvider`] | [`memory::InMemoryIdentityProvider`], [`crate::db::accounts::PgIdentityProvider`] |
//! | [`PhoneChallengeChannel`] | [`memory::DevPhoneChannel`], [`crate::firebase::FirebasePhoneChannel`] |
//! | [`ProfileStore`] | [`memory::InMemoryProfileStore`], [`crate::db::profiles::PgProfileStore`] |
//! | [`PaymentAuthority`] | [`memory::SimulatedPaymentAuthority`] |

pub mod memory;
pub mod password;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shopdrop_core::{AccountId, Email, Phone, Price, Role};

use crate::models::{
    AccountRecord, ChallengeHandle, GateHandle, GateMount, OtpCode, ProfileRecord,
    RegistrantProfile,
};

// =============================================================================
// Identity Provider
// =============================================================================

/// Errors reported by an [`IdentityProvider`].
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The email is already registered.
    #[error("an account with this email already exists")]
    CredentialConflict,

    /// The provider's password policy rejected the password.
    #[error("password rejected: {0}")]
    WeakCredential(String),

    /// The email/password pair was not accepted. Deliberately does not say
    /// which half was wrong.
    #[error("invalid credentials")]
    InvalidCredential,

    /// The email-verification token is unknown, expired or already used.
    #[error("email verification token is invalid or has expired")]
    InvalidToken,

    /// Transient network or provider fault.
    #[error("identity provider error: {0}")]
    Provider(String),
}

/// Credential storage, token issuance and email-verification dispatch.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Create an account and return its provider-assigned id.
    async fn create_account(
        &self,
        email: &Email,
        password: &SecretString,
        role: Role,
    ) -> Result<AccountId, IdentityError>;

    /// Dispatch an email-verification message for the account. Each dispatch
    /// issues a new token; earlier ones stay valid until they expire.
    async fn send_email_verification(&self, account_id: &AccountId) -> Result<(), IdentityError>;

    /// Consume an email-verification token and mark the account's email as
    /// verified. Returns the account the token belonged to.
    async fn confirm_email(&self, token: Uuid) -> Result<AccountId, IdentityError>;

    /// Authenticate an email/password pair.
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AccountRecord, IdentityError>;

    /// Look up an account by id.
    async fn account(&self, account_id: &AccountId)
    -> Result<Option<AccountRecord>, IdentityError>;

    /// Record that the account's phone number passed a challenge. Idempotent;
    /// the flag never moves back to `false`.
    async fn record_phone_verified(
        &self,
        account_id: &AccountId,
        phone: &Phone,
    ) -> Result<(), IdentityError>;
}

// =============================================================================
// Phone Challenge Channel
// =============================================================================

/// Errors reported by a [`PhoneChallengeChannel`].
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The provider did not accept the code for this challenge.
    #[error("incorrect verification code")]
    IncorrectCode,

    /// The human-verification gate was refused.
    #[error("verification gate rejected: {0}")]
    GateRejected(String),

    /// Transient network or provider fault.
    #[error("phone channel error: {0}")]
    Provider(String),
}

/// SMS dispatch, human-verification gate and code confirmation.
#[async_trait]
pub trait PhoneChallengeChannel: Send + Sync {
    /// Establish the human-verification gate for a browsing session.
    async fn establish_gate(&self, mount: &GateMount) -> Result<GateHandle, ChannelError>;

    /// Send a code to `phone` (dialled in E.164 form) behind `gate`.
    async fn send_challenge(
        &self,
        phone: &Phone,
        gate: &GateHandle,
    ) -> Result<ChallengeHandle, ChannelError>;

    /// Check `code` against the challenge identified by `handle`.
    async fn confirm_challenge(
        &self,
        handle: &ChallengeHandle,
        code: &OtpCode,
    ) -> Result<(), ChannelError>;
}

// =============================================================================
// Profile Store
// =============================================================================

/// Errors reported by a [`ProfileStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// A profile is already stored for this account.
    #[error("profile already exists for account {0}")]
    Conflict(AccountId),

    /// The store could not be reached or failed the write.
    #[error("profile store error: {0}")]
    Backend(String),
}

/// Persistence for registrant profiles, keyed uniquely by account id.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Persist the profile. The store assigns the creation timestamp.
    async fn save(
        &self,
        account_id: &AccountId,
        profile: &RegistrantProfile,
    ) -> Result<ProfileRecord, StoreError>;

    /// Load the profile stored for an account.
    async fn load(&self, account_id: &AccountId) -> Result<Option<ProfileRecord>, StoreError>;
}

// =============================================================================
// Payment Authority
// =============================================================================

/// Errors reported by a [`PaymentAuthority`].
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The charge was refused.
    #[error("payment declined: {0}")]
    Declined(String),

    /// Transient network or provider fault.
    #[error("payment provider error: {0}")]
    Provider(String),
}

/// A charge submitted for authorization.
///
/// Only the last four card digits travel past validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub amount: Price,
    pub cardholder: String,
    pub card_last4: String,
}

/// An approved charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentAuthorization {
    pub reference: Uuid,
}

/// Authorizes card payments.
#[async_trait]
pub trait PaymentAuthority: Send + Sync {
    /// Authorize and capture `request.amount`.
    async fn authorize(&self, request: &PaymentRequest)
    -> Result<PaymentAuthorization, PaymentError>;
}
