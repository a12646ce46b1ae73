//! Phone-verification gate and challenge handles.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shopdrop_core::Phone;

/// Where the human-verification gate is mounted.
///
/// For browser-rendered gates (reCAPTCHA) this is the token the widget
/// produced once the visitor passed the check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GateMount(String);

impl GateMount {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An established human-verification gate, reusable for every challenge sent
/// during one browsing session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateHandle {
    id: Uuid,
    token: String,
}

impl GateHandle {
    /// Wrap the provider-side gate token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            token: token.into(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Token presented to the provider with each challenge.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// One outstanding phone-verification attempt.
///
/// Identity is the locally generated id: two handles for the same provider
/// session are still different attempts. The provider reference is opaque to
/// everything but the channel that issued it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeHandle {
    id: Uuid,
    provider_ref: String,
}

impl ChallengeHandle {
    /// Wrap a provider session reference in a fresh handle.
    #[must_use]
    pub fn new(provider_ref: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider_ref: provider_ref.into(),
        }
    }

    /// A handle as presented by a client, which only knows the id. It
    /// matches the held handle with the same id and carries no provider
    /// reference of its own.
    #[must_use]
    pub const fn from_id(id: Uuid) -> Self {
        Self {
            id,
            provider_ref: String::new(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn provider_ref(&self) -> &str {
        &self.provider_ref
    }
}

impl PartialEq for ChallengeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChallengeHandle {}

/// Errors that can occur when parsing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpCodeError {
    #[error("your one-time password must be {len} digits")]
    InvalidFormat { len: usize },
}

/// A one-time password as typed by the registrant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpCode(String);

impl OtpCode {
    /// Number of digits in a code.
    pub const LENGTH: usize = 6;

    /// Parse a code, ignoring surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`OtpCodeError::InvalidFormat`] unless the input is exactly six
    /// ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpCodeError> {
        let s = s.trim();
        if s.len() == Self::LENGTH && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(OtpCodeError::InvalidFormat { len: Self::LENGTH })
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Outcome of a successful challenge confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmResult {
    pub verified: bool,
    /// The number the confirmed challenge was sent to.
    pub phone: Phone,
}
