//! Account domain types.
//!
//! These types represent validated domain objects separate from database row
//! and provider wire types.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use shopdrop_core::{AccountId, Email, Role};

use super::profile::RegistrantProfile;

/// Sign-up credentials.
///
/// `Debug` is derived; `SecretString` redacts the password itself.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: Email,
    pub password: SecretString,
}

/// An identity as known to the identity provider.
///
/// The verification flags only ever move from `false` to `true`. This core
/// never flips them itself; it asks the provider to record a verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub email: Email,
    pub role: Role,
    pub email_verified: bool,
    pub phone_verified: bool,
}

/// A registrant profile persisted against an account (1:1 with
/// [`AccountRecord`], keyed by the same id).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub account_id: AccountId,
    pub role: Role,
    pub profile: RegistrantProfile,
    /// Assigned by the store when the record is first saved.
    pub created_at: DateTime<Utc>,
}
