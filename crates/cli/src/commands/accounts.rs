//! Account inspection and repair commands.
//!
//! # Usage
//!
//! ```bash
//! # Print an account and its profile record
//! shopdrop-cli accounts show <account-id>
//!
//! # Redeem an email-verification token
//! shopdrop-cli accounts confirm-email <token>
//! ```
//!
//! `show` is the first stop when a registrant reports a partial sign-up: an
//! account with `"profile": null` was created but its profile never saved.

use serde_json::json;
use uuid::Uuid;

use shopdrop_core::AccountId;
use shopdrop_storefront::db::accounts::AccountRepository;
use shopdrop_storefront::db::profiles::ProfileRepository;

use super::{CommandError, connect};

/// Print an account and its profile record as pretty JSON.
///
/// # Errors
///
/// Returns `CommandError::AccountNotFound` if no account has this id.
pub async fn show(id: &str) -> Result<(), CommandError> {
    let pool = connect().await?;
    let account_id = AccountId::new(id);

    let account = AccountRepository::new(&pool)
        .get_by_id(&account_id)
        .await?
        .ok_or_else(|| CommandError::AccountNotFound(id.to_owned()))?;
    let profile = ProfileRepository::new(&pool).get(&account_id).await?;

    if profile.is_none() {
        tracing::warn!(%account_id, "account has no profile record");
    }

    let output = serde_json::to_string_pretty(&json!({
        "account": account,
        "profile": profile,
    }))?;

    #[allow(clippy::print_stdout)]
    {
        println!("{output}");
    }
    Ok(())
}

/// Mark the token's account email as verified.
///
/// # Errors
///
/// Returns `CommandError::InvalidToken` if the token is unknown, expired or
/// already used.
pub async fn confirm_email(token: Uuid) -> Result<(), CommandError> {
    let pool = connect().await?;

    let account_id = AccountRepository::new(&pool)
        .consume_email_token(token)
        .await?
        .ok_or(CommandError::InvalidToken)?;

    tracing::info!(%account_id, "Email verified");
    Ok(())
}
