//! Email-verification routes.
//!
//! The emailed link lands on a client page that posts its token to
//! `/auth/email/verify`. Redeeming a token needs no browser session.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session as BrowserSession;
use tracing::instrument;
use uuid::Uuid;

use shopdrop_core::AccountId;

use crate::error::{AppError, Result};
use crate::middleware::current_session;
use crate::models::session_keys;
use crate::services::ProvisionResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ResendResponse {
    /// False when the email was already verified.
    pub sent: bool,
}

/// POST /auth/email/resend
///
/// Works for a registrant still awaiting phone verification as well as a
/// signed-in account.
///
/// # Errors
///
/// Returns `Unauthorized` if the browser session names no account.
#[instrument(skip_all)]
pub async fn resend(
    State(state): State<AppState>,
    browser: BrowserSession,
) -> Result<Json<ResendResponse>> {
    let account_id = session_account(&browser).await?;
    let sent = state.email_confirmation().resend(&account_id).await?;
    Ok(Json(ResendResponse { sent }))
}

async fn session_account(browser: &BrowserSession) -> Result<AccountId> {
    if let Some(pending) = browser
        .get::<ProvisionResult>(session_keys::PENDING_VERIFICATION)
        .await?
    {
        return Ok(pending.account_id);
    }

    current_session(browser)
        .await?
        .map(|session| session.account_id)
        .ok_or_else(|| AppError::Unauthorized("no account in this session".into()))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: Uuid,
}

#[derive(Debug, Serialize)]
pub struct VerifyEmailResponse {
    pub account_id: AccountId,
    pub email_verified: bool,
}

/// POST /auth/email/verify
///
/// # Errors
///
/// Returns `AuthError::InvalidEmailToken` for an unknown, spent or expired
/// token.
#[instrument(skip_all)]
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyEmailRequest>,
) -> Result<Json<VerifyEmailResponse>> {
    let account_id = state.email_confirmation().confirm(request.token).await?;
    Ok(Json(VerifyEmailResponse {
        account_id,
        email_verified: true,
    }))
}
