//! Phone verification routes.
//!
//! The [`VerificationChallenge`] is loaded from the browser session at the
//! start of each request and written back before any error is returned, so
//! attempt counts and replaced handles survive failed calls.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use tower_sessions::Session as BrowserSession;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::forms::FieldErrors;
use crate::middleware::set_current_session;
use crate::models::{ChallengeHandle, GateMount, OtpCode, session_keys};
use crate::routes::auth::SessionResponse;
use crate::services::{ProvisionResult, VerificationChallenge};
use crate::state::AppState;

async fn load_challenge(browser: &BrowserSession) -> Result<VerificationChallenge> {
    Ok(browser
        .get(session_keys::PHONE_CHALLENGE)
        .await?
        .unwrap_or_default())
}

async fn save_challenge(browser: &BrowserSession, challenge: &VerificationChallenge) -> Result<()> {
    browser
        .insert(session_keys::PHONE_CHALLENGE, challenge)
        .await?;
    Ok(())
}

/// The registration awaiting phone verification. Only exists once account
/// creation has succeeded.
async fn pending_registration(browser: &BrowserSession) -> Result<ProvisionResult> {
    browser
        .get(session_keys::PENDING_VERIFICATION)
        .await?
        .ok_or_else(|| AppError::Unauthorized("no account is awaiting phone verification".into()))
}

/// Human-verification gate token from the browser widget.
#[derive(Debug, Deserialize)]
pub struct GateRequest {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct GateResponse {
    pub gate_established: bool,
}

/// POST /auth/otp/gate
///
/// # Errors
///
/// Returns `VerificationError::GateRejected` if the token is refused.
#[instrument(skip_all)]
pub async fn gate(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(request): Json<GateRequest>,
) -> Result<Json<GateResponse>> {
    let mut challenge = load_challenge(&browser).await?;
    challenge
        .establish_gate(state.phone(), &GateMount::new(request.token))
        .await?;
    save_challenge(&browser, &challenge).await?;

    Ok(Json(GateResponse {
        gate_established: true,
    }))
}

/// The challenge now held for this session.
#[derive(Debug, Serialize)]
pub struct ChallengeResponse {
    pub handle_id: Uuid,
    /// Masked number the code was sent to.
    pub phone: String,
}

/// POST /auth/otp/send
///
/// # Errors
///
/// Returns `Unauthorized` if no registration is pending and
/// `VerificationError::GateRequired` if the gate has not been passed.
#[instrument(skip_all)]
pub async fn send(
    State(state): State<AppState>,
    browser: BrowserSession,
) -> Result<Json<ChallengeResponse>> {
    let pending = pending_registration(&browser).await?;
    let mut challenge = load_challenge(&browser).await?;

    let outcome = challenge.issue(state.phone(), pending.phone.clone()).await;
    save_challenge(&browser, &challenge).await?;
    let handle = outcome?;

    add_breadcrumb("verification", "Challenge issued", None);
    Ok(Json(ChallengeResponse {
        handle_id: handle.id(),
        phone: pending.phone.masked(),
    }))
}

/// Handle the client was given by the last send or resend.
#[derive(Debug, Deserialize)]
pub struct ResendRequest {
    pub handle_id: Uuid,
}

/// POST /auth/otp/resend
///
/// # Errors
///
/// Returns `VerificationError::NoActiveChallenge` if `handle_id` is not the
/// held challenge.
#[instrument(skip_all, fields(handle_id = %request.handle_id))]
pub async fn resend(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(request): Json<ResendRequest>,
) -> Result<Json<ChallengeResponse>> {
    let mut challenge = load_challenge(&browser).await?;

    let outcome = challenge
        .resend(state.phone(), &ChallengeHandle::from_id(request.handle_id))
        .await;
    save_challenge(&browser, &challenge).await?;
    let handle = outcome?;

    let phone = challenge
        .state()
        .map(|s| s.target_phone.masked())
        .unwrap_or_default();
    Ok(Json(ChallengeResponse {
        handle_id: handle.id(),
        phone,
    }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyRequest {
    pub handle_id: Uuid,
    pub code: String,
}

/// POST /auth/otp/verify
///
/// Confirms the code, then turns the pending registration into an
/// authenticated session.
///
/// # Errors
///
/// Returns a field error for a malformed code without contacting the
/// channel, `VerificationError::IncorrectCode` for a wrong code and
/// `VerificationError::NoActiveChallenge` for a replaced handle.
#[instrument(skip_all, fields(handle_id = %request.handle_id))]
pub async fn verify(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<SessionResponse>> {
    let code = OtpCode::parse(&request.code).map_err(|e| {
        let mut errors = FieldErrors::new();
        errors.push("code", e.to_string());
        errors
    })?;
    let pending = pending_registration(&browser).await?;
    let mut challenge = load_challenge(&browser).await?;

    let outcome = challenge
        .confirm(state.phone(), &ChallengeHandle::from_id(request.handle_id), &code)
        .await;
    save_challenge(&browser, &challenge).await?;
    let confirmed = outcome?;

    let session = state
        .establisher()
        .finalize(&confirmed, &pending.account_id)
        .await?;

    browser
        .remove::<ProvisionResult>(session_keys::PENDING_VERIFICATION)
        .await?;
    set_current_session(&browser, &session).await?;
    add_breadcrumb("verification", "Phone verified", None);

    Ok(Json(SessionResponse::from(&session)))
}
