//! Registration, sign-in and sign-out.
//!
//! Registration ends by storing the
//! [`ProvisionResult`](crate::services::ProvisionResult) in the browser
//! session; phone verification (see [`super::otp`]) picks it up from there.

use axum::{Json, extract::State, http::StatusCode};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use tower_sessions::Session as BrowserSession;
use tracing::instrument;

use shopdrop_core::{AccountId, Role};

use crate::error::{Result, add_breadcrumb};
use crate::forms::{BuyerRegistrationForm, SupplierRegistrationForm};
use crate::middleware::{RequireSession, end_session, set_current_session};
use crate::models::{Credentials, Destination, RegistrantProfile, Session, session_keys};
use crate::state::AppState;

/// Response to a successful registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub account_id: AccountId,
    #[serde(flatten)]
    pub destination: Destination,
}

/// Response carrying an authenticated session's landing place.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub account_id: AccountId,
    pub role: Role,
    #[serde(flatten)]
    pub destination: Destination,
}

impl From<&Session> for SessionResponse {
    fn from(session: &Session) -> Self {
        Self {
            account_id: session.account_id.clone(),
            role: session.role,
            destination: session.destination(),
        }
    }
}

/// POST /auth/register/buyer
///
/// # Errors
///
/// Returns field errors for invalid input and provisioning errors otherwise.
#[instrument(skip_all)]
pub async fn register_buyer(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(form): Json<BuyerRegistrationForm>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let (profile, credentials) = form.validate()?;
    register(&state, &browser, profile, credentials).await
}

/// POST /auth/register/supplier
///
/// # Errors
///
/// Returns field errors for invalid input and provisioning errors otherwise.
#[instrument(skip_all)]
pub async fn register_supplier(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(form): Json<SupplierRegistrationForm>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let (profile, credentials) = form.validate()?;
    register(&state, &browser, profile, credentials).await
}

async fn register(
    state: &AppState,
    browser: &BrowserSession,
    profile: RegistrantProfile,
    credentials: Credentials,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    let role = profile.role().to_string();
    let provisioned = state.provisioner().provision(profile, credentials).await?;

    browser
        .insert(session_keys::PENDING_VERIFICATION, &provisioned)
        .await?;
    add_breadcrumb(
        "registration",
        "Account provisioned",
        Some(&[("role", role.as_str())]),
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            destination: provisioned.destination(),
            account_id: provisioned.account_id,
        }),
    ))
}

/// Sign-in request body.
#[derive(Deserialize)]
pub struct SignInRequest {
    /// Email address. Phone numbers are refused.
    pub identifier: String,
    pub password: String,
}

impl std::fmt::Debug for SignInRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignInRequest")
            .field("identifier", &self.identifier)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// POST /auth/sign-in
///
/// # Errors
///
/// Returns `AuthError::InvalidCredential` for any rejected credential.
#[instrument(skip_all)]
pub async fn sign_in(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(request): Json<SignInRequest>,
) -> Result<Json<SessionResponse>> {
    let password = SecretString::from(request.password);
    let session = state
        .establisher()
        .sign_in(request.identifier.trim(), &password)
        .await?;

    set_current_session(&browser, &session).await?;
    Ok(Json(SessionResponse::from(&session)))
}

/// POST /auth/sign-out
///
/// Ends the browser session. Any held challenge, gate, pending registration
/// and cart go with it.
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
#[instrument(skip_all)]
pub async fn sign_out(browser: BrowserSession) -> Result<StatusCode> {
    end_session(&browser).await?;
    tracing::info!("signed out");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/session
pub async fn current_session(RequireSession(session): RequireSession) -> Json<SessionResponse> {
    Json(SessionResponse::from(&session))
}
