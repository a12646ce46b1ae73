//! Authentication extractors and session helpers.
//!
//! The authenticated [`crate::models::Session`] lives in the browser session
//! under [`session_keys::CURRENT_SESSION`]. Nothing outside this module reads
//! or writes that key.

use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tower_sessions::Session as BrowserSession;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{Session, session_keys};

/// Extractor that requires an authenticated session.
///
/// # Example
///
/// ```rust,ignore
/// async fn dashboard(RequireSession(session): RequireSession) -> impl IntoResponse {
///     format!("Hello, {}!", session.role)
/// }
/// ```
pub struct RequireSession(pub Session);

/// Rejection returned when no authenticated session is present.
pub struct SessionRejection;

impl IntoResponse for SessionRejection {
    fn into_response(self) -> Response {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": { "code": "unauthorized", "message": "Sign in required" }
            })),
        )
            .into_response()
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = SessionRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let browser = parts
            .extensions
            .get::<BrowserSession>()
            .ok_or(SessionRejection)?;

        let session: Session = browser
            .get(session_keys::CURRENT_SESSION)
            .await
            .ok()
            .flatten()
            .ok_or(SessionRejection)?;

        Ok(Self(session))
    }
}

/// Store the authenticated session and rotate the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_session(
    browser: &BrowserSession,
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    browser.cycle_id().await?;
    browser
        .insert(session_keys::CURRENT_SESSION, session)
        .await?;
    set_sentry_user(&session.account_id);
    Ok(())
}

/// End the browser session, discarding every piece of per-visitor state.
///
/// # Errors
///
/// Returns an error if the session store cannot be updated.
pub async fn end_session(browser: &BrowserSession) -> Result<(), tower_sessions::session::Error> {
    browser.flush().await?;
    clear_sentry_user();
    Ok(())
}

/// The authenticated session, if any.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn current_session(
    browser: &BrowserSession,
) -> Result<Option<Session>, tower_sessions::session::Error> {
    browser.get(session_keys::CURRENT_SESSION).await
}
