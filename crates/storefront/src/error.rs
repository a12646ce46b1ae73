//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! # Response Bodies
//!
//! Field validation failures:
//!
//! ```json
//! { "errors": [{ "field": "email", "message": "Please enter a valid email address" }] }
//! ```
//!
//! Everything else:
//!
//! ```json
//! { "error": { "code": "incorrect_code", "message": "Incorrect verification code" } }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::forms::FieldErrors;
use crate::ports::PaymentError;
use crate::services::{
    AuthError, CartError, CheckoutError, ProvisionError, VerificationError,
};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Form input failed validation.
    #[error("Validation failed: {0}")]
    Validation(#[from] FieldErrors),

    /// Sign-up failed.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Phone verification failed.
    #[error("Verification error: {0}")]
    Verification(#[from] VerificationError),

    /// Sign-in or session establishment failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Cart line was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Checkout failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Browser session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Provision(err) => match err {
                ProvisionError::CredentialConflict => StatusCode::CONFLICT,
                ProvisionError::WeakCredential(_) => StatusCode::BAD_REQUEST,
                ProvisionError::PartialProvisionFailure { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                ProvisionError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Verification(err) => match err {
                VerificationError::GateRequired => StatusCode::PRECONDITION_REQUIRED,
                VerificationError::GateRejected(_) | VerificationError::IncorrectCode => {
                    StatusCode::BAD_REQUEST
                }
                VerificationError::NoActiveChallenge => StatusCode::CONFLICT,
                VerificationError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredential => StatusCode::UNAUTHORIZED,
                AuthError::InvalidEmailToken => StatusCode::BAD_REQUEST,
                AuthError::PhoneNotVerified | AuthError::EmailNotVerified => {
                    StatusCode::FORBIDDEN
                }
                AuthError::AccountNotFound(_) => StatusCode::NOT_FOUND,
                AuthError::Provider(_) => StatusCode::BAD_GATEWAY,
            },
            Self::Cart(_) => StatusCode::BAD_REQUEST,
            Self::Checkout(err) => match err {
                CheckoutError::EmptyCart => StatusCode::CONFLICT,
                CheckoutError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CheckoutError::Payment(PaymentError::Declined(_)) => StatusCode::PAYMENT_REQUIRED,
                CheckoutError::Payment(PaymentError::Provider(_)) => StatusCode::BAD_GATEWAY,
            },
            Self::Database(_) | Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }

    /// Stable machine-readable code for the client.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::Checkout(CheckoutError::Validation(_)) => "validation",
            Self::Provision(ProvisionError::CredentialConflict) => "credential_conflict",
            Self::Provision(ProvisionError::WeakCredential(_)) => "weak_credential",
            Self::Provision(ProvisionError::PartialProvisionFailure { .. }) => "partial_provision",
            Self::Verification(VerificationError::GateRequired) => "gate_required",
            Self::Verification(VerificationError::GateRejected(_)) => "gate_rejected",
            Self::Verification(VerificationError::NoActiveChallenge) => "no_active_challenge",
            Self::Verification(VerificationError::IncorrectCode) => "incorrect_code",
            Self::Auth(AuthError::InvalidCredential) => "invalid_credential",
            Self::Auth(AuthError::PhoneNotVerified) => "phone_not_verified",
            Self::Auth(AuthError::EmailNotVerified) => "email_not_verified",
            Self::Auth(AuthError::InvalidEmailToken) => "invalid_email_token",
            Self::Auth(AuthError::AccountNotFound(_)) => "not_found",
            Self::Provision(ProvisionError::Provider(_))
            | Self::Verification(VerificationError::Provider(_))
            | Self::Auth(AuthError::Provider(_))
            | Self::Checkout(CheckoutError::Payment(PaymentError::Provider(_))) => "provider_error",
            Self::Cart(_) => "invalid_cart_line",
            Self::Checkout(CheckoutError::EmptyCart) => "empty_cart",
            Self::Checkout(CheckoutError::Payment(PaymentError::Declined(_))) => "payment_declined",
            Self::Database(_) | Self::Session(_) => "internal",
            Self::Unauthorized(_) => "unauthorized",
        }
    }

    /// Whether this error is a server-side failure worth reporting.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Message safe to show the user. Internal details are never exposed.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Session(_) => "Internal server error".to_string(),
            Self::Provision(ProvisionError::Provider(_))
            | Self::Verification(VerificationError::Provider(_))
            | Self::Auth(AuthError::Provider(_))
            | Self::Checkout(CheckoutError::Payment(PaymentError::Provider(_))) => {
                "External service error, please try again".to_string()
            }
            Self::Provision(ProvisionError::PartialProvisionFailure { .. }) => {
                "Your account was created but your profile could not be saved. \
                 Please contact support rather than signing up again."
                    .to_string()
            }
            Self::Provision(ProvisionError::CredentialConflict) => {
                "An account with this email already exists".to_string()
            }
            Self::Provision(ProvisionError::WeakCredential(reason)) => capitalize(reason),
            Self::Auth(AuthError::InvalidCredential) => "Invalid credentials".to_string(),
            Self::Auth(AuthError::AccountNotFound(_)) => "Account not found".to_string(),
            Self::Auth(AuthError::InvalidEmailToken) => {
                "This verification link is invalid or has expired".to_string()
            }
            Self::Verification(VerificationError::GateRejected(_)) => {
                "Human verification failed, please try again".to_string()
            }
            Self::Verification(err) => capitalize(&err.to_string()),
            Self::Auth(err) => capitalize(&err.to_string()),
            Self::Cart(err) => capitalize(&err.to_string()),
            Self::Checkout(CheckoutError::EmptyCart) => "Your cart is empty".to_string(),
            Self::Checkout(CheckoutError::Payment(PaymentError::Declined(_))) => {
                "Payment was declined".to_string()
            }
            _ => self.to_string(),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if self.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = match &self {
            Self::Validation(errors) | Self::Checkout(CheckoutError::Validation(errors)) => {
                json!({ "errors": errors.errors() })
            }
            Self::Provision(ProvisionError::PartialProvisionFailure { account_id }) => json!({
                "error": {
                    "code": self.code(),
                    "message": self.public_message(),
                    "account_id": account_id,
                }
            }),
            _ => json!({
                "error": {
                    "code": self.code(),
                    "message": self.public_message(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from an account ID.
///
/// Call this after a session is established to associate errors with users.
pub fn set_sentry_user(account_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for a pipeline step.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of steps
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("verification", "Challenge issued", Some(&[("role", "buyer")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shopdrop_core::AccountId;

    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("no pending registration".to_string());
        assert_eq!(err.to_string(), "Unauthorized: no pending registration");
        assert_eq!(err.code(), "unauthorized");
    }

    #[test]
    fn test_pipeline_status_codes() {
        assert_eq!(
            get_status(ProvisionError::CredentialConflict.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(ProvisionError::WeakCredential("too short".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AuthError::InvalidCredential.into()),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(VerificationError::NoActiveChallenge.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(VerificationError::IncorrectCode.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(VerificationError::Provider("timeout".into()).into()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            get_status(CheckoutError::EmptyCart.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AuthError::InvalidEmailToken.into()),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_partial_provision_is_distinct() {
        let err: AppError = ProvisionError::PartialProvisionFailure {
            account_id: AccountId::new("acc-1"),
        }
        .into();

        assert_eq!(err.code(), "partial_provision");
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_ne!(
            err.code(),
            AppError::from(ProvisionError::CredentialConflict).code()
        );
    }

    #[test]
    fn test_invalid_credential_message_is_coarse() {
        let err = AppError::from(AuthError::InvalidCredential);
        assert_eq!(err.public_message(), "Invalid credentials");
    }

    #[test]
    fn test_provider_details_are_hidden() {
        let err = AppError::from(VerificationError::Provider("10.0.0.3 refused".into()));
        assert!(!err.public_message().contains("10.0.0.3"));
    }

    #[test]
    fn test_field_errors_are_unprocessable() {
        let mut errors = FieldErrors::new();
        errors.push("email", "Please enter a valid email address");
        assert_eq!(
            get_status(errors.into()),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
