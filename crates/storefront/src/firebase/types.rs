//! Identity Toolkit request and response bodies.

use serde::{Deserialize, Serialize};

/// Body of `accounts:sendVerificationCode`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationCodeRequest<'a> {
    /// Number to text, in E.164 form.
    pub phone_number: &'a str,
    /// Token produced by the reCAPTCHA widget.
    pub recaptcha_token: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendVerificationCodeResponse {
    /// Opaque reference to the code that was sent.
    pub session_info: String,
}

/// Body of `accounts:signInWithPhoneNumber`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithPhoneNumberRequest<'a> {
    pub session_info: &'a str,
    pub code: &'a str,
}

/// The parts of the sign-in response this crate reads. The tokens it also
/// carries are not used: the session is owned by the storefront.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInWithPhoneNumberResponse {
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Error envelope returned with non-2xx statuses.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    /// Machine-readable reason, e.g. `INVALID_CODE`, sometimes followed by
    /// ` : <detail>`.
    pub message: String,
}

impl ErrorBody {
    /// The reason code without any trailing detail.
    #[must_use]
    pub fn reason(&self) -> &str {
        self.message
            .split([' ', ':'])
            .next()
            .unwrap_or_default()
    }
}
