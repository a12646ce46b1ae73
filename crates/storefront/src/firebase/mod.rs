//! Firebase phone authentication over the Identity Toolkit REST API.
//!
//! The reCAPTCHA check runs in the browser; the token it yields is the
//! human-verification gate and travels with every `sendVerificationCode`
//! call made during the session.
//!
//! # Endpoints
//!
//! - `POST {base}/accounts:sendVerificationCode?key=...` - text a code, returns `sessionInfo`
//! - `POST {base}/accounts:signInWithPhoneNumber?key=...` - check a code against `sessionInfo`

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use tracing::instrument;

use shopdrop_core::Phone;

use crate::config::FirebaseConfig;
use crate::models::{ChallengeHandle, GateHandle, GateMount, OtpCode};
use crate::ports::{ChannelError, PhoneChallengeChannel};
use types::{
    ErrorResponse, SendVerificationCodeRequest, SendVerificationCodeResponse,
    SignInWithPhoneNumberRequest, SignInWithPhoneNumberResponse,
};

/// Request timeout for Identity Toolkit calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Reasons that mean the code did not match a live verification.
const INCORRECT_CODE_REASONS: &[&str] = &[
    "INVALID_CODE",
    "SESSION_EXPIRED",
    "INVALID_SESSION_INFO",
    "CODE_EXPIRED",
];

/// Reasons that mean the reCAPTCHA token was not accepted.
const GATE_REJECTED_REASONS: &[&str] = &[
    "CAPTCHA_CHECK_FAILED",
    "MISSING_RECAPTCHA_TOKEN",
    "INVALID_RECAPTCHA_TOKEN",
];

/// Phone challenge channel backed by Firebase Authentication.
#[derive(Clone)]
pub struct FirebasePhoneChannel {
    client: reqwest::Client,
    config: FirebaseConfig,
}

impl FirebasePhoneChannel {
    /// Create a new channel.
    ///
    /// # Errors
    ///
    /// Returns `ChannelError::Provider` if the HTTP client fails to build.
    pub fn new(config: FirebaseConfig) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/accounts:{method}?key={}",
            self.config.identity_toolkit_url.trim_end_matches('/'),
            urlencoding::encode(self.config.api_key.expose_secret())
        )
    }

    async fn post<Req, Res>(&self, method: &str, body: &Req) -> Result<Res, ChannelError>
    where
        Req: serde::Serialize + Sync + ?Sized,
        Res: serde::de::DeserializeOwned + Send,
    {
        let response = self
            .client
            .post(self.endpoint(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::Provider(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(classify_error(status.as_u16(), &text));
        }

        response
            .json()
            .await
            .map_err(|e| ChannelError::Provider(format!("unreadable response: {e}")))
    }
}

/// Map an Identity Toolkit error body to a channel error.
fn classify_error(status: u16, body: &str) -> ChannelError {
    let Ok(parsed) = serde_json::from_str::<ErrorResponse>(body) else {
        return ChannelError::Provider(format!("HTTP {status}: {body}"));
    };

    let reason = parsed.error.reason();
    if INCORRECT_CODE_REASONS.contains(&reason) {
        ChannelError::IncorrectCode
    } else if GATE_REJECTED_REASONS.contains(&reason) {
        ChannelError::GateRejected(reason.to_owned())
    } else {
        ChannelError::Provider(format!("HTTP {}: {}", parsed.error.code, parsed.error.message))
    }
}

#[async_trait]
impl PhoneChallengeChannel for FirebasePhoneChannel {
    async fn establish_gate(&self, mount: &GateMount) -> Result<GateHandle, ChannelError> {
        let token = mount.as_str().trim();
        if token.is_empty() {
            return Err(ChannelError::GateRejected(
                "MISSING_RECAPTCHA_TOKEN".to_owned(),
            ));
        }
        Ok(GateHandle::new(token))
    }

    #[instrument(skip_all, fields(phone = %phone.masked()))]
    async fn send_challenge(
        &self,
        phone: &Phone,
        gate: &GateHandle,
    ) -> Result<ChallengeHandle, ChannelError> {
        let e164 = phone.e164();
        let body = SendVerificationCodeRequest {
            phone_number: &e164,
            recaptcha_token: gate.token(),
        };

        let response: SendVerificationCodeResponse =
            self.post("sendVerificationCode", &body).await?;

        tracing::debug!("firebase verification code sent");
        Ok(ChallengeHandle::new(response.session_info))
    }

    #[instrument(skip_all, fields(handle_id = %handle.id()))]
    async fn confirm_challenge(
        &self,
        handle: &ChallengeHandle,
        code: &OtpCode,
    ) -> Result<(), ChannelError> {
        let body = SignInWithPhoneNumberRequest {
            session_info: handle.provider_ref(),
            code: code.as_str(),
        };

        let response: SignInWithPhoneNumberResponse =
            self.post("signInWithPhoneNumber", &body).await?;

        tracing::debug!(
            confirmed_number = response.phone_number.is_some(),
            "firebase code accepted"
        );
        Ok(())
    }
}
