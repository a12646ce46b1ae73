//! Phone verification challenge.
//!
//! [`VerificationChallenge`] is the single per-session holder for the
//! human-verification gate and the one live phone challenge. It lives in the
//! browser session and is discarded with it.
//!
//! Only the held handle is ever confirmable. Issuing or resending replaces
//! it, so a code sent for an earlier handle can never verify a later
//! confirmation, whatever the provider still accepts on its side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use shopdrop_core::Phone;

use crate::models::{ChallengeHandle, ConfirmResult, GateHandle, GateMount, OtpCode};
use crate::ports::{ChannelError, PhoneChallengeChannel};

/// Errors that can occur during phone verification.
#[derive(Debug, Error)]
pub enum VerificationError {
    /// No human-verification gate has been established in this session.
    #[error("the human verification check must be completed first")]
    GateRequired,

    /// The gate was refused by the provider.
    #[error("human verification failed: {0}")]
    GateRejected(String),

    /// There is no live challenge, or the handle was replaced.
    #[error("no active verification challenge")]
    NoActiveChallenge,

    /// The provider rejected the code.
    #[error("incorrect verification code")]
    IncorrectCode,

    /// Transient phone-channel fault.
    #[error("phone channel error: {0}")]
    Provider(String),
}

impl From<ChannelError> for VerificationError {
    fn from(err: ChannelError) -> Self {
        match err {
            ChannelError::IncorrectCode => Self::IncorrectCode,
            ChannelError::GateRejected(reason) => Self::GateRejected(reason),
            ChannelError::Provider(message) => Self::Provider(message),
        }
    }
}

/// Forget a gate the channel refused on send, so the next
/// `establish_gate` contacts the channel with a fresh token.
fn drop_rejected_gate(gate: &mut Option<GateHandle>, err: ChannelError) -> ChannelError {
    if matches!(err, ChannelError::GateRejected(_)) {
        tracing::info!("verification gate refused, a new one is required");
        *gate = None;
    }
    err
}

/// State of the phone number currently in verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChallengeState {
    pub target_phone: Phone,
    /// The only confirmable handle. Replaced, never appended, on resend.
    pub pending: Option<ChallengeHandle>,
    pub created_at: DateTime<Utc>,
}

/// Per-session gate and challenge holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationChallenge {
    gate: Option<GateHandle>,
    state: Option<VerificationChallengeState>,
    attempt_count: u32,
}

impl VerificationChallenge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The established gate, if any.
    #[must_use]
    pub const fn gate(&self) -> Option<&GateHandle> {
        self.gate.as_ref()
    }

    /// The number in verification, if any.
    #[must_use]
    pub const fn state(&self) -> Option<&VerificationChallengeState> {
        self.state.as_ref()
    }

    /// The live handle, if any.
    #[must_use]
    pub fn current_handle(&self) -> Option<&ChallengeHandle> {
        self.state.as_ref().and_then(|s| s.pending.as_ref())
    }

    /// Confirmation attempts made in this session, successful or not.
    #[must_use]
    pub const fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Establish the human-verification gate. Only the first call contacts
    /// the channel; later calls return the gate already held.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::GateRejected` if the channel refuses the
    /// gate, or `VerificationError::Provider` on a channel fault.
    #[instrument(skip_all)]
    pub async fn establish_gate(
        &mut self,
        channel: &dyn PhoneChallengeChannel,
        mount: &GateMount,
    ) -> Result<&GateHandle, VerificationError> {
        if self.gate.is_none() {
            let gate = channel.establish_gate(mount).await?;
            tracing::debug!(gate_id = %gate.id(), "verification gate established");
            self.gate = Some(gate);
        }
        self.gate.as_ref().ok_or(VerificationError::GateRequired)
    }

    /// Start verifying `phone`, replacing any challenge already held.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::GateRequired` if no gate is established.
    /// Returns `VerificationError::Provider` if the challenge could not be
    /// sent; the previous challenge is discarded either way. Returns
    /// `VerificationError::GateRejected` if the channel refused the gate,
    /// which is then dropped.
    #[instrument(skip_all, fields(phone = %phone.masked()))]
    pub async fn issue(
        &mut self,
        channel: &dyn PhoneChallengeChannel,
        phone: Phone,
    ) -> Result<ChallengeHandle, VerificationError> {
        let gate = self.gate.as_ref().ok_or(VerificationError::GateRequired)?;

        self.state = Some(VerificationChallengeState {
            target_phone: phone.clone(),
            pending: None,
            created_at: Utc::now(),
        });

        let handle = channel
            .send_challenge(&phone, gate)
            .await
            .map_err(|err| drop_rejected_gate(&mut self.gate, err))?;
        if let Some(state) = self.state.as_mut() {
            state.pending = Some(handle.clone());
        }

        tracing::info!(handle_id = %handle.id(), "phone challenge issued");
        Ok(handle)
    }

    /// Send a new code to the number in verification and make the new
    /// handle the only confirmable one.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::NoActiveChallenge` if `handle` is not the
    /// held handle. Returns `VerificationError::Provider` if sending failed,
    /// in which case the held handle is kept. A refused gate is dropped as
    /// in [`Self::issue`].
    #[instrument(skip_all, fields(handle_id = %handle.id()))]
    pub async fn resend(
        &mut self,
        channel: &dyn PhoneChallengeChannel,
        handle: &ChallengeHandle,
    ) -> Result<ChallengeHandle, VerificationError> {
        let gate = self.gate.as_ref().ok_or(VerificationError::GateRequired)?;
        let state = self
            .state
            .as_mut()
            .filter(|s| s.pending.as_ref().is_some_and(|p| p.id() == handle.id()))
            .ok_or(VerificationError::NoActiveChallenge)?;

        let replacement = channel
            .send_challenge(&state.target_phone, gate)
            .await
            .map_err(|err| drop_rejected_gate(&mut self.gate, err))?;
        state.pending = Some(replacement.clone());

        tracing::info!(handle_id = %replacement.id(), "phone challenge resent");
        Ok(replacement)
    }

    /// Confirm `code` against the held challenge. Every call counts as an
    /// attempt.
    ///
    /// On success the challenge state is destroyed; the gate is kept for the
    /// rest of the session.
    ///
    /// # Errors
    ///
    /// Returns `VerificationError::NoActiveChallenge` if nothing is held or
    /// `handle` was replaced. The channel is not contacted in that case.
    /// Returns `VerificationError::IncorrectCode` if the provider rejects the
    /// code.
    #[instrument(skip_all, fields(handle_id = %handle.id(), attempt = tracing::field::Empty))]
    pub async fn confirm(
        &mut self,
        channel: &dyn PhoneChallengeChannel,
        handle: &ChallengeHandle,
        code: &OtpCode,
    ) -> Result<ConfirmResult, VerificationError> {
        self.attempt_count = self.attempt_count.saturating_add(1);
        tracing::Span::current().record("attempt", self.attempt_count);

        let held = self
            .current_handle()
            .filter(|held| held.id() == handle.id())
            .ok_or(VerificationError::NoActiveChallenge)?;

        if let Err(e) = channel.confirm_challenge(held, code).await {
            tracing::warn!(error = %e, "phone challenge confirmation rejected");
            return Err(e.into());
        }

        let state = self.state.take().ok_or(VerificationError::NoActiveChallenge)?;
        tracing::info!(phone = %state.target_phone.masked(), "phone verified");

        Ok(ConfirmResult {
            verified: true,
            phone: state.target_phone,
        })
    }
}
