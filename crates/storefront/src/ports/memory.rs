//! In-process adapters for development and tests.
//!
//! These keep all state in memory and are safe to share across tasks. Locks
//! are never held across an `.await`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use rand::Rng;
use secrecy::{ExposeSecret, SecretString};
use uuid::Uuid;

use shopdrop_core::{AccountId, Email, Phone, Role};

use super::password::{hash_password, verify_password};
use super::{
    ChannelError, IdentityError, IdentityProvider, PaymentAuthority, PaymentAuthorization,
    PaymentError, PaymentRequest, PhoneChallengeChannel, ProfileStore, StoreError,
};
use crate::forms::MIN_PASSWORD_LENGTH;
use crate::models::{
    AccountRecord, ChallengeHandle, GateHandle, GateMount, OtpCode, ProfileRecord,
    RegistrantProfile,
};

fn poisoned<E>(_: E) -> String {
    "state lock poisoned".to_owned()
}

// =============================================================================
// Identity Provider
// =============================================================================

struct StoredAccount {
    record: AccountRecord,
    password_hash: String,
}

#[derive(Default)]
struct IdentityState {
    accounts: HashMap<AccountId, StoredAccount>,
    by_email: HashMap<Email, AccountId>,
    verification_emails: Vec<(AccountId, Uuid)>,
    email_tokens: HashMap<Uuid, AccountId>,
}

/// Identity provider that keeps argon2-hashed credentials in memory.
#[derive(Default)]
pub struct InMemoryIdentityProvider {
    state: Mutex<IdentityState>,
    fail_email_dispatch: AtomicBool,
}

impl InMemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent email-verification dispatch fail.
    pub fn fail_email_dispatch(&self, fail: bool) {
        self.fail_email_dispatch.store(fail, Ordering::SeqCst);
    }

    /// Accounts an email-verification message was dispatched for, in order.
    #[must_use]
    pub fn verification_emails_sent(&self) -> Vec<AccountId> {
        self.state
            .lock()
            .map(|state| {
                state
                    .verification_emails
                    .iter()
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// The unused token most recently mailed to an account, standing in
    /// for the link in its inbox.
    #[must_use]
    pub fn latest_email_token(&self, account_id: &AccountId) -> Option<Uuid> {
        let state = self.state.lock().ok()?;
        state
            .verification_emails
            .iter()
            .rev()
            .find(|(id, token)| id == account_id && state.email_tokens.contains_key(token))
            .map(|(_, token)| *token)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn create_account(
        &self,
        email: &Email,
        password: &SecretString,
        role: Role,
    ) -> Result<AccountId, IdentityError> {
        if password.expose_secret().chars().count() < MIN_PASSWORD_LENGTH {
            return Err(IdentityError::WeakCredential(format!(
                "password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let password_hash = hash_password(password)?;

        let mut state = self
            .state
            .lock()
            .map_err(|e| IdentityError::Provider(poisoned(e)))?;
        if state.by_email.contains_key(email) {
            return Err(IdentityError::CredentialConflict);
        }

        let id = AccountId::new(Uuid::new_v4().simple().to_string());
        state.by_email.insert(email.clone(), id.clone());
        state.accounts.insert(
            id.clone(),
            StoredAccount {
                record: AccountRecord {
                    id: id.clone(),
                    email: email.clone(),
                    role,
                    email_verified: false,
                    phone_verified: false,
                },
                password_hash,
            },
        );

        Ok(id)
    }

    async fn send_email_verification(&self, account_id: &AccountId) -> Result<(), IdentityError> {
        if self.fail_email_dispatch.load(Ordering::SeqCst) {
            return Err(IdentityError::Provider("mail relay unavailable".to_owned()));
        }

        let mut state = self
            .state
            .lock()
            .map_err(|e| IdentityError::Provider(poisoned(e)))?;
        if !state.accounts.contains_key(account_id) {
            return Err(IdentityError::Provider(format!("unknown account {account_id}")));
        }
        let token = Uuid::new_v4();
        state.email_tokens.insert(token, account_id.clone());
        state.verification_emails.push((account_id.clone(), token));
        Ok(())
    }

    async fn confirm_email(&self, token: Uuid) -> Result<AccountId, IdentityError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| IdentityError::Provider(poisoned(e)))?;
        let account_id = state
            .email_tokens
            .remove(&token)
            .ok_or(IdentityError::InvalidToken)?;
        let account = state
            .accounts
            .get_mut(&account_id)
            .ok_or(IdentityError::InvalidToken)?;
        account.record.email_verified = true;
        Ok(account_id)
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AccountRecord, IdentityError> {
        let (record, password_hash) = {
            let state = self
                .state
                .lock()
                .map_err(|e| IdentityError::Provider(poisoned(e)))?;
            let account = state
                .by_email
                .get(email)
                .and_then(|id| state.accounts.get(id))
                .ok_or(IdentityError::InvalidCredential)?;
            (account.record.clone(), account.password_hash.clone())
        };

        verify_password(password, &password_hash)?;
        Ok(record)
    }

    async fn account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountRecord>, IdentityError> {
        let state = self
            .state
            .lock()
            .map_err(|e| IdentityError::Provider(poisoned(e)))?;
        Ok(state.accounts.get(account_id).map(|a| a.record.clone()))
    }

    async fn record_phone_verified(
        &self,
        account_id: &AccountId,
        _phone: &Phone,
    ) -> Result<(), IdentityError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| IdentityError::Provider(poisoned(e)))?;
        let account = state
            .accounts
            .get_mut(account_id)
            .ok_or_else(|| IdentityError::Provider(format!("unknown account {account_id}")))?;
        account.record.phone_verified = true;
        Ok(())
    }
}

// =============================================================================
// Phone Challenge Channel
// =============================================================================

/// How long an issued code stays confirmable.
const CODE_TTL: Duration = Duration::from_secs(10 * 60);

/// Upper bound on codes held at once.
const MAX_LIVE_CODES: u64 = 10_000;

/// Recent destinations kept for [`DevPhoneChannel::sent_to`].
const SENT_LOG_CAPACITY: usize = 64;

/// Phone channel that writes codes to the log instead of sending SMS.
///
/// Earlier codes stay confirmable on the channel side until they expire or
/// are used, as with real providers. Replacing a challenge is enforced by
/// the holder, not here.
pub struct DevPhoneChannel {
    codes: Cache<String, String>,
    sent_to: Mutex<VecDeque<Phone>>,
    gates_established: AtomicUsize,
    reject_gates: AtomicBool,
    fixed_code: Option<String>,
}

impl Default for DevPhoneChannel {
    fn default() -> Self {
        Self::build(None)
    }
}

impl DevPhoneChannel {
    /// A channel that generates a random six-digit code per challenge.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A channel that issues the same code for every challenge.
    #[must_use]
    pub fn with_fixed_code(code: impl Into<String>) -> Self {
        Self::build(Some(code.into()))
    }

    fn build(fixed_code: Option<String>) -> Self {
        Self {
            codes: Cache::builder()
                .max_capacity(MAX_LIVE_CODES)
                .time_to_live(CODE_TTL)
                .build(),
            sent_to: Mutex::default(),
            gates_established: AtomicUsize::new(0),
            reject_gates: AtomicBool::new(false),
            fixed_code,
        }
    }

    /// Refuse the gate on every subsequent send, as a provider does once a
    /// single-use gate token has been spent.
    pub fn reject_gates(&self, reject: bool) {
        self.reject_gates.store(reject, Ordering::SeqCst);
    }

    /// Number of gates established through this channel.
    #[must_use]
    pub fn gates_established(&self) -> usize {
        self.gates_established.load(Ordering::SeqCst)
    }

    /// The live code for a handle, for tests and local debugging.
    pub async fn code_for(&self, handle: &ChallengeHandle) -> Option<String> {
        self.codes.get(handle.provider_ref()).await
    }

    /// Most recent numbers a challenge was sent to, oldest first.
    #[must_use]
    pub fn sent_to(&self) -> Vec<Phone> {
        self.sent_to
            .lock()
            .map(|sent| sent.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PhoneChallengeChannel for DevPhoneChannel {
    async fn establish_gate(&self, mount: &GateMount) -> Result<GateHandle, ChannelError> {
        if mount.as_str().trim().is_empty() {
            return Err(ChannelError::GateRejected("empty gate token".to_owned()));
        }
        self.gates_established.fetch_add(1, Ordering::SeqCst);
        Ok(GateHandle::new(mount.as_str()))
    }

    async fn send_challenge(
        &self,
        phone: &Phone,
        _gate: &GateHandle,
    ) -> Result<ChallengeHandle, ChannelError> {
        if self.reject_gates.load(Ordering::SeqCst) {
            return Err(ChannelError::GateRejected("CAPTCHA_CHECK_FAILED".to_owned()));
        }

        let code = self
            .fixed_code
            .clone()
            .unwrap_or_else(|| format!("{:06}", rand::rng().random_range(0..1_000_000)));
        let session_ref = Uuid::new_v4().to_string();

        tracing::debug!(phone = %phone.masked(), %code, "dev phone channel issued code");

        {
            let mut sent = self
                .sent_to
                .lock()
                .map_err(|e| ChannelError::Provider(poisoned(e)))?;
            if sent.len() == SENT_LOG_CAPACITY {
                sent.pop_front();
            }
            sent.push_back(phone.clone());
        }
        self.codes.insert(session_ref.clone(), code).await;

        Ok(ChallengeHandle::new(session_ref))
    }

    async fn confirm_challenge(
        &self,
        handle: &ChallengeHandle,
        code: &OtpCode,
    ) -> Result<(), ChannelError> {
        match self.codes.get(handle.provider_ref()).await {
            Some(expected) if expected == code.as_str() => {
                self.codes.invalidate(handle.provider_ref()).await;
                Ok(())
            }
            _ => Err(ChannelError::IncorrectCode),
        }
    }
}

// =============================================================================
// Profile Store
// =============================================================================

/// Profile store backed by a map.
#[derive(Default)]
pub struct InMemoryProfileStore {
    records: Mutex<HashMap<AccountId, ProfileRecord>>,
    unavailable: AtomicBool,
}

impl InMemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail as if the backend were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Whether no profiles are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn save(
        &self,
        account_id: &AccountId,
        profile: &RegistrantProfile,
    ) -> Result<ProfileRecord, StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("profile store unavailable".to_owned()));
        }

        let mut records = self
            .records
            .lock()
            .map_err(|e| StoreError::Backend(poisoned(e)))?;
        if records.contains_key(account_id) {
            return Err(StoreError::Conflict(account_id.clone()));
        }

        let record = ProfileRecord {
            account_id: account_id.clone(),
            role: profile.role(),
            profile: profile.clone(),
            created_at: Utc::now(),
        };
        records.insert(account_id.clone(), record.clone());
        Ok(record)
    }

    async fn load(&self, account_id: &AccountId) -> Result<Option<ProfileRecord>, StoreError> {
        let records = self
            .records
            .lock()
            .map_err(|e| StoreError::Backend(poisoned(e)))?;
        Ok(records.get(account_id).cloned())
    }
}

// =============================================================================
// Payment Authority
// =============================================================================

/// Payment authority that approves every charge after a fixed delay.
#[derive(Default)]
pub struct SimulatedPaymentAuthority {
    delay: Duration,
    charges: Mutex<Vec<PaymentRequest>>,
}

impl SimulatedPaymentAuthority {
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            charges: Mutex::default(),
        }
    }

    /// Charges approved so far, in order.
    #[must_use]
    pub fn charges(&self) -> Vec<PaymentRequest> {
        self.charges.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PaymentAuthority for SimulatedPaymentAuthority {
    async fn authorize(
        &self,
        request: &PaymentRequest,
    ) -> Result<PaymentAuthorization, PaymentError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.charges
            .lock()
            .map_err(|e| PaymentError::Provider(poisoned(e)))?
            .push(request.clone());

        Ok(PaymentAuthorization {
            reference: Uuid::new_v4(),
        })
    }
}
