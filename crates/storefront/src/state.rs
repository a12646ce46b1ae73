//! Application state shared across handlers.
//!
//! `AppState` is the composition root: every port is constructed here once
//! and handed to services by reference for the lifetime of a request.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::{PhoneChannelConfig, StorefrontConfig};
use crate::db::accounts::PgIdentityProvider;
use crate::db::profiles::PgProfileStore;
use crate::firebase::FirebasePhoneChannel;
use crate::ports::memory::{DevPhoneChannel, SimulatedPaymentAuthority};
use crate::ports::{
    ChannelError, IdentityProvider, PaymentAuthority, PhoneChallengeChannel, ProfileStore,
};
use crate::services::{
    AccountProvisioner, CheckoutProcess, EmailConfirmation, EmailService, SessionEstablisher,
    VerificationPolicy,
};

/// Error assembling application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("phone channel: {0}")]
    PhoneChannel(#[from] ChannelError),

    #[error("email relay: {0}")]
    EmailRelay(#[from] lettre::transport::smtp::Error),
}

/// The external collaborators the services talk to.
#[derive(Clone)]
pub struct Ports {
    pub identity: Arc<dyn IdentityProvider>,
    pub phone: Arc<dyn PhoneChallengeChannel>,
    pub profiles: Arc<dyn ProfileStore>,
    pub payments: Arc<dyn PaymentAuthority>,
}

impl Ports {
    /// Build the production adapters selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns `StateError::PhoneChannel` if the Firebase client cannot be
    /// built, or `StateError::EmailRelay` if the SMTP relay is misconfigured.
    pub fn from_config(config: &StorefrontConfig, pool: &PgPool) -> Result<Self, StateError> {
        let phone: Arc<dyn PhoneChallengeChannel> = match &config.phone_channel {
            PhoneChannelConfig::Dev => {
                tracing::warn!("using dev phone channel: codes are written to the debug log");
                Arc::new(DevPhoneChannel::new())
            }
            PhoneChannelConfig::Firebase(firebase) => {
                Arc::new(FirebasePhoneChannel::new(firebase.clone())?)
            }
        };

        let mailer = match &config.email {
            Some(email) => Some(EmailService::new(email, &config.base_url)?),
            None => {
                tracing::warn!("SMTP_HOST not set: email verification links cannot be sent");
                None
            }
        };

        Ok(Self {
            identity: Arc::new(PgIdentityProvider::new(pool.clone(), mailer)),
            phone,
            profiles: Arc::new(PgProfileStore::new(pool.clone())),
            payments: Arc::new(SimulatedPaymentAuthority::new(config.payment_delay)),
        })
    }
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections, configuration and ports.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    ports: Ports,
    policy: VerificationPolicy,
}

impl AppState {
    /// Create application state with the adapters selected by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a port adapter cannot be constructed.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let ports = Ports::from_config(&config, &pool)?;
        Ok(Self::with_ports(config, pool, ports))
    }

    /// Create application state around already-built ports.
    #[must_use]
    pub fn with_ports(config: StorefrontConfig, pool: PgPool, ports: Ports) -> Self {
        let policy = VerificationPolicy {
            require_email_verified: config.require_email_verification,
        };

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                ports,
                policy,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// The phone challenge channel.
    #[must_use]
    pub fn phone(&self) -> &dyn PhoneChallengeChannel {
        self.inner.ports.phone.as_ref()
    }

    /// Which verified flags sessions require.
    #[must_use]
    pub fn policy(&self) -> VerificationPolicy {
        self.inner.policy
    }

    #[must_use]
    pub fn provisioner(&self) -> AccountProvisioner<'_> {
        AccountProvisioner::new(
            self.inner.ports.identity.as_ref(),
            self.inner.ports.profiles.as_ref(),
        )
    }

    #[must_use]
    pub fn establisher(&self) -> SessionEstablisher<'_> {
        SessionEstablisher::new(self.inner.ports.identity.as_ref(), self.inner.policy)
    }

    #[must_use]
    pub fn email_confirmation(&self) -> EmailConfirmation<'_> {
        EmailConfirmation::new(self.inner.ports.identity.as_ref())
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutProcess<'_> {
        CheckoutProcess::new(self.inner.ports.payments.as_ref())
    }
}
