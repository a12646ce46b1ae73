//! Business logic services for the storefront.
//!
//! # Services
//!
//! - [`provisioning`] - Sign-up: account creation, email verification dispatch, profile save
//! - [`email`] - SMTP delivery of verification links
//! - [`email_confirmation`] - Resending and redeeming email-verification tokens
//! - [`verification`] - Phone one-time-password challenge held per browser session
//! - [`session`] - Credential sign-in and post-verification session establishment
//! - [`cart`] - Per-session cart ledger
//! - [`checkout`] - Payment validation, authorization and cart clearing
//!
//! Services borrow their ports for the duration of one operation. In the
//! server [`crate::state::AppState`] hands them out:
//!
//! ```rust,ignore
//! let pending = state.provisioner().provision(profile, credentials).await?;
//! ```

pub mod cart;
pub mod checkout;
pub mod email;
pub mod email_confirmation;
pub mod provisioning;
pub mod session;
pub mod verification;

pub use cart::{CartError, CartLedger, CartLine};
pub use checkout::{CheckoutError, CheckoutProcess, PaymentForm, PaymentResult, ValidatedPayment};
pub use email::{EmailError, EmailService};
pub use email_confirmation::EmailConfirmation;
pub use provisioning::{AccountProvisioner, ProvisionError, ProvisionResult, validate_password};
pub use session::{AuthError, SessionEstablisher, VerificationPolicy};
pub use verification::{VerificationChallenge, VerificationChallengeState, VerificationError};
