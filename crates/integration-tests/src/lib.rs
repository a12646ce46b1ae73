//! Integration tests for ShopDrop.
//!
//! The scenarios in `tests/` drive the storefront services end to end
//! against the in-memory adapters, so they need no database or network.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p shopdrop-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `onboarding` - Registration through phone verification to a session
//! - `verification` - Challenge replacement and attempt accounting
//! - `sign_in` - Credential sign-in and verification policy
//! - `cart_checkout` - Cart totals and payment

use std::time::Duration;

use shopdrop_core::{Price, ProductId};
use shopdrop_storefront::forms::{
    BankingDetailsForm, BuyerRegistrationForm, SupplierRegistrationForm,
};
use shopdrop_storefront::models::{ChallengeHandle, GateMount, OtpCode};
use shopdrop_storefront::ports::memory::{
    DevPhoneChannel, InMemoryIdentityProvider, InMemoryProfileStore, SimulatedPaymentAuthority,
};
use shopdrop_storefront::services::{
    AccountProvisioner, CartLine, CheckoutProcess, EmailConfirmation, SessionEstablisher,
    VerificationChallenge, VerificationPolicy,
};

/// Password used by every fixture form.
pub const PASSWORD: &str = "secret12";

/// In-memory adapters wired the way `AppState` wires the real ones.
pub struct Harness {
    pub identity: InMemoryIdentityProvider,
    pub phone: DevPhoneChannel,
    pub profiles: InMemoryProfileStore,
    pub payments: SimulatedPaymentAuthority,
    pub policy: VerificationPolicy,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    /// Adapters with random OTP codes and an instant payment authority.
    #[must_use]
    pub fn new() -> Self {
        Self {
            identity: InMemoryIdentityProvider::new(),
            phone: DevPhoneChannel::new(),
            profiles: InMemoryProfileStore::new(),
            payments: SimulatedPaymentAuthority::new(Duration::ZERO),
            policy: VerificationPolicy::default(),
        }
    }

    /// Adapters whose phone channel issues `code` for every challenge.
    #[must_use]
    pub fn with_fixed_code(code: &str) -> Self {
        Self {
            phone: DevPhoneChannel::with_fixed_code(code),
            ..Self::new()
        }
    }

    #[must_use]
    pub fn provisioner(&self) -> AccountProvisioner<'_> {
        AccountProvisioner::new(&self.identity, &self.profiles)
    }

    #[must_use]
    pub fn email_confirmation(&self) -> EmailConfirmation<'_> {
        EmailConfirmation::new(&self.identity)
    }

    #[must_use]
    pub fn establisher(&self) -> SessionEstablisher<'_> {
        SessionEstablisher::new(&self.identity, self.policy)
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutProcess<'_> {
        CheckoutProcess::new(&self.payments)
    }

    /// A challenge holder with the gate already passed.
    ///
    /// # Panics
    ///
    /// Panics if the dev channel refuses the gate.
    pub async fn gated_challenge(&self) -> VerificationChallenge {
        let mut challenge = VerificationChallenge::new();
        challenge
            .establish_gate(&self.phone, &GateMount::new("recaptcha-token"))
            .await
            .expect("dev channel accepts a non-empty gate");
        challenge
    }

    /// The code the dev channel issued for `handle`, parsed.
    ///
    /// # Panics
    ///
    /// Panics if the channel never issued this handle.
    pub async fn code_for(&self, handle: &ChallengeHandle) -> OtpCode {
        let code = self.phone.code_for(handle).await.expect("handle was issued");
        OtpCode::parse(&code).expect("dev codes are six digits")
    }
}

/// The buyer from the onboarding walkthrough.
#[must_use]
pub fn buyer_form() -> BuyerRegistrationForm {
    BuyerRegistrationForm {
        full_name: "John Doe".to_string(),
        phone: "0821234567".to_string(),
        email: "john@x.com".to_string(),
        delivery_address: "12 Long Street, Cape Town".to_string(),
        payment_preference: "cod".to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
    }
}

/// A supplier with complete banking details.
#[must_use]
pub fn supplier_form() -> SupplierRegistrationForm {
    SupplierRegistrationForm {
        business_name: "Green Valley Farms".to_string(),
        owner_name: "Thandi Mokoena".to_string(),
        phone: "+27 72 555 0101".to_string(),
        email: "contact@greenvalley.farm".to_string(),
        business_address: "123 Farm Rd, Stellenbosch".to_string(),
        category: "farmer".to_string(),
        banking_details: BankingDetailsForm {
            bank_name: "Capitec".to_string(),
            account_holder: "Green Valley Farms".to_string(),
            account_number: "1234 5678 90".to_string(),
        },
        registration_number: "2019/123456/07".to_string(),
        password: PASSWORD.to_string(),
        confirm_password: PASSWORD.to_string(),
    }
}

/// A cart line priced in cents.
///
/// # Panics
///
/// Panics on a zero quantity or negative price.
#[must_use]
pub fn line(id: &str, name: &str, cents: i64, quantity: u32) -> CartLine {
    CartLine::new(ProductId::new(id), name, Price::from_cents(cents), quantity)
        .expect("fixture lines are valid")
}
