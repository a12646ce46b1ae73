//! Domain models for the storefront.
//!
//! - [`profile`] - Role-discriminated registrant profiles
//! - [`account`] - Identity-provider accounts and stored profile records
//! - [`challenge`] - Phone-verification gate and challenge handles
//! - [`session`] - Role-scoped sessions, routing destinations and session keys
//! - [`shopper`] - Personal-shopper requests

pub mod account;
pub mod challenge;
pub mod profile;
pub mod session;
pub mod shopper;

pub use account::{AccountRecord, Credentials, ProfileRecord};
pub use challenge::{ChallengeHandle, ConfirmResult, GateHandle, GateMount, OtpCode, OtpCodeError};
pub use profile::{
    BankingDetails, BuyerProfile, PaymentPreference, RegistrantProfile, SupplierCategory,
    SupplierProfile,
};
pub use session::{Destination, Session, keys as session_keys};
pub use shopper::PersonalShopperRequest;
