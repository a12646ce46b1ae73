//! Session-related types.
//!
//! Types stored in the browser session and the routing decision handed to
//! the UI after each pipeline step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopdrop_core::{AccountId, Phone, RegistrantKind, Role};

/// An authenticated, role-scoped session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: AccountId,
    pub role: Role,
    pub established_at: DateTime<Utc>,
}

impl Session {
    /// Create a session established now.
    #[must_use]
    pub fn new(account_id: AccountId, role: Role) -> Self {
        Self {
            account_id,
            role,
            established_at: Utc::now(),
        }
    }

    /// Where this session lands after login or verification.
    #[must_use]
    pub const fn destination(&self) -> Destination {
        Destination::for_role(self.role)
    }
}

/// Routing decision handed to the UI. The core never renders; it only picks
/// the destination token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    SupplierDashboard,
    MarketplaceHome,
    /// Hand-off to phone verification after sign-up.
    VerifyOtp { kind: RegistrantKind, phone: Phone },
}

impl Destination {
    /// Post-authentication destination. Depends on the account role only.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        match role {
            Role::Supplier => Self::SupplierDashboard,
            Role::Buyer => Self::MarketplaceHome,
        }
    }

    /// Stable token for the routing boundary.
    #[must_use]
    pub const fn token(&self) -> &'static str {
        match self {
            Self::SupplierDashboard => "supplier-dashboard",
            Self::MarketplaceHome => "marketplace-home",
            Self::VerifyOtp { .. } => "verify-otp",
        }
    }

    /// Path the UI navigates to.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::SupplierDashboard => "/suppliers/dashboard".to_string(),
            Self::MarketplaceHome => "/".to_string(),
            Self::VerifyOtp { kind, phone } => format!(
                "/auth/verify-otp?type={}&phone={}",
                urlencoding::encode(kind.as_str()),
                urlencoding::encode(phone.as_str())
            ),
        }
    }
}

impl Serialize for Destination {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("Destination", 2)?;
        state.serialize_field("destination", self.token())?;
        state.serialize_field("path", &self.path())?;
        state.end()
    }
}

/// Session keys for pipeline and cart state.
pub mod keys {
    /// Key for the authenticated [`super::Session`].
    pub const CURRENT_SESSION: &str = "current_session";

    /// Key for the provisioned account awaiting phone verification.
    pub const PENDING_VERIFICATION: &str = "pending_verification";

    /// Key for the held phone challenge and its gate.
    pub const PHONE_CHALLENGE: &str = "phone_challenge";

    /// Key for the cart ledger.
    pub const CART: &str = "cart";
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_destinations() {
        assert_eq!(Destination::for_role(Role::Supplier).token(), "supplier-dashboard");
        assert_eq!(Destination::for_role(Role::Buyer).token(), "marketplace-home");
    }

    #[test]
    fn test_verify_otp_path_carries_type_and_stored_phone() {
        let destination = Destination::VerifyOtp {
            kind: RegistrantKind::Customer,
            phone: Phone::parse("+27821234567").unwrap(),
        };
        assert_eq!(
            destination.path(),
            "/auth/verify-otp?type=customer&phone=27821234567"
        );
    }

    #[test]
    fn test_serializes_token_and_path() {
        let json = serde_json::to_value(Destination::SupplierDashboard).unwrap();
        assert_eq!(json["destination"], "supplier-dashboard");
        assert_eq!(json["path"], "/suppliers/dashboard");
    }

    #[test]
    fn test_session_destination_follows_role() {
        let session = Session::new(AccountId::new("a1"), Role::Buyer);
        assert_eq!(session.destination(), Destination::MarketplaceHome);
    }
}
