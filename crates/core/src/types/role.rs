//! Registrant roles.

use serde::{Deserialize, Serialize};

/// The side of the marketplace an account belongs to.
///
/// Every authenticated session is scoped to exactly one role, which decides
/// where the registrant lands after verification or sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "storefront.account_role", rename_all = "snake_case")
)]
pub enum Role {
    /// Shops the marketplace.
    Buyer,
    /// Lists products on the marketplace.
    Supplier,
}

impl Role {
    /// The registrant kind used in the verification hand-off query string.
    #[must_use]
    pub const fn kind(self) -> RegistrantKind {
        match self {
            Self::Buyer => RegistrantKind::Customer,
            Self::Supplier => RegistrantKind::Supplier,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buyer => write!(f, "buyer"),
            Self::Supplier => write!(f, "supplier"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buyer" => Ok(Self::Buyer),
            "supplier" => Ok(Self::Supplier),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// The `type` query parameter carried to the verify-OTP step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrantKind {
    Customer,
    Supplier,
}

impl RegistrantKind {
    /// The role this kind registers as.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::Customer => Role::Buyer,
            Self::Supplier => Role::Supplier,
        }
    }

    /// Query-string spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer",
            Self::Supplier => "supplier",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_role() {
        for role in [Role::Buyer, Role::Supplier] {
            assert_eq!(role.kind().role(), role);
        }
    }

    #[test]
    fn test_buyer_is_customer_in_query() {
        assert_eq!(Role::Buyer.kind().as_str(), "customer");
    }

    #[test]
    fn test_parse_role() {
        assert_eq!("supplier".parse::<Role>().unwrap(), Role::Supplier);
        assert!("admin".parse::<Role>().is_err());
    }
}
