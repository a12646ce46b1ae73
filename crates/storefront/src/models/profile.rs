//! Registrant profile types.
//!
//! A profile is built from validated registration form input (see
//! [`crate::forms`]) and is immutable once handed to the provisioner.

use serde::{Deserialize, Serialize};

use shopdrop_core::{Email, Phone, Role};

/// Profile submitted by a new registrant, discriminated by role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum RegistrantProfile {
    Buyer(BuyerProfile),
    Supplier(SupplierProfile),
}

impl RegistrantProfile {
    /// The role this profile registers as.
    #[must_use]
    pub const fn role(&self) -> Role {
        match self {
            Self::Buyer(_) => Role::Buyer,
            Self::Supplier(_) => Role::Supplier,
        }
    }

    /// The phone number that enters verification.
    #[must_use]
    pub const fn phone(&self) -> &Phone {
        match self {
            Self::Buyer(buyer) => &buyer.phone,
            Self::Supplier(supplier) => &supplier.phone,
        }
    }

    /// The contact email on the profile.
    #[must_use]
    pub const fn email(&self) -> &Email {
        match self {
            Self::Buyer(buyer) => &buyer.email,
            Self::Supplier(supplier) => &supplier.email,
        }
    }

    /// Name shown in greetings and logs.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match self {
            Self::Buyer(buyer) => &buyer.full_name,
            Self::Supplier(supplier) => &supplier.business_name,
        }
    }
}

/// A shopper on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuyerProfile {
    pub full_name: String,
    pub phone: Phone,
    pub email: Email,
    pub delivery_address: String,
    pub payment_preference: PaymentPreference,
}

/// How a buyer prefers to pay on delivery orders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentPreference {
    /// Cash on delivery.
    Cod,
    /// Electronic funds transfer.
    Eft,
    /// SnapScan / Yoco card or QR payment.
    Snapscan,
}

impl std::str::FromStr for PaymentPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(Self::Cod),
            "eft" => Ok(Self::Eft),
            "snapscan" => Ok(Self::Snapscan),
            _ => Err(format!("unknown payment method: {s}")),
        }
    }
}

/// A business listing products on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupplierProfile {
    pub business_name: String,
    pub owner_name: String,
    pub phone: Phone,
    pub email: Email,
    pub business_address: String,
    pub category: SupplierCategory,
    pub banking_details: BankingDetails,
    pub registration_number: String,
}

/// Kind of business a supplier runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupplierCategory {
    Farmer,
    Baker,
    Butcher,
    Artisan,
    Other,
}

impl std::str::FromStr for SupplierCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "farmer" => Ok(Self::Farmer),
            "baker" => Ok(Self::Baker),
            "butcher" => Ok(Self::Butcher),
            "artisan" => Ok(Self::Artisan),
            "other" => Ok(Self::Other),
            _ => Err(format!("unknown business type: {s}")),
        }
    }
}

/// Where supplier payouts are sent.
///
/// Implements `Debug` manually so the account number never reaches logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankingDetails {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
}

impl BankingDetails {
    /// Account number with all but the last four digits hidden.
    #[must_use]
    pub fn masked_account_number(&self) -> String {
        let visible = self.account_number.len().saturating_sub(4);
        let tail = self.account_number.get(visible..).unwrap_or_default();
        format!("{}{tail}", "*".repeat(visible))
    }
}

impl std::fmt::Debug for BankingDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankingDetails")
            .field("bank_name", &self.bank_name)
            .field("account_holder", &self.account_holder)
            .field("account_number", &self.masked_account_number())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub fn buyer() -> RegistrantProfile {
        RegistrantProfile::Buyer(BuyerProfile {
            full_name: "John Doe".to_string(),
            phone: Phone::parse("0821234567").unwrap(),
            email: Email::parse("john@x.com").unwrap(),
            delivery_address: "12 Long Street, Cape Town".to_string(),
            payment_preference: PaymentPreference::Cod,
        })
    }

    pub fn supplier() -> RegistrantProfile {
        RegistrantProfile::Supplier(SupplierProfile {
            business_name: "Green Valley Farms".to_string(),
            owner_name: "Thandi Mokoena".to_string(),
            phone: Phone::parse("+27 72 555 0101").unwrap(),
            email: Email::parse("contact@greenvalley.farm").unwrap(),
            business_address: "123 Farm Rd, Stellenbosch".to_string(),
            category: SupplierCategory::Farmer,
            banking_details: BankingDetails {
                bank_name: "Capitec".to_string(),
                account_holder: "Green Valley Farms".to_string(),
                account_number: "1234567890".to_string(),
            },
            registration_number: "2019/123456/07".to_string(),
        })
    }

    #[test]
    fn test_role_follows_variant() {
        assert_eq!(buyer().role(), Role::Buyer);
        assert_eq!(supplier().role(), Role::Supplier);
    }

    #[test]
    fn test_serde_tags_role() {
        let json = serde_json::to_value(buyer()).unwrap();
        assert_eq!(json["role"], "buyer");
        assert_eq!(json["phone"], "0821234567");

        let back: RegistrantProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back, buyer());
    }

    #[test]
    fn test_banking_debug_is_masked() {
        let RegistrantProfile::Supplier(profile) = supplier() else {
            unreachable!()
        };
        let debug = format!("{:?}", profile.banking_details);
        assert!(debug.contains("******7890"));
        assert!(!debug.contains("1234567890"));
    }

    #[test]
    fn test_payment_preference_from_str() {
        assert_eq!(
            "snapscan".parse::<PaymentPreference>().unwrap(),
            PaymentPreference::Snapscan
        );
        assert!("bitcoin".parse::<PaymentPreference>().is_err());
    }
}
