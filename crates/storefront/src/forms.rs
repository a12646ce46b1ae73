//! Registration and personal-shopper form validation.
//!
//! Raw form input is checked field by field before anything reaches the
//! provisioner. Failures are collected rather than short-circuited so the UI
//! can mark every bad field at once.

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use shopdrop_core::{Email, Phone, Price};

use crate::models::{
    BankingDetails, BuyerProfile, Credentials, PaymentPreference, PersonalShopperRequest,
    RegistrantProfile, SupplierCategory, SupplierProfile,
};

/// Minimum password length accepted by the registration forms.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Smallest personal-shopper budget, in rand.
pub const MIN_SHOPPER_BUDGET: Decimal = Decimal::from_parts(100, 0, 0, false, 0);

/// A validation failure attached to one form field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Every field-level failure for one form submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct FieldErrors {
    errors: Vec<FieldError>,
}

impl FieldErrors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether a failure was recorded for `field`.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// `Ok(value)` when nothing was recorded.
    ///
    /// # Errors
    ///
    /// Returns `self` if any failure was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }
}

/// Minimum trimmed length check.
pub(crate) fn min_chars(
    errors: &mut FieldErrors,
    field: &str,
    value: &str,
    min: usize,
    message: &str,
) -> String {
    let value = value.trim();
    if value.chars().count() < min {
        errors.push(field, message);
    }
    value.to_owned()
}

fn parse_field<T, E>(
    errors: &mut FieldErrors,
    field: &str,
    result: Result<T, E>,
    message: &str,
) -> Option<T> {
    result.map_err(|_| errors.push(field, message)).ok()
}

fn check_passwords(errors: &mut FieldErrors, password: &str, confirm: &str) {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LENGTH} characters"),
        );
    }
    if password != confirm {
        errors.push("confirm_password", "Passwords don't match");
    }
}

/// Sign-up form for buyers.
#[derive(Debug, Clone, Deserialize)]
pub struct BuyerRegistrationForm {
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub delivery_address: String,
    pub payment_preference: String,
    pub password: String,
    pub confirm_password: String,
}

impl BuyerRegistrationForm {
    /// Validate the form into a profile and sign-up credentials.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<(RegistrantProfile, Credentials), FieldErrors> {
        let mut errors = FieldErrors::new();

        let full_name = min_chars(
            &mut errors,
            "full_name",
            &self.full_name,
            2,
            "Full name must be at least 2 characters",
        );
        let phone = parse_field(
            &mut errors,
            "phone",
            Phone::parse(&self.phone),
            "Please enter a valid phone number",
        );
        let email = parse_field(
            &mut errors,
            "email",
            Email::parse(&self.email),
            "Please enter a valid email address",
        );
        let delivery_address = min_chars(
            &mut errors,
            "delivery_address",
            &self.delivery_address,
            10,
            "Please enter a complete delivery address",
        );
        let payment_preference = parse_field(
            &mut errors,
            "payment_preference",
            self.payment_preference.parse::<PaymentPreference>(),
            "Please select a payment method",
        );
        check_passwords(&mut errors, &self.password, &self.confirm_password);

        match (phone, email, payment_preference) {
            (Some(phone), Some(email), Some(payment_preference)) if errors.is_empty() => {
                let credentials = Credentials {
                    email: email.clone(),
                    password: SecretString::from(self.password),
                };
                let profile = RegistrantProfile::Buyer(BuyerProfile {
                    full_name,
                    phone,
                    email,
                    delivery_address,
                    payment_preference,
                });
                Ok((profile, credentials))
            }
            _ => Err(errors),
        }
    }
}

/// Payout account fields of the supplier form.
#[derive(Debug, Clone, Deserialize)]
pub struct BankingDetailsForm {
    pub bank_name: String,
    pub account_holder: String,
    pub account_number: String,
}

/// Sign-up form for suppliers.
#[derive(Debug, Clone, Deserialize)]
pub struct SupplierRegistrationForm {
    pub business_name: String,
    pub owner_name: String,
    pub phone: String,
    pub email: String,
    pub business_address: String,
    pub category: String,
    pub banking_details: BankingDetailsForm,
    pub registration_number: String,
    pub password: String,
    pub confirm_password: String,
}

impl SupplierRegistrationForm {
    /// Validate the form into a profile and sign-up credentials.
    ///
    /// # Errors
    ///
    /// Returns every failing field. Banking fields are reported as
    /// `banking_details.<field>`.
    pub fn validate(self) -> Result<(RegistrantProfile, Credentials), FieldErrors> {
        let mut errors = FieldErrors::new();

        let business_name = min_chars(
            &mut errors,
            "business_name",
            &self.business_name,
            2,
            "Business name must be at least 2 characters",
        );
        let owner_name = min_chars(
            &mut errors,
            "owner_name",
            &self.owner_name,
            2,
            "Owner name must be at least 2 characters",
        );
        let phone = parse_field(
            &mut errors,
            "phone",
            Phone::parse(&self.phone),
            "Please enter a valid phone number",
        );
        let email = parse_field(
            &mut errors,
            "email",
            Email::parse(&self.email),
            "Please enter a valid email address",
        );
        let business_address = min_chars(
            &mut errors,
            "business_address",
            &self.business_address,
            10,
            "Please enter a complete business address",
        );
        let category = parse_field(
            &mut errors,
            "category",
            self.category.parse::<SupplierCategory>(),
            "Please select a business type",
        );
        let banking_details = validate_banking(&mut errors, &self.banking_details);

        let registration_number = self.registration_number.trim().to_owned();
        if registration_number.is_empty() {
            errors.push(
                "registration_number",
                "Business registration number is required",
            );
        }
        check_passwords(&mut errors, &self.password, &self.confirm_password);

        match (phone, email, category) {
            (Some(phone), Some(email), Some(category)) if errors.is_empty() => {
                let credentials = Credentials {
                    email: email.clone(),
                    password: SecretString::from(self.password),
                };
                let profile = RegistrantProfile::Supplier(SupplierProfile {
                    business_name,
                    owner_name,
                    phone,
                    email,
                    business_address,
                    category,
                    banking_details,
                    registration_number,
                });
                Ok((profile, credentials))
            }
            _ => Err(errors),
        }
    }
}

fn validate_banking(errors: &mut FieldErrors, form: &BankingDetailsForm) -> BankingDetails {
    let bank_name = min_chars(
        errors,
        "banking_details.bank_name",
        &form.bank_name,
        2,
        "Bank name is required",
    );
    let account_holder = min_chars(
        errors,
        "banking_details.account_holder",
        &form.account_holder,
        2,
        "Account holder name is required",
    );

    let account_number: String = form
        .account_number
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    if !(6..=16).contains(&account_number.len())
        || !account_number.bytes().all(|b| b.is_ascii_digit())
    {
        errors.push(
            "banking_details.account_number",
            "Account number must be 6 to 16 digits",
        );
    }

    BankingDetails {
        bank_name,
        account_holder,
        account_number,
    }
}

/// Personal-shopper request form.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonalShopperForm {
    pub full_name: String,
    pub delivery_address: String,
    pub shopping_list: String,
    /// Comma-separated store names.
    pub preferred_stores: String,
    pub budget: Decimal,
}

impl PersonalShopperForm {
    /// Validate the form into a request with a fresh id.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(self) -> Result<PersonalShopperRequest, FieldErrors> {
        let mut errors = FieldErrors::new();

        let full_name = min_chars(
            &mut errors,
            "full_name",
            &self.full_name,
            2,
            "Full name must be at least 2 characters",
        );
        let delivery_address = min_chars(
            &mut errors,
            "delivery_address",
            &self.delivery_address,
            10,
            "Please enter a valid delivery address",
        );
        let shopping_list = min_chars(
            &mut errors,
            "shopping_list",
            &self.shopping_list,
            10,
            "Shopping list must contain at least one item",
        );

        let preferred_stores: Vec<String> = self
            .preferred_stores
            .split(',')
            .map(str::trim)
            .filter(|store| !store.is_empty())
            .map(str::to_owned)
            .collect();
        if self.preferred_stores.trim().chars().count() < 2 || preferred_stores.is_empty() {
            errors.push("preferred_stores", "Please enter at least one preferred store");
        }

        if self.budget < MIN_SHOPPER_BUDGET {
            errors.push("budget", format!("Budget must be at least R{MIN_SHOPPER_BUDGET}"));
        }

        errors.into_result(PersonalShopperRequest {
            id: Uuid::new_v4(),
            full_name,
            delivery_address,
            shopping_list,
            preferred_stores,
            budget: Price::new(self.budget),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use shopdrop_core::Role;

    use super::*;

    fn buyer_form() -> BuyerRegistrationForm {
        BuyerRegistrationForm {
            full_name: "John Doe".to_string(),
            phone: "0821234567".to_string(),
            email: "john@x.com".to_string(),
            delivery_address: "12 Long Street, Cape Town".to_string(),
            payment_preference: "cod".to_string(),
            password: "abcd1234".to_string(),
            confirm_password: "abcd1234".to_string(),
        }
    }

    fn supplier_form() -> SupplierRegistrationForm {
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
            password: "harvest2024".to_string(),
            confirm_password: "harvest2024".to_string(),
        }
    }

    #[test]
    fn test_valid_buyer_form() {
        let (profile, credentials) = buyer_form().validate().unwrap();
        assert_eq!(profile.role(), Role::Buyer);
        assert_eq!(profile.phone().as_str(), "0821234567");
        assert_eq!(credentials.email.as_str(), "john@x.com");
        assert_eq!(credentials.password.expose_secret(), "abcd1234");
    }

    #[test]
    fn test_buyer_form_collects_every_failure() {
        let form = BuyerRegistrationForm {
            full_name: "J".to_string(),
            phone: "12345".to_string(),
            email: "nope".to_string(),
            delivery_address: "short".to_string(),
            payment_preference: "bitcoin".to_string(),
            password: "abc".to_string(),
            confirm_password: "abd".to_string(),
        };
        let errors = form.validate().unwrap_err();
        for field in [
            "full_name",
            "phone",
            "email",
            "delivery_address",
            "payment_preference",
            "password",
            "confirm_password",
        ] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_password_mismatch_alone_fails() {
        let mut form = buyer_form();
        form.confirm_password = "abcd12345".to_string();
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.errors().len(), 1);
        assert!(errors.has("confirm_password"));
    }

    #[test]
    fn test_valid_supplier_form_normalizes_account_number() {
        let (profile, _) = supplier_form().validate().unwrap();
        let RegistrantProfile::Supplier(supplier) = profile else {
            panic!("expected supplier profile");
        };
        assert_eq!(supplier.banking_details.account_number, "1234567890");
        assert_eq!(supplier.phone.as_str(), "27725550101");
    }

    #[test]
    fn test_supplier_banking_errors_are_scoped() {
        let mut form = supplier_form();
        form.banking_details.account_number = "12AB".to_string();
        form.registration_number = "  ".to_string();
        let errors = form.validate().unwrap_err();
        assert!(errors.has("banking_details.account_number"));
        assert!(errors.has("registration_number"));
        assert!(!errors.has("banking_details.bank_name"));
    }

    fn shopper_form() -> PersonalShopperForm {
        PersonalShopperForm {
            full_name: "John Doe".to_string(),
            delivery_address: "12 Long Street, Cape Town".to_string(),
            shopping_list: "2 dozen free-range eggs, 1 sourdough loaf".to_string(),
            preferred_stores: "Woolworths, Checkers,".to_string(),
            budget: Decimal::new(1500, 0),
        }
    }

    #[test]
    fn test_valid_shopper_form() {
        let request = shopper_form().validate().unwrap();
        assert_eq!(request.preferred_stores, vec!["Woolworths", "Checkers"]);
        assert_eq!(request.budget.to_string(), "R1500.00");
    }

    #[test]
    fn test_shopper_budget_floor() {
        let mut form = shopper_form();
        form.budget = Decimal::new(9999, 2);
        let errors = form.validate().unwrap_err();
        assert!(errors.has("budget"));
        assert_eq!(errors.errors()[0].message, "Budget must be at least R100");

        let mut form = shopper_form();
        form.budget = MIN_SHOPPER_BUDGET;
        assert!(form.validate().is_ok());
    }

    #[test]
    fn test_shopper_form_collects_every_failure() {
        let form = PersonalShopperForm {
            full_name: " ".to_string(),
            delivery_address: "short".to_string(),
            shopping_list: "milk".to_string(),
            preferred_stores: " , ".to_string(),
            budget: Decimal::ZERO,
        };
        let errors = form.validate().unwrap_err();
        for field in [
            "full_name",
            "delivery_address",
            "shopping_list",
            "preferred_stores",
            "budget",
        ] {
            assert!(errors.has(field), "missing error for {field}");
        }
    }
}
