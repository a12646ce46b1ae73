//! Checkout.
//!
//! Validates the payment form, authorizes the cart total and clears the cart
//! once the charge is approved.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use shopdrop_core::Price;

use super::cart::CartLedger;
use crate::forms::{FieldErrors, min_chars};
use crate::ports::{PaymentAuthority, PaymentError, PaymentRequest};

/// `MM/YY` or `MM/YYYY`; the slash is optional.
static EXPIRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(0[1-9]|1[0-2])/?([0-9]{4}|[0-9]{2})$").expect("Invalid regex")
});

/// Errors that can occur at checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to pay for.
    #[error("your cart is empty")]
    EmptyCart,

    /// The payment form failed validation.
    #[error("payment details are invalid: {0}")]
    Validation(FieldErrors),

    /// The payment authority refused or failed the charge.
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

/// Payment details as submitted.
#[derive(Clone, Deserialize)]
pub struct PaymentForm {
    pub name: String,
    pub address: String,
    pub card_number: String,
    pub expiry: String,
    pub cvv: String,
}

impl std::fmt::Debug for PaymentForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaymentForm")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("card_number", &"[REDACTED]")
            .field("expiry", &self.expiry)
            .field("cvv", &"[REDACTED]")
            .finish()
    }
}

/// A payment form that passed validation. Keeps only what the authority
/// needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPayment {
    pub cardholder: String,
    pub address: String,
    pub card_last4: String,
}

impl PaymentForm {
    /// Validate every field.
    ///
    /// # Errors
    ///
    /// Returns every failing field.
    pub fn validate(&self) -> Result<ValidatedPayment, FieldErrors> {
        let mut errors = FieldErrors::new();

        let cardholder = min_chars(
            &mut errors,
            "name",
            &self.name,
            2,
            "Name must be at least 2 characters",
        );
        let address = min_chars(
            &mut errors,
            "address",
            &self.address,
            5,
            "Address must be at least 5 characters",
        );

        let card_number: String = self
            .card_number
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect();
        if card_number.len() != 16 || !card_number.bytes().all(|b| b.is_ascii_digit()) {
            errors.push("card_number", "Card number must be 16 digits");
        }

        if !EXPIRY_RE.is_match(self.expiry.trim()) {
            errors.push("expiry", "Expiry date must be in MM/YY or MM/YYYY format");
        }

        let cvv = self.cvv.trim();
        if !(3..=4).contains(&cvv.len()) || !cvv.bytes().all(|b| b.is_ascii_digit()) {
            errors.push("cvv", "CVV must be 3 or 4 digits");
        }

        let card_last4 = card_number
            .get(card_number.len().saturating_sub(4)..)
            .unwrap_or_default()
            .to_owned();

        errors.into_result(ValidatedPayment {
            cardholder,
            address,
            card_last4,
        })
    }
}

/// Outcome of a successful payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentResult {
    pub success: bool,
    /// The cart total at the moment of the charge.
    pub amount_charged: Price,
    pub reference: Uuid,
}

/// Pays for a cart.
pub struct CheckoutProcess<'a> {
    payments: &'a dyn PaymentAuthority,
}

impl<'a> CheckoutProcess<'a> {
    #[must_use]
    pub const fn new(payments: &'a dyn PaymentAuthority) -> Self {
        Self { payments }
    }

    /// Charge the cart total and clear the cart.
    ///
    /// The cart is only cleared after the charge is approved. On any error it
    /// is left exactly as it was.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` if the cart has no lines.
    /// Returns `CheckoutError::Validation` if the form is invalid; the payment
    /// authority is not contacted.
    /// Returns `CheckoutError::Payment` if the charge is refused.
    #[instrument(skip_all, fields(lines = cart.lines().len()))]
    pub async fn pay(
        &self,
        cart: &mut CartLedger,
        form: &PaymentForm,
    ) -> Result<PaymentResult, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let payment = form.validate().map_err(CheckoutError::Validation)?;

        let amount = cart.total();
        let request = PaymentRequest {
            amount,
            cardholder: payment.cardholder,
            card_last4: payment.card_last4,
        };
        let authorization = self.payments.authorize(&request).await?;

        cart.clear();
        tracing::info!(%amount, reference = %authorization.reference, "order paid");

        Ok(PaymentResult {
            success: true,
            amount_charged: amount,
            reference: authorization.reference,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use shopdrop_core::ProductId;

    use super::*;
    use crate::ports::PaymentAuthorization;
    use crate::ports::memory::SimulatedPaymentAuthority;
    use crate::services::cart::CartLine;

    struct DecliningAuthority;

    #[async_trait]
    impl PaymentAuthority for DecliningAuthority {
        async fn authorize(
            &self,
            _request: &PaymentRequest,
        ) -> Result<PaymentAuthorization, PaymentError> {
            Err(PaymentError::Declined("insufficient funds".to_string()))
        }
    }

    fn form() -> PaymentForm {
        PaymentForm {
            name: "John Doe".to_string(),
            address: "12 Long Street".to_string(),
            card_number: "4111 1111 1111 1111".to_string(),
            expiry: "09/27".to_string(),
            cvv: "123".to_string(),
        }
    }

    fn cart() -> CartLedger {
        let mut cart = CartLedger::new();
        for (id, rand) in [("eggs", 72), ("honey", 99)] {
            cart.add(
                CartLine::new(ProductId::new(id), id, Price::new(Decimal::from(rand)), 1).unwrap(),
            )
            .unwrap();
        }
        cart
    }

    #[tokio::test]
    async fn test_pay_charges_total_and_clears() {
        let authority = SimulatedPaymentAuthority::new(Duration::ZERO);
        let mut cart = cart();

        let result = CheckoutProcess::new(&authority)
            .pay(&mut cart, &form())
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.amount_charged, Price::new(Decimal::from(171)));
        assert!(cart.lines().is_empty());

        let charges = authority.charges();
        assert_eq!(charges.len(), 1);
        assert_eq!(charges[0].card_last4, "1111");
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected() {
        let authority = SimulatedPaymentAuthority::new(Duration::ZERO);
        let mut cart = CartLedger::new();

        let result = CheckoutProcess::new(&authority).pay(&mut cart, &form()).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(cart, CartLedger::new());
        assert!(authority.charges().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_form_never_reaches_authority() {
        let authority = SimulatedPaymentAuthority::new(Duration::ZERO);
        let mut cart = cart();
        let mut bad = form();
        bad.card_number = "4111".to_string();

        let result = CheckoutProcess::new(&authority).pay(&mut cart, &bad).await;

        let Err(CheckoutError::Validation(errors)) = result else {
            panic!("expected validation error");
        };
        assert!(errors.has("card_number"));
        assert!(authority.charges().is_empty());
        assert_eq!(cart.lines().len(), 2);
    }

    #[tokio::test]
    async fn test_declined_payment_keeps_cart() {
        let mut cart = cart();

        let result = CheckoutProcess::new(&DecliningAuthority)
            .pay(&mut cart, &form())
            .await;

        assert!(matches!(
            result,
            Err(CheckoutError::Payment(PaymentError::Declined(_)))
        ));
        assert_eq!(cart.total(), Price::new(Decimal::from(171)));
    }

    #[test]
    fn test_expiry_formats() {
        for ok in ["09/27", "12/2030", "0127"] {
            let mut f = form();
            f.expiry = ok.to_string();
            assert!(f.validate().is_ok(), "{ok} should be accepted");
        }
        for bad in ["13/27", "00/27", "9/27", "09/275"] {
            let mut f = form();
            f.expiry = bad.to_string();
            assert!(f.validate().unwrap_err().has("expiry"), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_cvv_and_name() {
        let mut f = form();
        f.cvv = "12".to_string();
        f.name = "J".to_string();
        f.address = "abc".to_string();
        let errors = f.validate().unwrap_err();
        assert!(errors.has("cvv"));
        assert!(errors.has("name"));
        assert!(errors.has("address"));
    }
}
