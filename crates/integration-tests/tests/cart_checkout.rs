//! Cart totals and payment.

#![allow(clippy::unwrap_used)]

use shopdrop_core::{Price, ProductId};
use shopdrop_integration_tests::{Harness, line};
use shopdrop_storefront::services::{CartLedger, CheckoutError, PaymentForm};

fn payment_form() -> PaymentForm {
    PaymentForm {
        name: "John Doe".to_string(),
        address: "12 Long Street, Cape Town".to_string(),
        card_number: "4111 1111 1111 1111".to_string(),
        expiry: "12/29".to_string(),
        cvv: "123".to_string(),
    }
}

#[tokio::test]
async fn test_eggs_and_sourdough_charge_171() {
    let harness = Harness::new();

    let mut cart = CartLedger::new();
    cart.add(line("1", "Farm Eggs", 7200, 1)).unwrap();
    cart.add(line("2", "Sourdough Bread", 9900, 1)).unwrap();
    assert_eq!(cart.total().to_string(), "R171.00");

    let result = harness.checkout().pay(&mut cart, &payment_form()).await.unwrap();

    assert!(result.success);
    assert_eq!(result.amount_charged, Price::from_cents(17100));
    assert!(cart.is_empty());

    let charges = harness.payments.charges();
    assert_eq!(charges.len(), 1);
    assert_eq!(charges.first().unwrap().card_last4, "1111");
}

#[tokio::test]
async fn test_same_product_merges_into_one_line() {
    let mut cart = CartLedger::new();
    cart.add(line("1", "Farm Eggs", 7200, 1)).unwrap();
    cart.add(line("2", "Sourdough Bread", 9900, 1)).unwrap();
    cart.add(line("1", "Farm Eggs", 7200, 2)).unwrap();

    assert_eq!(cart.lines().len(), 2);
    assert_eq!(cart.item_count(), 4);
    assert_eq!(cart.total(), Price::from_cents(7200 * 3 + 9900));

    cart.remove(&ProductId::new("1"));
    assert_eq!(cart.total(), Price::from_cents(9900));
}

#[tokio::test]
async fn test_empty_cart_is_refused() {
    let harness = Harness::new();
    let mut cart = CartLedger::new();

    let result = harness.checkout().pay(&mut cart, &payment_form()).await;
    assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    assert!(harness.payments.charges().is_empty());
}

#[tokio::test]
async fn test_invalid_card_leaves_cart_untouched() {
    let harness = Harness::new();
    let mut cart = CartLedger::new();
    cart.add(line("1", "Farm Eggs", 7200, 1)).unwrap();

    let mut form = payment_form();
    form.card_number = "4111".to_string();
    form.cvv = "1".to_string();

    let Err(CheckoutError::Validation(errors)) = harness.checkout().pay(&mut cart, &form).await
    else {
        panic!("expected validation errors");
    };
    assert!(errors.has("card_number"));
    assert!(errors.has("cvv"));
    assert_eq!(cart.lines().len(), 1);
    assert!(harness.payments.charges().is_empty());
}
