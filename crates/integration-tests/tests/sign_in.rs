//! Credential sign-in and the verification policy.

#![allow(clippy::unwrap_used)]

use secrecy::SecretString;
use shopdrop_core::Role;
use shopdrop_integration_tests::{Harness, PASSWORD, buyer_form, supplier_form};
use shopdrop_storefront::services::{AuthError, VerificationPolicy};

fn password(s: &str) -> SecretString {
    SecretString::from(s.to_owned())
}

async fn registered(harness: &Harness) {
    let (profile, credentials) = supplier_form().validate().unwrap();
    harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_email_sign_in_is_role_scoped() {
    let harness = Harness::new();
    registered(&harness).await;

    let session = harness
        .establisher()
        .sign_in("contact@greenvalley.farm", &password(PASSWORD))
        .await
        .unwrap();

    assert_eq!(session.role, Role::Supplier);
    assert_eq!(session.destination().token(), "supplier-dashboard");
}

#[tokio::test]
async fn test_phone_identifier_is_refused() {
    let harness = Harness::new();
    registered(&harness).await;

    let result = harness
        .establisher()
        .sign_in("+27 72 555 0101", &password(PASSWORD))
        .await;
    assert!(matches!(result, Err(AuthError::InvalidCredential)));
}

#[tokio::test]
async fn test_unknown_email_and_wrong_password_look_alike() {
    let harness = Harness::new();
    registered(&harness).await;

    let unknown = harness
        .establisher()
        .sign_in("nobody@x.com", &password(PASSWORD))
        .await;
    let wrong = harness
        .establisher()
        .sign_in("contact@greenvalley.farm", &password("wrongpass1"))
        .await;

    assert!(matches!(unknown, Err(AuthError::InvalidCredential)));
    assert!(matches!(wrong, Err(AuthError::InvalidCredential)));
}

#[tokio::test]
async fn test_strict_policy_waits_for_email_confirmation() {
    let mut harness = Harness::new();
    harness.policy = VerificationPolicy {
        require_email_verified: true,
    };

    let (profile, credentials) = buyer_form().validate().unwrap();
    let provisioned = harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();

    let before = harness
        .establisher()
        .sign_in("john@x.com", &password(PASSWORD))
        .await;
    assert!(matches!(before, Err(AuthError::EmailNotVerified)));

    let token = harness
        .identity
        .latest_email_token(&provisioned.account_id)
        .unwrap();
    harness.email_confirmation().confirm(token).await.unwrap();
    let after = harness
        .establisher()
        .sign_in("john@x.com", &password(PASSWORD))
        .await
        .unwrap();
    assert_eq!(after.role, Role::Buyer);
}

#[tokio::test]
async fn test_spent_email_link_is_refused() {
    let harness = Harness::new();
    let (profile, credentials) = buyer_form().validate().unwrap();
    let provisioned = harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();

    let first = harness
        .identity
        .latest_email_token(&provisioned.account_id)
        .unwrap();
    harness.email_confirmation().confirm(first).await.unwrap();

    assert!(matches!(
        harness.email_confirmation().confirm(first).await,
        Err(AuthError::InvalidEmailToken)
    ));
    assert!(!harness
        .email_confirmation()
        .resend(&provisioned.account_id)
        .await
        .unwrap());
}
