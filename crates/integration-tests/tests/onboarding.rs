//! Registration through phone verification to a role-scoped session.

#![allow(clippy::unwrap_used)]

use shopdrop_core::{RegistrantKind, Role};
use shopdrop_integration_tests::{Harness, buyer_form, supplier_form};
use shopdrop_storefront::models::{Destination, RegistrantProfile};
use shopdrop_storefront::ports::{IdentityProvider, ProfileStore};
use shopdrop_storefront::services::ProvisionError;

#[tokio::test]
async fn test_buyer_walkthrough_lands_on_marketplace_home() {
    let harness = Harness::new();

    let (profile, credentials) = buyer_form().validate().unwrap();
    let provisioned = harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();

    let destination = provisioned.destination();
    assert_eq!(
        destination,
        Destination::VerifyOtp {
            kind: RegistrantKind::Customer,
            phone: provisioned.phone.clone(),
        }
    );
    assert_eq!(
        destination.path(),
        "/auth/verify-otp?type=customer&phone=0821234567"
    );

    let mut challenge = harness.gated_challenge().await;
    let handle = challenge
        .issue(&harness.phone, provisioned.phone.clone())
        .await
        .unwrap();
    let code = harness.code_for(&handle).await;
    let confirmed = challenge
        .confirm(&harness.phone, &handle, &code)
        .await
        .unwrap();
    assert!(confirmed.verified);

    let session = harness
        .establisher()
        .finalize(&confirmed, &provisioned.account_id)
        .await
        .unwrap();

    assert_eq!(session.role, Role::Buyer);
    assert_eq!(session.account_id, provisioned.account_id);
    assert_eq!(session.destination().token(), "marketplace-home");

    let stored = harness
        .profiles
        .load(&provisioned.account_id)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(stored.profile, RegistrantProfile::Buyer(ref b) if b.full_name == "John Doe"));
    assert_eq!(harness.identity.verification_emails_sent(), vec![provisioned.account_id]);
}

#[tokio::test]
async fn test_supplier_lands_on_dashboard() {
    let harness = Harness::with_fixed_code("424242");

    let (profile, credentials) = supplier_form().validate().unwrap();
    let provisioned = harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();
    assert_eq!(provisioned.role, Role::Supplier);
    assert_eq!(
        provisioned.destination().path(),
        "/auth/verify-otp?type=supplier&phone=27725550101"
    );

    let mut challenge = harness.gated_challenge().await;
    let handle = challenge
        .issue(&harness.phone, provisioned.phone.clone())
        .await
        .unwrap();
    let code = harness.code_for(&handle).await;
    let confirmed = challenge
        .confirm(&harness.phone, &handle, &code)
        .await
        .unwrap();

    let session = harness
        .establisher()
        .finalize(&confirmed, &provisioned.account_id)
        .await
        .unwrap();
    assert_eq!(session.role, Role::Supplier);
    assert_eq!(session.destination(), Destination::SupplierDashboard);
}

#[tokio::test]
async fn test_duplicate_email_is_a_conflict() {
    let harness = Harness::new();

    let (profile, credentials) = buyer_form().validate().unwrap();
    harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();

    let (profile, credentials) = buyer_form().validate().unwrap();
    let result = harness.provisioner().provision(profile, credentials).await;
    assert!(matches!(result, Err(ProvisionError::CredentialConflict)));
    assert_eq!(harness.profiles.len(), 1);
}

#[tokio::test]
async fn test_profile_store_outage_reports_partial_provision() {
    let harness = Harness::new();
    harness.profiles.set_unavailable(true);

    let (profile, credentials) = buyer_form().validate().unwrap();
    let result = harness.provisioner().provision(profile, credentials).await;

    let Err(ProvisionError::PartialProvisionFailure { account_id }) = result else {
        panic!("expected a partial provision failure, got {result:?}");
    };
    assert!(harness.profiles.is_empty());

    // The account exists even though the profile does not
    assert!(harness.identity.account(&account_id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_email_dispatch_failure_does_not_block_sign_up() {
    let harness = Harness::new();
    harness.identity.fail_email_dispatch(true);

    let (profile, credentials) = buyer_form().validate().unwrap();
    let provisioned = harness
        .provisioner()
        .provision(profile, credentials)
        .await
        .unwrap();

    assert_eq!(provisioned.role, Role::Buyer);
    assert!(harness.identity.verification_emails_sent().is_empty());
}

#[tokio::test]
async fn test_mismatched_passwords_never_reach_the_provider() {
    let mut form = buyer_form();
    form.confirm_password = "different1".to_string();

    let errors = form.validate().unwrap_err();
    assert!(errors.has("confirm_password"));
}
