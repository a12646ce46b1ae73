//! Challenge replacement, stale handles and attempt accounting.

#![allow(clippy::unwrap_used)]

use shopdrop_core::Phone;
use shopdrop_integration_tests::Harness;
use shopdrop_storefront::models::{ChallengeHandle, OtpCode};
use shopdrop_storefront::services::{VerificationChallenge, VerificationError};

fn phone() -> Phone {
    Phone::parse("0821234567").unwrap()
}

#[tokio::test]
async fn test_resend_invalidates_the_first_handle() {
    // Same code for both sends: only the handle decides
    let harness = Harness::with_fixed_code("111111");
    let code = OtpCode::parse("111111").unwrap();

    let mut challenge = harness.gated_challenge().await;
    let first = challenge.issue(&harness.phone, phone()).await.unwrap();
    let second = challenge.resend(&harness.phone, &first).await.unwrap();
    assert_ne!(first, second);

    let stale = challenge.confirm(&harness.phone, &first, &code).await;
    assert!(matches!(stale, Err(VerificationError::NoActiveChallenge)));

    let confirmed = challenge.confirm(&harness.phone, &second, &code).await.unwrap();
    assert_eq!(confirmed.phone, phone());
    assert_eq!(challenge.attempt_count(), 2);
    assert!(challenge.state().is_none());
}

#[tokio::test]
async fn test_incorrect_code_keeps_the_challenge() {
    let harness = Harness::with_fixed_code("123456");

    let mut challenge = harness.gated_challenge().await;
    let handle = challenge.issue(&harness.phone, phone()).await.unwrap();

    let wrong = challenge
        .confirm(&harness.phone, &handle, &OtpCode::parse("654321").unwrap())
        .await;
    assert!(matches!(wrong, Err(VerificationError::IncorrectCode)));
    assert_eq!(challenge.current_handle(), Some(&handle));

    challenge
        .confirm(&harness.phone, &handle, &OtpCode::parse("123456").unwrap())
        .await
        .unwrap();
    assert_eq!(challenge.attempt_count(), 2);
}

#[tokio::test]
async fn test_issue_requires_a_gate() {
    let harness = Harness::new();
    let mut challenge = VerificationChallenge::new();

    let result = challenge.issue(&harness.phone, phone()).await;
    assert!(matches!(result, Err(VerificationError::GateRequired)));
    assert!(harness.phone.sent_to().is_empty());
}

#[tokio::test]
async fn test_client_handle_by_id_confirms() {
    let harness = Harness::new();

    let mut challenge = harness.gated_challenge().await;
    let handle = challenge.issue(&harness.phone, phone()).await.unwrap();
    let code = harness.code_for(&handle).await;

    // The browser only ever sees the handle id
    let presented = ChallengeHandle::from_id(handle.id());
    assert!(challenge.confirm(&harness.phone, &presented, &code).await.is_ok());
}

#[tokio::test]
async fn test_gate_survives_confirmation() {
    let harness = Harness::new();

    let mut challenge = harness.gated_challenge().await;
    let gate_id = challenge.gate().unwrap().id();

    let handle = challenge.issue(&harness.phone, phone()).await.unwrap();
    let code = harness.code_for(&handle).await;
    challenge.confirm(&harness.phone, &handle, &code).await.unwrap();

    assert_eq!(challenge.gate().map(|g| g.id()), Some(gate_id));
    let again = challenge.confirm(&harness.phone, &handle, &code).await;
    assert!(matches!(again, Err(VerificationError::NoActiveChallenge)));
}

#[tokio::test]
async fn test_challenge_survives_a_session_round_trip() {
    let harness = Harness::with_fixed_code("222222");

    let mut challenge = harness.gated_challenge().await;
    let handle = challenge.issue(&harness.phone, phone()).await.unwrap();

    let stored = serde_json::to_value(&challenge).unwrap();
    let mut restored: VerificationChallenge = serde_json::from_value(stored).unwrap();

    restored
        .confirm(&harness.phone, &handle, &OtpCode::parse("222222").unwrap())
        .await
        .unwrap();
}
