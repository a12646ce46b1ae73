//! Handler tests against the in-memory ports and an in-memory session store.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, extract::State, http::StatusCode};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower_sessions::{MemoryStore, Session as BrowserSession};
use uuid::Uuid;

use shopdrop_core::{ProductId, Role};

use super::{auth, cart, email, otp, shopper};
use crate::config::StorefrontConfig;
use crate::forms::BuyerRegistrationForm;
use crate::models::session_keys;
use crate::ports::memory::{
    DevPhoneChannel, InMemoryIdentityProvider, InMemoryProfileStore, SimulatedPaymentAuthority,
};
use crate::services::{CartLedger, ProvisionResult, VerificationChallenge};
use crate::state::{AppState, Ports};

const CODE: &str = "123456";

struct TestApp {
    state: AppState,
    identity: Arc<InMemoryIdentityProvider>,
}

fn app() -> TestApp {
    let identity = Arc::new(InMemoryIdentityProvider::new());
    let ports = Ports {
        identity: identity.clone(),
        phone: Arc::new(DevPhoneChannel::with_fixed_code(CODE)),
        profiles: Arc::new(InMemoryProfileStore::new()),
        payments: Arc::new(SimulatedPaymentAuthority::new(Duration::ZERO)),
    };
    let pool = PgPool::connect_lazy("postgres://localhost/shopdrop_test").unwrap();

    TestApp {
        state: AppState::with_ports(StorefrontConfig::for_tests(), pool, ports),
        identity,
    }
}

fn browser() -> BrowserSession {
    BrowserSession::new(None, Arc::new(MemoryStore::default()), None)
}

fn buyer_form() -> BuyerRegistrationForm {
    BuyerRegistrationForm {
        full_name: "John Doe".to_string(),
        phone: "0821234567".to_string(),
        email: "john@x.com".to_string(),
        delivery_address: "12 Long Street, Cape Town".to_string(),
        payment_preference: "cod".to_string(),
        password: "secret12".to_string(),
        confirm_password: "secret12".to_string(),
    }
}

async fn register(app: &TestApp, browser: &BrowserSession) -> ProvisionResult {
    let (status, _) = auth::register_buyer(
        State(app.state.clone()),
        browser.clone(),
        Json(buyer_form()),
    )
    .await
    .unwrap();
    assert_eq!(status, StatusCode::CREATED);

    browser
        .get(session_keys::PENDING_VERIFICATION)
        .await
        .unwrap()
        .unwrap()
}

/// Register, pass the gate and send a challenge. Returns the handle id.
async fn challenged(app: &TestApp, browser: &BrowserSession) -> Uuid {
    register(app, browser).await;
    otp::gate(
        State(app.state.clone()),
        browser.clone(),
        Json(otp::GateRequest {
            token: "widget-token".to_string(),
        }),
    )
    .await
    .unwrap();

    otp::send(State(app.state.clone()), browser.clone())
        .await
        .unwrap()
        .handle_id
}

async fn stored_challenge(browser: &BrowserSession) -> Option<VerificationChallenge> {
    browser.get(session_keys::PHONE_CHALLENGE).await.unwrap()
}

fn verify_request(handle_id: Uuid, code: &str) -> Json<otp::VerifyRequest> {
    Json(otp::VerifyRequest {
        handle_id,
        code: code.to_string(),
    })
}

// =============================================================================
// Phone verification
// =============================================================================

#[tokio::test]
async fn test_send_without_pending_registration_is_unauthorized() {
    let app = app();
    let browser = browser();

    let err = otp::send(State(app.state.clone()), browser.clone())
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(err.code(), "unauthorized");
    assert!(stored_challenge(&browser).await.is_none());
}

#[tokio::test]
async fn test_send_before_gate_is_refused() {
    let app = app();
    let browser = browser();
    register(&app, &browser).await;

    let err = otp::send(State(app.state.clone()), browser.clone())
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::PRECONDITION_REQUIRED);
    assert_eq!(err.code(), "gate_required");
}

#[tokio::test]
async fn test_failed_verify_keeps_attempt_count() {
    let app = app();
    let browser = browser();
    let handle_id = challenged(&app, &browser).await;

    let err = otp::verify(
        State(app.state.clone()),
        browser.clone(),
        verify_request(handle_id, "654321"),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "incorrect_code");

    let challenge = stored_challenge(&browser).await.unwrap();
    assert_eq!(challenge.attempt_count(), 1);
    assert_eq!(challenge.current_handle().unwrap().id(), handle_id);

    let session = otp::verify(
        State(app.state.clone()),
        browser.clone(),
        verify_request(handle_id, CODE),
    )
    .await
    .unwrap();
    assert_eq!(session.role, Role::Buyer);
    assert_eq!(stored_challenge(&browser).await.unwrap().attempt_count(), 2);
}

#[tokio::test]
async fn test_malformed_code_is_not_an_attempt() {
    let app = app();
    let browser = browser();
    let handle_id = challenged(&app, &browser).await;

    let err = otp::verify(
        State(app.state.clone()),
        browser.clone(),
        verify_request(handle_id, "12ab"),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(stored_challenge(&browser).await.unwrap().attempt_count(), 0);
}

#[tokio::test]
async fn test_verify_establishes_session_and_drops_pending() {
    let app = app();
    let browser = browser();
    let handle_id = challenged(&app, &browser).await;

    otp::verify(
        State(app.state.clone()),
        browser.clone(),
        verify_request(handle_id, CODE),
    )
    .await
    .unwrap();

    let pending: Option<ProvisionResult> = browser
        .get(session_keys::PENDING_VERIFICATION)
        .await
        .unwrap();
    assert!(pending.is_none());
    assert!(
        crate::middleware::current_session(&browser)
            .await
            .unwrap()
            .is_some()
    );
}

// =============================================================================
// Sign-out
// =============================================================================

#[tokio::test]
async fn test_sign_out_discards_challenge_gate_and_cart() {
    let app = app();
    let browser = browser();
    challenged(&app, &browser).await;
    cart::add(
        browser.clone(),
        Json(cart::AddToCartRequest {
            product_id: ProductId::new("eggs"),
            name: "Farm Eggs".to_string(),
            unit_price: Decimal::new(7200, 2),
            quantity: 2,
        }),
    )
    .await
    .unwrap();
    assert!(stored_challenge(&browser).await.unwrap().gate().is_some());

    let status = auth::sign_out(browser.clone()).await.unwrap();
    assert_eq!(status, StatusCode::NO_CONTENT);

    assert!(stored_challenge(&browser).await.is_none());
    let saved_cart: Option<CartLedger> = browser.get(session_keys::CART).await.unwrap();
    assert!(saved_cart.is_none());
    assert!(cart::show(browser.clone()).await.unwrap().lines.is_empty());

    let err = otp::send(State(app.state.clone()), browser.clone())
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Email verification
// =============================================================================

#[tokio::test]
async fn test_email_resend_and_verify() {
    let app = app();
    let browser = browser();
    let pending = register(&app, &browser).await;

    let resent = email::resend(State(app.state.clone()), browser.clone())
        .await
        .unwrap();
    assert!(resent.sent);
    assert_eq!(app.identity.verification_emails_sent().len(), 2);

    let token = app.identity.latest_email_token(&pending.account_id).unwrap();
    let verified = email::verify(
        State(app.state.clone()),
        Json(email::VerifyEmailRequest { token }),
    )
    .await
    .unwrap();
    assert_eq!(verified.account_id, pending.account_id);
    assert!(verified.email_verified);

    let err = email::verify(
        State(app.state.clone()),
        Json(email::VerifyEmailRequest { token }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    assert_eq!(err.code(), "invalid_email_token");
}

#[tokio::test]
async fn test_email_resend_needs_an_account() {
    let app = app();

    let err = email::resend(State(app.state.clone()), browser())
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Personal shopper
// =============================================================================

#[tokio::test]
async fn test_personal_shopper_request_is_accepted() {
    let (status, response) = shopper::request(Json(crate::forms::PersonalShopperForm {
        full_name: "John Doe".to_string(),
        delivery_address: "12 Long Street, Cape Town".to_string(),
        shopping_list: "2 dozen free-range eggs".to_string(),
        preferred_stores: "Woolworths".to_string(),
        budget: Decimal::new(1500, 0),
    }))
    .await
    .unwrap();

    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(!response.request_id.is_nil());
}

#[tokio::test]
async fn test_personal_shopper_budget_below_floor_is_unprocessable() {
    let err = shopper::request(Json(crate::forms::PersonalShopperForm {
        full_name: "John Doe".to_string(),
        delivery_address: "12 Long Street, Cape Town".to_string(),
        shopping_list: "2 dozen free-range eggs".to_string(),
        preferred_stores: "Woolworths".to_string(),
        budget: Decimal::new(50, 0),
    }))
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
