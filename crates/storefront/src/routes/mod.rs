//! HTTP route handlers for storefront.
//!
//! Every route speaks JSON. Handlers only move data between the browser
//! session and the services; rendering is left to the client, which
//! navigates to the `destination`/`path` pair a response carries.
//!
//! # Route Structure
//!
//! ```text
//! # Auth
//! POST /auth/register/buyer    - Validate form, provision, hand off to verify-otp
//! POST /auth/register/supplier - Same for suppliers
//! POST /auth/sign-in           - Email + password sign-in
//! POST /auth/sign-out          - End the browser session
//! GET  /auth/session           - Current role-scoped session
//! POST /auth/email/resend      - Mail a fresh email-verification link
//! POST /auth/email/verify      - Redeem an email-verification token
//!
//! # Phone verification
//! POST /auth/otp/gate          - Establish the human-verification gate
//! POST /auth/otp/send          - Issue a challenge to the pending registrant
//! POST /auth/otp/resend        - Replace the held challenge
//! POST /auth/otp/verify        - Confirm the code and establish the session
//!
//! # Cart
//! GET  /cart                   - Lines and total
//! POST /cart/add               - Add a product (merges by product id)
//! POST /cart/remove            - Remove a product
//! POST /cart/clear             - Empty the cart
//!
//! # Checkout
//! POST /checkout/pay           - Charge the cart total and clear the cart
//!
//! # Personal shopper
//! POST /personal-shopper       - Validate and log a personal-shopper request
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod email;
pub mod otp;
pub mod shopper;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests;

use axum::{
    Router,
    routing::{get, post},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter, otp_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let limited = Router::new()
        .route("/register/buyer", post(auth::register_buyer))
        .route("/register/supplier", post(auth::register_supplier))
        .route("/sign-in", post(auth::sign_in))
        .route("/email/resend", post(email::resend))
        .route("/email/verify", post(email::verify))
        .layer(auth_rate_limiter());

    Router::new()
        .merge(limited)
        .route("/sign-out", post(auth::sign_out))
        .route("/session", get(auth::current_session))
        .nest("/otp", otp_routes())
}

/// Create the phone verification routes router.
pub fn otp_routes() -> Router<AppState> {
    Router::new()
        .route("/gate", post(otp::gate))
        .route("/send", post(otp::send))
        .route("/resend", post(otp::resend))
        .route("/verify", post(otp::verify))
        .layer(otp_rate_limiter())
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .layer(api_rate_limiter())
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/pay", post(checkout::pay))
        .layer(api_rate_limiter())
}

/// Create the personal-shopper routes router.
pub fn shopper_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(shopper::request))
        .layer(api_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth_routes())
        .nest("/cart", cart_routes())
        .nest("/checkout", checkout_routes())
        .nest("/personal-shopper", shopper_routes())
}
