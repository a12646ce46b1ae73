//! Checkout route handler.

use axum::{Json, extract::State};
use tower_sessions::Session as BrowserSession;
use tracing::instrument;

use crate::error::Result;
use crate::routes::cart::{load_cart, save_cart};
use crate::services::{PaymentForm, PaymentResult};
use crate::state::AppState;

/// POST /checkout/pay
///
/// Charges the session's cart. The stored cart is only rewritten (emptied)
/// once the charge succeeds.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart, field errors for an
/// invalid payment form and `CheckoutError::Payment` if the charge fails.
#[instrument(skip_all)]
pub async fn pay(
    State(state): State<AppState>,
    browser: BrowserSession,
    Json(form): Json<PaymentForm>,
) -> Result<Json<PaymentResult>> {
    let mut cart = load_cart(&browser).await?;
    let result = state.checkout().pay(&mut cart, &form).await?;
    save_cart(&browser, &cart).await?;

    Ok(Json(result))
}
