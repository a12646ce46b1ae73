//! Cart route handlers.
//!
//! The [`CartLedger`] is stored in the browser session and rewritten after
//! every change.

use axum::Json;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tower_sessions::Session as BrowserSession;
use tracing::instrument;

use shopdrop_core::{Price, ProductId};

use crate::error::Result;
use crate::models::session_keys;
use crate::services::{CartLedger, CartLine};

pub(crate) async fn load_cart(browser: &BrowserSession) -> Result<CartLedger> {
    Ok(browser.get(session_keys::CART).await?.unwrap_or_default())
}

pub(crate) async fn save_cart(browser: &BrowserSession, cart: &CartLedger) -> Result<()> {
    browser.insert(session_keys::CART, cart).await?;
    Ok(())
}

// =============================================================================
// Views
// =============================================================================

#[derive(Debug, Serialize)]
pub struct CartLineView {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Price,
    pub quantity: u32,
    pub line_total: Price,
}

impl From<&CartLine> for CartLineView {
    fn from(line: &CartLine) -> Self {
        Self {
            product_id: line.product_id().clone(),
            name: line.name().to_owned(),
            unit_price: line.unit_price(),
            quantity: line.quantity(),
            line_total: line.line_total(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub total: Price,
    /// Total formatted for display, e.g. `R171.00`.
    pub total_display: String,
}

impl From<&CartLedger> for CartView {
    fn from(cart: &CartLedger) -> Self {
        let total = cart.total();
        Self {
            lines: cart.lines().iter().map(CartLineView::from).collect(),
            item_count: cart.item_count(),
            total,
            total_display: total.to_string(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// GET /cart
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn show(browser: BrowserSession) -> Result<Json<CartView>> {
    let cart = load_cart(&browser).await?;
    Ok(Json(CartView::from(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub name: String,
    pub unit_price: Decimal,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// POST /cart/add
///
/// # Errors
///
/// Returns `CartError` for a zero quantity, a negative price or an amount
/// past the cart limits.
#[instrument(skip_all, fields(product_id = %request.product_id))]
pub async fn add(
    browser: BrowserSession,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartView>> {
    let line = CartLine::new(
        request.product_id,
        request.name,
        Price::new(request.unit_price),
        request.quantity,
    )?;

    let mut cart = load_cart(&browser).await?;
    cart.add(line)?;
    save_cart(&browser, &cart).await?;

    Ok(Json(CartView::from(&cart)))
}

#[derive(Debug, Deserialize)]
pub struct RemoveFromCartRequest {
    pub product_id: ProductId,
}

/// POST /cart/remove
///
/// Removing a product that is not in the cart is a no-op.
///
/// # Errors
///
/// Returns an error if the session cannot be read or written.
#[instrument(skip_all, fields(product_id = %request.product_id))]
pub async fn remove(
    browser: BrowserSession,
    Json(request): Json<RemoveFromCartRequest>,
) -> Result<Json<CartView>> {
    let mut cart = load_cart(&browser).await?;
    if cart.remove(&request.product_id).is_some() {
        save_cart(&browser, &cart).await?;
    }
    Ok(Json(CartView::from(&cart)))
}

/// POST /cart/clear
///
/// # Errors
///
/// Returns an error if the session cannot be written.
#[instrument(skip_all)]
pub async fn clear(browser: BrowserSession) -> Result<Json<CartView>> {
    let cart = CartLedger::new();
    save_cart(&browser, &cart).await?;
    Ok(Json(CartView::from(&cart)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_view_totals() {
        let mut cart = CartLedger::new();
        cart.add(CartLine::new(ProductId::new("1"), "Farm Eggs", Price::from_cents(7200), 1).unwrap())
            .unwrap();
        cart.add(CartLine::new(ProductId::new("2"), "Sourdough", Price::from_cents(9900), 1).unwrap())
            .unwrap();

        let view = CartView::from(&cart);
        assert_eq!(view.lines.len(), 2);
        assert_eq!(view.item_count, 2);
        assert_eq!(view.total_display, "R171.00");
    }

    #[test]
    fn test_quantity_defaults_to_one() {
        let request: AddToCartRequest = serde_json::from_value(serde_json::json!({
            "product_id": "1",
            "name": "Farm Eggs",
            "unit_price": "72.00"
        }))
        .unwrap();
        assert_eq!(request.quantity, 1);
    }
}
