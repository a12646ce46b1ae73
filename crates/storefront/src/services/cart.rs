//! Cart ledger.
//!
//! The ordered line items selected in one browsing session. The ledger is
//! owned by the session and serialized into it between requests.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shopdrop_core::{Price, ProductId};

/// Largest accepted unit price, in rand.
pub const MAX_UNIT_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest quantity a single line may hold, merges included.
pub const MAX_LINE_QUANTITY: u32 = 999;

/// Largest number of distinct products in one cart.
pub const MAX_LINES: usize = 200;

/// Errors that can occur when building or changing a cart.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("unit price cannot be negative")]
    NegativePrice,

    #[error("amount is larger than the cart accepts")]
    AmountTooLarge,

    #[error("quantity cannot exceed {MAX_LINE_QUANTITY} per product")]
    QuantityTooLarge,

    #[error("the cart cannot hold more than {MAX_LINES} products")]
    CartFull,
}

/// One product in the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    product_id: ProductId,
    name: String,
    unit_price: Price,
    quantity: u32,
}

impl CartLine {
    /// Build a line.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ZeroQuantity` for a zero quantity,
    /// `CartError::NegativePrice` for a negative unit price,
    /// `CartError::QuantityTooLarge` above [`MAX_LINE_QUANTITY`] and
    /// `CartError::AmountTooLarge` for a unit price above [`MAX_UNIT_PRICE`].
    pub fn new(
        product_id: ProductId,
        name: impl Into<String>,
        unit_price: Price,
        quantity: u32,
    ) -> Result<Self, CartError> {
        if quantity == 0 {
            return Err(CartError::ZeroQuantity);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CartError::QuantityTooLarge);
        }
        if unit_price.is_negative() {
            return Err(CartError::NegativePrice);
        }
        if unit_price.amount > MAX_UNIT_PRICE {
            return Err(CartError::AmountTooLarge);
        }
        unit_price
            .checked_mul(quantity)
            .ok_or(CartError::AmountTooLarge)?;
        Ok(Self {
            product_id,
            name: name.into(),
            unit_price,
            quantity,
        })
    }

    #[must_use]
    pub const fn product_id(&self) -> &ProductId {
        &self.product_id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn unit_price(&self) -> Price {
        self.unit_price
    }

    #[must_use]
    pub const fn quantity(&self) -> u32 {
        self.quantity
    }

    /// `unit_price × quantity`. Bounded by the limits checked in
    /// [`CartLine::new`] and [`CartLedger::add`].
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price * self.quantity
    }
}

/// Ordered collection of cart lines, at most one per product.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLedger {
    lines: Vec<CartLine>,
}

impl CartLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line. A product already in the cart keeps its position, name
    /// and unit price, and its quantity grows by `line.quantity`.
    ///
    /// The cart is unchanged when an error is returned.
    ///
    /// # Errors
    ///
    /// Returns `CartError::QuantityTooLarge` if the merged quantity would
    /// exceed [`MAX_LINE_QUANTITY`] and `CartError::CartFull` if a new
    /// product would exceed [`MAX_LINES`].
    pub fn add(&mut self, line: CartLine) -> Result<(), CartError> {
        let line_count = self.lines.len();
        match self
            .lines
            .iter_mut()
            .find(|existing| existing.product_id == line.product_id)
        {
            Some(existing) => {
                let quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .filter(|q| *q <= MAX_LINE_QUANTITY)
                    .ok_or(CartError::QuantityTooLarge)?;
                existing.quantity = quantity;
            }
            None if line_count >= MAX_LINES => return Err(CartError::CartFull),
            None => self.lines.push(line),
        }
        Ok(())
    }

    /// Remove the line for `product_id`, returning it if present.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<CartLine> {
        let index = self
            .lines
            .iter()
            .position(|line| &line.product_id == product_id)?;
        Some(self.lines.remove(index))
    }

    /// Remove every line. Clearing an empty cart does nothing.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Sum of line totals, recomputed from the current lines.
    #[must_use]
    pub fn total(&self) -> Price {
        self.lines.iter().map(CartLine::line_total).sum()
    }

    /// Lines in insertion order.
    #[must_use]
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.lines
            .iter()
            .fold(0_u32, |count, line| count.saturating_add(line.quantity))
    }
}
