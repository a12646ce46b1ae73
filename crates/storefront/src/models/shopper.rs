//! Personal-shopper requests.

use serde::Serialize;
use uuid::Uuid;

use shopdrop_core::Price;

/// A validated request for someone to shop on the buyer's behalf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonalShopperRequest {
    pub id: Uuid,
    pub full_name: String,
    pub delivery_address: String,
    pub shopping_list: String,
    /// Stores in the order the buyer listed them.
    pub preferred_stores: Vec<String>,
    pub budget: Price,
}
