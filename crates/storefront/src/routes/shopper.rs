//! Personal-shopper requests.
//!
//! Requests are validated and written to the log for the fulfilment team.
//! They are not stored.

use axum::{Json, http::StatusCode};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{Result, add_breadcrumb};
use crate::forms::PersonalShopperForm;

#[derive(Debug, Serialize)]
pub struct ShopperRequestResponse {
    pub request_id: Uuid,
}

/// POST /personal-shopper
///
/// # Errors
///
/// Returns field errors for invalid input.
#[instrument(skip_all)]
pub async fn request(
    Json(form): Json<PersonalShopperForm>,
) -> Result<(StatusCode, Json<ShopperRequestResponse>)> {
    let request = form.validate()?;

    tracing::info!(
        request_id = %request.id,
        budget = %request.budget,
        stores = ?request.preferred_stores,
        list_len = request.shopping_list.len(),
        "personal shopper request received"
    );
    add_breadcrumb("shopper", "Personal shopper request received", None);

    Ok((
        StatusCode::ACCEPTED,
        Json(ShopperRequestResponse {
            request_id: request.id,
        }),
    ))
}
