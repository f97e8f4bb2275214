//! Listing handlers: classified ads for used iPhones
//!
//! Creation runs the IMEI verification and fills the device fields; reads
//! maintain the per-viewer 24h-deduplicated view counter.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use tracing::{info, warn};

use crate::entities::{listing_views, listings, prelude::*, users};
use crate::models::listing::{
    CreateListingRequest, DirectUploadResponse, ListingQuery, ListingResponse, ListingsFilter,
    ListingsResponse, UpdateListingRequest,
};
use crate::models::user::ErrorResponse;
use crate::services::auth::{optional_user, require_user};
use crate::AppState;

use super::{bad_request, db_error, forbidden, not_found};

const IMEI_LENGTH: usize = 15;
const MAX_DESCRIPTION_LENGTH: usize = 1000;
const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

/// GET /api/v1/r2_link
///
/// Asks Cloudflare Images for a one-time direct-upload URL. The client
/// uploads the file straight to Cloudflare and assembles the public URL
/// as `{image_delivery_base}/{image_id}/public`.
pub async fn direct_upload_link(
    State(state): State<AppState>,
) -> Result<Json<DirectUploadResponse>, (StatusCode, Json<ErrorResponse>)> {
    if !state.cloudflare.is_configured() {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Cloudflare API is not configured".to_string(),
            }),
        ));
    }

    let upload = state.cloudflare.request_direct_upload().await.map_err(|e| {
        warn!(error = %e, "Cloudflare direct-upload request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Cloudflare API error: {}", e),
            }),
        )
    })?;

    Ok(Json(DirectUploadResponse {
        upload_url: upload.upload_url,
        account_hash: state.cloudflare.account_hash().unwrap_or_default().to_string(),
        image_delivery_base: state.cloudflare.image_delivery_base().unwrap_or_default(),
    }))
}

/// POST /api/v1/iphone
pub async fn create_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), (StatusCode, Json<ErrorResponse>)> {
    let current = require_user(&headers, &state.config.secret_key)?;

    validate_listing_request(&payload)?;

    // Device verification; a provider outage degrades to an unverified ad
    let device = if state.imei.is_configured() {
        match state.imei.check_imei(&payload.imei).await {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(imei = %payload.imei, error = %e, "IMEI lookup failed, listing stays unverified");
                None
            }
        }
    } else {
        None
    };

    let mut new_listing = listings::ActiveModel {
        author_id: Set(current.user_id),
        active: Set(true),
        view_count: Set(0),
        imei: Set(payload.imei.clone()),
        battery: Set(payload.battery),
        price: Set(payload.price),
        description: Set(payload.description.clone()),
        has_original_box: Set(payload.has_original_box),
        has_charger: Set(payload.has_charger),
        has_cable: Set(payload.has_cable),
        has_receipt: Set(payload.has_receipt),
        has_warranty: Set(payload.has_warranty),
        images_url: Set(payload.images_url.clone()),
        ..Default::default()
    };

    if let Some(device) = device {
        new_listing.serial_number = Set(device.serial_number);
        new_listing.model = Set(device.model);
        new_listing.memory = Set(device.memory);
        new_listing.color = Set(device.color);
        new_listing.activated = Set(device.activated);
        new_listing.icloud_lock = Set(device.icloud_lock);
        new_listing.fmi = Set(device.fmi);
        new_listing.simlock = Set(device.simlock);
    }

    let listing = new_listing.insert(&state.db).await.map_err(db_error)?;

    // Keep the author's listing counter in step
    if let Some(author) = Users::find_by_id(current.user_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
    {
        let posts_count = author.posts_count + 1;
        let mut active: users::ActiveModel = author.into_active_model();
        active.posts_count = Set(posts_count);
        active.update(&state.db).await.map_err(db_error)?;
    }

    info!(
        listing_id = listing.id,
        author_id = current.user_id,
        model = ?listing.model,
        "Listing created"
    );

    Ok((StatusCode::CREATED, Json(listing.into())))
}

/// GET /api/v1/iphone?id=…
///
/// Counts a view at most once per viewer per 24 hours. The viewer key is
/// the user id for authenticated callers, otherwise the `viewer_id`
/// query value the frontend persists per browser.
pub async fn get_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListingQuery>,
) -> Result<Json<ListingResponse>, (StatusCode, Json<ErrorResponse>)> {
    let listing = Listings::find_by_id(query.id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(format!("Listing {} not found", query.id)))?;

    let viewer_key = optional_user(&headers, &state.config.secret_key)
        .map(|u| u.user_id.to_string())
        .or(query.viewer_id);

    let listing = if let Some(viewer_key) = viewer_key {
        maybe_count_view(&state, listing, &viewer_key).await?
    } else {
        listing
    };

    Ok(Json(listing.into()))
}

/// GET /api/v1/iphones - active listings with filters and pagination
pub async fn list_listings(
    State(state): State<AppState>,
    Query(filter): Query<ListingsFilter>,
) -> Result<Json<ListingsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let mut query = Listings::find().filter(listings::Column::Active.eq(true));

    if let Some(model) = &filter.model {
        query = query.filter(listings::Column::Model.eq(model));
    }
    if let Some(memory) = &filter.memory {
        query = query.filter(listings::Column::Memory.eq(memory));
    }
    if let Some(color) = &filter.color {
        query = query.filter(listings::Column::Color.eq(color));
    }
    if let Some(min_price) = filter.min_price {
        query = query.filter(listings::Column::Price.gte(min_price));
    }
    if let Some(max_price) = filter.max_price {
        query = query.filter(listings::Column::Price.lte(max_price));
    }
    if let Some(author_id) = filter.author_id {
        query = query.filter(listings::Column::AuthorId.eq(author_id));
    }

    let total = query.clone().count(&state.db).await.map_err(db_error)?;

    let limit = filter.limit.unwrap_or(DEFAULT_PAGE_SIZE).min(MAX_PAGE_SIZE);
    let offset = filter.offset.unwrap_or(0);

    let rows = query
        .order_by_desc(listings::Column::CreatedAt)
        .limit(limit)
        .offset(offset)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(ListingsResponse {
        listings: rows.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// GET /api/v1/my-posts
pub async fn my_posts(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ListingsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let current = require_user(&headers, &state.config.secret_key)?;

    let rows = Listings::find()
        .filter(listings::Column::AuthorId.eq(current.user_id))
        .order_by_desc(listings::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let total = rows.len() as u64;
    Ok(Json(ListingsResponse {
        listings: rows.into_iter().map(Into::into).collect(),
        total,
    }))
}

/// PATCH /api/v1/iphone/{id}
pub async fn update_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, (StatusCode, Json<ErrorResponse>)> {
    let current = require_user(&headers, &state.config.secret_key)?;

    let listing = Listings::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(format!("Listing {} not found", id)))?;

    if listing.author_id != current.user_id {
        return Err(forbidden("Only the author can edit a listing"));
    }

    if let Some(description) = &payload.description {
        if description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(bad_request(format!(
                "Description cannot exceed {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
    }

    let mut active_model = listing.into_active_model();
    if let Some(price) = payload.price {
        active_model.price = Set(Some(price));
    }
    if let Some(description) = payload.description {
        active_model.description = Set(Some(description));
    }
    if let Some(active) = payload.active {
        active_model.active = Set(active);
    }
    if let Some(v) = payload.has_original_box {
        active_model.has_original_box = Set(v);
    }
    if let Some(v) = payload.has_charger {
        active_model.has_charger = Set(v);
    }
    if let Some(v) = payload.has_cable {
        active_model.has_cable = Set(v);
    }
    if let Some(v) = payload.has_receipt {
        active_model.has_receipt = Set(v);
    }
    if let Some(v) = payload.has_warranty {
        active_model.has_warranty = Set(v);
    }

    let updated = active_model.update(&state.db).await.map_err(db_error)?;

    Ok(Json(updated.into()))
}

/// DELETE /api/v1/iphone/{id} - withdraws the ad
pub async fn delete_listing(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let current = require_user(&headers, &state.config.secret_key)?;

    let listing = Listings::find_by_id(id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found(format!("Listing {} not found", id)))?;

    if listing.author_id != current.user_id {
        return Err(forbidden("Only the author can delete a listing"));
    }

    let mut active_model = listing.into_active_model();
    active_model.active = Set(false);
    active_model.update(&state.db).await.map_err(db_error)?;

    info!(listing_id = id, author_id = current.user_id, "Listing withdrawn");

    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Bump the view counter unless this viewer was already counted within
/// the last 24 hours. Returns the listing with the current counter.
async fn maybe_count_view(
    state: &AppState,
    listing: listings::Model,
    viewer_key: &str,
) -> Result<listings::Model, (StatusCode, Json<ErrorResponse>)> {
    let now = Utc::now();
    let window_start = now - Duration::hours(24);

    let existing = ListingViews::find()
        .filter(listing_views::Column::ListingId.eq(listing.id))
        .filter(listing_views::Column::ViewerKey.eq(viewer_key))
        .one(&state.db)
        .await
        .map_err(db_error)?;

    match existing {
        Some(view) if view.viewed_at > window_start.fixed_offset() => {
            // Already counted within the window
            Ok(listing)
        }
        Some(view) => {
            let mut active_view = view.into_active_model();
            active_view.viewed_at = Set(now.fixed_offset());
            active_view.update(&state.db).await.map_err(db_error)?;
            increment_view_count(state, listing).await
        }
        None => {
            let new_view = listing_views::ActiveModel {
                listing_id: Set(listing.id),
                viewer_key: Set(viewer_key.to_string()),
                viewed_at: Set(now.fixed_offset()),
                ..Default::default()
            };
            new_view.insert(&state.db).await.map_err(db_error)?;
            increment_view_count(state, listing).await
        }
    }
}

async fn increment_view_count(
    state: &AppState,
    listing: listings::Model,
) -> Result<listings::Model, (StatusCode, Json<ErrorResponse>)> {
    let view_count = listing.view_count + 1;
    let mut active_model = listing.into_active_model();
    active_model.view_count = Set(view_count);
    active_model.update(&state.db).await.map_err(db_error)
}

fn validate_listing_request(
    req: &CreateListingRequest,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if req.imei.len() != IMEI_LENGTH {
        return Err(bad_request(format!(
            "IMEI must be exactly {} digits",
            IMEI_LENGTH
        )));
    }
    if !req.imei.chars().all(|c| c.is_ascii_digit()) {
        return Err(bad_request("IMEI must contain only digits"));
    }

    if !(0..=100).contains(&req.battery) {
        return Err(bad_request("Battery level must be between 0 and 100"));
    }

    if let Some(price) = req.price {
        if price.is_sign_negative() {
            return Err(bad_request("Price cannot be negative"));
        }
    }

    if let Some(description) = &req.description {
        if description.len() > MAX_DESCRIPTION_LENGTH {
            return Err(bad_request(format!(
                "Description cannot exceed {} characters",
                MAX_DESCRIPTION_LENGTH
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_request(imei: &str, battery: i32) -> CreateListingRequest {
        CreateListingRequest {
            imei: imei.to_string(),
            battery,
            price: Some(dec!(450.00)),
            description: None,
            has_original_box: false,
            has_charger: false,
            has_cable: false,
            has_receipt: false,
            has_warranty: false,
            images_url: None,
        }
    }

    #[test]
    fn test_validate_imei_wrong_length() {
        assert!(validate_listing_request(&make_request("12345", 80)).is_err());
        assert!(validate_listing_request(&make_request(&"1".repeat(16), 80)).is_err());
    }

    #[test]
    fn test_validate_imei_non_digits() {
        assert!(validate_listing_request(&make_request("35690145072888X", 80)).is_err());
    }

    #[test]
    fn test_validate_battery_bounds() {
        assert!(validate_listing_request(&make_request("356901450728885", -1)).is_err());
        assert!(validate_listing_request(&make_request("356901450728885", 101)).is_err());
        assert!(validate_listing_request(&make_request("356901450728885", 0)).is_ok());
        assert!(validate_listing_request(&make_request("356901450728885", 100)).is_ok());
    }

    #[test]
    fn test_validate_negative_price() {
        let mut req = make_request("356901450728885", 80);
        req.price = Some(dec!(-1));
        assert!(validate_listing_request(&req).is_err());
    }

    #[test]
    fn test_validate_description_too_long() {
        let mut req = make_request("356901450728885", 80);
        req.description = Some("x".repeat(MAX_DESCRIPTION_LENGTH + 1));
        assert!(validate_listing_request(&req).is_err());
    }

    #[test]
    fn test_validate_valid_request() {
        assert!(validate_listing_request(&make_request("356901450728885", 87)).is_ok());
    }
}
