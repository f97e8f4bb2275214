//! Order workflow handlers
//!
//! create -> pay -> ship -> deliver -> confirm, with cancel/refund side
//! exits. Every transition re-validates the caller against the stored
//! buyer/seller id and the current status before mutating. Payment is
//! simulated; there is no provider integration.

use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use rand::Rng;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use tracing::{info, warn};

use crate::entities::{listings, orders, prelude::*};
use crate::models::order::{
    ConfirmOrderRequest, CreateOrderRequest, OrderIdQuery, OrderResponse, OrderStatus,
};
use crate::models::user::ErrorResponse;
use crate::services::auth::{optional_user, require_user, CurrentUser};
use crate::services::seller_stats::record_completed_sale;
use crate::AppState;

use super::{bad_request, db_error, forbidden, not_found};

/// POST /api/v1/orders/create
///
/// Anonymous checkout is allowed; `buyer_id` stays empty in that case.
pub async fn create_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderResponse>), (StatusCode, Json<ErrorResponse>)> {
    let buyer = optional_user(&headers, &state.config.secret_key);
    let buyer_id = buyer.as_ref().map(|u| u.user_id);

    let listing = Listings::find_by_id(payload.listing_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Listing not found"))?;

    if !listing.active {
        return Err(bad_request("Listing is no longer active"));
    }

    let price = listing
        .price
        .ok_or_else(|| bad_request("Listing has no price"))?;

    if buyer_id == Some(listing.author_id) {
        return Err(bad_request("You cannot buy your own listing"));
    }

    if payload.delivery_method.requires_address() {
        let address_complete = payload
            .delivery_address
            .as_deref()
            .is_some_and(|s| !s.is_empty())
            && payload
                .delivery_city
                .as_deref()
                .is_some_and(|s| !s.is_empty())
            && payload
                .delivery_zip
                .as_deref()
                .is_some_and(|s| !s.is_empty());
        if !address_complete {
            return Err(bad_request(
                "Courier delivery requires a full address (street, city and zip)",
            ));
        }
    }

    for (field, value) in [
        ("first_name", &payload.first_name),
        ("last_name", &payload.last_name),
        ("email", &payload.email),
        ("phone", &payload.phone),
    ] {
        if value.is_empty() {
            return Err(bad_request(format!("Missing required field: {}", field)));
        }
    }

    let new_order = orders::ActiveModel {
        listing_id: Set(listing.id),
        buyer_id: Set(buyer_id),
        seller_id: Set(listing.author_id),
        price: Set(price),
        delivery_method: Set(payload.delivery_method.as_str().to_string()),
        buyer_first_name: Set(payload.first_name),
        buyer_last_name: Set(payload.last_name),
        buyer_email: Set(payload.email),
        buyer_phone: Set(payload.phone),
        delivery_address: Set(payload.delivery_address),
        delivery_city: Set(payload.delivery_city),
        delivery_zip: Set(payload.delivery_zip),
        delivery_country: Set(payload.delivery_country),
        status: Set(OrderStatus::PendingPayment.as_str().to_string()),
        ..Default::default()
    };

    let order = new_order.insert(&state.db).await.map_err(db_error)?;

    info!(
        order_id = order.id,
        listing_id = order.listing_id,
        buyer_id = ?order.buyer_id,
        seller_id = order.seller_id,
        "Order created"
    );

    Ok((StatusCode::CREATED, Json(OrderResponse::for_buyer(order))))
}

/// POST /api/v1/orders/pay?order_id=…
///
/// Simulated payment: flips the order to paid, generates the parcel
/// locker code and deactivates the listing.
pub async fn pay_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderIdQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let caller = optional_user(&headers, &state.config.secret_key);

    let order = find_order(&state, query.order_id).await?;

    // An authenticated caller may only pay their own order; anonymous
    // orders stay payable by whoever holds the order id.
    if let (Some(caller), Some(buyer_id)) = (&caller, order.buyer_id) {
        if caller.user_id != buyer_id {
            return Err(forbidden("This order belongs to another buyer"));
        }
    }

    ensure_status(&order, OrderStatus::PendingPayment, "Order is already paid or cancelled")?;

    let payment_successful = true; // payment provider integration is out of scope
    if !payment_successful {
        return Err(bad_request("Payment failed"));
    }

    let order_id = order.id;
    let listing_id = order.listing_id;

    let mut active_order = order.into_active_model();
    active_order.status = Set(OrderStatus::Paid.as_str().to_string());
    active_order.paid_at = Set(Some(Utc::now().fixed_offset()));
    active_order.pickup_code = Set(Some(generate_code()));
    let order = active_order.update(&state.db).await.map_err(db_error)?;

    // The phone is sold; withdraw the ad
    if let Some(listing) = Listings::find_by_id(listing_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
    {
        let mut active_listing: listings::ActiveModel = listing.into_active_model();
        active_listing.active = Set(false);
        active_listing.update(&state.db).await.map_err(db_error)?;
    }

    info!(order_id = order_id, "Order paid");

    Ok(Json(serde_json::json!({
        "success": true,
        "order_id": order.id,
        "status": order.status,
        "message": "Payment accepted. The seller has been notified and will ship the phone soon."
    })))
}

/// POST /api/v1/orders/ship?order_id=… - seller marks the parcel sent
pub async fn ship_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderIdQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_user(&headers, &state.config.secret_key)?;

    let order = find_order(&state, query.order_id).await?;

    ensure_seller(&order, &caller, "Only the seller can ship the order")?;
    ensure_status(&order, OrderStatus::Paid, "Order is not paid yet")?;

    let mut active_order = order.into_active_model();
    active_order.status = Set(OrderStatus::Shipped.as_str().to_string());
    active_order.shipped_at = Set(Some(Utc::now().fixed_offset()));
    let order = active_order.update(&state.db).await.map_err(db_error)?;

    info!(order_id = order.id, seller_id = caller.user_id, "Order shipped");

    Ok(Json(serde_json::json!({
        "success": true,
        "order_id": order.id,
        "status": order.status,
        "shipped_at": order.shipped_at,
        "message": "Marked as shipped. The buyer will be notified."
    })))
}

/// POST /api/v1/orders/deliver?order_id=…
///
/// Seller marks the parcel as arrived; the handover confirmation code is
/// generated here and shown to the buyer.
pub async fn deliver_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderIdQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_user(&headers, &state.config.secret_key)?;

    let order = find_order(&state, query.order_id).await?;

    ensure_seller(&order, &caller, "Only the seller can mark delivery")?;
    ensure_status(&order, OrderStatus::Shipped, "Order is not shipped yet")?;

    let mut active_order = order.into_active_model();
    active_order.status = Set(OrderStatus::Delivered.as_str().to_string());
    active_order.delivered_at = Set(Some(Utc::now().fixed_offset()));
    active_order.confirmation_code = Set(Some(generate_code()));
    let order = active_order.update(&state.db).await.map_err(db_error)?;

    info!(order_id = order.id, "Order delivered");

    Ok(Json(serde_json::json!({
        "success": true,
        "order_id": order.id,
        "status": order.status,
        "delivered_at": order.delivered_at,
    })))
}

/// POST /api/v1/orders/confirm
///
/// Buyer accepts or rejects the received phone and leaves a review.
/// Acceptance completes the order and updates the seller statistics;
/// rejection cancels it.
pub async fn confirm_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<ConfirmOrderRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_user(&headers, &state.config.secret_key)?;

    if !(0..=5).contains(&payload.rating) {
        return Err(bad_request("Rating must be between 0 and 5"));
    }

    let order = find_order(&state, payload.order_id).await?;

    if order.buyer_id != Some(caller.user_id) {
        return Err(forbidden("Only the buyer can confirm the order"));
    }

    let status = parse_status(&order)?;
    if !status.confirmable() {
        return Err(bad_request("Order has not been shipped yet"));
    }

    if order.confirmed_by_buyer || order.rejected_by_buyer {
        return Err(bad_request("You already reviewed this order"));
    }

    let order_id = order.id;
    let seller_id = order.seller_id;
    let accepted = payload.accepted;

    let mut active_order = order.into_active_model();
    active_order.review_rating = Set(Some(payload.rating));
    active_order.review_text = Set(payload.review_text.clone());
    active_order.completed_at = Set(Some(Utc::now().fixed_offset()));

    let message = if accepted {
        active_order.confirmed_by_buyer = Set(true);
        active_order.status = Set(OrderStatus::Completed.as_str().to_string());
        "Thank you for confirming the purchase."
    } else {
        active_order.rejected_by_buyer = Set(true);
        active_order.status = Set(OrderStatus::Cancelled.as_str().to_string());
        "Order rejected. Support will review your complaint."
    };

    active_order.update(&state.db).await.map_err(db_error)?;

    if accepted {
        // Review must be stored before the mean is recomputed
        record_completed_sale(&state.db, seller_id)
            .await
            .map_err(db_error)?;
    }

    info!(
        order_id = order_id,
        buyer_id = caller.user_id,
        accepted = accepted,
        rating = payload.rating,
        "Order reviewed"
    );

    Ok(Json(serde_json::json!({
        "success": true,
        "order_id": order_id,
        "accepted": accepted,
        "message": message,
    })))
}

/// POST /api/v1/orders/refund?order_id=… - seller refunds a cancelled paid order
pub async fn refund_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderIdQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_user(&headers, &state.config.secret_key)?;

    let order = find_order(&state, query.order_id).await?;

    ensure_seller(&order, &caller, "Only the seller can refund the order")?;
    ensure_status(&order, OrderStatus::Cancelled, "Only cancelled orders can be refunded")?;

    if order.paid_at.is_none() {
        return Err(bad_request("Order was never paid"));
    }

    let mut active_order = order.into_active_model();
    active_order.status = Set(OrderStatus::Refunded.as_str().to_string());
    let order = active_order.update(&state.db).await.map_err(db_error)?;

    info!(order_id = order.id, seller_id = caller.user_id, "Order refunded");

    Ok(Json(serde_json::json!({
        "success": true,
        "order_id": order.id,
        "status": order.status,
    })))
}

/// GET /api/v1/orders/my-orders - buyer history, empty when unauthenticated
pub async fn my_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let Some(caller) = optional_user(&headers, &state.config.secret_key) else {
        return Ok(Json(serde_json::json!({ "orders": [] })));
    };

    let rows = Orders::find()
        .filter(orders::Column::BuyerId.eq(caller.user_id))
        .order_by_desc(orders::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let orders: Vec<OrderResponse> = rows.into_iter().map(OrderResponse::for_buyer).collect();
    Ok(Json(serde_json::json!({ "orders": orders })))
}

/// GET /api/v1/orders/my-sales - seller view, buyer reduced to a name
pub async fn my_sales(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let Some(caller) = optional_user(&headers, &state.config.secret_key) else {
        return Ok(Json(serde_json::json!({ "sales": [] })));
    };

    let rows = Orders::find()
        .filter(orders::Column::SellerId.eq(caller.user_id))
        .order_by_desc(orders::Column::CreatedAt)
        .all(&state.db)
        .await
        .map_err(db_error)?;

    let sales: Vec<OrderResponse> = rows.into_iter().map(OrderResponse::for_seller).collect();
    Ok(Json(serde_json::json!({ "sales": sales })))
}

/// GET /api/v1/orders/details?order_id=…
pub async fn order_details(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderIdQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, Json<ErrorResponse>)> {
    let caller = require_user(&headers, &state.config.secret_key)?;

    let order = find_order(&state, query.order_id).await?;

    let is_buyer = order.buyer_id == Some(caller.user_id);
    let is_seller = order.seller_id == caller.user_id;
    let is_staff = matches!(caller.user_type.as_str(), "admin" | "support");

    if !is_buyer && !is_seller && !is_staff {
        return Err(forbidden("Access denied"));
    }

    let listing = Listings::find_by_id(order.listing_id)
        .one(&state.db)
        .await
        .map_err(db_error)?;

    Ok(Json(serde_json::json!({
        "order": order,
        "listing": listing,
    })))
}

async fn find_order(
    state: &AppState,
    order_id: i32,
) -> Result<orders::Model, (StatusCode, Json<ErrorResponse>)> {
    Orders::find_by_id(order_id)
        .one(&state.db)
        .await
        .map_err(db_error)?
        .ok_or_else(|| not_found("Order not found"))
}

fn parse_status(order: &orders::Model) -> Result<OrderStatus, (StatusCode, Json<ErrorResponse>)> {
    OrderStatus::parse(&order.status).ok_or_else(|| {
        warn!(order_id = order.id, status = %order.status, "Order carries unknown status");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("Order is in an unknown state: {}", order.status),
            }),
        )
    })
}

fn ensure_status(
    order: &orders::Model,
    expected: OrderStatus,
    message: &str,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if parse_status(order)? != expected {
        return Err(bad_request(message));
    }
    Ok(())
}

fn ensure_seller(
    order: &orders::Model,
    caller: &CurrentUser,
    message: &str,
) -> Result<(), (StatusCode, Json<ErrorResponse>)> {
    if order.seller_id != caller.user_id {
        return Err(forbidden(message));
    }
    Ok(())
}

/// 6-digit numeric code for lockers and handover confirmation
fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..6).map(|_| rng.random_range(0..10).to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn make_order(status: OrderStatus) -> orders::Model {
        orders::Model {
            id: 1,
            listing_id: 10,
            buyer_id: Some(2),
            seller_id: 3,
            price: dec!(450.00),
            delivery_method: "dpd".to_string(),
            buyer_first_name: "Jane".to_string(),
            buyer_last_name: "Doe".to_string(),
            buyer_email: "jane@example.com".to_string(),
            buyer_phone: "+37255551234".to_string(),
            delivery_address: Some("Main St 1".to_string()),
            delivery_city: Some("Tallinn".to_string()),
            delivery_zip: Some("10111".to_string()),
            delivery_country: Some("EE".to_string()),
            status: status.as_str().to_string(),
            pickup_code: None,
            confirmation_code: None,
            confirmed_by_buyer: false,
            rejected_by_buyer: false,
            review_rating: None,
            review_text: None,
            created_at: None,
            paid_at: None,
            shipped_at: None,
            delivered_at: None,
            completed_at: None,
        }
    }

    fn make_caller(user_id: i32) -> CurrentUser {
        CurrentUser {
            user_id,
            username: "tester".to_string(),
            user_type: "regular".to_string(),
        }
    }

    #[test]
    fn test_generate_code_is_six_digits() {
        for _ in 0..20 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_cannot_ship_before_paid() {
        let order = make_order(OrderStatus::PendingPayment);
        assert!(ensure_status(&order, OrderStatus::Paid, "Order is not paid yet").is_err());

        let order = make_order(OrderStatus::Paid);
        assert!(ensure_status(&order, OrderStatus::Paid, "Order is not paid yet").is_ok());
    }

    #[test]
    fn test_ensure_seller_rejects_strangers() {
        let order = make_order(OrderStatus::Paid);
        assert!(ensure_seller(&order, &make_caller(3), "nope").is_ok());
        let result = ensure_seller(&order, &make_caller(99), "nope");
        assert!(result.is_err());
        let (status, _) = result.unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_unknown_status_is_surfaced() {
        let mut order = make_order(OrderStatus::Paid);
        order.status = "limbo".to_string();
        assert!(parse_status(&order).is_err());
    }
}
