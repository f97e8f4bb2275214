use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::orders;

/// Order lifecycle. Transitions are linear and re-validated by every
/// endpoint before mutating:
/// pending_payment -> paid -> shipped -> delivered -> completed,
/// with cancelled on buyer rejection and refunded after a cancelled
/// paid order is refunded by the seller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    PendingPayment,
    Paid,
    Shipped,
    Delivered,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::Paid => "paid",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Refunded => "refunded",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending_payment" => Some(OrderStatus::PendingPayment),
            "paid" => Some(OrderStatus::Paid),
            "shipped" => Some(OrderStatus::Shipped),
            "delivered" => Some(OrderStatus::Delivered),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            "refunded" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    /// Buyer review is accepted once the parcel left the seller
    pub fn confirmable(&self) -> bool {
        matches!(self, OrderStatus::Shipped | OrderStatus::Delivered)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
    Dpd,
    Omniva,
    Pickup,
}

impl DeliveryMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Dpd => "dpd",
            DeliveryMethod::Omniva => "omniva",
            DeliveryMethod::Pickup => "pickup",
        }
    }

    /// Courier methods need a full street address; locker pickup does not
    pub fn requires_address(&self) -> bool {
        matches!(self, DeliveryMethod::Dpd | DeliveryMethod::Omniva)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub listing_id: i32,
    pub delivery_method: DeliveryMethod,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_zip: Option<String>,
    pub delivery_country: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmOrderRequest {
    pub order_id: i32,
    pub accepted: bool,
    /// 0-5
    pub rating: i16,
    pub review_text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderIdQuery {
    pub order_id: i32,
}

/// Order view for the buyer's own history; personal data the buyer
/// entered themselves, nothing about the seller beyond ids
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: i32,
    pub listing_id: i32,
    pub status: String,
    pub delivery_method: String,
    pub price: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_last_name: Option<String>,
    /// Display name only, used in the seller's sales view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_name: Option<String>,
    pub created_at: Option<DateTime<FixedOffset>>,
    pub paid_at: Option<DateTime<FixedOffset>>,
    pub shipped_at: Option<DateTime<FixedOffset>>,
    pub delivered_at: Option<DateTime<FixedOffset>>,
    pub completed_at: Option<DateTime<FixedOffset>>,
    pub review_rating: Option<i16>,
    pub review_text: Option<String>,
}

impl OrderResponse {
    /// Buyer-facing view: contact fields as entered, no seller data
    pub fn for_buyer(order: orders::Model) -> Self {
        Self {
            id: order.id,
            listing_id: order.listing_id,
            status: order.status,
            delivery_method: order.delivery_method,
            price: order.price,
            buyer_first_name: Some(order.buyer_first_name),
            buyer_last_name: Some(order.buyer_last_name),
            buyer_name: None,
            created_at: order.created_at,
            paid_at: order.paid_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            completed_at: order.completed_at,
            review_rating: order.review_rating,
            review_text: order.review_text,
        }
    }

    /// Seller-facing view: buyer reduced to a display name, no contact data
    pub fn for_seller(order: orders::Model) -> Self {
        let buyer_name = format!("{} {}", order.buyer_first_name, order.buyer_last_name);
        Self {
            id: order.id,
            listing_id: order.listing_id,
            status: order.status,
            delivery_method: order.delivery_method,
            price: order.price,
            buyer_first_name: None,
            buyer_last_name: None,
            buyer_name: Some(buyer_name),
            created_at: order.created_at,
            paid_at: order.paid_at,
            shipped_at: order.shipped_at,
            delivered_at: order.delivered_at,
            completed_at: order.completed_at,
            review_rating: order.review_rating,
            review_text: order.review_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Shipped,
            OrderStatus::Delivered,
            OrderStatus::Completed,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(OrderStatus::parse("unknown"), None);
    }

    #[test]
    fn test_confirmable_statuses() {
        assert!(OrderStatus::Shipped.confirmable());
        assert!(OrderStatus::Delivered.confirmable());
        assert!(!OrderStatus::Paid.confirmable());
        assert!(!OrderStatus::PendingPayment.confirmable());
        assert!(!OrderStatus::Completed.confirmable());
    }

    #[test]
    fn test_courier_methods_require_address() {
        assert!(DeliveryMethod::Dpd.requires_address());
        assert!(DeliveryMethod::Omniva.requires_address());
        assert!(!DeliveryMethod::Pickup.requires_address());
    }
}
