use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::entities::listings;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateListingRequest {
    /// 15-digit IMEI, digits only
    pub imei: String,
    /// Battery health percentage (0-100)
    pub battery: i32,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    #[serde(default)]
    pub has_original_box: bool,
    #[serde(default)]
    pub has_charger: bool,
    #[serde(default)]
    pub has_cable: bool,
    #[serde(default)]
    pub has_receipt: bool,
    #[serde(default)]
    pub has_warranty: bool,
    /// Comma-separated image delivery URLs from the direct-upload flow
    pub images_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateListingRequest {
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub active: Option<bool>,
    pub has_original_box: Option<bool>,
    pub has_charger: Option<bool>,
    pub has_cable: Option<bool>,
    pub has_receipt: Option<bool>,
    pub has_warranty: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingQuery {
    pub id: i32,
    /// Anonymous viewer identity for view deduplication
    pub viewer_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListingsFilter {
    pub model: Option<String>,
    pub memory: Option<String>,
    pub color: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub author_id: Option<i32>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingResponse {
    pub id: i32,
    pub author_id: i32,
    pub active: bool,
    pub view_count: i32,
    pub imei: String,
    pub battery: i32,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub model: Option<String>,
    pub memory: Option<String>,
    pub color: Option<String>,
    pub activated: Option<bool>,
    pub icloud_lock: Option<bool>,
    pub fmi: Option<bool>,
    pub simlock: Option<bool>,
    pub has_original_box: bool,
    pub has_charger: bool,
    pub has_cable: bool,
    pub has_receipt: bool,
    pub has_warranty: bool,
    pub images_url: Option<String>,
    pub created_at: Option<DateTime<FixedOffset>>,
}

impl From<listings::Model> for ListingResponse {
    fn from(listing: listings::Model) -> Self {
        Self {
            id: listing.id,
            author_id: listing.author_id,
            active: listing.active,
            view_count: listing.view_count,
            imei: listing.imei,
            battery: listing.battery,
            price: listing.price,
            description: listing.description,
            model: listing.model,
            memory: listing.memory,
            color: listing.color,
            activated: listing.activated,
            icloud_lock: listing.icloud_lock,
            fmi: listing.fmi,
            simlock: listing.simlock,
            has_original_box: listing.has_original_box,
            has_charger: listing.has_charger,
            has_cable: listing.has_cable,
            has_receipt: listing.has_receipt,
            has_warranty: listing.has_warranty,
            images_url: listing.images_url,
            created_at: listing.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<ListingResponse>,
    pub total: u64,
}

/// Response for the Cloudflare direct-upload link request
#[derive(Debug, Clone, Serialize)]
pub struct DirectUploadResponse {
    pub upload_url: String,
    pub account_hash: String,
    pub image_delivery_base: String,
}
