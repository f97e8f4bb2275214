//! SeaORM entity for purchase orders
//!
//! Buyer contact fields are snapshots taken at order time so later profile
//! edits do not rewrite delivery paperwork. Status values:
//! pending_payment, paid, shipped, delivered, completed, cancelled, refunded.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_id: i32,
    /// None for anonymous checkouts
    pub buyer_id: Option<i32>,
    pub seller_id: i32,
    /// Listing price snapshot at order time
    pub price: Decimal,
    /// "dpd", "omniva" or "pickup"
    pub delivery_method: String,
    pub buyer_first_name: String,
    pub buyer_last_name: String,
    pub buyer_email: String,
    pub buyer_phone: String,
    pub delivery_address: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_zip: Option<String>,
    pub delivery_country: Option<String>,
    pub status: String,
    /// 6-digit parcel locker code, generated on payment
    pub pickup_code: Option<String>,
    /// 6-digit handover code, generated when the seller marks delivery
    pub confirmation_code: Option<String>,
    pub confirmed_by_buyer: bool,
    pub rejected_by_buyer: bool,
    /// 0-5, left by the buyer on confirm
    pub review_rating: Option<i16>,
    pub review_text: Option<String>,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub shipped_at: Option<DateTimeWithTimeZone>,
    pub delivered_at: Option<DateTimeWithTimeZone>,
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
