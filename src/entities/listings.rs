//! SeaORM entity for iPhone classified-ad listings
//!
//! Verification fields (serial number, model, memory, color and the lock
//! flags) are filled from the IMEI lookup when the listing is created.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub author_id: i32,
    /// Cleared when the phone is sold or the listing is withdrawn
    pub active: bool,
    pub view_count: i32,
    /// 15-digit device identifier, stored as text to keep leading zeros
    pub imei: String,
    /// Battery health percentage (0-100)
    pub battery: i32,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub serial_number: Option<String>,
    pub model: Option<String>,
    pub memory: Option<String>,
    pub color: Option<String>,
    pub activated: Option<bool>,
    pub icloud_lock: Option<bool>,
    /// Find My iPhone status from the IMEI lookup
    pub fmi: Option<bool>,
    pub simlock: Option<bool>,
    pub has_original_box: bool,
    pub has_charger: bool,
    pub has_cable: bool,
    pub has_receipt: bool,
    pub has_warranty: bool,
    /// Comma-separated Cloudflare image delivery URLs
    pub images_url: Option<String>,
    pub created_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
