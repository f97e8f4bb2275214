//! SeaORM entity for user accounts
//!
//! Covers both local (password) and Google OAuth accounts, plus the
//! aggregate seller statistics maintained by the order workflow.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub username: String,
    pub email: String,
    /// Bcrypt hash; None for OAuth-only accounts
    pub hashed_password: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub phone: Option<String>,
    /// Google subject id for OAuth accounts
    pub google_id: Option<String>,
    /// Listings authored by this user
    pub posts_count: i32,
    /// Completed sales as a seller
    pub sells_count: i32,
    /// Mean review rating over reviewed orders, rounded to 2 decimals
    pub rating: Option<Decimal>,
    /// "regular", "admin" or "support"
    pub user_type: String,
    pub created_at: Option<DateTimeWithTimeZone>,
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
