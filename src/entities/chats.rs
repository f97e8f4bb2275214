//! SeaORM entity for buyer/seller chat rooms
//!
//! One room per (listing, buyer) pair. The buyer id is a stringified user
//! id for registered buyers or a UUID for anonymous visitors.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "chats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub listing_id: i32,
    pub seller_id: i32,
    pub buyer_id: String,
    pub buyer_is_registered: bool,
    pub created_at: Option<DateTimeWithTimeZone>,
    /// Bumped whenever a message is stored
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::messages::Entity")]
    Messages,
}

impl Related<super::messages::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Messages.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
