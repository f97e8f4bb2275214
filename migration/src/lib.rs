pub use sea_orm_migration::prelude::*;

mod m20260702_000001_create_users;
mod m20260702_000002_create_listings;
mod m20260703_000001_create_listing_views;
mod m20260705_000001_create_chats;
mod m20260708_000001_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260702_000001_create_users::Migration),
            Box::new(m20260702_000002_create_listings::Migration),
            Box::new(m20260703_000001_create_listing_views::Migration),
            Box::new(m20260705_000001_create_chats::Migration),
            Box::new(m20260708_000001_create_orders::Migration),
        ]
    }
}
