use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per (listing, viewer); viewed_at is refreshed when a view
        // is counted again after the 24h window.
        manager
            .create_table(
                Table::create()
                    .table(ListingViews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ListingViews::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ListingViews::ListingId).integer().not_null())
                    .col(
                        ColumnDef::new(ListingViews::ViewerKey)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ListingViews::ViewedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listing_views_listing_viewer")
                    .table(ListingViews::Table)
                    .col(ListingViews::ListingId)
                    .col(ListingViews::ViewerKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ListingViews::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum ListingViews {
    Table,
    Id,
    ListingId,
    ViewerKey,
    ViewedAt,
}
