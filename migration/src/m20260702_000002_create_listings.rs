use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Listings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Listings::AuthorId).integer().not_null())
                    .col(
                        ColumnDef::new(Listings::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Listings::ViewCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Listings::Imei).string_len(15).not_null())
                    .col(ColumnDef::new(Listings::Battery).integer().not_null())
                    .col(ColumnDef::new(Listings::Price).decimal_len(10, 2).null())
                    .col(ColumnDef::new(Listings::Description).string_len(1000).null())
                    // Filled in from the IMEI lookup
                    .col(ColumnDef::new(Listings::SerialNumber).string_len(20).null())
                    .col(ColumnDef::new(Listings::Model).string_len(50).null())
                    .col(ColumnDef::new(Listings::Memory).string_len(20).null())
                    .col(ColumnDef::new(Listings::Color).string_len(150).null())
                    .col(ColumnDef::new(Listings::Activated).boolean().null())
                    .col(ColumnDef::new(Listings::IcloudLock).boolean().null())
                    .col(ColumnDef::new(Listings::Fmi).boolean().null())
                    .col(ColumnDef::new(Listings::Simlock).boolean().null())
                    // Accessories included with the phone
                    .col(
                        ColumnDef::new(Listings::HasOriginalBox)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Listings::HasCharger)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Listings::HasCable)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Listings::HasReceipt)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Listings::HasWarranty)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Listings::ImagesUrl).text().null())
                    .col(
                        ColumnDef::new(Listings::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listings_author_id")
                    .table(Listings::Table)
                    .col(Listings::AuthorId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listings_active")
                    .table(Listings::Table)
                    .col(Listings::Active)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listings_model_memory")
                    .table(Listings::Table)
                    .col(Listings::Model)
                    .col(Listings::Memory)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Listings::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Listings {
    Table,
    Id,
    AuthorId,
    Active,
    ViewCount,
    Imei,
    Battery,
    Price,
    Description,
    SerialNumber,
    Model,
    Memory,
    Color,
    Activated,
    IcloudLock,
    Fmi,
    Simlock,
    HasOriginalBox,
    HasCharger,
    HasCable,
    HasReceipt,
    HasWarranty,
    ImagesUrl,
    CreatedAt,
}
