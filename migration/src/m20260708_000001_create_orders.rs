use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::ListingId).integer().not_null())
                    // Null for anonymous checkouts
                    .col(ColumnDef::new(Orders::BuyerId).integer().null())
                    .col(ColumnDef::new(Orders::SellerId).integer().not_null())
                    .col(ColumnDef::new(Orders::Price).decimal_len(10, 2).not_null())
                    .col(
                        ColumnDef::new(Orders::DeliveryMethod)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::BuyerFirstName)
                            .string_len(150)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Orders::BuyerLastName)
                            .string_len(150)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Orders::BuyerEmail).string_len(150).not_null())
                    .col(ColumnDef::new(Orders::BuyerPhone).string_len(20).not_null())
                    .col(ColumnDef::new(Orders::DeliveryAddress).string_len(500).null())
                    .col(ColumnDef::new(Orders::DeliveryCity).string_len(100).null())
                    .col(ColumnDef::new(Orders::DeliveryZip).string_len(20).null())
                    .col(ColumnDef::new(Orders::DeliveryCountry).string_len(100).null())
                    .col(
                        ColumnDef::new(Orders::Status)
                            .string_len(20)
                            .not_null()
                            .default("pending_payment"),
                    )
                    .col(ColumnDef::new(Orders::PickupCode).string_len(6).null())
                    .col(ColumnDef::new(Orders::ConfirmationCode).string_len(6).null())
                    .col(
                        ColumnDef::new(Orders::ConfirmedByBuyer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Orders::RejectedByBuyer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Orders::ReviewRating).small_integer().null())
                    .col(ColumnDef::new(Orders::ReviewText).string_len(1000).null())
                    .col(
                        ColumnDef::new(Orders::CreatedAt)
                            .timestamp_with_time_zone()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(ColumnDef::new(Orders::PaidAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Orders::ShippedAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Orders::DeliveredAt).timestamp_with_time_zone().null())
                    .col(ColumnDef::new(Orders::CompletedAt).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_buyer_id")
                    .table(Orders::Table)
                    .col(Orders::BuyerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_seller_id")
                    .table(Orders::Table)
                    .col(Orders::SellerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_status")
                    .table(Orders::Table)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Orders {
    Table,
    Id,
    ListingId,
    BuyerId,
    SellerId,
    Price,
    DeliveryMethod,
    BuyerFirstName,
    BuyerLastName,
    BuyerEmail,
    BuyerPhone,
    DeliveryAddress,
    DeliveryCity,
    DeliveryZip,
    DeliveryCountry,
    Status,
    PickupCode,
    ConfirmationCode,
    ConfirmedByBuyer,
    RejectedByBuyer,
    ReviewRating,
    ReviewText,
    CreatedAt,
    PaidAt,
    ShippedAt,
    DeliveredAt,
    CompletedAt,
}
