use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_users_table::Migration),
            Box::new(m20240301_000002_create_tables_and_reservations::Migration),
            Box::new(m20240301_000003_create_menu_tables::Migration),
            Box::new(m20240301_000004_create_orders_tables::Migration),
            Box::new(m20240301_000005_create_fulfilment_tables::Migration),
            Box::new(m20240301_000006_create_reviews_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_users_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Email)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::FirstName).string_len(100).not_null())
                        .col(ColumnDef::new(Users::LastName).string_len(100).not_null())
                        .col(ColumnDef::new(Users::Phone).string_len(20).not_null())
                        .col(ColumnDef::new(Users::Address).string_len(100).null())
                        .col(ColumnDef::new(Users::DateOfBirth).date().null())
                        .col(
                            ColumnDef::new(Users::Role)
                                .string_len(20)
                                .not_null()
                                .default("customer"),
                        )
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_users_role")
                        .table(Users::Table)
                        .col(Users::Role)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Users {
        Table,
        Id,
        Email,
        PasswordHash,
        FirstName,
        LastName,
        Phone,
        Address,
        DateOfBirth,
        Role,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_tables_and_reservations {

    use super::m20240301_000001_create_users_table::Users;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_tables_and_reservations"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(RestaurantTables::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(RestaurantTables::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(RestaurantTables::TableNumber)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(RestaurantTables::Seats).integer().not_null())
                        .col(
                            ColumnDef::new(RestaurantTables::XPosition)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RestaurantTables::YPosition)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(RestaurantTables::QrToken)
                                .string_len(64)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(RestaurantTables::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Reservations::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reservations::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Reservations::UserId).uuid().null())
                        .col(ColumnDef::new(Reservations::TableId).integer().not_null())
                        .col(ColumnDef::new(Reservations::Date).date().not_null())
                        .col(ColumnDef::new(Reservations::Time).time().not_null())
                        .col(ColumnDef::new(Reservations::PartySize).integer().not_null())
                        .col(
                            ColumnDef::new(Reservations::FullName)
                                .string_len(100)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Reservations::Phone).string_len(20).not_null())
                        .col(ColumnDef::new(Reservations::Email).string_len(100).not_null())
                        .col(ColumnDef::new(Reservations::SpecialRequests).text().null())
                        .col(
                            ColumnDef::new(Reservations::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Reservations::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reservations::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservations_table_id")
                                .from(Reservations::Table, Reservations::TableId)
                                .to(RestaurantTables::Table, RestaurantTables::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_reservations_user_id")
                                .from(Reservations::Table, Reservations::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            // Overlap checks scan one table's bookings for one date
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservations_table_date")
                        .table(Reservations::Table)
                        .col(Reservations::TableId)
                        .col(Reservations::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservations_user_id")
                        .table(Reservations::Table)
                        .col(Reservations::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reservations_status")
                        .table(Reservations::Table)
                        .col(Reservations::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reservations::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(RestaurantTables::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum RestaurantTables {
        Table,
        Id,
        TableNumber,
        Seats,
        XPosition,
        YPosition,
        QrToken,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Reservations {
        Table,
        Id,
        UserId,
        TableId,
        Date,
        Time,
        PartySize,
        FullName,
        Phone,
        Email,
        SpecialRequests,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000003_create_menu_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_menu_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(MenuCategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuCategories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MenuCategories::Name)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(MenuCategories::Slug)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MenuSubcategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuSubcategories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MenuSubcategories::CategoryId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(MenuSubcategories::Name)
                                .string_len(100)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_menu_subcategories_category_id")
                                .from(MenuSubcategories::Table, MenuSubcategories::CategoryId)
                                .to(MenuCategories::Table, MenuCategories::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(MenuItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(MenuItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(MenuItems::SubcategoryId)
                                .integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(MenuItems::Name).string_len(100).not_null())
                        .col(ColumnDef::new(MenuItems::Description).text().not_null())
                        .col(
                            ColumnDef::new(MenuItems::Price)
                                .decimal_len(10, 2)
                                .not_null(),
                        )
                        .col(ColumnDef::new(MenuItems::ImageUrl).string_len(300).null())
                        .col(
                            ColumnDef::new(MenuItems::IsAvailable)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_menu_items_subcategory_id")
                                .from(MenuItems::Table, MenuItems::SubcategoryId)
                                .to(MenuSubcategories::Table, MenuSubcategories::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Promotions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Promotions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Promotions::ItemId).integer().not_null())
                        .col(ColumnDef::new(Promotions::Title).string_len(100).not_null())
                        .col(ColumnDef::new(Promotions::Description).text().not_null())
                        .col(ColumnDef::new(Promotions::StartDate).date().not_null())
                        .col(ColumnDef::new(Promotions::EndDate).date().not_null())
                        .col(
                            ColumnDef::new(Promotions::DiscountPercent)
                                .decimal_len(8, 4)
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_promotions_item_id")
                                .from(Promotions::Table, Promotions::ItemId)
                                .to(MenuItems::Table, MenuItems::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_promotions_item_id")
                        .table(Promotions::Table)
                        .col(Promotions::ItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Promotions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MenuItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MenuSubcategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MenuCategories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MenuCategories {
        Table,
        Id,
        Name,
        Slug,
    }

    #[derive(DeriveIden)]
    enum MenuSubcategories {
        Table,
        Id,
        CategoryId,
        Name,
    }

    #[derive(DeriveIden)]
    pub(super) enum MenuItems {
        Table,
        Id,
        SubcategoryId,
        Name,
        Description,
        Price,
        ImageUrl,
        IsAvailable,
    }

    #[derive(DeriveIden)]
    pub(super) enum Promotions {
        Table,
        Id,
        ItemId,
        Title,
        Description,
        StartDate,
        EndDate,
        DiscountPercent,
    }
}

mod m20240301_000004_create_orders_tables {

    use super::m20240301_000001_create_users_table::Users;
    use super::m20240301_000003_create_menu_tables::{MenuItems, Promotions};
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_orders_tables"
        }
    }

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
                        .col(ColumnDef::new(Orders::UserId).uuid().null())
                        .col(ColumnDef::new(Orders::SessionId).string_len(64).null())
                        .col(
                            ColumnDef::new(Orders::OrderType)
                                .string_len(20)
                                .not_null()
                                .default("delivery"),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(Orders::Total)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_orders_user_id")
                                .from(Orders::Table, Orders::UserId)
                                .to(Users::Table, Users::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_user_id")
                        .table(Orders::Table)
                        .col(Orders::UserId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ItemId).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Price)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Subtotal)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(OrderItems::PromotionId).integer().null())
                        .col(
                            ColumnDef::new(OrderItems::MeatTopping)
                                .string_len(50)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(OrderItems::ExtraToppings)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_item_id")
                                .from(OrderItems::Table, OrderItems::ItemId)
                                .to(MenuItems::Table, MenuItems::Id)
                                .on_delete(ForeignKeyAction::Restrict)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_promotion_id")
                                .from(OrderItems::Table, OrderItems::PromotionId)
                                .to(Promotions::Table, Promotions::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        UserId,
        SessionId,
        OrderType,
        Status,
        Total,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ItemId,
        Quantity,
        Price,
        Subtotal,
        PromotionId,
        MeatTopping,
        ExtraToppings,
    }
}

mod m20240301_000005_create_fulfilment_tables {

    use super::m20240301_000004_create_orders_tables::Orders;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000005_create_fulfilment_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Deliveries::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Deliveries::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Deliveries::OrderId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Deliveries::Address).text().not_null())
                        .col(
                            ColumnDef::new(Deliveries::Fee)
                                .decimal_len(8, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Deliveries::DeliveryStatus)
                                .string_len(20)
                                .not_null()
                                .default("preparing_order"),
                        )
                        .col(ColumnDef::new(Deliveries::ArrivalTime).time().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_deliveries_order_id")
                                .from(Deliveries::Table, Deliveries::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Takeouts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Takeouts::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Takeouts::OrderId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Takeouts::Fee)
                                .decimal_len(8, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Takeouts::PickupTime).time().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_takeouts_order_id")
                                .from(Takeouts::Table, Takeouts::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Transactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Transactions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        // A second checkout of the same order trips this constraint
                        .col(
                            ColumnDef::new(Transactions::OrderId)
                                .integer()
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Transactions::Amount)
                                .decimal_len(10, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Transactions::PaymentMethod)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Transactions::CardName).string_len(100).null())
                        .col(ColumnDef::new(Transactions::CardLast4).string_len(4).null())
                        .col(
                            ColumnDef::new(Transactions::Status)
                                .string_len(20)
                                .not_null()
                                .default("in_progress"),
                        )
                        .col(
                            ColumnDef::new(Transactions::TransactionDate)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_transactions_order_id")
                                .from(Transactions::Table, Transactions::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Transactions::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Takeouts::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Deliveries::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Deliveries {
        Table,
        Id,
        OrderId,
        Address,
        Fee,
        DeliveryStatus,
        ArrivalTime,
    }

    #[derive(DeriveIden)]
    enum Takeouts {
        Table,
        Id,
        OrderId,
        Fee,
        PickupTime,
    }

    #[derive(DeriveIden)]
    enum Transactions {
        Table,
        Id,
        OrderId,
        Amount,
        PaymentMethod,
        CardName,
        CardLast4,
        Status,
        TransactionDate,
    }
}

mod m20240301_000006_create_reviews_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000006_create_reviews_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Reviews::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Reviews::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Reviews::UserName).string_len(100).not_null())
                        .col(ColumnDef::new(Reviews::Email).string_len(100).not_null())
                        .col(ColumnDef::new(Reviews::Title).string_len(100).not_null())
                        .col(ColumnDef::new(Reviews::Text).text().not_null())
                        .col(ColumnDef::new(Reviews::Rating).integer().not_null())
                        .col(
                            ColumnDef::new(Reviews::DishesOrdered)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Reviews::DateOfVisit).date().not_null())
                        .col(
                            ColumnDef::new(Reviews::WouldRecommend)
                                .string_len(10)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Reviews::IsVerified)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Reviews::HelpfulCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Reviews::SubmittedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_reviews_verified")
                        .table(Reviews::Table)
                        .col(Reviews::IsVerified)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Reviews::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Reviews {
        Table,
        Id,
        UserName,
        Email,
        Title,
        Text,
        Rating,
        DishesOrdered,
        DateOfVisit,
        WouldRecommend,
        IsVerified,
        HelpfulCount,
        SubmittedAt,
    }
}
