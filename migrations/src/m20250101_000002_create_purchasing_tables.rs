use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrders::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::PoNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::SupplierName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::SupplierContact)
                            .string()
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseOrders::OrderDate).date().not_null())
                    .col(
                        ColumnDef::new(PurchaseOrders::ExpectedDelivery)
                            .date()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::PaymentStatus)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::StorageLocation)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::TotalAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(PurchaseOrders::Notes).text().null())
                    .col(
                        ColumnDef::new(PurchaseOrders::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrders::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PurchaseOrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderItems::PoId).uuid().not_null())
                    .col(ColumnDef::new(PurchaseOrderItems::ProductId).uuid().null())
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ProductName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::CategoryId)
                            .uuid()
                            .null(),
                    )
                    .col(ColumnDef::new(PurchaseOrderItems::BrandId).uuid().null())
                    .col(ColumnDef::new(PurchaseOrderItems::ModelId).uuid().null())
                    .col(
                        ColumnDef::new(PurchaseOrderItems::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::CostPrice)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::ReceivedQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(PurchaseOrderItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_po_items_po")
                            .from(PurchaseOrderItems::Table, PurchaseOrderItems::PoId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Grns::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Grns::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Grns::GrnNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Grns::PoId).uuid().not_null())
                    .col(ColumnDef::new(Grns::PoNumber).string().not_null())
                    .col(ColumnDef::new(Grns::SupplierName).string().not_null())
                    .col(
                        ColumnDef::new(Grns::ReceivedDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Grns::TotalItems)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Grns::TotalQuantity)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Grns::PaymentStatus)
                            .string()
                            .not_null()
                            .default("unpaid"),
                    )
                    .col(ColumnDef::new(Grns::StorageLocation).string().null())
                    .col(ColumnDef::new(Grns::Notes).text().null())
                    .col(ColumnDef::new(Grns::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(Grns::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grns_po")
                            .from(Grns::Table, Grns::PoId)
                            .to(PurchaseOrders::Table, PurchaseOrders::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GrnItems::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(GrnItems::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(GrnItems::GrnId).uuid().not_null())
                    .col(ColumnDef::new(GrnItems::ProductId).uuid().null())
                    .col(ColumnDef::new(GrnItems::ProductName).string().not_null())
                    .col(
                        ColumnDef::new(GrnItems::QuantityReceived)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GrnItems::QuantityDamaged)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(GrnItems::DamageReason).string().null())
                    .col(ColumnDef::new(GrnItems::CostPrice).double().not_null())
                    .col(
                        ColumnDef::new(GrnItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_grn_items_grn")
                            .from(GrnItems::Table, GrnItems::GrnId)
                            .to(Grns::Table, Grns::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(DamagedItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DamagedItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DamagedItems::PoId).uuid().not_null())
                    .col(ColumnDef::new(DamagedItems::PoItemId).uuid().not_null())
                    .col(
                        ColumnDef::new(DamagedItems::ProductName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(DamagedItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(DamagedItems::DamageReason).string().null())
                    .col(
                        ColumnDef::new(DamagedItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DamagedItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(GrnItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Grns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrderItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PurchaseOrders::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum PurchaseOrders {
    Table,
    Id,
    PoNumber,
    SupplierName,
    SupplierContact,
    OrderDate,
    ExpectedDelivery,
    Status,
    PaymentStatus,
    StorageLocation,
    TotalAmount,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PurchaseOrderItems {
    Table,
    Id,
    PoId,
    ProductId,
    ProductName,
    CategoryId,
    BrandId,
    ModelId,
    Quantity,
    CostPrice,
    ReceivedQuantity,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Grns {
    Table,
    Id,
    GrnNumber,
    PoId,
    PoNumber,
    SupplierName,
    ReceivedDate,
    TotalItems,
    TotalQuantity,
    PaymentStatus,
    StorageLocation,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GrnItems {
    Table,
    Id,
    GrnId,
    ProductId,
    ProductName,
    QuantityReceived,
    QuantityDamaged,
    DamageReason,
    CostPrice,
    CreatedAt,
}

#[derive(DeriveIden)]
enum DamagedItems {
    Table,
    Id,
    PoId,
    PoItemId,
    ProductName,
    Quantity,
    DamageReason,
    CreatedAt,
}
