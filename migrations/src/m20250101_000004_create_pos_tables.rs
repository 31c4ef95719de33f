use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Customers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Customers::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Customers::Name).string().not_null())
                    .col(ColumnDef::new(Customers::Phone).string().null().unique_key())
                    .col(ColumnDef::new(Customers::Email).string().null())
                    .col(ColumnDef::new(Customers::Address).string().null())
                    .col(ColumnDef::new(Customers::City).string().null())
                    .col(ColumnDef::new(Customers::Gstin).string().null())
                    .col(ColumnDef::new(Customers::Notes).text().null())
                    .col(
                        ColumnDef::new(Customers::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(Customers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Customers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PosSales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PosSales::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(PosSales::InvoiceNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PosSales::TransactionType)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PosSales::CustomerId).uuid().null())
                    .col(ColumnDef::new(PosSales::OriginalSaleId).uuid().null())
                    .col(ColumnDef::new(PosSales::Subtotal).double().not_null())
                    .col(
                        ColumnDef::new(PosSales::DiscountPercent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PosSales::DiscountAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PosSales::TaxPercent)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(PosSales::TaxAmount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(PosSales::Total).double().not_null())
                    .col(
                        ColumnDef::new(PosSales::PaymentMethod)
                            .string()
                            .not_null()
                            .default("cash"),
                    )
                    .col(ColumnDef::new(PosSales::Notes).text().null())
                    .col(ColumnDef::new(PosSales::CreatedBy).string().not_null())
                    .col(
                        ColumnDef::new(PosSales::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pos_sales_customer")
                            .from(PosSales::Table, PosSales::CustomerId)
                            .to(Customers::Table, Customers::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PosSaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PosSaleItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PosSaleItems::SaleId).uuid().not_null())
                    .col(ColumnDef::new(PosSaleItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(PosSaleItems::ProductName).string().not_null())
                    .col(ColumnDef::new(PosSaleItems::Quantity).integer().not_null())
                    .col(ColumnDef::new(PosSaleItems::UnitPrice).double().not_null())
                    .col(ColumnDef::new(PosSaleItems::LineTotal).double().not_null())
                    .col(ColumnDef::new(PosSaleItems::ImeiNumbers).text().null())
                    .col(
                        ColumnDef::new(PosSaleItems::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pos_sale_items_sale")
                            .from(PosSaleItems::Table, PosSaleItems::SaleId)
                            .to(PosSales::Table, PosSales::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PosSaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PosSales::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Customers::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Customers {
    Table,
    Id,
    Name,
    Phone,
    Email,
    Address,
    City,
    Gstin,
    Notes,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum PosSales {
    Table,
    Id,
    InvoiceNumber,
    TransactionType,
    CustomerId,
    OriginalSaleId,
    Subtotal,
    DiscountPercent,
    DiscountAmount,
    TaxPercent,
    TaxAmount,
    Total,
    PaymentMethod,
    Notes,
    CreatedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum PosSaleItems {
    Table,
    Id,
    SaleId,
    ProductId,
    ProductName,
    Quantity,
    UnitPrice,
    LineTotal,
    ImeiNumbers,
    CreatedAt,
}
