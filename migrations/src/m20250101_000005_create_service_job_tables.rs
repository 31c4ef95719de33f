use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ServiceJobs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceJobs::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceJobs::JobNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ServiceJobs::CustomerName).string().not_null())
                    .col(ColumnDef::new(ServiceJobs::CustomerPhone).string().null())
                    .col(ColumnDef::new(ServiceJobs::CustomerId).uuid().null())
                    .col(ColumnDef::new(ServiceJobs::DeviceName).string().not_null())
                    .col(ColumnDef::new(ServiceJobs::Imei).string().null())
                    .col(
                        ColumnDef::new(ServiceJobs::ProblemDescription)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceJobs::Status)
                            .string()
                            .not_null()
                            .default("received"),
                    )
                    .col(
                        ColumnDef::new(ServiceJobs::EstimatedCost)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ServiceJobs::AdvancePaid)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(ServiceJobs::TotalCost)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(ServiceJobs::Notes).text().null())
                    .col(
                        ColumnDef::new(ServiceJobs::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceJobs::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceStatusHistory::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceStatusHistory::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceStatusHistory::JobId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceStatusHistory::FromStatus)
                            .string()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(ServiceStatusHistory::ToStatus)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ServiceStatusHistory::Notes).text().null())
                    .col(
                        ColumnDef::new(ServiceStatusHistory::ChangedBy)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceStatusHistory::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_status_history_job")
                            .from(ServiceStatusHistory::Table, ServiceStatusHistory::JobId)
                            .to(ServiceJobs::Table, ServiceJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServicePartsUsed::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServicePartsUsed::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ServicePartsUsed::JobId).uuid().not_null())
                    .col(
                        ColumnDef::new(ServicePartsUsed::PartName)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServicePartsUsed::Quantity)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServicePartsUsed::UnitCost)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServicePartsUsed::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_parts_job")
                            .from(ServicePartsUsed::Table, ServicePartsUsed::JobId)
                            .to(ServiceJobs::Table, ServiceJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ServiceLaborCharges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ServiceLaborCharges::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceLaborCharges::JobId)
                            .uuid()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceLaborCharges::Description)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceLaborCharges::Amount)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ServiceLaborCharges::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_service_labor_job")
                            .from(ServiceLaborCharges::Table, ServiceLaborCharges::JobId)
                            .to(ServiceJobs::Table, ServiceJobs::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ServiceLaborCharges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServicePartsUsed::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServiceStatusHistory::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(ServiceJobs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ServiceJobs {
    Table,
    Id,
    JobNumber,
    CustomerName,
    CustomerPhone,
    CustomerId,
    DeviceName,
    Imei,
    ProblemDescription,
    Status,
    EstimatedCost,
    AdvancePaid,
    TotalCost,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum ServiceStatusHistory {
    Table,
    Id,
    JobId,
    FromStatus,
    ToStatus,
    Notes,
    ChangedBy,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ServicePartsUsed {
    Table,
    Id,
    JobId,
    PartName,
    Quantity,
    UnitCost,
    CreatedAt,
}

#[derive(DeriveIden)]
enum ServiceLaborCharges {
    Table,
    Id,
    JobId,
    Description,
    Amount,
    CreatedAt,
}
