pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_catalog_tables;
mod m20250101_000002_create_purchasing_tables;
mod m20250101_000003_create_stock_ledger_tables;
mod m20250101_000004_create_pos_tables;
mod m20250101_000005_create_service_job_tables;
mod m20250101_000006_create_auth_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_catalog_tables::Migration),
            Box::new(m20250101_000002_create_purchasing_tables::Migration),
            Box::new(m20250101_000003_create_stock_ledger_tables::Migration),
            Box::new(m20250101_000004_create_pos_tables::Migration),
            Box::new(m20250101_000005_create_service_job_tables::Migration),
            Box::new(m20250101_000006_create_auth_tables::Migration),
        ]
    }
}
