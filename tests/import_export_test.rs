//! Bulk import/export: auto-created references, error collection, opening
//! movements and the export → re-import round trip.

mod common;

use cellstock_api::entities::{brand, category, product, stock_movement};
use cellstock_api::services::catalog::ProductFilter;
use cellstock_api::services::imports::ImportOptions;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

const CSV: &str = "\
sku,name,category_name,brand_name,model_name,cost_price,selling_price,mrp,current_stock,min_stock_level,status
SKU-A,Galaxy S24,Smartphones,Samsung,Galaxy S24,600,750,799,10,5,active
SKU-B,Galaxy Buds,Accessories,Samsung,,80,120,129,25,10,active
";

#[tokio::test]
async fn import_creates_products_and_reference_rows() {
    let (db, services) = common::setup().await;

    let report = services
        .imports
        .import_products(CSV.as_bytes(), ImportOptions::default(), "importer")
        .await
        .unwrap();

    assert_eq!(report.imported, 2);
    assert_eq!(report.updated, 0);
    assert_eq!(report.created_categories, 2);
    // The brand cache prevents a duplicate Samsung row.
    assert_eq!(report.created_brands, 1);
    assert_eq!(report.created_models, 1);
    assert!(report.errors.is_empty());

    assert_eq!(
        brand::Entity::find()
            .filter(brand::Column::Name.eq("Samsung"))
            .all(&*db)
            .await
            .unwrap()
            .len(),
        1
    );
    assert_eq!(category::Entity::find().all(&*db).await.unwrap().len(), 2);

    // Imported stock satisfies the ledger invariant via opening movements.
    let imported = product::Entity::find()
        .filter(product::Column::Sku.eq("SKU-A"))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(imported.current_stock, 10);
    assert_eq!(imported.opening_stock, 10);
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(imported.id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, "opening_stock");
    assert_eq!(movements[0].quantity, 10);
}

#[tokio::test]
async fn skip_errors_collects_bad_rows_and_continues() {
    let (db, services) = common::setup().await;

    let csv = "\
sku,name,cost_price
SKU-1,Good Phone,100
SKU-2,,50
SKU-3,Priced Wrong,abc
SKU-4,Also Good,75
";
    let report = services
        .imports
        .import_products(csv.as_bytes(), ImportOptions::default(), "importer")
        .await
        .unwrap();

    assert_eq!(report.imported, 2);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].contains("Row 3"));
    assert!(report.errors[1].contains("Row 4"));
    assert_eq!(product::Entity::find().all(&*db).await.unwrap().len(), 2);
}

#[tokio::test]
async fn strict_mode_aborts_the_whole_batch() {
    let (db, services) = common::setup().await;

    let csv = "\
sku,name,cost_price
SKU-1,Good Phone,100
SKU-2,,50
";
    let options = ImportOptions {
        skip_errors: false,
        ..ImportOptions::default()
    };
    services
        .imports
        .import_products(csv.as_bytes(), options, "importer")
        .await
        .unwrap_err();

    // The valid first row rolled back too.
    assert!(product::Entity::find().all(&*db).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_sku_without_update_flag_is_reported() {
    let (_db, services) = common::setup().await;

    services
        .imports
        .import_products(CSV.as_bytes(), ImportOptions::default(), "importer")
        .await
        .unwrap();
    let report = services
        .imports
        .import_products(CSV.as_bytes(), ImportOptions::default(), "importer")
        .await
        .unwrap();

    assert_eq!(report.imported, 0);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].contains("SKU already exists"));
}

#[tokio::test]
async fn export_then_reimport_preserves_field_values() {
    let (db, services) = common::setup().await;

    services
        .imports
        .import_products(CSV.as_bytes(), ImportOptions::default(), "importer")
        .await
        .unwrap();

    let file = services
        .reports
        .export_products(ProductFilter::default(), None)
        .await
        .unwrap();
    assert!(file.filename.starts_with("products_export_"));

    // Re-import the export with update-existing: same rows, same values.
    let options = ImportOptions {
        update_existing: true,
        ..ImportOptions::default()
    };
    let report = services
        .imports
        .import_products(&file.bytes, options, "importer")
        .await
        .unwrap();
    assert_eq!(report.imported, 0);
    assert_eq!(report.updated, 2);
    assert!(report.errors.is_empty());

    let round_tripped = product::Entity::find()
        .filter(product::Column::Sku.eq("SKU-A"))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(round_tripped.name, "Galaxy S24");
    assert_eq!(round_tripped.cost_price, 600.0);
    assert_eq!(round_tripped.selling_price, 750.0);
    assert_eq!(round_tripped.mrp, 799.0);
    assert_eq!(round_tripped.current_stock, 10);
    assert_eq!(round_tripped.min_stock_level, 5);
    assert_eq!(round_tripped.status, "active");

    // Unchanged stock means no corrective adjustment was written.
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(round_tripped.id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
}

#[tokio::test]
async fn preview_validates_without_writing() {
    let (db, services) = common::setup().await;

    let csv = "\
sku,name
SKU-1,Phone
SKU-2,
";
    let preview = services.imports.preview(csv.as_bytes()).unwrap();
    assert_eq!(preview.total_rows, 2);
    assert_eq!(preview.valid_count, 1);
    assert_eq!(preview.error_count, 1);
    assert!(preview.errors[0].contains("Row 3"));

    assert!(product::Entity::find().all(&*db).await.unwrap().is_empty());
}
