//! Stock-ledger behavior: opening stock, adjustments, damage write-offs and
//! the running-balance reconstruction.

mod common;

use cellstock_api::entities::stock_movement::{self, MovementType};
use cellstock_api::entities::product;
use cellstock_api::errors::ServiceError;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

/// Recompute the ledger sum and compare with the materialized stock.
/// Opening movements record the seed itself and are excluded from the sum.
async fn assert_stock_conserved(db: &sea_orm::DatabaseConnection, product_id: uuid::Uuid) {
    let item = product::Entity::find_by_id(product_id)
        .one(db)
        .await
        .unwrap()
        .unwrap();
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(product_id))
        .all(db)
        .await
        .unwrap();

    let ledger_sum: i32 = movements
        .iter()
        .filter(|m| MovementType::parse(&m.movement_type) != Some(MovementType::OpeningStock))
        .map(|m| m.quantity)
        .sum();

    assert_eq!(
        item.current_stock,
        item.opening_stock + ledger_sum,
        "current_stock must equal opening_stock plus the ledger sum"
    );
}

#[tokio::test]
async fn opening_stock_seeds_ledger_and_history() {
    let (db, services) = common::setup().await;

    let created = services
        .catalog
        .create_product(common::sample_product("Pixel 9", 10), "tester")
        .await
        .unwrap();
    assert_eq!(created.current_stock, 10);

    let history = services.stock.stock_history(created.id).await.unwrap();
    assert_eq!(history.product_name, "Pixel 9");
    assert_eq!(history.history.len(), 1);

    let entry = &history.history[0];
    assert_eq!(entry.stock_added, 10);
    assert_eq!(entry.stock_removed, 0);
    assert_eq!(entry.running_balance, 10);

    assert_stock_conserved(&db, created.id).await;
}

#[tokio::test]
async fn zero_opening_stock_writes_no_movement() {
    let (db, services) = common::setup().await;

    let created = services
        .catalog
        .create_product(common::sample_product("Empty Shelf", 0), "tester")
        .await
        .unwrap();

    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(created.id))
        .all(&*db)
        .await
        .unwrap();
    assert!(movements.is_empty());
}

#[tokio::test]
async fn adjustments_change_stock_and_append_movements() {
    let (db, services) = common::setup().await;
    let created = services
        .catalog
        .create_product(common::sample_product("Charger", 10), "tester")
        .await
        .unwrap();

    services
        .stock
        .adjust_stock(created.id, 5, Some("recount".to_string()), "tester")
        .await
        .unwrap();
    services
        .stock
        .adjust_stock(created.id, -3, None, "tester")
        .await
        .unwrap();

    let item = product::Entity::find_by_id(created.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.current_stock, 12);
    assert_stock_conserved(&db, created.id).await;

    let history = services.stock.stock_history(created.id).await.unwrap();
    assert_eq!(history.history.len(), 3);
    assert_eq!(history.history.last().unwrap().running_balance, 12);
}

#[tokio::test]
async fn negative_adjustment_below_zero_is_rejected() {
    let (db, services) = common::setup().await;
    let created = services
        .catalog
        .create_product(common::sample_product("Cable", 2), "tester")
        .await
        .unwrap();

    let err = services
        .stock
        .adjust_stock(created.id, -5, None, "tester")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // Nothing was written.
    let item = product::Entity::find_by_id(created.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.current_stock, 2);
    let history = services.stock.stock_history(created.id).await.unwrap();
    assert_eq!(history.history.len(), 1);
}

#[tokio::test]
async fn damage_write_off_reduces_stock() {
    let (db, services) = common::setup().await;
    let created = services
        .catalog
        .create_product(common::sample_product("Screen Guard", 8), "tester")
        .await
        .unwrap();

    services
        .stock
        .record_damage(created.id, 3, Some("water damage".to_string()), "tester")
        .await
        .unwrap();

    let item = product::Entity::find_by_id(created.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(item.current_stock, 5);
    assert_stock_conserved(&db, created.id).await;

    let history = services.stock.stock_history(created.id).await.unwrap();
    let last = history.history.last().unwrap();
    assert_eq!(last.stock_removed, 3);
    assert_eq!(last.running_balance, 5);
}

#[tokio::test]
async fn product_edit_synthesizes_corrective_adjustment() {
    let (db, services) = common::setup().await;
    let created = services
        .catalog
        .create_product(common::sample_product("Power Bank", 10), "tester")
        .await
        .unwrap();

    let mut update = cellstock_api::services::catalog::ProductUpdate {
        sku: created.sku.clone(),
        name: created.name.clone(),
        category_id: None,
        brand_id: None,
        model_id: None,
        description: None,
        cost_price: created.cost_price,
        selling_price: created.selling_price,
        mrp: created.mrp,
        current_stock: Some(7),
        min_stock_level: created.min_stock_level,
        storage_location: None,
        color: None,
        storage_capacity: None,
        ram: None,
        warranty_period: None,
        supplier_name: None,
        supplier_contact: None,
        status: cellstock_api::entities::product::ProductStatus::Active,
    };
    services
        .catalog
        .update_product(created.id, update.clone(), "tester")
        .await
        .unwrap();

    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(created.id))
        .all(&*db)
        .await
        .unwrap();
    let adjustment = movements
        .iter()
        .find(|m| m.movement_type == "adjustment")
        .expect("corrective adjustment recorded");
    assert_eq!(adjustment.quantity, -3);
    assert_stock_conserved(&db, created.id).await;

    // An edit that does not touch stock adds no movement.
    update.current_stock = None;
    services
        .catalog
        .update_product(created.id, update, "tester")
        .await
        .unwrap();
    let count = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(created.id))
        .all(&*db)
        .await
        .unwrap()
        .len();
    assert_eq!(count, movements.len());
}
