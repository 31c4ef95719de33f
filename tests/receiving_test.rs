//! Purchase-order receiving: GRN generation, product resolution, status
//! derivation and schema-bootstrap idempotence.

mod common;

use cellstock_api::entities::{product, product_imei, purchase_order_item, stock_movement};
use cellstock_api::services::procurement::{
    NewPurchaseOrder, NewPurchaseOrderItem, ReceiveLine, ReceiveRequest,
};
use chrono::NaiveDate;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

fn po_input(po_number: &str, items: Vec<NewPurchaseOrderItem>) -> NewPurchaseOrder {
    NewPurchaseOrder {
        po_number: po_number.to_string(),
        supplier_name: "Tech Distributors Ltd".to_string(),
        supplier_contact: Some("+1234567890".to_string()),
        order_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
        expected_delivery: None,
        total_amount: 0.0,
        notes: None,
        items,
    }
}

fn line(product_id: Option<uuid::Uuid>, name: &str, quantity: i32, cost: f64) -> NewPurchaseOrderItem {
    NewPurchaseOrderItem {
        product_id,
        product_name: name.to_string(),
        category_id: None,
        brand_id: None,
        model_id: None,
        quantity,
        cost_price: cost,
    }
}

fn receive_all(po_item_id: uuid::Uuid, received: i32, damaged: i32) -> ReceiveRequest {
    ReceiveRequest {
        payment_status: None,
        storage_location: Some("A1".to_string()),
        items: vec![ReceiveLine {
            po_item_id,
            received_quantity: received,
            damaged_quantity: damaged,
            damage_reason: if damaged > 0 {
                Some("crushed box".to_string())
            } else {
                None
            },
            imei_numbers: vec![],
        }],
    }
}

#[tokio::test]
async fn receiving_a_new_line_creates_the_product() {
    let (db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(po_input("PO-1001", vec![line(None, "Galaxy A15", 5, 100.0)]), "tester")
        .await
        .unwrap();

    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();
    let po_item = &detail.items[0];

    let outcome = services
        .procurement
        .receive_purchase_order(order.id, receive_all(po_item.id, 5, 0), "tester")
        .await
        .unwrap();

    assert_eq!(outcome.status, "completed");
    assert_eq!(outcome.total_received, 5);
    assert_eq!(outcome.damaged_count, 0);
    assert!(outcome.grn_number.starts_with("GRN-"));

    // Exactly one product synthesized with the markup defaults.
    let created = product::Entity::find()
        .filter(product::Column::Name.eq("Galaxy A15"))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(created.len(), 1);
    let created = &created[0];
    assert_eq!(created.current_stock, 5);
    assert_eq!(created.opening_stock, 5);
    assert_eq!(created.selling_price, 120.0);
    assert_eq!(created.mrp, 130.0);
    assert_eq!(created.storage_location.as_deref(), Some("A1"));

    // PO item retro-fitted to reference it.
    let refreshed = purchase_order_item::Entity::find_by_id(po_item.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.product_id, Some(created.id));
    assert_eq!(refreshed.received_quantity, 5);

    // One purchase movement of +5.
    let movements = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(created.id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].movement_type, "purchase");
    assert_eq!(movements[0].quantity, 5);

    // GRN totals recomputed.
    let grn = services.procurement.get_grn(outcome.grn_id).await.unwrap();
    assert_eq!(grn.grn.total_items, 1);
    assert_eq!(grn.grn.total_quantity, 5);
    assert_eq!(grn.items.len(), 1);
}

#[tokio::test]
async fn partial_receipt_derives_partial_status() {
    let (_db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(po_input("PO-1002", vec![line(None, "Redmi 13", 5, 80.0)]), "tester")
        .await
        .unwrap();
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();
    let po_item_id = detail.items[0].id;

    let outcome = services
        .procurement
        .receive_purchase_order(order.id, receive_all(po_item_id, 3, 0), "tester")
        .await
        .unwrap();
    assert_eq!(outcome.status, "partial");

    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();
    assert_eq!(detail.order.status, "partial");
    assert_eq!(detail.items[0].received_quantity, 3);

    // Receiving the rest completes the order.
    let outcome = services
        .procurement
        .receive_purchase_order(order.id, receive_all(po_item_id, 2, 0), "tester")
        .await
        .unwrap();
    assert_eq!(outcome.status, "completed");
}

#[tokio::test]
async fn damaged_units_never_enter_saleable_stock() {
    let (db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(po_input("PO-1003", vec![line(None, "Tempered Glass", 10, 5.0)]), "tester")
        .await
        .unwrap();
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();

    let outcome = services
        .procurement
        .receive_purchase_order(order.id, receive_all(detail.items[0].id, 7, 3), "tester")
        .await
        .unwrap();

    // Good + damaged count against the ordered quantity.
    assert_eq!(outcome.status, "completed");
    assert_eq!(outcome.damaged_count, 1);

    let created = product::Entity::find()
        .filter(product::Column::Name.eq("Tempered Glass"))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(created.current_stock, 7);

    let grn = services.procurement.get_grn(outcome.grn_id).await.unwrap();
    assert_eq!(grn.items[0].quantity_received, 7);
    assert_eq!(grn.items[0].quantity_damaged, 3);
    // GRN total counts good units only.
    assert_eq!(grn.grn.total_quantity, 7);
}

#[tokio::test]
async fn over_receipt_is_accepted_and_completes_the_order() {
    let (_db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(po_input("PO-1004", vec![line(None, "SIM Tray", 5, 2.0)]), "tester")
        .await
        .unwrap();
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();

    let outcome = services
        .procurement
        .receive_purchase_order(order.id, receive_all(detail.items[0].id, 8, 0), "tester")
        .await
        .unwrap();
    assert_eq!(outcome.status, "completed");
    assert_eq!(outcome.total_received, 8);

    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();
    assert_eq!(detail.items[0].received_quantity, 8);
}

#[tokio::test]
async fn receiving_registers_supplied_serials() {
    let (db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(po_input("PO-1005", vec![line(None, "iPhone 15", 2, 700.0)]), "tester")
        .await
        .unwrap();
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();

    let request = ReceiveRequest {
        payment_status: None,
        storage_location: None,
        items: vec![ReceiveLine {
            po_item_id: detail.items[0].id,
            received_quantity: 2,
            damaged_quantity: 0,
            damage_reason: None,
            imei_numbers: vec!["111111111111111".to_string(), "222222222222222".to_string()],
        }],
    };
    let outcome = services
        .procurement
        .receive_purchase_order(order.id, request, "tester")
        .await
        .unwrap();

    let serials = product_imei::Entity::find()
        .filter(product_imei::Column::GrnId.eq(outcome.grn_id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(serials.len(), 2);
    assert!(serials.iter().all(|s| s.status == "available"));
    assert!(serials.iter().all(|s| s.stock_movement_id.is_some()));
}

#[tokio::test]
async fn invalid_serial_rolls_back_the_whole_receipt() {
    let (db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(po_input("PO-1006", vec![line(None, "Nokia 3310", 1, 30.0)]), "tester")
        .await
        .unwrap();
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();

    let request = ReceiveRequest {
        payment_status: None,
        storage_location: None,
        items: vec![ReceiveLine {
            po_item_id: detail.items[0].id,
            received_quantity: 1,
            damaged_quantity: 0,
            damage_reason: None,
            imei_numbers: vec!["not-a-serial".to_string()],
        }],
    };
    services
        .procurement
        .receive_purchase_order(order.id, request, "tester")
        .await
        .unwrap_err();

    // No product, no GRN side effects survive the rollback.
    assert!(product::Entity::find()
        .filter(product::Column::Name.eq("Nokia 3310"))
        .one(&*db)
        .await
        .unwrap()
        .is_none());
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();
    assert_eq!(detail.order.status, "pending");
    assert_eq!(detail.items[0].received_quantity, 0);
    assert!(services.procurement.list_grns().await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_purchase_order_is_not_found() {
    let (_db, services) = common::setup().await;
    let err = services
        .procurement
        .receive_purchase_order(
            uuid::Uuid::new_v4(),
            ReceiveRequest {
                payment_status: None,
                storage_location: None,
                items: vec![],
            },
            "tester",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cellstock_api::errors::ServiceError::NotFound(_)
    ));
}

#[tokio::test]
async fn schema_bootstrap_is_idempotent() {
    let (db, _services) = common::setup().await;

    // Re-running the chain and the seed produces no errors and no duplicates.
    cellstock_api::db::run_migrations(&db).await.unwrap();
    let before = cellstock_api::entities::permission::Entity::find()
        .all(&*db)
        .await
        .unwrap()
        .len();
    cellstock_api::db::seed_rbac(&db).await.unwrap();
    let after = cellstock_api::entities::permission::Entity::find()
        .all(&*db)
        .await
        .unwrap()
        .len();
    assert_eq!(before, after);
}
