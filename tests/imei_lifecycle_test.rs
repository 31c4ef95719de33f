//! IMEI lifecycle: registration, verification, the conditional-update race
//! guard and the sold-delete prohibition.

mod common;

use cellstock_api::entities::pos_sale::TransactionType;
use cellstock_api::entities::product_imei;
use cellstock_api::errors::ServiceError;
use cellstock_api::services::pos::{PosLine, PosRequest};
use sea_orm::EntityTrait;
use uuid::Uuid;

#[tokio::test]
async fn serials_must_be_fifteen_digits() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Phone A", 2), "tester")
        .await
        .unwrap();

    let err = services
        .imei
        .add_serials(item.id, vec!["12345".to_string()], "tester")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    services
        .imei
        .add_serials(item.id, vec!["666666666666666".to_string()], "tester")
        .await
        .unwrap();
}

#[tokio::test]
async fn duplicate_serial_is_a_distinct_conflict() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Phone B", 2), "tester")
        .await
        .unwrap();

    services
        .imei
        .add_serials(item.id, vec!["777777777777777".to_string()], "tester")
        .await
        .unwrap();
    let err = services
        .imei
        .add_serials(item.id, vec!["777777777777777".to_string()], "tester")
        .await
        .unwrap_err();
    match err {
        ServiceError::Conflict(message) => assert!(message.contains("already exists")),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn verify_reports_existence_and_availability() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Phone C", 1), "tester")
        .await
        .unwrap();
    services
        .imei
        .add_serials(item.id, vec!["888888888888888".to_string()], "tester")
        .await
        .unwrap();

    let verification = services.imei.verify(item.id, "888888888888888").await.unwrap();
    assert!(verification.exists);
    assert!(verification.available);

    let verification = services.imei.verify(item.id, "000000000000000").await.unwrap();
    assert!(!verification.exists);
    assert!(!verification.available);
}

#[tokio::test]
async fn status_filter_accepts_the_in_stock_alias() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Phone D", 2), "tester")
        .await
        .unwrap();
    services
        .imei
        .add_serials(
            item.id,
            vec!["121212121212121".to_string(), "212121212121212".to_string()],
            "tester",
        )
        .await
        .unwrap();

    let available = services
        .imei
        .list_by_product(item.id, Some("in_stock"))
        .await
        .unwrap();
    assert_eq!(available.len(), 2);

    let err = services
        .imei
        .list_by_product(item.id, Some("reserved"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn claimed_serial_loses_the_race() {
    let (_db, services) = common::setup().await;
    // Two units in stock, one serial already claimed by another sale: stock
    // passes but the conditional update must catch the serial.
    let item = services
        .catalog
        .create_product(common::sample_product("Phone E", 2), "tester")
        .await
        .unwrap();
    let serials = services
        .imei
        .add_serials(
            item.id,
            vec!["313131313131313".to_string(), "131313131313131".to_string()],
            "tester",
        )
        .await
        .unwrap();

    services
        .imei
        .mark_sold(vec![serials[0].id], Uuid::new_v4(), "tester")
        .await
        .unwrap();

    let err = services
        .pos
        .create_transaction(
            PosRequest {
                transaction_type: TransactionType::Sale,
                customer: None,
                items: vec![PosLine {
                    product_id: item.id,
                    quantity: 1,
                    unit_price: 100.0,
                    imei_ids: vec![serials[0].id],
                    new_serials: vec![],
                }],
                discount_percent: 0.0,
                tax_percent: 0.0,
                payment_method: "cash".to_string(),
                original_sale_id: None,
                notes: None,
            },
            "cashier",
        )
        .await
        .unwrap_err();
    match err {
        ServiceError::Conflict(message) => assert!(message.contains("concurrent")),
        other => panic!("expected conflict, got {:?}", other),
    }

    // The failed sale left no trace.
    assert!(services.pos.list_sales().await.unwrap().is_empty());
}

#[tokio::test]
async fn returning_an_unsold_serial_is_a_conflict() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Phone F", 1), "tester")
        .await
        .unwrap();
    let serials = services
        .imei
        .add_serials(item.id, vec!["414141414141414".to_string()], "tester")
        .await
        .unwrap();

    let err = services
        .imei
        .mark_returned(vec![serials[0].id], "tester")
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn sold_serials_cannot_be_deleted() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Phone G", 2), "tester")
        .await
        .unwrap();
    let serials = services
        .imei
        .add_serials(
            item.id,
            vec!["515151515151515".to_string(), "616161616161616".to_string()],
            "tester",
        )
        .await
        .unwrap();

    services
        .imei
        .mark_sold(vec![serials[0].id], Uuid::new_v4(), "tester")
        .await
        .unwrap();

    let err = services.imei.delete(serials[0].id, "tester").await.unwrap_err();
    assert!(matches!(err, ServiceError::InvalidOperation(_)));

    // An available serial deletes cleanly.
    services.imei.delete(serials[1].id, "tester").await.unwrap();
    assert!(product_imei::Entity::find_by_id(serials[1].id)
        .one(&*db)
        .await
        .unwrap()
        .is_none());
}
