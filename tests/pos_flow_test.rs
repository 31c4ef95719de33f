//! POS composer: totals, stock effects, IMEI transitions, customer upsert
//! and all-or-nothing rollback.

mod common;

use cellstock_api::entities::pos_sale::TransactionType;
use cellstock_api::entities::{customer, product, product_imei, stock_movement};
use cellstock_api::errors::ServiceError;
use cellstock_api::services::pos::{PosCustomer, PosLine, PosRequest};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

fn request(kind: TransactionType, items: Vec<PosLine>) -> PosRequest {
    PosRequest {
        transaction_type: kind,
        customer: None,
        items,
        discount_percent: 0.0,
        tax_percent: 0.0,
        payment_method: "cash".to_string(),
        original_sale_id: None,
        notes: None,
    }
}

fn plain_line(product_id: Uuid, quantity: i32, unit_price: f64) -> PosLine {
    PosLine {
        product_id,
        quantity,
        unit_price,
        imei_ids: vec![],
        new_serials: vec![],
    }
}

#[tokio::test]
async fn sale_totals_follow_discount_then_tax() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Earbuds", 10), "cashier")
        .await
        .unwrap();

    let mut req = request(TransactionType::Sale, vec![plain_line(item.id, 2, 100.0)]);
    req.discount_percent = 10.0;
    req.tax_percent = 18.0;

    let detail = services.pos.create_transaction(req, "cashier").await.unwrap();

    // 200 - 20 discount = 180 taxable; 180 * 18% = 32.4 tax; total 212.4
    assert_eq!(detail.sale.subtotal, 200.0);
    assert_eq!(detail.sale.discount_amount, 20.0);
    assert_eq!(detail.sale.tax_amount, 32.4);
    assert_eq!(detail.sale.total, 212.4);
    assert!(detail.sale.invoice_number.starts_with("INV-"));
    assert_eq!(detail.items.len(), 1);
    assert_eq!(detail.items[0].line_total, 200.0);
}

#[tokio::test]
async fn return_stores_negative_magnitudes_and_restocks() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Adapter", 5), "cashier")
        .await
        .unwrap();

    let detail = services
        .pos
        .create_transaction(
            request(TransactionType::Return, vec![plain_line(item.id, 2, 50.0)]),
            "cashier",
        )
        .await
        .unwrap();

    assert_eq!(detail.sale.subtotal, -100.0);
    assert_eq!(detail.sale.total, -100.0);
    assert!(detail.sale.invoice_number.starts_with("RET-"));

    let refreshed = product::Entity::find_by_id(item.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.current_stock, 7);

    // The return movement is positive in the reconciled ledger.
    let movement = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(item.id))
        .filter(stock_movement::Column::MovementType.eq("return"))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.quantity, 2);
}

#[tokio::test]
async fn insufficient_stock_aborts_everything() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Rare Phone", 1), "cashier")
        .await
        .unwrap();

    let mut req = request(TransactionType::Sale, vec![plain_line(item.id, 2, 500.0)]);
    req.customer = Some(PosCustomer {
        name: "Walk-in".to_string(),
        phone: Some("+911234567890".to_string()),
        email: None,
    });

    let err = services.pos.create_transaction(req, "cashier").await.unwrap_err();
    assert!(matches!(err, ServiceError::InsufficientStock(_)));

    // Stock untouched, no movement, no sale, and the customer upsert rolled
    // back with the rest.
    let refreshed = product::Entity::find_by_id(item.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.current_stock, 1);
    assert!(stock_movement::Entity::find()
        .filter(stock_movement::Column::MovementType.eq("sale"))
        .one(&*db)
        .await
        .unwrap()
        .is_none());
    assert!(services.pos.list_sales().await.unwrap().is_empty());
    assert!(customer::Entity::find()
        .filter(customer::Column::Phone.eq("+911234567890"))
        .one(&*db)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn imei_sale_and_return_round_trip() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Serialized Phone", 1), "cashier")
        .await
        .unwrap();
    let serials = services
        .imei
        .add_serials(item.id, vec!["333333333333333".to_string()], "cashier")
        .await
        .unwrap();
    let imei_id = serials[0].id;

    // Sell the unit by selecting its serial.
    let sale = services
        .pos
        .create_transaction(
            request(
                TransactionType::Sale,
                vec![PosLine {
                    product_id: item.id,
                    quantity: 1,
                    unit_price: 500.0,
                    imei_ids: vec![imei_id],
                    new_serials: vec![],
                }],
            ),
            "cashier",
        )
        .await
        .unwrap();

    let row = product_imei::Entity::find_by_id(imei_id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "sold");
    assert_eq!(row.sale_id, Some(sale.sale.id));
    assert!(row.sold_date.is_some());
    assert_eq!(sale.items[0].imei_numbers.as_deref(), Some("333333333333333"));

    let refreshed = product::Entity::find_by_id(item.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.current_stock, 0);

    // Selling the same serial again loses the availability check.
    let err = services
        .pos
        .create_transaction(
            request(
                TransactionType::Sale,
                vec![PosLine {
                    product_id: item.id,
                    quantity: 1,
                    unit_price: 500.0,
                    imei_ids: vec![imei_id],
                    new_serials: vec![],
                }],
            ),
            "cashier",
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::InsufficientStock(_) | ServiceError::Conflict(_)
    ));

    // Return it against the original sale.
    let mut ret = request(
        TransactionType::Return,
        vec![PosLine {
            product_id: item.id,
            quantity: 1,
            unit_price: 500.0,
            imei_ids: vec![imei_id],
            new_serials: vec![],
        }],
    );
    ret.original_sale_id = Some(sale.sale.id);
    services.pos.create_transaction(ret, "cashier").await.unwrap();

    let row = product_imei::Entity::find_by_id(imei_id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.status, "available");
    assert!(row.sale_id.is_none());
    assert!(row.sold_date.is_none());

    let refreshed = product::Entity::find_by_id(item.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.current_stock, 1);
}

#[tokio::test]
async fn fresh_serials_enter_inventory_already_sold() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Boxed Phone", 2), "cashier")
        .await
        .unwrap();

    let detail = services
        .pos
        .create_transaction(
            request(
                TransactionType::Sale,
                vec![PosLine {
                    product_id: item.id,
                    quantity: 2,
                    unit_price: 400.0,
                    imei_ids: vec![],
                    new_serials: vec![
                        "444444444444444".to_string(),
                        "555555555555555".to_string(),
                    ],
                }],
            ),
            "cashier",
        )
        .await
        .unwrap();

    let rows = product_imei::Entity::find()
        .filter(product_imei::Column::ProductId.eq(item.id))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == "sold"));
    assert!(rows.iter().all(|r| r.sale_id == Some(detail.sale.id)));
}

#[tokio::test]
async fn customer_is_upserted_by_phone() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Headset", 10), "cashier")
        .await
        .unwrap();

    let mut first = request(TransactionType::Sale, vec![plain_line(item.id, 1, 80.0)]);
    first.customer = Some(PosCustomer {
        name: "Asha".to_string(),
        phone: Some("+919999988888".to_string()),
        email: None,
    });
    services.pos.create_transaction(first, "cashier").await.unwrap();

    let mut second = request(TransactionType::Sale, vec![plain_line(item.id, 1, 80.0)]);
    second.customer = Some(PosCustomer {
        name: "Asha K".to_string(),
        phone: Some("+919999988888".to_string()),
        email: Some("asha@example.com".to_string()),
    });
    services.pos.create_transaction(second, "cashier").await.unwrap();

    let rows = customer::Entity::find()
        .filter(customer::Column::Phone.eq("+919999988888"))
        .all(&*db)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].name, "Asha K");
    assert_eq!(rows[0].email.as_deref(), Some("asha@example.com"));
}

#[tokio::test]
async fn unknown_original_sale_is_rejected() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Speaker", 5), "cashier")
        .await
        .unwrap();

    let mut req = request(TransactionType::Return, vec![plain_line(item.id, 1, 60.0)]);
    req.original_sale_id = Some(Uuid::new_v4());
    let err = services.pos.create_transaction(req, "cashier").await.unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));
}

#[tokio::test]
async fn exchange_decrements_stock() {
    let (db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Trade-in Phone", 3), "cashier")
        .await
        .unwrap();

    let detail = services
        .pos
        .create_transaction(
            request(TransactionType::Exchange, vec![plain_line(item.id, 1, 250.0)]),
            "cashier",
        )
        .await
        .unwrap();
    assert!(detail.sale.invoice_number.starts_with("EXC-"));

    let refreshed = product::Entity::find_by_id(item.id)
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed.current_stock, 2);

    let movement = stock_movement::Entity::find()
        .filter(stock_movement::Column::ProductId.eq(item.id))
        .filter(stock_movement::Column::MovementType.eq("exchange"))
        .one(&*db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(movement.quantity, -1);
}
