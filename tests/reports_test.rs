//! Dashboard statistics and sales summaries.

mod common;

use cellstock_api::entities::pos_sale::TransactionType;
use cellstock_api::services::pos::{PosLine, PosRequest};
use chrono::{Duration, Utc};

async fn sell(
    services: &cellstock_api::handlers::AppServices,
    product_id: uuid::Uuid,
    kind: TransactionType,
    quantity: i32,
    unit_price: f64,
) {
    services
        .pos
        .create_transaction(
            PosRequest {
                transaction_type: kind,
                customer: None,
                items: vec![PosLine {
                    product_id,
                    quantity,
                    unit_price,
                    imei_ids: vec![],
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
        .unwrap();
}

#[tokio::test]
async fn dashboard_counts_low_and_out_of_stock() {
    let (_db, services) = common::setup().await;

    // min_stock_level is 5 in the sample product.
    services
        .catalog
        .create_product(common::sample_product("Healthy", 20), "tester")
        .await
        .unwrap();
    services
        .catalog
        .create_product(common::sample_product("Low", 3), "tester")
        .await
        .unwrap();
    services
        .catalog
        .create_product(common::sample_product("Gone", 0), "tester")
        .await
        .unwrap();

    let stats = services.reports.dashboard_stats().await.unwrap();
    assert_eq!(stats.total_products, 3);
    assert_eq!(stats.low_stock, 2); // "Low" and "Gone"
    assert_eq!(stats.out_of_stock, 1);
    // 20*100 + 3*100 + 0
    assert_eq!(stats.stock_value, 2300.0);
    assert_eq!(stats.low_stock_items.len(), 2);
    assert!(!stats.recent_movements.is_empty());
}

#[tokio::test]
async fn sales_summary_buckets_by_transaction_type() {
    let (_db, services) = common::setup().await;
    let item = services
        .catalog
        .create_product(common::sample_product("Seller", 50), "tester")
        .await
        .unwrap();

    sell(&services, item.id, TransactionType::Sale, 2, 100.0).await;
    sell(&services, item.id, TransactionType::Sale, 1, 100.0).await;
    sell(&services, item.id, TransactionType::Return, 1, 100.0).await;

    let now = Utc::now();
    let summary = services
        .reports
        .sales_summary(now - Duration::hours(1), now + Duration::hours(1))
        .await
        .unwrap();

    let sales = summary
        .buckets
        .iter()
        .find(|b| b.transaction_type == "sale")
        .unwrap();
    assert_eq!(sales.count, 2);
    assert_eq!(sales.total_amount, 300.0);

    let returns = summary
        .buckets
        .iter()
        .find(|b| b.transaction_type == "return")
        .unwrap();
    assert_eq!(returns.count, 1);
    assert_eq!(returns.total_amount, -100.0);

    assert_eq!(summary.net_total, 200.0);
}

#[tokio::test]
async fn inverted_date_range_is_rejected() {
    let (_db, services) = common::setup().await;
    let now = Utc::now();
    let err = services
        .reports
        .sales_summary(now, now - Duration::hours(1))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        cellstock_api::errors::ServiceError::ValidationError(_)
    ));
}

#[tokio::test]
async fn grn_export_includes_line_totals() {
    let (_db, services) = common::setup().await;

    let order = services
        .procurement
        .create_purchase_order(
            cellstock_api::services::procurement::NewPurchaseOrder {
                po_number: "PO-EXPORT".to_string(),
                supplier_name: "Supplier".to_string(),
                supplier_contact: None,
                order_date: chrono::NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
                expected_delivery: None,
                total_amount: 0.0,
                notes: None,
                items: vec![cellstock_api::services::procurement::NewPurchaseOrderItem {
                    product_id: None,
                    product_name: "Exported Item".to_string(),
                    category_id: None,
                    brand_id: None,
                    model_id: None,
                    quantity: 4,
                    cost_price: 25.0,
                }],
            },
            "tester",
        )
        .await
        .unwrap();
    let detail = services.procurement.get_purchase_order(order.id).await.unwrap();
    services
        .procurement
        .receive_purchase_order(
            order.id,
            cellstock_api::services::procurement::ReceiveRequest {
                payment_status: None,
                storage_location: None,
                items: vec![cellstock_api::services::procurement::ReceiveLine {
                    po_item_id: detail.items[0].id,
                    received_quantity: 4,
                    damaged_quantity: 0,
                    damage_reason: None,
                    imei_numbers: vec![],
                }],
            },
            "tester",
        )
        .await
        .unwrap();

    let file = services.reports.export_grns().await.unwrap();
    let text = String::from_utf8(file.bytes).unwrap();
    assert!(text.contains("PO-EXPORT"));
    assert!(text.contains("Exported Item"));
    // 4 units at 25.00
    assert!(text.contains("100.00"));
}
