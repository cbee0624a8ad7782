//! Integration tests for the public storefront API.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`gl-cli migrate all`)
//! - The storefront server running (`cargo run -p greenleaf-storefront`)
//! - `SHOPIFY_WEBHOOK_SECRET` matching the server for the webhook tests
//! - The admin server and `IT_ADMIN_*` credentials for the order lifecycle tests

use greenleaf_integration_tests::{
    admin_base_url, admin_client, client, shopify_signature, storefront_base_url, unique_suffix,
};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health/ready", storefront_base_url()))
        .send()
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_empty_cart_has_zero_totals() {
    let resp = client()
        .get(format!("{}/api/cart", storefront_base_url()))
        .send()
        .await
        .expect("Failed to get cart");
    assert_eq!(resp.status(), StatusCode::OK);

    let view: Value = resp.json().await.expect("body");
    assert!(view["cart"].is_null());
    let total = view["totals"]["total"].as_str().unwrap_or_default();
    assert!(!total.is_empty() && total.chars().all(|c| c == '0' || c == '.'));
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_unknown_code_rejected() {
    let resp = client()
        .post(format!("{}/api/cart/codes", storefront_base_url()))
        .json(&json!({ "code": format!("NOPE-{}", unique_suffix()) }))
        .send()
        .await
        .expect("Failed to apply code");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_rejects_short_password() {
    let resp = client()
        .post(format!("{}/api/auth/register", storefront_base_url()))
        .json(&json!({
            "email": format!("short-{}@greenleaf.shop", unique_suffix().to_lowercase()),
            "password": "short",
        }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_register_then_account() {
    let client = client();
    let base_url = storefront_base_url();
    let email = format!("member-{}@greenleaf.shop", unique_suffix().to_lowercase());

    let resp = client
        .post(format!("{base_url}/api/auth/register"))
        .json(&json!({ "email": email, "password": "a long enough password" }))
        .send()
        .await
        .expect("Failed to register");
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = client
        .get(format!("{base_url}/api/account"))
        .send()
        .await
        .expect("Failed to get account");
    assert_eq!(resp.status(), StatusCode::OK);
    let account: Value = resp.json().await.expect("body");
    assert_eq!(account["email"], email);

    let resp = client
        .post(format!("{base_url}/api/auth/logout"))
        .send()
        .await
        .expect("Failed to log out");
    assert!(resp.status().is_success());

    let resp = client
        .get(format!("{base_url}/api/account"))
        .send()
        .await
        .expect("Failed to get account");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_donation_summary() {
    let resp = client()
        .get(format!("{}/api/donations/summary", storefront_base_url()))
        .send()
        .await
        .expect("Failed to get summary");
    assert_eq!(resp.status(), StatusCode::OK);
    let summary: Value = resp.json().await.expect("body");
    assert!(summary["count"].is_number());
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_missing_legal_document() {
    let resp = client()
        .get(format!(
            "{}/api/legal/missing-{}",
            storefront_base_url(),
            unique_suffix().to_lowercase()
        ))
        .send()
        .await
        .expect("Failed to get legal document");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server"]
async fn test_webhook_rejects_bad_signature() {
    let resp = client()
        .post(format!("{}/webhooks/shopify", storefront_base_url()))
        .header("x-shopify-topic", "orders/paid")
        .header("x-shopify-webhook-id", unique_suffix())
        .header("x-shopify-hmac-sha256", "bm90IGEgc2lnbmF0dXJl")
        .body("{}")
        .send()
        .await
        .expect("Failed to post webhook");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and SHOPIFY_WEBHOOK_SECRET"]
async fn test_webhook_delivery_is_idempotent() {
    let secret = std::env::var("SHOPIFY_WEBHOOK_SECRET").expect("SHOPIFY_WEBHOOK_SECRET not set");
    let base_url = storefront_base_url();
    let order_id = i64::from(std::process::id()) * 1_000 + 7;

    let body = json!({
        "id": order_id,
        "name": "#IT1001",
        "email": "buyer@greenleaf.shop",
        "currency": "USD",
        "subtotal_price": "41.00",
        "total_price": "41.00",
        "line_items": [
            {
                "id": order_id * 10,
                "product_id": 1,
                "variant_id": 11,
                "title": "Fern",
                "quantity": 2,
                "price": "20.00",
            },
            {
                "id": order_id * 10 + 1,
                "product_id": 2,
                "variant_id": 21,
                "title": "Donation",
                "quantity": 100,
                "price": "0.01",
                "properties": [{ "name": "_donation", "value": "round_up" }],
            },
        ],
    })
    .to_string();
    let signature = shopify_signature(&secret, body.as_bytes());
    let webhook_id = format!("it-{}", unique_suffix());

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let resp = client()
            .post(format!("{base_url}/webhooks/shopify"))
            .header("x-shopify-topic", "orders/paid")
            .header("x-shopify-webhook-id", &webhook_id)
            .header("x-shopify-hmac-sha256", &signature)
            .header("content-type", "application/json")
            .body(body.clone())
            .send()
            .await
            .expect("Failed to post webhook");
        assert_eq!(resp.status(), StatusCode::OK);
        let ack: Value = resp.json().await.expect("body");
        outcomes.push(ack["outcome"].clone());
    }
    assert_eq!(outcomes, vec![json!("processed"), json!("duplicate")]);
}

// =============================================================================
// Order lifecycle: paid, fulfilled, refunded
// =============================================================================

/// Post a signed delivery and return the acknowledged outcome.
async fn deliver(topic: &str, body: &Value) -> Value {
    let secret = std::env::var("SHOPIFY_WEBHOOK_SECRET").expect("SHOPIFY_WEBHOOK_SECRET not set");
    let body = body.to_string();
    let resp = client()
        .post(format!("{}/webhooks/shopify", storefront_base_url()))
        .header("x-shopify-topic", topic)
        .header("x-shopify-webhook-id", format!("it-{}", unique_suffix()))
        .header("x-shopify-hmac-sha256", shopify_signature(&secret, body.as_bytes()))
        .header("content-type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to post webhook");
    assert_eq!(resp.status(), StatusCode::OK);
    let ack: Value = resp.json().await.expect("body");
    ack["outcome"].clone()
}

fn amount(value: &Value) -> f64 {
    value
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .expect("decimal string")
}

fn assert_amount(value: &Value, expected: f64) {
    let actual = amount(value);
    assert!((actual - expected).abs() < 0.001, "expected {expected}, got {actual}");
}

/// Create a 10% affiliate and return `(id, code)`.
async fn create_affiliate(admin: &reqwest::Client) -> (Value, String) {
    let code = format!("IT-{}", unique_suffix());
    let resp = admin
        .post(format!("{}/api/admin/affiliates", admin_base_url()))
        .json(&json!({
            "code": code,
            "name": "Lifecycle Partner",
            "email": "lifecycle@greenleaf.shop",
            "commission_rate": "10",
        }))
        .send()
        .await
        .expect("Failed to create affiliate");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let affiliate: Value = resp.json().await.expect("body");
    (affiliate["id"].clone(), code)
}

/// The affiliate's single commission.
async fn commission(admin: &reqwest::Client, affiliate_id: &Value) -> Value {
    let resp = admin
        .get(format!(
            "{}/api/admin/affiliates/{affiliate_id}/commissions",
            admin_base_url()
        ))
        .send()
        .await
        .expect("Failed to list commissions");
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = resp.json().await.expect("body");
    let commissions = report["commissions"].as_array().expect("commissions");
    assert_eq!(commissions.len(), 1);
    commissions[0].clone()
}

/// Sales counters for one product, paging through the report.
async fn product_sales(admin: &reqwest::Client, product_id: &str) -> Value {
    let mut offset = 0;
    loop {
        let resp = admin
            .get(format!(
                "{}/api/admin/product-sales?limit=200&offset={offset}",
                admin_base_url()
            ))
            .send()
            .await
            .expect("Failed to list product sales");
        assert_eq!(resp.status(), StatusCode::OK);
        let rows: Vec<Value> = resp.json().await.expect("body");
        if let Some(row) = rows.iter().find(|row| row["product_id"] == product_id) {
            return row.clone();
        }
        assert!(!rows.is_empty(), "no sales recorded for {product_id}");
        offset += 200;
    }
}

/// Paid order with two units of one product, a 4.40 round-up donation line
/// and 5.60 shipping.
fn paid_order(order_id: i64, product_id: i64, affiliate_code: &str) -> Value {
    json!({
        "id": order_id,
        "name": format!("#IT{order_id}"),
        "email": "buyer@greenleaf.shop",
        "currency": "USD",
        "subtotal_price": "44.40",
        "total_price": "50.00",
        "note_attributes": [{ "name": "affiliate_code", "value": affiliate_code }],
        "line_items": [
            {
                "id": order_id * 10,
                "product_id": product_id,
                "variant_id": product_id * 10,
                "title": "Lifecycle Fern",
                "quantity": 2,
                "price": "20.00",
            },
            {
                "id": order_id * 10 + 1,
                "product_id": 4410,
                "variant_id": 44100,
                "title": "Donation",
                "quantity": 440,
                "price": "0.01",
                "properties": [{ "name": "_donation", "value": "round_up" }],
            },
        ],
    })
}

fn refund(order_id: i64, refund_id: i64, lines: &[(i64, i32, &str)], refunded: &str) -> Value {
    let lines: Vec<Value> = lines
        .iter()
        .map(|(line_item_id, quantity, subtotal)| {
            json!({
                "line_item_id": line_item_id,
                "quantity": quantity,
                "subtotal": subtotal,
            })
        })
        .collect();
    json!({
        "id": order_id * 100 + refund_id,
        "order_id": order_id,
        "refund_line_items": lines,
        "transactions": [{ "amount": refunded, "kind": "refund", "status": "success" }],
    })
}

fn lifecycle_ids(salt: i64) -> (i64, i64) {
    let base = i64::from(std::process::id()) * 1_000 + salt;
    (base, 9_000_000 + base)
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers, SHOPIFY_WEBHOOK_SECRET and an admin account"]
async fn test_fulfilled_then_full_refund_reverses_commission() {
    let admin = admin_client().await;
    let (affiliate_id, code) = create_affiliate(&admin).await;
    let (order_id, product_id) = lifecycle_ids(101);
    let order = paid_order(order_id, product_id, &code);

    assert_eq!(deliver("orders/paid", &order).await, json!("processed"));
    let pending = commission(&admin, &affiliate_id).await;
    assert_eq!(pending["status"], "pending");
    // The donation line is charged but earns nothing.
    assert_amount(&pending["order_subtotal"], 40.0);
    assert_amount(&pending["amount"], 4.0);

    assert_eq!(deliver("orders/fulfilled", &order).await, json!("processed"));
    assert_eq!(commission(&admin, &affiliate_id).await["status"], "approved");

    let full = refund(order_id, 1, &[(order_id * 10, 2, "40.00")], "50.00");
    assert_eq!(deliver("refunds/create", &full).await, json!("processed"));
    assert_eq!(commission(&admin, &affiliate_id).await["status"], "reversed");

    let sales = product_sales(&admin, &format!("gid://shopify/Product/{product_id}")).await;
    assert_eq!(sales["units_sold"], 0);
    assert_amount(&sales["revenue"], 0.0);
}

#[tokio::test]
#[ignore = "Requires running storefront and admin servers, SHOPIFY_WEBHOOK_SECRET and an admin account"]
async fn test_partial_refunds_reduce_commission_by_returned_merchandise() {
    let admin = admin_client().await;
    let (affiliate_id, code) = create_affiliate(&admin).await;
    let (order_id, product_id) = lifecycle_ids(202);

    assert_eq!(
        deliver("orders/paid", &paid_order(order_id, product_id, &code)).await,
        json!("processed")
    );

    // Shipping-only refund leaves the commission alone.
    let shipping = refund(order_id, 1, &[], "5.60");
    assert_eq!(deliver("refunds/create", &shipping).await, json!("processed"));
    let unchanged = commission(&admin, &affiliate_id).await;
    assert_amount(&unchanged["order_subtotal"], 40.0);
    assert_amount(&unchanged["amount"], 4.0);

    let one_unit = refund(order_id, 2, &[(order_id * 10, 1, "20.00")], "20.00");
    assert_eq!(deliver("refunds/create", &one_unit).await, json!("processed"));
    let reduced = commission(&admin, &affiliate_id).await;
    assert_eq!(reduced["status"], "pending");
    assert_amount(&reduced["order_subtotal"], 20.0);
    assert_amount(&reduced["amount"], 2.0);

    let sales = product_sales(&admin, &format!("gid://shopify/Product/{product_id}")).await;
    assert_eq!(sales["units_sold"], 1);
    assert_amount(&sales["revenue"], 20.0);

    // Returning more than is left floors both counters at zero.
    let too_many = refund(order_id, 3, &[(order_id * 10, 3, "60.00")], "1.00");
    assert_eq!(deliver("refunds/create", &too_many).await, json!("processed"));
    let floored = commission(&admin, &affiliate_id).await;
    assert_amount(&floored["order_subtotal"], 0.0);
    assert_amount(&floored["amount"], 0.0);

    let sales = product_sales(&admin, &format!("gid://shopify/Product/{product_id}")).await;
    assert_eq!(sales["units_sold"], 0);
    assert_amount(&sales["revenue"], 0.0);
}
