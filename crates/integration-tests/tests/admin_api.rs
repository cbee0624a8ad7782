//! Integration tests for the back-office API.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database (`gl-cli migrate all`)
//! - The admin server running (`cargo run -p greenleaf-admin`)
//! - `IT_ADMIN_EMAIL` / `IT_ADMIN_PASSWORD` for a `super_admin` account

use greenleaf_integration_tests::{admin_base_url, admin_client, client, unique_suffix};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_health() {
    let resp = client()
        .get(format!("{}/health/ready", admin_base_url()))
        .send()
        .await
        .expect("Failed to reach admin server");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_requires_sign_in() {
    let resp = client()
        .get(format!("{}/api/admin/affiliates", admin_base_url()))
        .send()
        .await
        .expect("Failed to reach admin server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body: Value = resp.json().await.expect("Failed to read body");
    assert!(body["error"].is_string());
}

#[tokio::test]
#[ignore = "Requires running admin server"]
async fn test_login_rejects_bad_password() {
    let resp = client()
        .post(format!("{}/api/admin/auth/login", admin_base_url()))
        .json(&json!({ "email": "nobody@greenleaf.shop", "password": "wrong-password" }))
        .send()
        .await
        .expect("Failed to reach admin server");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running admin server and an admin account"]
async fn test_viewer_cannot_write() {
    let admin = admin_client().await;
    let base_url = admin_base_url();
    let email = format!("viewer-{}@greenleaf.shop", unique_suffix().to_lowercase());

    let resp = admin
        .post(format!("{base_url}/api/admin/admin-users"))
        .json(&json!({
            "email": email,
            "name": "Read Only",
            "role": "viewer",
            "password": "viewer-password",
        }))
        .send()
        .await
        .expect("Failed to create viewer");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let viewer_id = resp.json::<Value>().await.expect("body")["id"].clone();

    let viewer = client();
    let resp = viewer
        .post(format!("{base_url}/api/admin/auth/login"))
        .json(&json!({ "email": email, "password": "viewer-password" }))
        .send()
        .await
        .expect("Failed to log in viewer");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = viewer
        .get(format!("{base_url}/api/admin/volume-discounts"))
        .send()
        .await
        .expect("Failed to list tiers");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = viewer
        .post(format!("{base_url}/api/admin/volume-discounts"))
        .json(&json!({ "min_quantity": 99, "percent": "5" }))
        .send()
        .await
        .expect("Failed to post tier");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = admin
        .delete(format!("{base_url}/api/admin/admin-users/{viewer_id}"))
        .send()
        .await
        .expect("Failed to delete viewer");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running admin server and an admin account"]
async fn test_bundle_validation() {
    let admin = admin_client().await;
    let resp = admin
        .post(format!("{}/api/admin/bundles", admin_base_url()))
        .json(&json!({
            "name": "Solo",
            "product_ids": ["gid://shopify/Product/1", "gid://shopify/Product/1"],
            "percent": "10",
        }))
        .send()
        .await
        .expect("Failed to post bundle");
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running admin server and an admin account"]
async fn test_affiliate_lifecycle() {
    let admin = admin_client().await;
    let base_url = admin_base_url();
    let code = format!("IT-{}", unique_suffix());

    let resp = admin
        .post(format!("{base_url}/api/admin/affiliates"))
        .json(&json!({
            "code": code.to_lowercase(),
            "name": "Integration Partner",
            "email": "partner@greenleaf.shop",
            "commission_rate": "10",
        }))
        .send()
        .await
        .expect("Failed to create affiliate");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let affiliate: Value = resp.json().await.expect("body");
    assert_eq!(affiliate["code"], code);
    let id = affiliate["id"].clone();

    // Same code again
    let resp = admin
        .post(format!("{base_url}/api/admin/affiliates"))
        .json(&json!({
            "code": code,
            "name": "Duplicate",
            "email": "dup@greenleaf.shop",
            "commission_rate": "5",
        }))
        .send()
        .await
        .expect("Failed to post duplicate");
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = admin
        .get(format!("{base_url}/api/admin/affiliates/{id}/commissions"))
        .send()
        .await
        .expect("Failed to list commissions");
    assert_eq!(resp.status(), StatusCode::OK);
    let report: Value = resp.json().await.expect("body");
    assert!(report["commissions"].as_array().is_some_and(Vec::is_empty));

    let resp = admin
        .delete(format!("{base_url}/api/admin/affiliates/{id}"))
        .send()
        .await
        .expect("Failed to delete affiliate");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
#[ignore = "Requires running admin server and an admin account"]
async fn test_legal_versions_increment() {
    let admin = admin_client().await;
    let base_url = admin_base_url();
    let slug = format!("it-terms-{}", unique_suffix().to_lowercase());

    let mut versions = Vec::new();
    for body in ["First draft", "Second draft"] {
        let resp = admin
            .post(format!("{base_url}/api/admin/legal"))
            .json(&json!({ "slug": slug, "title": "Terms", "body": body }))
            .send()
            .await
            .expect("Failed to create legal version");
        assert_eq!(resp.status(), StatusCode::CREATED);
        versions.push(resp.json::<Value>().await.expect("body"));
    }
    assert_eq!(versions[0]["version"], 1);
    assert_eq!(versions[1]["version"], 2);
    assert!(versions[1]["published_at"].is_null());

    let id = &versions[1]["id"];
    let first = admin
        .post(format!("{base_url}/api/admin/legal/{id}/publish"))
        .send()
        .await
        .expect("Failed to publish")
        .json::<Value>()
        .await
        .expect("body");
    let second = admin
        .post(format!("{base_url}/api/admin/legal/{id}/publish"))
        .send()
        .await
        .expect("Failed to publish again")
        .json::<Value>()
        .await
        .expect("body");
    assert_eq!(first["published_at"], second["published_at"]);
}

#[tokio::test]
#[ignore = "Requires running admin server and an admin account"]
async fn test_dashboard_summary() {
    let admin = admin_client().await;
    let resp = admin
        .get(format!("{}/api/admin/dashboard", admin_base_url()))
        .send()
        .await
        .expect("Failed to get dashboard");
    assert_eq!(resp.status(), StatusCode::OK);

    let summary: Value = resp.json().await.expect("body");
    assert!(summary["orders_total"].is_number());
    assert!(summary["revenue_total"].is_string());
}
