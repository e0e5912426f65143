//! HTTP tests against a running storefront.
//!
//! Ignored by default; run with `--ignored` once the server is up.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use sundry_integration_tests::TestContext;

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_storefront_health() {
    let ctx = TestContext::new().unwrap();
    let resp = ctx.client.get(ctx.url("/health")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_anonymous_cart_flow() {
    let ctx = TestContext::new().unwrap();
    let widget = serde_json::json!({"id": 7, "name": "Widget", "price": 10.0, "image": ""});

    for _ in 0..2 {
        let resp = ctx
            .client
            .post(ctx.url("/api/cart/items"))
            .json(&widget)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let cart: serde_json::Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["item_count"], 2);
    assert_eq!(cart["items"][0]["quantity"], 2);

    let cart: serde_json::Value = ctx
        .client
        .patch(ctx.url("/api/cart/items/7"))
        .json(&serde_json::json!({"quantity": 5}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["item_count"], 5);
    assert_eq!(cart["total_price"], 50.0);

    let resp = ctx
        .client
        .delete(ctx.url("/api/cart"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 204);

    let cart: serde_json::Value = ctx
        .client
        .get(ctx.url("/api/cart"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(cart["is_empty"], true);
}

#[tokio::test]
#[ignore = "requires a running storefront"]
async fn test_orders_require_sign_in() {
    let ctx = TestContext::new().unwrap();
    let resp = ctx.client.get(ctx.url("/api/orders")).send().await.unwrap();

    assert_eq!(resp.status(), 401);
}

#[tokio::test]
#[ignore = "requires a running storefront and Supabase project"]
async fn test_product_listing() {
    let ctx = TestContext::new().unwrap();
    let resp = ctx.client.get(ctx.url("/api/products")).send().await.unwrap();

    assert_eq!(resp.status(), 200);
    let products: serde_json::Value = resp.json().await.unwrap();
    assert!(products.is_array());
}
