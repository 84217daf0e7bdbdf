use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use storefront::api::router;
use storefront::domain::Product;
use storefront::inventory::MemoryInventory;
use storefront::Store;
use tower::ServiceExt;

fn product(id: i64, name: &str, price: i64, stock: i32) -> Product {
    Product {
        id: Some(id), name: name.into(), description: format!("{name} for gaming rigs"),
        price: Decimal::new(price, 0), stock, brand_id: 1, category_id: 2, image_url: String::new(),
    }
}

async fn app() -> (Router, Arc<Store<MemoryInventory>>) {
    let inventory = MemoryInventory::with_products(vec![
        product(1, "Keyboard", 250_000, 3),
        product(2, "Mouse", 90_000, 1),
    ]);
    let store = Arc::new(Store::new(inventory));
    store.load_products().await.expect("catalog load");
    (router(store.clone()), store)
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder.header("content-type", "application/json").body(Body::from(json.to_string())).unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, bytes)
}

async fn send_raw(app: &Router, uri: &str, content_type: Option<&str>, body: &str) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(content_type) = content_type {
        builder = builder.header("content-type", content_type);
    }
    let response = app.clone().oneshot(builder.body(Body::from(body.to_string())).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes().to_vec();
    (status, bytes)
}

fn json_of(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("json body")
}

#[tokio::test]
async fn test_health_and_catalog() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["status"], "healthy");

    let (status, body) = send(&app, "GET", "/api/v1/products", None).await;
    assert_eq!(status, StatusCode::OK);
    let products = json_of(&body);
    assert_eq!(products.as_array().unwrap().len(), 2);
    assert_eq!(products[0]["nombre"], "Keyboard");
}

#[tokio::test]
async fn test_cart_endpoints() {
    let (app, _) = app().await;
    let (status, body) = send(&app, "POST", "/api/v1/cart/items/2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body), json!({ "product_id": 2, "quantity": 1 }));

    let (status, body) = send(&app, "POST", "/api/v1/cart/items/2", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(String::from_utf8(body).unwrap().starts_with("No more stock available of Mouse"));

    let (status, _) = send(&app, "POST", "/api/v1/cart/items/77", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    send(&app, "POST", "/api/v1/cart/items/1", None).await;
    let (status, _) = send(&app, "PUT", "/api/v1/cart/items/1", Some(json!({ "quantity": 3 }))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/api/v1/cart", None).await;
    let cart = json_of(&body);
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["total"]["amount"], "840000");

    let (_, body) = send(&app, "GET", "/api/v1/cart/summary", None).await;
    assert!(String::from_utf8(body).unwrap().ends_with("TOTAL: $840.000"));

    let (_, body) = send(&app, "DELETE", "/api/v1/cart/items/1", None).await;
    assert_eq!(json_of(&body)["quantity"], 2);
    let (_, body) = send(&app, "DELETE", "/api/v1/cart/items/1?all=true", None).await;
    assert_eq!(json_of(&body)["quantity"], 0);
    let (status, _) = send(&app, "DELETE", "/api/v1/cart/items/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", "/api/v1/cart", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", "/api/v1/cart/summary", None).await;
    assert_eq!(body, b"Cart is empty");
}

#[tokio::test]
async fn test_client_request_then_company_confirms() {
    let (app, store) = app().await;
    send(&app, "POST", "/api/v1/cart/items/1", None).await;
    send(&app, "POST", "/api/v1/cart/items/1", None).await;

    let customer = json!({ "customer": { "name": "Sofía", "email": "sofia@example.com", "phone": "3001234567" } });
    let (status, body) = send(&app, "POST", "/api/v1/checkout", Some(customer)).await;
    assert_eq!(status, StatusCode::CREATED);
    let outcome = json_of(&body);
    assert_eq!(outcome["kind"], "requested");
    assert_eq!(outcome["request"]["status"], "pending");
    let id = outcome["request"]["id"].as_str().unwrap().to_string();

    let (_, body) = send(&app, "GET", "/api/v1/notifications/latest", None).await;
    assert_eq!(json_of(&body)["id"], id.as_str());
    let (status, _) = send(&app, "POST", "/api/v1/notifications/latest/seen", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", "/api/v1/notifications/latest", None).await;
    assert_eq!(json_of(&body), Value::Null);

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/payment-requests/{id}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(&app, "POST", &format!("/api/v1/payment-requests/{id}/confirm"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["status"], "confirmed");
    assert_eq!(store.api().get(1).await.unwrap().stock, 1);

    let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
    let state = json_of(&body);
    assert_eq!(state["success_message"], "Payment confirmed. Stock updated successfully.");
    assert_eq!(state["loading"], false);

    let (status, _) = send(&app, "POST", &format!("/api/v1/payment-requests/{id}/reject"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
    assert_eq!(json_of(&body)["error_message"], "This request has already been processed (confirmed)");

    let (_, body) = send(&app, "GET", &format!("/api/v1/payment-requests/{id}/summary"), None).await;
    let summary = String::from_utf8(body).unwrap();
    assert!(summary.contains("Name: Sofía"));
    assert!(summary.contains("TOTAL: $500.000"));

    let (status, _) = send(&app, "DELETE", &format!("/api/v1/payment-requests/{id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", &format!("/api/v1/payment-requests/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_company_direct_sale_and_failures() {
    let (app, store) = app().await;
    let (status, body) = send(&app, "POST", "/api/v1/checkout", None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body, b"The cart is empty");

    send(&app, "POST", "/api/v1/cart/items/2", None).await;
    store.api().fail_updates_for(2).await;
    let (status, body) = send(&app, "POST", "/api/v1/checkout", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(String::from_utf8(body).unwrap().starts_with("Error updating stock of Mouse"));

    send(&app, "POST", "/api/v1/cart/items/1", None).await;
    send(&app, "DELETE", "/api/v1/cart/items/2?all=true", None).await;
    let (status, body) = send(&app, "POST", "/api/v1/checkout", Some(json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["kind"], "sale");
    assert_eq!(store.api().get(1).await.unwrap().stock, 2);
    let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
    assert_eq!(json_of(&body)["success_message"], "Sale processed. Stock updated.");

    let (status, _) = send(&app, "DELETE", "/api/v1/state/messages", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
    assert_eq!(json_of(&body)["success_message"], Value::Null);
}

#[tokio::test]
async fn test_sale_stopped_part_way_keeps_applied_lines() {
    let (app, store) = app().await;
    send(&app, "POST", "/api/v1/cart/items/1", None).await;
    send(&app, "POST", "/api/v1/cart/items/2", None).await;
    store.api().fail_updates_for(2).await;

    let (status, body) = send(&app, "POST", "/api/v1/checkout", None).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(String::from_utf8(body).unwrap().starts_with("Error updating stock of Mouse"));
    assert_eq!(store.api().get(1).await.unwrap().stock, 2);
    assert_eq!(store.api().get(2).await.unwrap().stock, 1);

    let (_, body) = send(&app, "GET", "/api/v1/products", None).await;
    let products = json_of(&body);
    assert_eq!(products[0]["stock"], 2);
    assert_eq!(products[1]["stock"], 1);

    let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
    let state = json_of(&body);
    assert_eq!(state["cart"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(state["success_message"], Value::Null);
    assert!(state["error_message"].as_str().unwrap().starts_with("Error updating stock of Mouse"));
}

#[tokio::test]
async fn test_checkout_body_must_be_a_valid_request() {
    let (app, store) = app().await;
    send(&app, "POST", "/api/v1/cart/items/2", None).await;

    let customer = r#"{"customer":{"name":"Ana"}}"#;
    let (status, _) = send_raw(&app, "/api/v1/checkout", None, customer).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    let (status, _) = send_raw(&app, "/api/v1/checkout", Some("text/plain"), customer).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);

    let json = Some("application/json");
    let (status, _) = send_raw(&app, "/api/v1/checkout", json, r#"{"customer":{"name":5}}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send_raw(&app, "/api/v1/checkout", json, r#"{"costumer":{"name":"Ana"}}"#).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send_raw(&app, "/api/v1/checkout", json, r#"{"customer":"#).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(store.api().get(2).await.unwrap().stock, 1);
    assert_eq!(store.cart().await.quantity_of(2), 1);
    assert!(store.payment_requests().await.is_empty());

    let (status, body) = send_raw(&app, "/api/v1/checkout", json, customer).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json_of(&body)["kind"], "requested");
    assert_eq!(store.api().get(2).await.unwrap().stock, 1);
}

#[tokio::test]
async fn test_loading_is_visible_while_backend_call_is_pending() {
    let (app, store) = app().await;
    let gate = store.api().hold_next_call().await;
    let refresh = tokio::spawn({
        let app = app.clone();
        async move { send(&app, "POST", "/api/v1/products/refresh", None).await }
    });

    let mut seen_loading = false;
    for _ in 0..100 {
        let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
        if json_of(&body)["loading"] == true {
            seen_loading = true;
            break;
        }
        tokio::task::yield_now().await;
    }
    assert!(seen_loading);

    gate.notify_one();
    let (status, body) = refresh.await.unwrap();
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["count"], 2);
    let (_, body) = send(&app, "GET", "/api/v1/state", None).await;
    assert_eq!(json_of(&body)["loading"], false);
}

#[tokio::test]
async fn test_product_management() {
    let (app, _) = app().await;
    let form = json!({
        "name": "Headset", "description": "7.1 surround", "price": "320000", "stock": "5",
        "brand_id": "6", "category_id": "3", "image_url": "h.png"
    });
    let (_, body) = send(&app, "POST", "/api/v1/products/validate", Some(form.clone())).await;
    assert_eq!(json_of(&body)["valid"], true);

    let (status, body) = send(&app, "POST", "/api/v1/products", Some(form.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = json_of(&body);
    assert_eq!(created["id"], 3);
    assert_eq!(created["precio"], 320000.0);

    let mut edit = form.clone();
    edit["stock"] = json!("9");
    let (status, body) = send(&app, "PUT", "/api/v1/products/3", Some(edit)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["stock"], 9);

    let mut bad = form;
    bad["name"] = json!(" ");
    let (_, body) = send(&app, "POST", "/api/v1/products/validate", Some(bad.clone())).await;
    assert_eq!(json_of(&body)["valid"], false);
    let (status, _) = send(&app, "POST", "/api/v1/products", Some(bad)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&app, "DELETE", "/api/v1/products/3", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, "DELETE", "/api/v1/products/3", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app, "POST", "/api/v1/products/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json_of(&body)["count"], 2);
}
