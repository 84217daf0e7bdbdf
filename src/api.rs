//! JSON surface over the [`Store`] for the client and company roles.

use std::sync::Arc;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::domain::{CartError, CartItem, CustomerInfo, Money, PaymentRequest, Product, ProductForm, ProductId};
use crate::inventory::InventoryApi;
use crate::store::{CheckoutOutcome, Store, StoreState};
use crate::StoreError;

type AppState<A> = State<Arc<Store<A>>>;
type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn router<A: InventoryApi>(store: Arc<Store<A>>) -> Router {
    Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront"})) }))
        .route("/api/v1/state", get(snapshot::<A>))
        .route("/api/v1/state/messages", axum::routing::delete(clear_messages::<A>))
        .route("/api/v1/products", get(list_products::<A>).post(create_product::<A>))
        .route("/api/v1/products/refresh", post(refresh_products::<A>))
        .route("/api/v1/products/validate", post(validate_product::<A>))
        .route("/api/v1/products/:id", put(update_product::<A>).delete(delete_product::<A>))
        .route("/api/v1/cart", get(get_cart::<A>).delete(clear_cart::<A>))
        .route("/api/v1/cart/summary", get(cart_summary::<A>))
        .route("/api/v1/cart/items/:product_id", post(add_cart_item::<A>).put(set_cart_item::<A>).delete(remove_cart_item::<A>))
        .route("/api/v1/checkout", post(checkout::<A>))
        .route("/api/v1/payment-requests", get(list_requests::<A>))
        .route("/api/v1/payment-requests/:id", axum::routing::delete(remove_request::<A>))
        .route("/api/v1/payment-requests/:id/confirm", post(confirm_request::<A>))
        .route("/api/v1/payment-requests/:id/reject", post(reject_request::<A>))
        .route("/api/v1/payment-requests/:id/summary", get(request_summary::<A>))
        .route("/api/v1/notifications/latest", get(latest_request::<A>))
        .route("/api/v1/notifications/latest/seen", post(mark_seen::<A>))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()))
        .with_state(store)
}

fn reject(e: StoreError) -> (StatusCode, String) {
    let status = match &e {
        StoreError::ProductNotFound(_)
        | StoreError::ProductNotInInventory(_)
        | StoreError::RequestNotFound
        | StoreError::Cart(CartError::ItemNotFound) => StatusCode::NOT_FOUND,
        StoreError::Payment(_) => StatusCode::CONFLICT,
        StoreError::Inventory { source, .. } if source.is_not_found() => StatusCode::NOT_FOUND,
        StoreError::Inventory { .. } | StoreError::StockUpdateFailed { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };
    (status, e.to_string())
}

async fn snapshot<A: InventoryApi>(State(store): AppState<A>) -> Json<StoreState> {
    Json(store.snapshot().await)
}

async fn clear_messages<A: InventoryApi>(State(store): AppState<A>) -> StatusCode {
    store.clear_error().await;
    store.clear_success().await;
    StatusCode::NO_CONTENT
}

// ========== Catalog ==========

async fn list_products<A: InventoryApi>(State(store): AppState<A>) -> Json<Vec<Product>> {
    Json(store.products().await)
}

async fn refresh_products<A: InventoryApi>(State(store): AppState<A>) -> ApiResult<Json<serde_json::Value>> {
    let count = store.load_products().await.map_err(reject)?;
    Ok(Json(serde_json::json!({ "count": count })))
}

async fn create_product<A: InventoryApi>(State(store): AppState<A>, Json(form): Json<ProductForm>) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = store.add_product(form).await.map_err(reject)?;
    Ok((StatusCode::CREATED, Json(product)))
}

async fn validate_product<A: InventoryApi>(State(store): AppState<A>, Json(form): Json<ProductForm>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "valid": store.validate_fields(&form) }))
}

async fn update_product<A: InventoryApi>(State(store): AppState<A>, Path(id): Path<ProductId>, Json(form): Json<ProductForm>) -> ApiResult<Json<Product>> {
    store.update_product(id, form).await.map(Json).map_err(reject)
}

async fn delete_product<A: InventoryApi>(State(store): AppState<A>, Path(id): Path<ProductId>) -> ApiResult<StatusCode> {
    store.delete_product(id).await.map_err(reject)?;
    Ok(StatusCode::NO_CONTENT)
}

// ========== Cart ==========

#[derive(Debug, Serialize)]
pub struct CartView { pub items: Vec<CartItem>, pub total: Money }

#[derive(Debug, Serialize, Deserialize)]
pub struct CartLine { pub product_id: ProductId, pub quantity: u32 }

#[derive(Debug, Deserialize)]
pub struct SetQuantityRequest { pub quantity: u32 }

#[derive(Debug, Default, Deserialize)]
pub struct RemoveParams { #[serde(default)] pub all: bool }

async fn get_cart<A: InventoryApi>(State(store): AppState<A>) -> Json<CartView> {
    let cart = store.cart().await;
    Json(CartView { total: cart.total(), items: cart.items().to_vec() })
}

async fn clear_cart<A: InventoryApi>(State(store): AppState<A>) -> StatusCode {
    store.clear_cart().await;
    StatusCode::NO_CONTENT
}

async fn cart_summary<A: InventoryApi>(State(store): AppState<A>) -> String {
    store.cart_summary().await
}

async fn add_cart_item<A: InventoryApi>(State(store): AppState<A>, Path(product_id): Path<ProductId>) -> ApiResult<Json<CartLine>> {
    let quantity = store.add_to_cart(product_id).await.map_err(reject)?;
    Ok(Json(CartLine { product_id, quantity }))
}

async fn set_cart_item<A: InventoryApi>(State(store): AppState<A>, Path(product_id): Path<ProductId>, Json(req): Json<SetQuantityRequest>) -> ApiResult<Json<CartLine>> {
    store.set_quantity(product_id, req.quantity).await.map_err(reject)?;
    Ok(Json(CartLine { product_id, quantity: req.quantity }))
}

async fn remove_cart_item<A: InventoryApi>(State(store): AppState<A>, Path(product_id): Path<ProductId>, Query(params): Query<RemoveParams>) -> ApiResult<Json<CartLine>> {
    if params.all {
        store.remove_product_from_cart(product_id).await.map_err(reject)?;
        return Ok(Json(CartLine { product_id, quantity: 0 }));
    }
    match store.remove_from_cart(product_id).await {
        Some(quantity) => Ok(Json(CartLine { product_id, quantity })),
        None => Err(reject(StoreError::Cart(CartError::ItemNotFound))),
    }
}

// ========== Payments ==========

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest { pub customer: Option<CustomerInfo> }

/// An empty body is a company sale. Any other body must be a JSON `CheckoutRequest`.
fn checkout_customer(headers: &HeaderMap, body: &Bytes) -> ApiResult<Option<CustomerInfo>> {
    if body.iter().all(u8::is_ascii_whitespace) { return Ok(None); }
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with("application/json"));
    if !is_json {
        return Err((StatusCode::UNSUPPORTED_MEDIA_TYPE, "Expected request with `Content-Type: application/json`".to_string()));
    }
    let Json(req) = Json::<CheckoutRequest>::from_bytes(body).map_err(|e| (e.status(), e.body_text()))?;
    Ok(req.customer)
}

async fn checkout<A: InventoryApi>(State(store): AppState<A>, headers: HeaderMap, body: Bytes) -> ApiResult<(StatusCode, Json<CheckoutOutcome>)> {
    let customer = checkout_customer(&headers, &body)?;
    let outcome = store.process_payment(customer).await.map_err(reject)?;
    let status = match outcome {
        CheckoutOutcome::Sale { .. } => StatusCode::OK,
        CheckoutOutcome::Requested { .. } => StatusCode::CREATED,
    };
    Ok((status, Json(outcome)))
}

async fn list_requests<A: InventoryApi>(State(store): AppState<A>) -> Json<Vec<PaymentRequest>> {
    Json(store.payment_requests().await)
}

async fn confirm_request<A: InventoryApi>(State(store): AppState<A>, Path(id): Path<Uuid>) -> ApiResult<Json<PaymentRequest>> {
    store.confirm_payment(id).await.map(Json).map_err(reject)
}

async fn reject_request<A: InventoryApi>(State(store): AppState<A>, Path(id): Path<Uuid>) -> ApiResult<Json<PaymentRequest>> {
    store.reject_payment(id).await.map(Json).map_err(reject)
}

async fn remove_request<A: InventoryApi>(State(store): AppState<A>, Path(id): Path<Uuid>) -> ApiResult<StatusCode> {
    if store.remove_processed_request(id).await { return Ok(StatusCode::NO_CONTENT); }
    let exists = store.payment_requests().await.iter().any(|r| r.id() == id);
    if exists {
        Err((StatusCode::CONFLICT, "Only confirmed or rejected requests can be removed".to_string()))
    } else {
        Err(reject(StoreError::RequestNotFound))
    }
}

async fn request_summary<A: InventoryApi>(State(store): AppState<A>, Path(id): Path<Uuid>) -> ApiResult<String> {
    store.request_summary(id).await.map_err(reject)
}

async fn latest_request<A: InventoryApi>(State(store): AppState<A>) -> Json<Option<PaymentRequest>> {
    Json(store.latest_request().await)
}

async fn mark_seen<A: InventoryApi>(State(store): AppState<A>) -> StatusCode {
    store.mark_request_seen().await;
    StatusCode::NO_CONTENT
}
