use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, Query, State},
    http::HeaderMap,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::orders::{CheckoutResponse, OrderList, OrderWithItems, PickupResult, SellerOrderList, WebhookAck},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub const SIGNATURE_HEADER: &str = "stripe-signature";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders))
        .route("/checkout", post(checkout))
        .route("/seller", get(list_seller_orders))
        .route("/webhook", post(webhook))
        .route("/{id}", get(get_order))
        .route("/{id}/ready", post(mark_ready))
        .route("/{id}/pickup-confirm", post(confirm_pickup))
}

#[utoipa::path(
    post,
    path = "/api/orders/checkout",
    responses(
        (status = 200, description = "Orders created or payment intent issued", body = ApiResponse<CheckoutResponse>),
        (status = 400, description = "Cart is empty"),
        (status = 403, description = "Only consumers can check out"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn checkout(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CheckoutResponse>>> {
    let resp = order_service::checkout(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Caller's orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/seller",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Orders containing the caller's products", body = ApiResponse<SellerOrderList>),
        (status = 403, description = "Caller is not an approved seller"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn list_seller_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<SellerOrderList>>> {
    let resp = order_service::list_seller_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::get_order(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/ready",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Seller items marked ready", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "No items of the caller, or already ready"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn mark_ready(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = order_service::notify_order_ready(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/orders/{id}/pickup-confirm",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Ready items marked picked up", body = ApiResponse<PickupResult>),
        (status = 400, description = "Order does not belong to the caller"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Orders"
)]
pub async fn confirm_pickup(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PickupResult>>> {
    let resp = order_service::confirm_order_pickup(&state, &user, id).await?;
    Ok(Json(resp))
}

/// Payment provider callback. The raw body is needed for the signature.
#[utoipa::path(
    post,
    path = "/api/orders/webhook",
    request_body(content = String, description = "Raw provider event", content_type = "application/json"),
    params(
        ("Stripe-Signature" = String, Header, description = "t=<unix>,v1=<hex hmac>")
    ),
    responses(
        (status = 200, description = "Event accepted", body = WebhookAck),
        (status = 400, description = "Bad signature or payload"),
    ),
    tag = "Orders"
)]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());
    let ack = order_service::handle_webhook(&state, signature, &body).await?;
    Ok(Json(ack))
}
