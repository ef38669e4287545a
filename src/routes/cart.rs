use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
    error::AppResult,
    middleware::{auth::AuthUser, validate::ValidatedJson},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", post(add_item))
        .route("/items/{product_id}", put(update_item).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    responses(
        (status = 200, description = "Current cart with line totals", body = ApiResponse<CartView>),
        (status = 403, description = "Only consumers have a cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::get_cart(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added", body = ApiResponse<CartView>),
        (status = 400, description = "Product unavailable or not enough stock"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::add_item(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity set", body = ApiResponse<CartView>),
        (status = 400, description = "Not enough stock"),
        (status = 404, description = "Item not in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::update_item(&state, &user, product_id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Item removed", body = ApiResponse<CartView>),
        (status = 404, description = "Item not in cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::remove_item(&state, &user, product_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartView>),
    ),
    security(("bearer_auth" = [])),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartView>>> {
    let resp = cart_service::clear_cart(&state, &user).await?;
    Ok(Json(resp))
}
