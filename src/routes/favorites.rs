use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{delete, get},
};
use uuid::Uuid;

use crate::{
    dto::favorites::{AddFavoriteRequest, FavoriteProductList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Favorite,
    response::{Ack, ApiResponse},
    routes::params::Pagination,
    services::favorite_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_favorites).post(add_favorite))
        .route("/{product_id}", delete(remove_favorite))
}

#[utoipa::path(
    get,
    path = "/api/favorites",
    params(Pagination),
    responses(
        (status = 200, description = "Favorite products, newest first", body = ApiResponse<FavoriteProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn list_favorites(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<FavoriteProductList>>> {
    let resp = favorite_service::list_favorites(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/favorites",
    request_body = AddFavoriteRequest,
    responses(
        (status = 200, description = "Added (or already present)", body = ApiResponse<Favorite>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn add_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddFavoriteRequest>,
) -> AppResult<Json<ApiResponse<Favorite>>> {
    let resp = favorite_service::add_favorite(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/favorites/{product_id}",
    params(
        ("product_id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Removed", body = ApiResponse<Ack>),
        (status = 404, description = "Not a favorite"),
    ),
    security(("bearer_auth" = [])),
    tag = "Favorites"
)]
pub async fn remove_favorite(
    State(state): State<AppState>,
    user: AuthUser,
    Path(product_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let resp = favorite_service::remove_favorite(&state, &user, product_id).await?;
    Ok(Json(resp))
}
