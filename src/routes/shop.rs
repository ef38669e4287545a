use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::{categories::CategoryList, products::{ProductList, RegionList}},
    error::AppResult,
    models::Product,
    response::ApiResponse,
    routes::params::{Pagination, ProductQuery},
    services::shop_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(shop_products))
        .route("/products/featured", get(featured_products))
        .route("/products/category/{id}", get(products_by_category))
        .route("/products/{id}", get(get_shop_product))
        .route("/categories", get(categories))
        .route("/regions", get(regions))
}

#[utoipa::path(
    get,
    path = "/api/shop/products",
    params(ProductQuery),
    responses(
        (status = 200, description = "Listable products, featured first", body = ApiResponse<ProductList>)
    ),
    tag = "Shop"
)]
pub async fn shop_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(shop_service::shop_products(&state, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/shop/products/featured",
    responses(
        (status = 200, description = "Up to eight featured products", body = ApiResponse<ProductList>)
    ),
    tag = "Shop"
)]
pub async fn featured_products(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(shop_service::featured_products(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/shop/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product detail", body = ApiResponse<Product>),
        (status = 404, description = "Product not found or not listed"),
    ),
    tag = "Shop"
)]
pub async fn get_shop_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(shop_service::get_shop_product(&state, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/shop/products/category/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID"),
        Pagination
    ),
    responses(
        (status = 200, description = "Listable products in a category", body = ApiResponse<ProductList>),
        (status = 404, description = "Category not found"),
    ),
    tag = "Shop"
)]
pub async fn products_by_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(
        shop_service::products_by_category(&state, id, pagination).await?,
    ))
}

#[utoipa::path(
    get,
    path = "/api/shop/categories",
    responses(
        (status = 200, description = "All categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Shop"
)]
pub async fn categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    Ok(Json(shop_service::categories(&state).await?))
}

#[utoipa::path(
    get,
    path = "/api/shop/regions",
    responses(
        (status = 200, description = "Regions with listable products", body = ApiResponse<RegionList>)
    ),
    tag = "Shop"
)]
pub async fn regions(State(state): State<AppState>) -> AppResult<Json<ApiResponse<RegionList>>> {
    Ok(Json(shop_service::regions(&state).await?))
}
