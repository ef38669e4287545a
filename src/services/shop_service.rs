//! Public storefront: only listable products (active and in stock).

use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select};
use uuid::Uuid;

use crate::{
    dto::{categories::CategoryList, products::{ProductList, RegionList}},
    entity::{
        Categories,
        categories::Column as CategoryCol,
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Category, Product},
    response::ApiResponse,
    routes::params::{Pagination, ProductQuery},
    services::product_service::{apply_sort, filtered, paginate, product_details, with_details},
    state::AppState,
};

pub const FEATURED_LIMIT: u64 = 8;

fn listable(finder: Select<Products>) -> Select<Products> {
    finder
        .filter(ProdCol::IsActive.eq(true))
        .filter(ProdCol::Stock.gt(0))
}

pub async fn shop_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let finder = listable(filtered(&query)).order_by_desc(ProdCol::Featured);
    let finder = apply_sort(finder, &query);
    paginate(state, finder, query.pagination(), "Shop products").await
}

pub async fn featured_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let models = listable(Products::find())
        .filter(ProdCol::Featured.eq(true))
        .order_by_desc(ProdCol::CreatedAt)
        .limit(FEATURED_LIMIT)
        .all(&state.orm)
        .await?;
    let items = with_details(&state.orm, models).await?;
    Ok(ApiResponse::ok("Featured products", ProductList { items }))
}

pub async fn get_shop_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = listable(Products::find_by_id(id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::ok("Product", product_details(&state.orm, product).await?))
}

pub async fn products_by_category(
    state: &AppState,
    category_id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    if Categories::find_by_id(category_id).one(&state.orm).await?.is_none() {
        return Err(AppError::not_found("Category"));
    }

    let finder = listable(Products::find())
        .filter(ProdCol::CategoryId.eq(category_id))
        .order_by_desc(ProdCol::Featured)
        .order_by_desc(ProdCol::CreatedAt);
    paginate(state, finder, pagination, "Category products").await
}

pub async fn categories(state: &AppState) -> AppResult<ApiResponse<CategoryList>> {
    let items = Categories::find()
        .order_by_asc(CategoryCol::Name)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();
    Ok(ApiResponse::ok("Categories", CategoryList { items }))
}

/// Distinct regions of listable products, sorted.
pub async fn regions(state: &AppState) -> AppResult<ApiResponse<RegionList>> {
    let items: Vec<String> = listable(Products::find())
        .select_only()
        .column(ProdCol::Region)
        .distinct()
        .filter(ProdCol::Region.is_not_null())
        .filter(ProdCol::Region.ne(""))
        .order_by_asc(ProdCol::Region)
        .into_tuple()
        .all(&state.orm)
        .await?;
    Ok(ApiResponse::ok("Regions", RegionList { items }))
}
