use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, JoinType,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Select, Set,
    TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit::record,
    dto::products::{ContentEntry, CreateProductRequest, ProductList, UpdateProductRequest},
    entity::{
        Categories, ProductContents, Users,
        enums::UserRole,
        product_contents::{ActiveModel as ContentActive, Column as ContentCol},
        products::{self, ActiveModel as ProductActive, Column as ProdCol, Entity as Products},
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Product, ProductContent},
    policy::{Action, Resource, authorize},
    response::{Ack, ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery, ProductSortBy, SortOrder, contains_pattern},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let finder = apply_sort(filtered(&query), &query);
    paginate(state, finder, query.pagination(), "Products").await
}

pub async fn list_my_products(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let actor = user.actor(state).await?;
    authorize(&actor, Action::ListOwnProducts, Resource::None).into_result()?;

    let finder = apply_sort(
        filtered(&query).filter(ProdCol::OwnerId.eq(actor.id)),
        &query,
    );
    paginate(state, finder, query.pagination(), "My products").await
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    Ok(ApiResponse::ok("Product", product_details(&state.orm, product).await?))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let actor = user.actor(state).await?;
    authorize(&actor, Action::CreateProduct, Resource::None).into_result()?;
    ensure_category(state, payload.category_id).await?;

    let txn = state.orm.begin().await?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        owner_id: Set(actor.id),
        category_id: Set(payload.category_id),
        name: Set(payload.name.trim().to_string()),
        description: Set(payload.description),
        price: Set(payload.price),
        original_price: Set(payload.original_price),
        stock: Set(payload.stock),
        rating: Set(0.0),
        image_url: Set(payload.image_url),
        product_type: Set(payload.product_type),
        region: Set(payload.region),
        pickup_info: Set(payload.pickup_info),
        solidaire: Set(payload.solidaire),
        is_restaurant: Set(actor.role == UserRole::Restaurant),
        is_active: Set(payload.stock > 0),
        featured: Set(false),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;
    replace_contents(&txn, product.id, &payload.contents).await?;
    let product = product_details(&txn, product).await?;
    txn.commit().await?;

    record(
        state,
        actor.id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::ok("Product created", product))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let actor = user.actor(state).await?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    authorize(
        &actor,
        Action::UpdateProduct,
        Resource::Product {
            owner_id: existing.owner_id,
        },
    )
    .into_result()?;
    ensure_category(state, payload.category_id).await?;

    let txn = state.orm.begin().await?;
    let mut active: ProductActive = existing.into();
    let contents = apply_update(&mut active, payload);
    let updated = active.update(&txn).await?;
    if let Some(contents) = contents {
        replace_contents(&txn, updated.id, &contents).await?;
    }
    let product = product_details(&txn, updated).await?;
    txn.commit().await?;

    record(
        state,
        actor.id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Product updated", product))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    let actor = user.actor(state).await?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    authorize(
        &actor,
        Action::DeleteProduct,
        Resource::Product {
            owner_id: existing.owner_id,
        },
    )
    .into_result()?;

    Products::delete_by_id(id).exec(&state.orm).await?;

    record(
        state,
        actor.id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Product deleted", Ack::done()))
}

/// Writes the optional fields of `payload` onto `active`. A stock change
/// re-derives `is_active` unless the flag is given. Returns the new contents
/// list when one was supplied.
pub(crate) fn apply_update(
    active: &mut ProductActive,
    payload: UpdateProductRequest,
) -> Option<Vec<ContentEntry>> {
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(original_price) = payload.original_price {
        active.original_price = Set(Some(original_price));
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(Some(category_id));
    }
    if let Some(image_url) = payload.image_url {
        active.image_url = Set(Some(image_url));
    }
    if let Some(product_type) = payload.product_type {
        active.product_type = Set(Some(product_type));
    }
    if let Some(region) = payload.region {
        active.region = Set(Some(region));
    }
    if let Some(pickup_info) = payload.pickup_info {
        active.pickup_info = Set(Some(pickup_info));
    }
    if let Some(solidaire) = payload.solidaire {
        active.solidaire = Set(solidaire);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    match (payload.is_active, payload.stock) {
        (Some(is_active), _) => active.is_active = Set(is_active),
        (None, Some(stock)) => active.is_active = Set(stock > 0),
        (None, None) => {}
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    payload.contents
}

/// Product query with every filter from `query` applied. Joins the owner
/// so the producer name can be searched.
pub(crate) fn filtered(query: &ProductQuery) -> Select<Products> {
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col((Products, ProdCol::Name)).ilike(pattern.clone()))
                .add(Expr::col((Products, ProdCol::Description)).ilike(pattern.clone()))
                .add(producer_matches(&pattern)),
        );
    }
    if let Some(producer) = query.producer.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        condition = condition.add(producer_matches(&contains_pattern(producer)));
    }
    if let Some(product_type) = query.product_type.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(ProdCol::ProductType.eq(product_type));
    }
    if let Some(region) = query.region.as_deref().filter(|s| !s.is_empty()) {
        condition = condition.add(ProdCol::Region.eq(region));
    }
    if let Some(solidaire) = query.solidaire {
        condition = condition.add(ProdCol::Solidaire.eq(solidaire));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(ProdCol::CategoryId.eq(category_id));
    }
    if let Some(min_price) = query.min_price {
        condition = condition.add(ProdCol::Price.gte(min_price));
    }
    if let Some(max_price) = query.max_price {
        condition = condition.add(ProdCol::Price.lte(max_price));
    }

    Products::find()
        .join(JoinType::InnerJoin, products::Relation::Owner.def())
        .filter(condition)
}

fn producer_matches(pattern: &str) -> Condition {
    Condition::any()
        .add(Expr::col((Users, UserCol::CompanyName)).ilike(pattern.to_string()))
        .add(Expr::col((Users, UserCol::FirstName)).ilike(pattern.to_string()))
        .add(Expr::col((Users, UserCol::LastName)).ilike(pattern.to_string()))
}

pub(crate) fn apply_sort(finder: Select<Products>, query: &ProductQuery) -> Select<Products> {
    let sort_col = match query.sort_by.unwrap_or(ProductSortBy::CreatedAt) {
        ProductSortBy::CreatedAt => ProdCol::CreatedAt,
        ProductSortBy::Price => ProdCol::Price,
        ProductSortBy::Name => ProdCol::Name,
    };
    match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    }
}

pub(crate) async fn paginate(
    state: &AppState,
    finder: Select<Products>,
    pagination: Pagination,
    message: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let total = finder.clone().count(&state.orm).await? as i64;

    let models = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;
    let items = with_details(&state.orm, models).await?;

    Ok(ApiResponse::success(
        message,
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub(crate) async fn product_details<C: ConnectionTrait>(
    conn: &C,
    model: products::Model,
) -> AppResult<Product> {
    let mut items = with_details(conn, vec![model]).await?;
    items
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("product vanished while loading")))
}

/// Converts products and fills in owner names and contents with one query each.
pub(crate) async fn with_details<C: ConnectionTrait>(
    conn: &C,
    models: Vec<products::Model>,
) -> AppResult<Vec<Product>> {
    if models.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<Uuid> = models.iter().map(|p| p.id).collect();
    let owner_ids: Vec<Uuid> = models.iter().map(|p| p.owner_id).collect();

    let owners: HashMap<Uuid, String> = Users::find()
        .filter(UserCol::Id.is_in(owner_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, u.display_name()))
        .collect();

    let mut contents: HashMap<Uuid, Vec<ProductContent>> = HashMap::new();
    for entry in ProductContents::find()
        .filter(ContentCol::ProductId.is_in(ids))
        .order_by_asc(ContentCol::Position)
        .all(conn)
        .await?
    {
        contents
            .entry(entry.product_id)
            .or_default()
            .push(ProductContent::from(entry));
    }

    Ok(models
        .into_iter()
        .map(|model| {
            let mut product = Product::from(model);
            product.producer = owners.get(&product.owner_id).cloned();
            product.contents = contents.remove(&product.id).unwrap_or_default();
            product
        })
        .collect())
}

pub(crate) async fn replace_contents<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    entries: &[ContentEntry],
) -> AppResult<()> {
    ProductContents::delete_many()
        .filter(ContentCol::ProductId.eq(product_id))
        .exec(conn)
        .await?;

    for (position, entry) in entries.iter().enumerate() {
        ContentActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            position: Set(position as i32),
            emoji: Set(entry.emoji.clone()),
            label: Set(entry.label.clone()),
        }
        .insert(conn)
        .await?;
    }
    Ok(())
}

pub(crate) async fn ensure_category(state: &AppState, category_id: Option<Uuid>) -> AppResult<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if Categories::find_by_id(id).one(&state.orm).await?.is_none() {
        return Err(AppError::BadRequest("Category not found".into()));
    }
    Ok(())
}
