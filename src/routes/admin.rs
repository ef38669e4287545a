use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{
            DashboardStats, UpdateOrderStatusRequest, UpdateUserRequest, UpdateUserStatusRequest,
            UserList,
        },
        categories::{CategoryList, CreateCategoryRequest, UpdateCategoryRequest},
        orders::{OrderList, OrderWithItems},
        products::{AdminUpdateProductRequest, ProductList},
    },
    error::AppResult,
    middleware::{
        auth::{AuthUser, ensure_admin},
        validate::ValidatedJson,
    },
    models::{Category, Order, Product, User},
    response::{Ack, ApiResponse},
    routes::params::{LowStockQuery, OrderListQuery, ProductQuery, UserListQuery},
    services::{admin_service, category_service, shop_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/users", get(list_users))
        .route(
            "/users/{id}",
            get(get_user).put(update_user).delete(delete_user),
        )
        .route("/users/{id}/status", patch(set_user_status))
        .route("/products", get(list_products))
        .route("/products/{id}", put(update_product).delete(delete_product))
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{id}",
            put(update_category).delete(delete_category),
        )
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin).delete(delete_order))
        .route("/orders/{id}/status", patch(update_order_status))
        .route("/inventory/low-stock", get(list_low_stock))
}

#[utoipa::path(
    get,
    path = "/api/admin/dashboard",
    responses(
        (status = 200, description = "Platform counters", body = ApiResponse<DashboardStats>),
        (status = 403, description = "Admin access required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn dashboard(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DashboardStats>>> {
    Ok(Json(admin_service::dashboard(&state, &user).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users",
    params(UserListQuery),
    responses(
        (status = 200, description = "Users", body = ApiResponse<UserList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_users(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<UserList>>> {
    Ok(Json(admin_service::list_users(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User", body = ApiResponse<User>),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(admin_service::get_user(&state, &user, id).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<User>),
        (status = 409, description = "Email already taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateUserRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(admin_service::update_user(&state, &user, id, payload).await?))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/status",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "Account approved or rejected", body = ApiResponse<User>),
        (status = 400, description = "Status must be APPROVED or REJECTED"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn set_user_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    Ok(Json(admin_service::set_user_status(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/users/{id}",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User and owned data removed", body = ApiResponse<Ack>),
        (status = 400, description = "Cannot delete yourself"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    Ok(Json(admin_service::delete_user(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/products",
    operation_id = "admin_list_products",
    params(ProductQuery),
    responses(
        (status = 200, description = "All products in any state", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_products(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(admin_service::list_products_admin(&state, &user, query).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/products/{id}",
    operation_id = "admin_update_product",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = AdminUpdateProductRequest,
    responses(
        (status = 200, description = "Product moderated", body = ApiResponse<Product>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<AdminUpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    Ok(Json(admin_service::update_product_admin(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/products/{id}",
    operation_id = "admin_delete_product",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Product deleted", body = ApiResponse<Ack>),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    Ok(Json(admin_service::delete_product_admin(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/categories",
    responses(
        (status = 200, description = "Categories", body = ApiResponse<CategoryList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_categories(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    ensure_admin(&state, &user).await?;
    Ok(Json(shop_service::categories(&state).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CreateCategoryRequest,
    responses(
        (status = 200, description = "Category created", body = ApiResponse<Category>),
        (status = 409, description = "Slug already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_category(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    Ok(Json(category_service::create_category(&state, &user, payload).await?))
}

#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    request_body = UpdateCategoryRequest,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 404, description = "Category not found"),
        (status = 409, description = "Slug already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    ValidatedJson(payload): ValidatedJson<UpdateCategoryRequest>,
) -> AppResult<Json<ApiResponse<Category>>> {
    Ok(Json(category_service::update_category(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = Uuid, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted, products detached", body = ApiResponse<Ack>),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_category(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    Ok(Json(category_service::delete_category(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "All orders", body = ApiResponse<OrderList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    Ok(Json(admin_service::list_all_orders(&state, &user, query).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order with items", body = ApiResponse<OrderWithItems>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    Ok(Json(admin_service::get_order_admin(&state, &user, id).await?))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Order status updated", body = ApiResponse<Order>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    Ok(Json(admin_service::update_order_status(&state, &user, id, payload).await?))
}

#[utoipa::path(
    delete,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Order deleted", body = ApiResponse<Ack>),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_order(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    Ok(Json(admin_service::delete_order(&state, &user, id).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/inventory/low-stock",
    params(LowStockQuery),
    responses(
        (status = 200, description = "Products at or below the threshold", body = ApiResponse<ProductList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<LowStockQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    Ok(Json(admin_service::list_low_stock(&state, &user, query).await?))
}
