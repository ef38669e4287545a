use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit::record,
    checkout::LOW_STOCK_THRESHOLD,
    dto::{
        admin::{
            DashboardStats, OrderCounts, ProductCounts, UpdateOrderStatusRequest,
            UpdateUserRequest, UpdateUserStatusRequest, UserCounts, UserList,
        },
        orders::{OrderList, OrderWithItems},
        products::{AdminUpdateProductRequest, ProductList},
    },
    entity::{
        CartItems, Carts, Favorites, Notifications, OrderItems, Products,
        cart_items::Column as CartItemCol,
        carts::Column as CartCol,
        enums::{AccountStatus, NotificationKind},
        favorites::Column as FavCol,
        notifications::Column as NotifCol,
        order_items::Column as OrderItemCol,
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Column as ProdCol},
        users::{self, ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, Product, User},
    response::{Ack, ApiResponse, Meta},
    routes::params::{
        LowStockQuery, OrderListQuery, ProductQuery, SortOrder, UserListQuery, contains_pattern,
    },
    services::{
        notification_service::notify,
        order_service::{find_order, order_with_items},
        product_service::{apply_sort, apply_update, filtered, paginate, product_details, replace_contents},
    },
    state::AppState,
};

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(state, user).await?;

    let (total, consumers, producers, restaurants, admins, pending_sellers): (
        i64,
        i64,
        i64,
        i64,
        i64,
        i64,
    ) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE role = 'CONSUMER'),
               COUNT(*) FILTER (WHERE role = 'PRODUCER'),
               COUNT(*) FILTER (WHERE role = 'RESTAURANT'),
               COUNT(*) FILTER (WHERE role = 'ADMIN'),
               COUNT(*) FILTER (WHERE role IN ('PRODUCER', 'RESTAURANT') AND account_status = 'PENDING')
        FROM users
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let (products_total, products_active, out_of_stock): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE is_active AND stock > 0),
               COUNT(*) FILTER (WHERE stock = 0)
        FROM products
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let (orders_total, paid, pending, revenue): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COUNT(*) FILTER (WHERE status = 'PAID'),
               COUNT(*) FILTER (WHERE status = 'PENDING'),
               COALESCE(SUM(total_amount) FILTER (WHERE status = 'PAID'), 0)::BIGINT
        FROM orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    Ok(ApiResponse::ok(
        "Dashboard",
        DashboardStats {
            users: UserCounts {
                total,
                consumers,
                producers,
                restaurants,
                admins,
                pending_sellers,
            },
            products: ProductCounts {
                total: products_total,
                active: products_active,
                out_of_stock,
            },
            orders: OrderCounts {
                total: orders_total,
                paid,
                pending,
            },
            revenue,
        },
    ))
}

pub async fn list_users(
    state: &AppState,
    user: &AuthUser,
    query: UserListQuery,
) -> AppResult<ApiResponse<UserList>> {
    ensure_admin(state, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(role) = query.role {
        condition = condition.add(UserCol::Role.eq(role));
    }
    if let Some(status) = query.status {
        condition = condition.add(UserCol::AccountStatus.eq(status));
    }
    if let Some(search) = query.q.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = contains_pattern(search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(UserCol::Email).ilike(pattern.clone()))
                .add(Expr::col(UserCol::FirstName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::LastName).ilike(pattern.clone()))
                .add(Expr::col(UserCol::CompanyName).ilike(pattern)),
        );
    }

    let finder = Users::find()
        .filter(condition)
        .order_by_desc(UserCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    Ok(ApiResponse::success(
        "Users",
        UserList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    ensure_admin(state, user).await?;
    let found = find_user(state, id).await?;
    Ok(ApiResponse::ok("User", User::from(found)))
}

pub async fn update_user(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    let admin = ensure_admin(state, user).await?;
    let existing = find_user(state, id).await?;

    let mut active: UserActive = existing.into();
    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        let taken = Users::find()
            .filter(UserCol::Email.eq(email.as_str()))
            .filter(UserCol::Id.ne(id))
            .one(&state.orm)
            .await?;
        if taken.is_some() {
            return Err(AppError::Conflict("Email is already taken".into()));
        }
        active.email = Set(email);
    }
    if let Some(first_name) = payload.first_name {
        active.first_name = Set(first_name);
    }
    if let Some(last_name) = payload.last_name {
        active.last_name = Set(last_name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(Some(phone));
    }
    if let Some(address) = payload.address {
        active.address = Set(Some(address));
    }
    if let Some(city) = payload.city {
        active.city = Set(Some(city));
    }
    if let Some(postal_code) = payload.postal_code {
        active.postal_code = Set(Some(postal_code));
    }
    if let Some(region) = payload.region {
        active.region = Set(Some(region));
    }
    if let Some(company_name) = payload.company_name {
        active.company_name = Set(Some(company_name));
    }
    if let Some(role) = payload.role {
        active.role = Set(role);
    }
    if let Some(siret) = payload.siret {
        active.siret = Set(Some(siret));
    }
    if let Some(iban) = payload.iban {
        active.iban = Set(Some(iban));
    }
    if let Some(bic) = payload.bic {
        active.bic = Set(Some(bic));
    }
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active
        .update(&state.orm)
        .await
        .map_err(AppError::on_unique("Email is already taken"))?;

    record(
        state,
        admin.id,
        "admin_user_update",
        "users",
        serde_json::json!({ "user_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("User updated", User::from(updated)))
}

/// Approves or rejects an account and tells its owner.
pub async fn set_user_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserStatusRequest,
) -> AppResult<ApiResponse<User>> {
    let admin = ensure_admin(state, user).await?;
    let (kind, text) = match payload.status {
        AccountStatus::Approved => (
            NotificationKind::AccountApproved,
            "Your account has been approved, you can now sign in and sell on GreenCart",
        ),
        AccountStatus::Rejected => (
            NotificationKind::AccountRejected,
            "Your account application has been rejected",
        ),
        AccountStatus::Pending => {
            return Err(AppError::BadRequest(
                "Status must be APPROVED or REJECTED".into(),
            ));
        }
    };

    let existing = find_user(state, id).await?;
    let email = existing.email.clone();

    let mut active: UserActive = existing.into();
    active.account_status = Set(payload.status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let updated = active.update(&state.orm).await?;

    notify(&state.orm, id, kind, text).await?;
    if let Err(err) = state
        .mailer
        .send(&email, "Your GreenCart account", text.to_string())
        .await
    {
        tracing::warn!(error = %err, user_id = %id, "status mail not sent");
    }

    tracing::info!(user_id = %id, status = ?payload.status, "account status changed");
    record(
        state,
        admin.id,
        "admin_user_status",
        "users",
        serde_json::json!({ "user_id": id, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::ok("User status updated", User::from(updated)))
}

/// Removes a user and everything hanging off them in one transaction.
/// Orders they sold keep their rows with the seller reference cleared.
pub async fn delete_user(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Ack>> {
    let admin = ensure_admin(state, user).await?;
    if admin.id == id {
        return Err(AppError::BadRequest("You cannot delete your own account".into()));
    }
    find_user(state, id).await?;

    let txn = state.orm.begin().await?;

    Notifications::delete_many()
        .filter(NotifCol::UserId.eq(id))
        .exec(&txn)
        .await?;
    Favorites::delete_many()
        .filter(FavCol::UserId.eq(id))
        .exec(&txn)
        .await?;

    if let Some(cart) = Carts::find().filter(CartCol::UserId.eq(id)).one(&txn).await? {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
        Carts::delete_by_id(cart.id).exec(&txn).await?;
    }

    let bought: Vec<Uuid> = Orders::find()
        .select_only()
        .column(OrderCol::Id)
        .filter(OrderCol::UserId.eq(id))
        .into_tuple()
        .all(&txn)
        .await?;
    if !bought.is_empty() {
        OrderItems::delete_many()
            .filter(OrderItemCol::OrderId.is_in(bought.iter().copied()))
            .exec(&txn)
            .await?;
        Orders::delete_many()
            .filter(OrderCol::UserId.eq(id))
            .exec(&txn)
            .await?;
    }

    Products::delete_many()
        .filter(ProdCol::OwnerId.eq(id))
        .exec(&txn)
        .await?;
    Users::delete_by_id(id).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(user_id = %id, "user deleted");
    record(
        state,
        admin.id,
        "admin_user_delete",
        "users",
        serde_json::json!({ "user_id": id, "orders_removed": bought.len() }),
    )
    .await;

    Ok(ApiResponse::ok("User deleted", Ack::done()))
}

pub async fn list_products_admin(
    state: &AppState,
    user: &AuthUser,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(state, user).await?;
    let finder = apply_sort(filtered(&query), &query);
    paginate(state, finder, query.pagination(), "Products").await
}

pub async fn update_product_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: AdminUpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let admin = ensure_admin(state, user).await?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;

    let txn = state.orm.begin().await?;
    let mut active: ProductActive = existing.into();
    if let Some(featured) = payload.featured {
        active.featured = Set(featured);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    let contents = apply_update(&mut active, payload.product);
    let updated = active.update(&txn).await?;
    if let Some(contents) = contents {
        replace_contents(&txn, updated.id, &contents).await?;
    }
    let product = product_details(&txn, updated).await?;
    txn.commit().await?;

    record(
        state,
        admin.id,
        "admin_product_update",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Product updated", product))
}

pub async fn delete_product_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    let admin = ensure_admin(state, user).await?;
    let result = Products::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Product"));
    }

    record(
        state,
        admin.id,
        "admin_product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Product deleted", Ack::done()))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(state, user).await?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(state, user).await?;
    let order = find_order(state, id).await?;
    Ok(ApiResponse::ok("Order found", order_with_items(state, order).await?))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let admin = ensure_admin(state, user).await?;
    let existing = find_order(state, id).await?;

    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    active.updated_at = Set(Utc::now().fixed_offset());
    let order = active.update(&state.orm).await?;

    record(
        state,
        admin.id,
        "order_status_update",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status }),
    )
    .await;

    Ok(ApiResponse::ok("Order updated", Order::from(order)))
}

pub async fn delete_order(state: &AppState, user: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Ack>> {
    let admin = ensure_admin(state, user).await?;

    let txn = state.orm.begin().await?;
    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    let result = Orders::delete_by_id(id).exec(&txn).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Order"));
    }
    txn.commit().await?;

    record(
        state,
        admin.id,
        "admin_order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Order deleted", Ack::done()))
}

pub async fn list_low_stock(
    state: &AppState,
    user: &AuthUser,
    query: LowStockQuery,
) -> AppResult<ApiResponse<ProductList>> {
    ensure_admin(state, user).await?;
    let threshold = query.threshold.unwrap_or(LOW_STOCK_THRESHOLD);

    let finder = Products::find()
        .filter(ProdCol::Stock.lte(threshold))
        .order_by_asc(ProdCol::Stock)
        .order_by_desc(ProdCol::CreatedAt);
    paginate(state, finder, query.pagination(), "Low stock").await
}

async fn find_user(state: &AppState, id: Uuid) -> AppResult<users::Model> {
    Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))
}
