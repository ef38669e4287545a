use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::record,
    dto::cart::{
        AddToCartRequest, CartItemDto, CartView, MAX_CART_QUANTITY, UpdateCartItemRequest,
    },
    entity::{
        Products,
        cart_items::{self, ActiveModel as CartItemActive, Column as CartItemCol, Entity as CartItems},
        carts::{self, ActiveModel as CartActive, Column as CartCol, Entity as Carts},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    policy::{Action, Actor, Resource, authorize},
    response::ApiResponse,
    services::product_service::with_details,
    state::AppState,
};

/// Finds the user's cart, creating it on first use.
pub async fn ensure_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<carts::Model> {
    if let Some(cart) = find_cart(conn, user_id).await? {
        return Ok(cart);
    }

    // A concurrent request may create the cart first; keep whichever row won.
    let created = Carts::insert(CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: NotSet,
        updated_at: NotSet,
    })
    .on_conflict(OnConflict::column(CartCol::UserId).do_nothing().to_owned())
    .exec_without_returning(conn)
    .await?;
    if created > 0 {
        tracing::debug!(%user_id, "cart created");
    }

    find_cart(conn, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart"))
}

async fn find_cart<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Option<carts::Model>> {
    Ok(Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .one(conn)
        .await?)
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let actor = cart_owner(state, user).await?;
    let cart = ensure_cart(&state.orm, actor.id).await?;
    Ok(ApiResponse::ok("Cart", cart_view(state, &cart).await?))
}

/// Adds to the quantity already in the cart.
pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    let actor = cart_owner(state, user).await?;
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    if !product.is_active {
        return Err(AppError::BadRequest("Product is not available".into()));
    }

    let cart = ensure_cart(&state.orm, actor.id).await?;
    let existing = find_item(state, cart.id, product.id).await?;
    let quantity = existing
        .as_ref()
        .map_or(0, |item| item.quantity)
        .checked_add(payload.quantity)
        .ok_or_else(quantity_out_of_range)?;
    check_quantity(quantity)?;
    check_stock(quantity, product.stock)?;

    match existing {
        Some(item) => {
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&state.orm).await?;
        }
        None => {
            // Two first adds racing on the same product collapse into one line.
            CartItems::insert(CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(product.id),
                quantity: Set(quantity),
                created_at: NotSet,
            })
            .on_conflict(
                OnConflict::columns([CartItemCol::CartId, CartItemCol::ProductId])
                    .update_column(CartItemCol::Quantity)
                    .to_owned(),
            )
            .exec_without_returning(&state.orm)
            .await?;
        }
    }
    touch(state, cart.clone()).await?;

    record(
        state,
        actor.id,
        "cart_add",
        "cart_items",
        serde_json::json!({ "product_id": product.id, "quantity": quantity }),
    )
    .await;

    Ok(ApiResponse::ok("Item added to cart", cart_view(state, &cart).await?))
}

/// Sets the quantity of a product already in the cart.
pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    let actor = cart_owner(state, user).await?;
    let cart = ensure_cart(&state.orm, actor.id).await?;
    let item = find_item(state, cart.id, product_id)
        .await?
        .ok_or_else(|| AppError::not_found("Cart item"))?;
    let product = Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Product"))?;
    check_quantity(payload.quantity)?;
    check_stock(payload.quantity, product.stock)?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    active.update(&state.orm).await?;
    touch(state, cart.clone()).await?;

    Ok(ApiResponse::ok("Cart updated", cart_view(state, &cart).await?))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<CartView>> {
    let actor = cart_owner(state, user).await?;
    let cart = ensure_cart(&state.orm, actor.id).await?;
    let result = CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Cart item"));
    }
    touch(state, cart.clone()).await?;

    record(
        state,
        actor.id,
        "cart_remove",
        "cart_items",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::ok("Item removed from cart", cart_view(state, &cart).await?))
}

pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let actor = cart_owner(state, user).await?;
    let cart = ensure_cart(&state.orm, actor.id).await?;
    CartItems::delete_many()
        .filter(CartItemCol::CartId.eq(cart.id))
        .exec(&state.orm)
        .await?;
    touch(state, cart.clone()).await?;

    Ok(ApiResponse::ok("Cart cleared", cart_view(state, &cart).await?))
}

async fn cart_owner(state: &AppState, user: &AuthUser) -> AppResult<Actor> {
    let actor = user.actor(state).await?;
    authorize(&actor, Action::UseCart, Resource::None).into_result()?;
    Ok(actor)
}

fn check_quantity(quantity: i32) -> AppResult<()> {
    if !(1..=MAX_CART_QUANTITY).contains(&quantity) {
        return Err(quantity_out_of_range());
    }
    Ok(())
}

fn quantity_out_of_range() -> AppError {
    AppError::BadRequest(format!(
        "Quantity must be between 1 and {MAX_CART_QUANTITY}"
    ))
}

fn check_stock(quantity: i32, stock: i32) -> AppResult<()> {
    if quantity > stock {
        return Err(AppError::BadRequest(format!(
            "Insufficient stock: only {stock} left"
        )));
    }
    Ok(())
}

async fn find_item(
    state: &AppState,
    cart_id: Uuid,
    product_id: Uuid,
) -> AppResult<Option<cart_items::Model>> {
    Ok(CartItems::find()
        .filter(CartItemCol::CartId.eq(cart_id))
        .filter(CartItemCol::ProductId.eq(product_id))
        .one(&state.orm)
        .await?)
}

async fn touch(state: &AppState, cart: carts::Model) -> AppResult<()> {
    let mut active: CartActive = cart.into();
    active.updated_at = Set(Utc::now().fixed_offset());
    active.update(&state.orm).await?;
    Ok(())
}

async fn cart_view(state: &AppState, cart: &carts::Model) -> AppResult<CartView> {
    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .find_also_related(Products)
        .all(&state.orm)
        .await?;

    let (items, products): (Vec<_>, Vec<_>) = rows
        .into_iter()
        .filter_map(|(item, product)| product.map(|p| (item, p)))
        .unzip();
    let products = with_details(&state.orm, products).await?;

    let items: Vec<CartItemDto> = items
        .into_iter()
        .zip(products)
        .map(|(item, product)| CartItemDto {
            id: item.id,
            line_total: product.price * i64::from(item.quantity),
            quantity: item.quantity,
            product,
        })
        .collect();

    Ok(CartView {
        id: cart.id,
        item_count: items.iter().map(|i| i64::from(i.quantity)).sum(),
        total: items.iter().map(|i| i.line_total).sum(),
        items,
    })
}
