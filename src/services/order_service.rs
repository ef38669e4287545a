use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, Query};
use uuid::Uuid;

use crate::{
    audit::record,
    checkout::{CartLine, apply_sale, combined_total, format_price, group_by_seller, order_ref},
    dto::orders::{
        BuyerContact, CheckoutResponse, LowStockWarning, OrderList, OrderWithItems, PickupResult,
        SellerOrder, SellerOrderList, SellerOrderSummary, WebhookAck,
    },
    entity::{
        Carts, Products, Users,
        carts::Column as CartCol,
        cart_items::{Column as CartItemCol, Entity as CartItems},
        enums::{NotificationKind, OrderStatus},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{self, ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Column as ProdCol},
        users::Column as UserCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    payments::{PAYMENT_SUCCEEDED, WebhookEvent, verify_signature},
    policy::{Action, Decision, Denial, Resource, authorize},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::notification_service::notify,
    state::AppState,
};

/// Checks out the caller's cart. Without a payment provider the payment is
/// simulated and orders are created immediately, one per seller.
pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CheckoutResponse>> {
    let actor = user.actor(state).await?;
    authorize(&actor, Action::Checkout, Resource::None).into_result()?;

    match state.payments.as_ref() {
        Some(_) => checkout_with_provider(state, actor.id).await,
        None => checkout_simulated(state, actor.id).await,
    }
}

async fn checkout_with_provider(
    state: &AppState,
    buyer_id: Uuid,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let Some(client) = state.payments.as_ref() else {
        return Err(AppError::Internal(anyhow::anyhow!("payment provider not configured")));
    };

    let lines = load_cart_lines(&state.orm, buyer_id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    let total = combined_total(&lines);

    let intent = client
        .create_payment_intent(total, &state.config.payments.currency, &buyer_id.to_string())
        .await
        .map_err(AppError::Internal)?;

    tracing::info!(%buyer_id, intent = %intent.id, total, "payment intent created");
    record(
        state,
        buyer_id,
        "checkout_intent",
        "orders",
        serde_json::json!({ "payment_intent_id": intent.id, "total": total }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Payment intent created",
        CheckoutResponse {
            client_secret: intent.client_secret,
            payment_intent_id: Some(intent.id),
            total,
            orders: Vec::new(),
            low_stock_warnings: Vec::new(),
            message: format!("Complete the payment of {}", format_price(total)),
        },
    ))
}

async fn checkout_simulated(
    state: &AppState,
    buyer_id: Uuid,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    let txn = state.orm.begin().await?;

    let lines = load_cart_lines(&txn, buyer_id).await?;
    if lines.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    // Lock every touched product up front, in id order, so concurrent
    // checkouts cannot interleave their stock writes.
    let product_ids: BTreeSet<Uuid> = lines.iter().map(|l| l.product_id).collect();
    Products::find()
        .filter(ProdCol::Id.is_in(product_ids.iter().copied()))
        .order_by_asc(ProdCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    let groups = group_by_seller(&lines);
    let mut summaries = Vec::with_capacity(groups.len());
    for group in &groups {
        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(buyer_id),
            seller_id: Set(Some(group.seller_id)),
            total_amount: Set(group.subtotal),
            status: Set(OrderStatus::Paid),
            payment_intent_id: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        for line in &group.lines {
            OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(Some(line.product_id)),
                seller_id: Set(Some(line.seller_id)),
                product_name: Set(line.product_name.clone()),
                quantity: Set(line.quantity),
                price_at_purchase: Set(line.unit_price),
                seller_ready: Set(false),
                picked_up: Set(false),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
        }

        summaries.push(SellerOrderSummary {
            order_id: order.id,
            seller_id: group.seller_id,
            total: group.subtotal,
        });
    }

    let mut warnings = Vec::new();
    for line in &lines {
        let Some(product) = Products::find_by_id(line.product_id).one(&txn).await? else {
            continue;
        };
        let owner_id = product.owner_id;
        let update = apply_sale(product.stock, line.quantity);

        let mut active: ProductActive = product.into();
        active.stock = Set(update.new_stock);
        active.is_active = Set(update.is_active);
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&txn).await?;

        if update.low_stock {
            tracing::info!(product_id = %line.product_id, remaining = update.new_stock, "low stock");
            notify(
                &txn,
                owner_id,
                NotificationKind::LowStock,
                format!(
                    "Low stock: only {} left of \"{}\"",
                    update.new_stock, line.product_name
                ),
            )
            .await?;
            warnings.push(LowStockWarning {
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                remaining: update.new_stock,
            });
        }
    }

    for (group, summary) in groups.iter().zip(&summaries) {
        let units: i32 = group.lines.iter().map(|l| l.quantity).sum();
        notify(
            &txn,
            group.seller_id,
            NotificationKind::NewOrder,
            format!(
                "New order #{}: {units} item(s) for {}",
                order_ref(summary.order_id),
                format_price(group.subtotal)
            ),
        )
        .await?;
    }

    if let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(buyer_id))
        .one(&txn)
        .await?
    {
        CartItems::delete_many()
            .filter(CartItemCol::CartId.eq(cart.id))
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    let total = combined_total(&lines);
    tracing::info!(%buyer_id, orders = summaries.len(), total, "checkout completed");
    record(
        state,
        buyer_id,
        "checkout",
        "orders",
        serde_json::json!({
            "order_ids": summaries.iter().map(|s| s.order_id).collect::<Vec<_>>(),
            "total": total,
        }),
    )
    .await;

    let message = format!(
        "Payment accepted: {} order(s) created for {}",
        summaries.len(),
        format_price(total)
    );
    Ok(ApiResponse::ok(
        "Checkout success",
        CheckoutResponse {
            client_secret: simulated_client_secret(),
            payment_intent_id: None,
            total,
            orders: summaries,
            low_stock_warnings: warnings,
            message,
        },
    ))
}

async fn load_cart_lines<C: ConnectionTrait>(
    conn: &C,
    buyer_id: Uuid,
) -> AppResult<Vec<CartLine>> {
    let Some(cart) = Carts::find()
        .filter(CartCol::UserId.eq(buyer_id))
        .one(conn)
        .await?
    else {
        return Ok(Vec::new());
    };

    let rows = CartItems::find()
        .filter(CartItemCol::CartId.eq(cart.id))
        .order_by_asc(CartItemCol::CreatedAt)
        .find_also_related(Products)
        .all(conn)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(item, product)| {
            product.map(|p| CartLine {
                product_id: p.id,
                seller_id: p.owner_id,
                product_name: p.name,
                unit_price: p.price,
                quantity: item.quantity,
            })
        })
        .collect())
}

fn simulated_client_secret() -> String {
    format!(
        "pi_sim_{}_secret_{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Verifies a provider callback and marks the matching order paid.
pub async fn handle_webhook(
    state: &AppState,
    signature: Option<&str>,
    payload: &[u8],
) -> AppResult<WebhookAck> {
    let secret = state
        .config
        .payments
        .webhook_secret
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Webhook Error: webhook secret not configured".into()))?;
    let signature = signature
        .ok_or_else(|| AppError::BadRequest("Webhook Error: missing Stripe-Signature header".into()))?;

    verify_signature(payload, signature, secret, Utc::now().timestamp())
        .map_err(|e| AppError::BadRequest(format!("Webhook Error: {e}")))?;

    let event: WebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| AppError::BadRequest(format!("Webhook Error: {e}")))?;

    if event.event_type != PAYMENT_SUCCEEDED {
        tracing::debug!(event_type = %event.event_type, "webhook event ignored");
        return Ok(WebhookAck { received: true });
    }

    let intent_id = event.data.object.id;
    match Orders::find()
        .filter(OrderCol::PaymentIntentId.eq(intent_id.as_str()))
        .one(&state.orm)
        .await?
    {
        Some(order) => {
            let order_id = order.id;
            let mut active: OrderActive = order.into();
            active.status = Set(OrderStatus::Paid);
            active.updated_at = Set(Utc::now().fixed_offset());
            active.update(&state.orm).await?;
            tracing::info!(%order_id, intent = %intent_id, "order paid");
        }
        None => tracing::warn!(intent = %intent_id, "no order for payment intent"),
    }

    Ok(WebhookAck { received: true })
}

/// Seller marks their part of an order ready for pickup.
pub async fn notify_order_ready(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let actor = user.actor(state).await?;
    let order = find_order(state, order_id).await?;

    match authorize(
        &actor,
        Action::MarkOrderReady,
        Resource::Order {
            buyer_id: order.user_id,
            seller_id: order.seller_id,
        },
    ) {
        Decision::Allow => {}
        Decision::Deny(Denial::NotOwner) => return Err(not_your_order()),
        deny => deny.into_result()?,
    }

    let own_items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .filter(OrderItemCol::SellerId.eq(actor.id))
        .all(&state.orm)
        .await?;
    if own_items.is_empty() {
        return Err(not_your_order());
    }
    if own_items.iter().all(|item| item.seller_ready) {
        return Err(AppError::BadRequest("Order already marked as ready".into()));
    }

    OrderItems::update_many()
        .col_expr(OrderItemCol::SellerReady, Expr::value(true))
        .filter(OrderItemCol::OrderId.eq(order.id))
        .filter(OrderItemCol::SellerId.eq(actor.id))
        .exec(&state.orm)
        .await?;

    let seller_name = Users::find_by_id(actor.id)
        .one(&state.orm)
        .await?
        .map(|u| u.display_name())
        .unwrap_or_default();
    notify(
        &state.orm,
        order.user_id,
        NotificationKind::OrderReady,
        format!(
            "Your order #{} is ready for pickup at {seller_name}",
            order_ref(order.id)
        ),
    )
    .await?;

    record(
        state,
        actor.id,
        "order_ready",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Order marked as ready",
        order_with_items(state, order).await?,
    ))
}

/// Buyer confirms collection; only items the seller marked ready move on.
pub async fn confirm_order_pickup(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<PickupResult>> {
    let actor = user.actor(state).await?;
    let order = find_order(state, order_id).await?;

    match authorize(
        &actor,
        Action::ConfirmPickup,
        Resource::Order {
            buyer_id: order.user_id,
            seller_id: order.seller_id,
        },
    ) {
        Decision::Allow => {}
        Decision::Deny(Denial::NotOwner) => {
            return Err(AppError::BadRequest("Order not found for this user".into()));
        }
        deny => deny.into_result()?,
    }

    let ready_condition = Condition::all()
        .add(OrderItemCol::OrderId.eq(order.id))
        .add(OrderItemCol::SellerReady.eq(true))
        .add(OrderItemCol::PickedUp.eq(false));

    let sellers: BTreeSet<Uuid> = OrderItems::find()
        .filter(ready_condition.clone())
        .all(&state.orm)
        .await?
        .into_iter()
        .filter_map(|item| item.seller_id)
        .collect();

    let result = OrderItems::update_many()
        .col_expr(OrderItemCol::PickedUp, Expr::value(true))
        .filter(ready_condition)
        .exec(&state.orm)
        .await?;

    for seller_id in &sellers {
        notify(
            &state.orm,
            *seller_id,
            NotificationKind::OrderPickedUp,
            format!("Order #{} has been picked up", order_ref(order.id)),
        )
        .await?;
    }

    record(
        state,
        actor.id,
        "order_pickup",
        "orders",
        serde_json::json!({ "order_id": order.id, "items": result.rows_affected }),
    )
    .await;

    let message = if result.rows_affected == 0 {
        "No items ready for pickup"
    } else {
        "Pickup confirmed"
    };
    Ok(ApiResponse::ok(
        message,
        PickupResult {
            picked_up: result.rows_affected,
            order: order_with_items(state, order).await?,
        },
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
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

/// Orders containing the seller's items, each limited to those items.
pub async fn list_seller_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<SellerOrderList>> {
    let actor = user.actor(state).await?;
    authorize(&actor, Action::ViewSellerOrders, Resource::None).into_result()?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(
        OrderCol::Id.in_subquery(
            Query::select()
                .column(OrderItemCol::OrderId)
                .from(OrderItems)
                .and_where(OrderItemCol::SellerId.eq(actor.id))
                .to_owned(),
        ),
    );
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let buyer_ids: Vec<Uuid> = orders.iter().map(|o| o.user_id).collect();

    let mut items_by_order: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    for item in OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .filter(OrderItemCol::SellerId.eq(actor.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
    {
        items_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderItem::from(item));
    }

    let buyers: HashMap<Uuid, BuyerContact> = Users::find()
        .filter(UserCol::Id.is_in(buyer_ids))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|u| {
            (
                u.id,
                BuyerContact {
                    id: u.id,
                    name: u.display_name(),
                    email: u.email,
                    phone: u.phone,
                },
            )
        })
        .collect();

    let items = orders
        .into_iter()
        .map(|order| SellerOrder {
            items: items_by_order.remove(&order.id).unwrap_or_default(),
            buyer: buyers.get(&order.user_id).cloned(),
            order: Order::from(order),
        })
        .collect();

    Ok(ApiResponse::success(
        "Seller orders",
        SellerOrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Visible to the buyer, the order's seller and admins.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let actor = user.actor(state).await?;
    let order = find_order(state, id).await?;

    let decision = authorize(
        &actor,
        Action::ViewOrder,
        Resource::Order {
            buyer_id: order.user_id,
            seller_id: order.seller_id,
        },
    );
    if !decision.is_allowed() {
        return Err(AppError::not_found("Order"));
    }

    Ok(ApiResponse::ok("Order", order_with_items(state, order).await?))
}

pub(crate) async fn find_order(state: &AppState, id: Uuid) -> AppResult<orders::Model> {
    Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))
}

pub(crate) async fn order_with_items(
    state: &AppState,
    order: orders::Model,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(OrderWithItems {
        order: Order::from(order),
        items,
    })
}

fn not_your_order() -> AppError {
    AppError::BadRequest("This order contains none of your products".into())
}
