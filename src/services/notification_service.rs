use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    dto::notifications::{MarkedRead, NotificationList, UnreadCount},
    entity::{
        enums::NotificationKind,
        notifications::{ActiveModel as NotificationActive, Column as NotifCol, Entity as Notifications},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::NotificationQuery,
    state::AppState,
};

/// Appends a message to a user's log. Runs on whatever connection or
/// transaction the caller is using.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    kind: NotificationKind,
    message: impl Into<String>,
) -> AppResult<()> {
    NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        kind: Set(kind),
        message: Set(message.into()),
        read: Set(false),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    tracing::debug!(%user_id, ?kind, "notification stored");
    Ok(())
}

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    query: NotificationQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all().add(NotifCol::UserId.eq(user.user_id));
    if query.unread_only {
        condition = condition.add(NotifCol::Read.eq(false));
    }

    let finder = Notifications::find()
        .filter(condition)
        .order_by_desc(NotifCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn unread_count(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<UnreadCount>> {
    let unread = Notifications::find()
        .filter(NotifCol::UserId.eq(user.user_id))
        .filter(NotifCol::Read.eq(false))
        .count(&state.orm)
        .await?;
    Ok(ApiResponse::ok("Unread notifications", UnreadCount { unread }))
}

pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let existing = Notifications::find_by_id(id)
        .filter(NotifCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Notification"))?;

    if existing.read {
        return Ok(ApiResponse::ok("Notification", Notification::from(existing)));
    }

    let mut active: NotificationActive = existing.into();
    active.read = Set(true);
    let updated = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Notification marked as read", Notification::from(updated)))
}

pub async fn mark_all_read(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<MarkedRead>> {
    let result = Notifications::update_many()
        .col_expr(NotifCol::Read, Expr::value(true))
        .filter(NotifCol::UserId.eq(user.user_id))
        .filter(NotifCol::Read.eq(false))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::ok(
        "All notifications marked as read",
        MarkedRead {
            updated: result.rows_affected,
        },
    ))
}
