use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch},
};
use uuid::Uuid;

use crate::{
    dto::notifications::{MarkedRead, NotificationList, UnreadCount},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Notification,
    response::ApiResponse,
    routes::params::NotificationQuery,
    services::notification_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", patch(mark_all_read))
        .route("/{id}/read", patch(mark_read))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(NotificationQuery),
    responses(
        (status = 200, description = "Caller's notifications, newest first", body = ApiResponse<NotificationList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<ApiResponse<NotificationList>>> {
    let resp = notification_service::list_notifications(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses(
        (status = 200, description = "Unread count", body = ApiResponse<UnreadCount>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let resp = notification_service::unread_count(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/read",
    params(
        ("id" = Uuid, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Marked read", body = ApiResponse<Notification>),
        (status = 404, description = "Notification not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let resp = notification_service::mark_read(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/notifications/read-all",
    responses(
        (status = 200, description = "All marked read", body = ApiResponse<MarkedRead>)
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MarkedRead>>> {
    let resp = notification_service::mark_all_read(&state, &user).await?;
    Ok(Json(resp))
}
