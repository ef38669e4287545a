use std::time::Duration;

use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    response::{ApiResponse, Meta},
    state::AppState,
};

const DB_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    /// `ok`, or `degraded` when the database does not answer.
    pub status: String,
    pub version: String,
    pub database: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up; `database` reports reachability", body = ApiResponse<HealthData>),
    ),
    tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> Json<ApiResponse<HealthData>> {
    let ping = sqlx::query("SELECT 1").execute(&state.pool);
    let database_up = matches!(tokio::time::timeout(DB_PING_TIMEOUT, ping).await, Ok(Ok(_)));
    if !database_up {
        tracing::warn!("health check: database unreachable");
    }

    let data = HealthData {
        status: if database_up { "ok" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_up { "up" } else { "down" }.to_string(),
    };

    Json(ApiResponse::success("Health check", data, Some(Meta::empty())))
}
