use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::{
    audit::record,
    dto::favorites::{AddFavoriteRequest, FavoriteEntry, FavoriteProductList},
    entity::{
        Favorites, Products,
        favorites::Column as FavCol,
        products::Column as ProdCol,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Favorite,
    policy::{Action, Actor, Resource, authorize},
    response::{Ack, ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::with_details,
    state::AppState,
};

pub async fn list_favorites(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<FavoriteProductList>> {
    let actor = favorites_owner(state, user).await?;
    let (page, limit, offset) = pagination.normalize();

    let saved: Vec<(Uuid, DateTime<Utc>)> = sqlx::query_as(
        r#"
        SELECT product_id, created_at
        FROM favorites
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(actor.id)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
        .bind(actor.id)
        .fetch_one(&state.pool)
        .await?;

    let models = Products::find()
        .filter(ProdCol::Id.is_in(saved.iter().map(|(id, _)| *id)))
        .all(&state.orm)
        .await?;
    let mut by_id: HashMap<Uuid, _> = with_details(&state.orm, models)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    // Keep most-recently-favorited first.
    let items = saved
        .into_iter()
        .filter_map(|(id, favorited_at)| {
            by_id.remove(&id).map(|product| FavoriteEntry {
                product,
                favorited_at,
            })
        })
        .collect();

    Ok(ApiResponse::success(
        "Favorites",
        FavoriteProductList { items },
        Some(Meta::new(page, limit, total.0)),
    ))
}

/// Adding a product twice returns the existing favorite.
pub async fn add_favorite(
    state: &AppState,
    user: &AuthUser,
    payload: AddFavoriteRequest,
) -> AppResult<ApiResponse<Favorite>> {
    let actor = favorites_owner(state, user).await?;
    if Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::not_found("Product"));
    }

    let inserted = sqlx::query(
        r#"
        INSERT INTO favorites (id, user_id, product_id)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, product_id) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor.id)
    .bind(payload.product_id)
    .execute(&state.pool)
    .await?
    .rows_affected();

    let favorite = Favorites::find()
        .filter(FavCol::UserId.eq(actor.id))
        .filter(FavCol::ProductId.eq(payload.product_id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Favorite"))?;

    if inserted > 0 {
        record(
            state,
            actor.id,
            "favorite_add",
            "favorites",
            serde_json::json!({ "product_id": payload.product_id }),
        )
        .await;
    }

    Ok(ApiResponse::ok("Added to favorites", Favorite::from(favorite)))
}

pub async fn remove_favorite(
    state: &AppState,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    let actor = favorites_owner(state, user).await?;
    let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND product_id = $2")
        .bind(actor.id)
        .bind(product_id)
        .execute(&state.pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Favorite"));
    }

    record(
        state,
        actor.id,
        "favorite_remove",
        "favorites",
        serde_json::json!({ "product_id": product_id }),
    )
    .await;

    Ok(ApiResponse::ok("Removed from favorites", Ack::done()))
}

async fn favorites_owner(state: &AppState, user: &AuthUser) -> AppResult<Actor> {
    let actor = user.actor(state).await?;
    authorize(&actor, Action::ManageFavorites, Resource::None).into_result()?;
    Ok(actor)
}
