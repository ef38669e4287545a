use axum::{extract::FromRequestParts, http::header};
use sea_orm::EntityTrait;
use uuid::Uuid;

use crate::{
    entity::{Users, enums::UserRole},
    error::{AppError, AppResult},
    policy::{Action, Actor, Resource, authorize},
    state::AppState,
    token::decode_token,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    /// Loads the caller's current role and account status. Tokens only carry
    /// the role they were issued with.
    pub async fn actor(&self, state: &AppState) -> AppResult<Actor> {
        let user = Users::find_by_id(self.user_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;
        Ok(Actor {
            id: user.id,
            role: user.role,
            status: user.account_status,
        })
    }
}

pub async fn ensure_admin(state: &AppState, user: &AuthUser) -> AppResult<Actor> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".into()));
    }
    let actor = user.actor(state).await?;
    authorize(&actor, Action::Administer, Resource::None).into_result()?;
    Ok(actor)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let claims = decode_token(&state.config.jwt_secret, token)?;

        let user_id = Uuid::parse_str(&claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        Ok(AuthUser {
            user_id,
            role: claims.role,
        })
    }
}
