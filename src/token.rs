use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use password_hash::rand_core::{OsRng, RngCore};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::enums::UserRole,
    error::{AppError, AppResult},
};

/// Reset tokens stay valid this long.
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub fn issue_token(
    secret: &str,
    user_id: Uuid,
    role: UserRole,
    lifetime_hours: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(lifetime_hours))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        role,
        iat: now.timestamp() as usize,
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

pub fn decode_token(secret: &str, token: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))
}

/// 32 random bytes, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Only this digest is persisted.
pub fn digest_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
