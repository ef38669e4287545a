use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{Duration, Utc};
use password_hash::rand_core::OsRng;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set, TransactionTrait};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::record,
    dto::auth::{
        ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        ResetPasswordRequest,
    },
    entity::{
        Users,
        carts::ActiveModel as CartActive,
        enums::{AccountStatus, UserRole},
        users::{self, ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    state::AppState,
    token::{RESET_TOKEN_TTL_MINUTES, digest_reset_token, generate_reset_token, issue_token},
};

const EMAIL_TAKEN: &str = "Email is already taken";

const FORGOT_PASSWORD_REPLY: &str =
    "If an account exists for this email, a reset link has been sent";

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<User>> {
    let role = payload.role.unwrap_or(UserRole::Consumer);
    if role == UserRole::Admin {
        return Err(AppError::BadRequest("Cannot register as admin".into()));
    }
    if role.is_seller() {
        check_seller_details(&payload)?;
    }

    let email = normalize_email(&payload.email);
    let taken = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;
    if taken.is_some() {
        return Err(AppError::Conflict(EMAIL_TAKEN.into()));
    }

    let password_hash = hash_password(&payload.password)?;

    let txn = state.orm.begin().await?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email),
        password_hash: Set(password_hash),
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        phone: Set(payload.phone),
        address: Set(payload.address),
        city: Set(payload.city),
        postal_code: Set(payload.postal_code),
        region: Set(payload.region),
        company_name: Set(payload.company_name),
        role: Set(role),
        account_status: Set(role.initial_status()),
        siret: Set(payload.siret.map(|s| compact(&s))),
        iban: Set(payload.iban.map(|s| compact(&s))),
        bic: Set(payload.bic.map(|s| compact(&s))),
        student_proof: Set(None),
        reset_token: Set(None),
        reset_token_expires_at: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(AppError::on_unique(EMAIL_TAKEN))?;

    if role == UserRole::Consumer {
        CartActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(user.id),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;

    tracing::info!(user_id = %user.id, ?role, "user registered");
    record(
        state,
        user.id,
        "user_register",
        "users",
        serde_json::json!({ "user_id": user.id, "role": role }),
    )
    .await;

    Ok(ApiResponse::ok("User created", User::from(user)))
}

/// Checks credentials and the account status gate.
pub async fn validate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> AppResult<users::Model> {
    let user = Users::find()
        .filter(UserCol::Email.eq(normalize_email(email)))
        .one(&state.orm)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(password, &user.password_hash)? {
        return Err(invalid_credentials());
    }

    check_login_status(user.role, user.account_status)?;
    Ok(user)
}

/// Sellers must be approved before they can sign in.
pub fn check_login_status(role: UserRole, status: AccountStatus) -> AppResult<()> {
    if !role.is_seller() {
        return Ok(());
    }
    match status {
        AccountStatus::Approved => Ok(()),
        AccountStatus::Pending => Err(AppError::Unauthorized(
            "Your account is pending approval".into(),
        )),
        AccountStatus::Rejected => Err(AppError::Unauthorized(
            "Your account has been rejected".into(),
        )),
    }
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginResponse>> {
    let user = validate_user(state, &payload.email, &payload.password).await?;
    let resp = login_response(state, user)?;

    record(
        state,
        resp.user.id,
        "user_login",
        "users",
        serde_json::json!({ "user_id": resp.user.id }),
    )
    .await;

    Ok(ApiResponse::ok("Logged in", resp))
}

pub async fn refresh_token(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<LoginResponse>> {
    let current = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;
    check_login_status(current.role, current.account_status)?;

    Ok(ApiResponse::ok("Token refreshed", login_response(state, current)?))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<User>> {
    let current = Users::find_by_id(user.user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    Ok(ApiResponse::ok("Profile", User::from(current)))
}

/// Issues a reset token and mails it. The reply is the same whether or not
/// the address is known, and never carries the token.
pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<MessageResponse>> {
    let email = normalize_email(&payload.email);
    let user = Users::find()
        .filter(UserCol::Email.eq(email.as_str()))
        .one(&state.orm)
        .await?;

    if let Some(user) = user {
        let token = generate_reset_token();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);

        let user_id = user.id;
        let mut active: UserActive = user.into();
        active.reset_token = Set(Some(digest_reset_token(&token)));
        active.reset_token_expires_at = Set(Some(expires_at.fixed_offset()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&state.orm).await?;

        let link = format!(
            "{}/reset-password?token={token}",
            state.config.frontend_url.trim_end_matches('/')
        );
        let body = format!(
            "A password reset was requested for your GreenCart account.\n\n\
             Open this link to choose a new password:\n{link}\n\n\
             The link expires in {RESET_TOKEN_TTL_MINUTES} minutes. \
             If you did not ask for this, ignore this message."
        );
        if let Err(err) = state
            .mailer
            .send(&email, "Reset your GreenCart password", body)
            .await
        {
            tracing::warn!(error = %err, %user_id, "reset mail not sent");
        }

        record(
            state,
            user_id,
            "password_forgot",
            "users",
            serde_json::json!({ "user_id": user_id }),
        )
        .await;
    } else {
        tracing::debug!("password reset requested for unknown email");
    }

    Ok(ApiResponse::ok(
        FORGOT_PASSWORD_REPLY,
        MessageResponse {
            message: FORGOT_PASSWORD_REPLY.to_string(),
        },
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<MessageResponse>> {
    let digest = digest_reset_token(&payload.token);
    let now = Utc::now().fixed_offset();

    let user = Users::find()
        .filter(UserCol::ResetToken.eq(digest))
        .filter(UserCol::ResetTokenExpiresAt.gt(now))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired token".into()))?;

    let user_id = user.id;
    let mut active: UserActive = user.into();
    active.password_hash = Set(hash_password(&payload.password)?);
    active.reset_token = Set(None);
    active.reset_token_expires_at = Set(None);
    active.updated_at = Set(now);
    active.update(&state.orm).await?;

    record(
        state,
        user_id,
        "password_reset",
        "users",
        serde_json::json!({ "user_id": user_id }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Password updated",
        MessageResponse {
            message: "Password updated".to_string(),
        },
    ))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))
}

fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

fn login_response(state: &AppState, user: users::Model) -> AppResult<LoginResponse> {
    let hours = state.config.jwt_expires_hours;
    let access_token = issue_token(&state.config.jwt_secret, user.id, user.role, hours)?;
    Ok(LoginResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: hours * 3600,
        user: User::from(user),
    })
}

fn check_seller_details(payload: &RegisterRequest) -> AppResult<()> {
    let siret = payload.siret.as_deref().map(compact).unwrap_or_default();
    if !is_valid_siret(&siret) {
        return Err(AppError::BadRequest(
            "SIRET is required for sellers and must be 14 digits".into(),
        ));
    }
    if payload.iban.as_deref().map(compact).unwrap_or_default().is_empty() {
        return Err(AppError::BadRequest("IBAN is required for sellers".into()));
    }
    if payload.bic.as_deref().map(compact).unwrap_or_default().is_empty() {
        return Err(AppError::BadRequest("BIC is required for sellers".into()));
    }
    Ok(())
}

pub fn is_valid_siret(siret: &str) -> bool {
    siret.len() == 14 && siret.chars().all(|c| c.is_ascii_digit())
}

fn compact(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".into())
}
