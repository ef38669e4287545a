use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit::record,
    dto::categories::{CreateCategoryRequest, UpdateCategoryRequest},
    entity::categories::{ActiveModel as CategoryActive, Column as CategoryCol, Entity as Categories},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Category,
    response::{Ack, ApiResponse},
    state::AppState,
};

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let admin = ensure_admin(state, user).await?;

    let slug = match payload.slug.as_deref() {
        Some(slug) => slugify(slug),
        None => slugify(&payload.name),
    };
    if slug.is_empty() {
        return Err(AppError::BadRequest("Category slug cannot be empty".into()));
    }
    ensure_slug_free(state, &slug, None).await?;

    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(payload.name.trim().to_string()),
        slug: Set(slug),
        description: Set(payload.description),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    record(
        state,
        admin.id,
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id, "slug": category.slug }),
    )
    .await;

    Ok(ApiResponse::ok("Category created", Category::from(category)))
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    let admin = ensure_admin(state, user).await?;
    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    let mut active: CategoryActive = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name.trim().to_string());
    }
    if let Some(slug) = payload.slug {
        let slug = slugify(&slug);
        if slug.is_empty() {
            return Err(AppError::BadRequest("Category slug cannot be empty".into()));
        }
        ensure_slug_free(state, &slug, Some(id)).await?;
        active.slug = Set(slug);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    let category = active.update(&state.orm).await?;

    record(
        state,
        admin.id,
        "category_update",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Category updated", Category::from(category)))
}

/// Products in the category keep existing with no category.
pub async fn delete_category(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    let admin = ensure_admin(state, user).await?;
    let result = Categories::delete_by_id(id).exec(&state.orm).await?;
    if result.rows_affected == 0 {
        return Err(AppError::not_found("Category"));
    }

    record(
        state,
        admin.id,
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id }),
    )
    .await;

    Ok(ApiResponse::ok("Category deleted", Ack::done()))
}

/// Lowercase ASCII words joined by single dashes. French accents are folded.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for c in input.chars().flat_map(char::to_lowercase).map(fold_accent) {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}

fn fold_accent(c: char) -> char {
    match c {
        'à' | 'â' | 'ä' | 'á' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'î' | 'ï' | 'í' => 'i',
        'ô' | 'ö' | 'ó' => 'o',
        'ù' | 'û' | 'ü' | 'ú' => 'u',
        'ç' => 'c',
        'ÿ' => 'y',
        other => other,
    }
}

async fn ensure_slug_free(state: &AppState, slug: &str, except: Option<Uuid>) -> AppResult<()> {
    let mut finder = Categories::find().filter(CategoryCol::Slug.eq(slug));
    if let Some(id) = except {
        finder = finder.filter(CategoryCol::Id.ne(id));
    }
    if finder.one(&state.orm).await?.is_some() {
        return Err(AppError::Conflict(format!("Category slug '{slug}' already exists")));
    }
    Ok(())
}
