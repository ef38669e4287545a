use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, Set};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    audit::record,
    entity::{
        ProductImages, Users,
        product_images::ActiveModel as ProductImageActive,
        users::{ActiveModel as UserActive, Column as UserCol},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    policy::{Action, Resource, authorize},
    response::{Ack, ApiResponse},
    state::AppState,
    storage::{StoredFile, UploadKind, check_name},
};

/// Stores an upload. A student proof replaces the caller's previous one.
pub async fn upload(
    state: &AppState,
    user: &AuthUser,
    kind: UploadKind,
    original_name: &str,
    bytes: &[u8],
) -> AppResult<ApiResponse<StoredFile>> {
    let actor = user.actor(state).await?;
    let action = match kind {
        UploadKind::ProductImage => Action::UploadProductImage,
        UploadKind::StudentProof => Action::UploadStudentProof,
    };
    authorize(&actor, action, Resource::None).into_result()?;

    let stored = state.files.save(kind, original_name, bytes).await?;

    if kind == UploadKind::ProductImage {
        let owned = ProductImageActive {
            filename: Set(stored.filename.clone()),
            owner_id: Set(actor.id),
            created_at: NotSet,
        }
        .insert(&state.orm)
        .await;
        if let Err(err) = owned {
            if let Err(cleanup) = state.files.delete(kind, &stored.filename).await {
                tracing::warn!(error = %cleanup, filename = %stored.filename, "orphan image not removed");
            }
            return Err(err.into());
        }
    }

    if kind == UploadKind::StudentProof {
        let owner = Users::find_by_id(actor.id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        let previous = owner.student_proof.clone();

        let mut active: UserActive = owner.into();
        active.student_proof = Set(Some(stored.filename.clone()));
        active.updated_at = Set(Utc::now().fixed_offset());
        active.update(&state.orm).await?;

        if let Some(previous) = previous.filter(|p| *p != stored.filename) {
            if let Err(err) = state.files.delete(kind, &previous).await {
                tracing::warn!(error = %err, %previous, "old student proof not removed");
            }
        }
    }

    record(
        state,
        actor.id,
        "file_upload",
        kind.dir_name(),
        serde_json::json!({ "filename": stored.filename, "size": stored.size }),
    )
    .await;

    Ok(ApiResponse::ok("File uploaded", stored))
}

/// Product images are public.
pub async fn read_product_image(state: &AppState, filename: &str) -> AppResult<(Vec<u8>, &'static str)> {
    state.files.read(UploadKind::ProductImage, filename).await
}

/// Student proofs are readable by their owner and admins.
pub async fn read_student_proof(
    state: &AppState,
    user: &AuthUser,
    filename: &str,
) -> AppResult<(Vec<u8>, &'static str)> {
    check_name(UploadKind::StudentProof, filename)?;
    let actor = user.actor(state).await?;
    let owner_id = proof_owner(state, filename).await?.unwrap_or_default();
    authorize(&actor, Action::ViewStudentProof, Resource::StudentProof { owner_id })
        .into_result()?;
    state.files.read(UploadKind::StudentProof, filename).await
}

/// Deleting a file that no longer exists succeeds. Product images can be
/// removed by their uploader; images with no recorded uploader by admins only.
pub async fn delete_file(
    state: &AppState,
    user: &AuthUser,
    kind: UploadKind,
    filename: &str,
) -> AppResult<ApiResponse<Ack>> {
    check_name(kind, filename)?;
    let actor = user.actor(state).await?;
    match kind {
        UploadKind::ProductImage => {
            match ProductImages::find_by_id(filename.to_string())
                .one(&state.orm)
                .await?
            {
                Some(image) => {
                    let owner_id = image.owner_id;
                    authorize(&actor, Action::DeleteProductImage, Resource::ProductImage { owner_id })
                        .into_result()?;
                    image.delete(&state.orm).await?;
                }
                None if state.files.exists(kind, filename).await? => {
                    authorize(&actor, Action::Administer, Resource::None).into_result()?;
                }
                None => {
                    authorize(&actor, Action::UploadProductImage, Resource::None).into_result()?;
                }
            }
            state.files.delete(kind, filename).await?;
        }
        UploadKind::StudentProof => {
            if let Some(owner_id) = proof_owner(state, filename).await? {
                authorize(&actor, Action::ViewStudentProof, Resource::StudentProof { owner_id })
                    .into_result()?;
                Users::update_many()
                    .col_expr(UserCol::StudentProof, Expr::value(Option::<String>::None))
                    .filter(UserCol::Id.eq(owner_id))
                    .exec(&state.orm)
                    .await?;
            }
            state.files.delete(kind, filename).await?;
        }
    }

    record(
        state,
        actor.id,
        "file_delete",
        kind.dir_name(),
        serde_json::json!({ "filename": filename }),
    )
    .await;

    Ok(ApiResponse::ok("File deleted", Ack::done()))
}

async fn proof_owner(state: &AppState, filename: &str) -> AppResult<Option<Uuid>> {
    Ok(Users::find()
        .filter(UserCol::StudentProof.eq(filename))
        .one(&state.orm)
        .await?
        .map(|u| u.id))
}
