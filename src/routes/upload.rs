use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartError},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::{Ack, ApiResponse},
    services::upload_service,
    state::AppState,
    storage::{StoredFile, UploadKind},
};

/// Room for multipart boundaries and headers on top of the file itself.
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Multipart body with a single `file` part.
#[derive(ToSchema)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

pub fn router(max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/product-image", post(upload_product_image))
        .route(
            "/product-image/{filename}",
            get(get_product_image).delete(delete_product_image),
        )
        .route("/student-proof", post(upload_student_proof))
        .route(
            "/student-proof/{filename}",
            get(get_student_proof).delete(delete_student_proof),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes + FORM_OVERHEAD_BYTES))
}

#[utoipa::path(
    post,
    path = "/api/upload/product-image",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image stored", body = ApiResponse<StoredFile>),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 413, description = "File too large"),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn upload_product_image(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<StoredFile>>> {
    let (name, bytes) = read_file_field(multipart).await?;
    let resp = upload_service::upload(&state, &user, UploadKind::ProductImage, &name, &bytes).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/upload/student-proof",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Proof stored, previous one replaced", body = ApiResponse<StoredFile>),
        (status = 400, description = "Missing file or unsupported type"),
        (status = 413, description = "File too large"),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn upload_student_proof(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<StoredFile>>> {
    let (name, bytes) = read_file_field(multipart).await?;
    let resp = upload_service::upload(&state, &user, UploadKind::StudentProof, &name, &bytes).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/upload/product-image/{filename}",
    params(
        ("filename" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "File not found"),
    ),
    tag = "Upload"
)]
pub async fn get_product_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (bytes, content_type) = upload_service::read_product_image(&state, &filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[utoipa::path(
    get,
    path = "/api/upload/student-proof/{filename}",
    params(
        ("filename" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "Proof bytes", content_type = "application/octet-stream"),
        (status = 403, description = "Not the owner"),
        (status = 404, description = "File not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn get_student_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(filename): Path<String>,
) -> AppResult<impl IntoResponse> {
    let (bytes, content_type) =
        upload_service::read_student_proof(&state, &user, &filename).await?;
    Ok(([(header::CONTENT_TYPE, content_type)], bytes))
}

#[utoipa::path(
    delete,
    path = "/api/upload/product-image/{filename}",
    params(
        ("filename" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<Ack>),
        (status = 400, description = "Invalid file name"),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn delete_product_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(filename): Path<String>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let resp =
        upload_service::delete_file(&state, &user, UploadKind::ProductImage, &filename).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/upload/student-proof/{filename}",
    params(
        ("filename" = String, Path, description = "Stored file name")
    ),
    responses(
        (status = 200, description = "File deleted", body = ApiResponse<Ack>),
        (status = 400, description = "Invalid file name"),
        (status = 403, description = "Not the owner"),
    ),
    security(("bearer_auth" = [])),
    tag = "Upload"
)]
pub async fn delete_student_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(filename): Path<String>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let resp =
        upload_service::delete_file(&state, &user, UploadKind::StudentProof, &filename).await?;
    Ok(Json(resp))
}

/// Pulls the `file` field out of the form; other fields are skipped.
async fn read_file_field(mut multipart: Multipart) -> AppResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        return Ok((name, bytes.to_vec()));
    }
    Err(AppError::BadRequest("No file provided".into()))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::BadRequest(err.body_text())
    }
}
