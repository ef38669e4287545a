//! Disk storage for uploaded files. Every file is renamed to
//! `<uuid>.<ext>` inside the directory of its kind.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    ProductImage,
    StudentProof,
}

impl UploadKind {
    pub fn dir_name(self) -> &'static str {
        match self {
            UploadKind::ProductImage => "product-images",
            UploadKind::StudentProof => "student-proofs",
        }
    }

    /// Path segment used in routes (`/upload/<segment>/...`).
    pub fn route_segment(self) -> &'static str {
        match self {
            UploadKind::ProductImage => "product-image",
            UploadKind::StudentProof => "student-proof",
        }
    }

    pub fn allowed_extensions(self) -> &'static [&'static str] {
        match self {
            UploadKind::ProductImage => &["jpg", "jpeg", "png", "webp"],
            UploadKind::StudentProof => &["jpg", "jpeg", "png", "pdf"],
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StoredFile {
    pub filename: String,
    pub url: String,
    pub size: usize,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    max_bytes: usize,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn save(
        &self,
        kind: UploadKind,
        original_name: &str,
        bytes: &[u8],
    ) -> AppResult<StoredFile> {
        if bytes.is_empty() {
            return Err(AppError::BadRequest("File is empty".into()));
        }
        if bytes.len() > self.max_bytes {
            return Err(AppError::PayloadTooLarge);
        }

        let ext = extension_of(original_name)
            .filter(|ext| kind.allowed_extensions().contains(&ext.as_str()))
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Unsupported file type, allowed: {}",
                    kind.allowed_extensions().join(", ")
                ))
            })?;

        let dir = self.root.join(kind.dir_name());
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        let filename = format!("{}.{ext}", Uuid::new_v4());
        fs::write(dir.join(&filename), bytes)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

        tracing::info!(kind = kind.dir_name(), %filename, size = bytes.len(), "file stored");

        Ok(StoredFile {
            url: format!("/api/upload/{}/{filename}", kind.route_segment()),
            filename,
            size: bytes.len(),
        })
    }

    pub async fn read(&self, kind: UploadKind, filename: &str) -> AppResult<(Vec<u8>, &'static str)> {
        let path = self.resolve(kind, filename)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok((bytes, content_type_for(filename))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(AppError::not_found("File")),
            Err(e) => Err(AppError::Internal(e.into())),
        }
    }

    pub async fn exists(&self, kind: UploadKind, filename: &str) -> AppResult<bool> {
        let path = self.resolve(kind, filename)?;
        fs::try_exists(&path)
            .await
            .map_err(|e| AppError::Internal(e.into()))
    }

    /// Removing a file that is already gone succeeds.
    pub async fn delete(&self, kind: UploadKind, filename: &str) -> AppResult<()> {
        let path = self.resolve(kind, filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(%filename, "delete of missing file ignored");
                Ok(())
            }
            Err(e) => Err(AppError::Internal(e.into())),
        }
    }

    fn resolve(&self, kind: UploadKind, filename: &str) -> AppResult<PathBuf> {
        check_name(kind, filename)?;
        Ok(self.root.join(kind.dir_name()).join(filename))
    }
}

pub fn check_name(kind: UploadKind, filename: &str) -> AppResult<()> {
    if is_stored_name(filename, kind) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid file name".into()))
    }
}

/// Accepts only names this store could have produced.
pub fn is_stored_name(filename: &str, kind: UploadKind) -> bool {
    let Some((stem, ext)) = filename.rsplit_once('.') else {
        return false;
    };
    Uuid::parse_str(stem).is_ok()
        && stem.len() == 36
        && kind.allowed_extensions().contains(&ext)
}

fn extension_of(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 5 {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
