use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    auth::AdminUser, catalog::FieldError, config::UploadConfig, error::AppError, AppState,
};

/// Extensions `poster_extension` can produce
const POSTER_EXTENSIONS: [&str; 4] = ["png", "jpg", "gif", "webp"];

#[derive(Debug, Serialize)]
pub struct PosterResponse {
    /// Opaque reference to store in a game's `poster` field
    pub poster: String,
}

/// File extension for the accepted poster image types
pub fn poster_extension(content_type: &str) -> Option<&'static str> {
    match content_type.trim().to_ascii_lowercase().as_str() {
        "image/png" => Some("png"),
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

fn poster_error(message: &str) -> AppError {
    AppError::Validation(vec![FieldError::new("poster", message)])
}

/// Path of the file behind a poster reference
///
/// Only names produced by `upload_poster` (`<uuid>.<ext>`) resolve, so a
/// reference can never point outside the upload directory.
pub fn poster_path(dir: &str, reference: &str) -> Option<PathBuf> {
    let (stem, extension) = reference.split_once('.')?;
    if stem.len() != 36 || Uuid::try_parse(stem).is_err() {
        return None;
    }
    if !POSTER_EXTENSIONS.contains(&extension) {
        return None;
    }
    Some(Path::new(dir).join(reference))
}

/// Reject a poster reference that does not name a stored upload
pub async fn ensure_poster_exists(
    uploads: &UploadConfig,
    reference: &str,
) -> Result<(), AppError> {
    let path = poster_path(&uploads.dir, reference)
        .ok_or_else(|| poster_error("Poster reference is not a valid upload"))?;

    let exists = tokio::fs::try_exists(&path)
        .await
        .with_context(|| format!("Failed to look up poster {}", path.display()))?;
    if !exists {
        return Err(poster_error("Poster was not found, please upload it again"));
    }
    Ok(())
}

/// Delete a poster file; failures are logged and otherwise ignored
pub async fn remove_poster(uploads: &UploadConfig, reference: &str) {
    let Some(path) = poster_path(&uploads.dir, reference) else {
        tracing::warn!("Refusing to remove invalid poster reference {:?}", reference);
        return;
    };

    match tokio::fs::remove_file(&path).await {
        Ok(()) => tracing::info!("Removed poster {}", reference),
        Err(e) => tracing::warn!("Failed to remove poster {}: {}", path.display(), e),
    }
}

/// Store an uploaded poster under a random name and return its reference
pub async fn upload_poster(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<PosterResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("poster") {
            continue;
        }

        let extension = field
            .content_type()
            .and_then(poster_extension)
            .ok_or_else(|| poster_error("Poster must be a PNG, JPEG, GIF or WebP image"))?;

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if bytes.is_empty() {
            return Err(poster_error("Poster file is empty"));
        }
        if bytes.len() > state.config.uploads.max_bytes {
            return Err(poster_error(&format!(
                "Poster must not exceed {} bytes",
                state.config.uploads.max_bytes
            )));
        }

        let name = format!("{}.{}", Uuid::new_v4(), extension);
        let dir = Path::new(&state.config.uploads.dir);
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create upload directory {}", dir.display()))?;
        tokio::fs::write(dir.join(&name), &bytes)
            .await
            .with_context(|| format!("Failed to write poster {}", name))?;

        tracing::info!(
            "Poster {} ({} bytes) uploaded by {}",
            name,
            bytes.len(),
            admin.username
        );
        return Ok((StatusCode::CREATED, Json(PosterResponse { poster: name })));
    }

    Err(poster_error("Please upload a poster"))
}
