//! Staff image uploads.
//!
//! Accepts one multipart `file` field, stores it under the media root and
//! generates the derivative set before answering. Derivative encoding is
//! CPU-bound, so it runs on the blocking thread pool.

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use futures_util::StreamExt;
use serde::Deserialize;

use crate::error::ApiError;
use crate::images;
use crate::state::AppState;

use super::require_staff;

/// 10 MB, matching the JSON payload limit.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct UploadQuery {
    kind: String,
}

fn subdir_for(kind: &str) -> Result<&'static str, ApiError> {
    match kind {
        "recipe_hero" => Ok("recipes/hero"),
        "recipe_step" => Ok("recipes/steps"),
        "site" => Ok("site"),
        other => Err(ApiError::validation(format!("unknown media kind '{other}'"))),
    }
}

/// Handler for `POST /api/staff/media?kind=...`.
pub async fn process(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<UploadQuery>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    {
        let conn = state.db()?;
        require_staff(&conn, &req)?;
    }
    let subdir = subdir_for(&query.kind)?;

    let mut stored: Option<(String, Vec<u8>)> = None;
    while let Some(item) = payload.next().await {
        let mut field =
            item.map_err(|e| ApiError::validation(format!("malformed multipart payload: {e}")))?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));
        if name.as_deref() != Some("file") {
            continue;
        }

        let filename = field
            .content_disposition()
            .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
            .unwrap_or_default();

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let chunk = chunk
                .map_err(|e| ApiError::validation(format!("upload interrupted: {e}")))?;
            if bytes.len() + chunk.len() > MAX_UPLOAD_BYTES {
                return Err(ApiError::validation("file exceeds the 10 MB upload limit"));
            }
            bytes.extend_from_slice(&chunk);
        }
        stored = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = stored else {
        return Err(ApiError::validation("missing 'file' field"));
    };
    if bytes.is_empty() {
        return Err(ApiError::validation("uploaded file is empty"));
    }

    let rel_path = images::upload_rel_path(subdir, &filename);
    let media_root = state.config.media_root.clone();
    let rel_for_job = rel_path.clone();
    web::block(move || -> Result<(), ApiError> {
        images::store_upload(&media_root, &rel_for_job, &bytes)
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        // A non-image upload fails here, before anything references it.
        images::generate_derivatives(&media_root, &rel_for_job)
            .map_err(|e| ApiError::validation(format!("not a decodable image: {e}")))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("upload worker failed: {e}")))??;

    let images = images::image_set(&state.config.media_base_url, Some(&rel_path));
    Ok(HttpResponse::Created().json(serde_json::json!({
        "path": rel_path,
        "images": images,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_kinds_map_to_subdirs() {
        assert_eq!(subdir_for("recipe_hero").unwrap(), "recipes/hero");
        assert_eq!(subdir_for("recipe_step").unwrap(), "recipes/steps");
        assert_eq!(subdir_for("site").unwrap(), "site");
        assert!(subdir_for("etc").is_err());
    }
}
