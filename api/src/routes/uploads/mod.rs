//! Serves stored proof-of-delivery photos.
//!
//! `GET /uploads/{filename}` reads the file from the configured upload root
//! and returns it with a guessed content type. File names are opaque tokens
//! generated at upload time, so anything that looks like a path is rejected.

use axum::{
    extract::Path,
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::path::Path as FsPath;
use util::config;

/// GET /uploads/{filename}
///
/// Returns the raw image bytes, `404` when the file does not exist, and
/// `400` for names containing path separators or parent references.
pub async fn get_upload(Path(filename): Path<String>) -> impl IntoResponse {
    if filename.contains('/') || filename.contains('\\') || filename.contains("..") {
        return (StatusCode::BAD_REQUEST, "Invalid file name").into_response();
    }

    let fs_path = FsPath::new(&config::upload_root()).join(&filename);

    match tokio::fs::read(&fs_path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&filename).first_or_octet_stream();
            ([(header::CONTENT_TYPE, mime.to_string())], bytes).into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "File not found").into_response(),
    }
}
