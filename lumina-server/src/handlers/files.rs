//! Book file handlers
//!
//! The reader fetches `GET /<id>.epub` over loopback; the desktop shell
//! writes and deletes the same files.

use crate::state::{AppState, ServerEvent};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

/// Serve a stored book file
pub async fn get_book_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, StatusCode> {
    let (id, path) = state
        .book_file_path(&file)
        .map_err(|_| StatusCode::NOT_FOUND)?;

    let data = match tokio::fs::read(&path).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(StatusCode::NOT_FOUND),
        Err(e) => {
            tracing::error!(book_id = %id, "Failed to read book file: {}", e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    tracing::debug!(book_id = %id, size = data.len(), "Serving book file");
    Ok(([(header::CONTENT_TYPE, "application/epub+zip")], data).into_response())
}

/// Store a book file
pub async fn put_book_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
    body: Bytes,
) -> Result<StatusCode, (StatusCode, String)> {
    let (id, path) = state
        .book_file_path(&file)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    if body.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "The file is empty".to_string()));
    }
    let size = body.len() as u64;
    if size > state.max_file_size {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("File exceeds {} bytes", state.max_file_size),
        ));
    }

    // Write to temp file in same directory (ensures same filesystem for rename)
    let temp_path = path.with_extension("epub.tmp");
    tokio::fs::write(&temp_path, &body)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tokio::fs::rename(&temp_path, &path)
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    tracing::info!(book_id = %id, size, "Stored book file");
    state.broadcast(ServerEvent::BookStored { id, size });
    Ok(StatusCode::CREATED)
}

/// Delete a book file; deleting a missing file succeeds
pub async fn delete_book_file(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let (id, path) = state
        .book_file_path(&file)
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    match tokio::fs::remove_file(&path).await {
        Ok(()) => {
            tracing::info!(book_id = %id, "Deleted book file");
            state.broadcast(ServerEvent::BookDeleted { id });
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::error!(book_id = %id, "Failed to delete book file: {}", e);
            state.broadcast(ServerEvent::Error {
                message: e.to_string(),
            });
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
