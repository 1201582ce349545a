//! Request handlers

mod files;
mod library;
mod sync;

pub use files::*;
pub use library::*;
pub use sync::*;

use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Serialize;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    /// Books in the library index
    pub books: usize,
}

/// Health check endpoint; the shell polls it before pointing the reader here
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        books: state.library.len().await,
    })
}
