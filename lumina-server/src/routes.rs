//! API routes

use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::get,
    Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the CORS layer from a `LUMINA_CORS_ORIGINS` style value
///
/// The value is a comma-separated list of origins, or "*" for any.
pub fn cors_layer(origins: Option<&str>) -> CorsLayer {
    let layer = match origins {
        Some("*") => CorsLayer::new().allow_origin(Any),
        Some(origins) => {
            let allowed: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            CorsLayer::new().allow_origin(AllowOrigin::list(allowed))
        }
        None => {
            // Default: allow localhost origins for development
            CorsLayer::new().allow_origin(AllowOrigin::list([
                HeaderValue::from_static("http://localhost:1420"),
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://127.0.0.1:1420"),
                HeaderValue::from_static("http://127.0.0.1:5173"),
                HeaderValue::from_static("tauri://localhost"),
            ]))
        }
    };
    layer.allow_methods(Any).allow_headers(Any)
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(std::env::var("LUMINA_CORS_ORIGINS").ok().as_deref());
    let body_limit = usize::try_from(state.max_file_size).unwrap_or(usize::MAX);

    let api_routes = Router::new()
        // Library endpoints
        .route("/library", get(handlers::list_books))
        .route("/library/:id", get(handlers::get_book))
        .route("/collections", get(handlers::list_collections))
        // SSE endpoint
        .route("/sync", get(handlers::sync_events));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(handlers::health_check))
        // Book files for the reader
        .route(
            "/:file",
            get(handlers::get_book_file)
                .put(handlers::put_book_file)
                .delete(handlers::delete_book_file),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
