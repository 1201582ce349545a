//! Integration tests for the Lumina Server API

use axum::body::Bytes;
use axum::http::StatusCode;
use axum_test::TestServer;
use lumina_core::collections::Collections;
use lumina_core::content::{ContentStore, LocalShell, ShellBridge, ShellContentStore};
use lumina_core::storage::{MemoryStorage, Store};
use lumina_core::{BookPatch, BookRecord, Library, RetrievalError};
use lumina_server::routes::create_router;
use lumina_server::state::AppState;
use serde_json::Value;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Create a test app state with temporary storage
async fn create_test_state() -> (AppState, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let books_dir = temp_dir.path().join("books");
    tokio::fs::create_dir_all(&books_dir).await.unwrap();

    let store = Store::new(Arc::new(MemoryStorage::new()));
    let library = Library::load(store.clone()).await;
    let collections = Collections::load(store).await;

    let state = AppState::from_parts(books_dir, library, collections, 1024 * 1024);
    (state, temp_dir)
}

/// Create a test server
async fn create_test_server() -> (TestServer, AppState, TempDir) {
    let (state, temp_dir) = create_test_state().await;
    let app = create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");
    (server, state, temp_dir)
}

async fn seed_library(library: &Library) {
    let mut dune = BookRecord::new("b1", "Dune", "Frank Herbert");
    dune.progress = 100;
    library.upsert(dune).await.unwrap();
    library
        .upsert(BookRecord::new("b2", "Emma", "Jane Austen"))
        .await
        .unwrap();
    library
        .upsert(BookRecord::new("b3", "Persuasion", "Jane Austen"))
        .await
        .unwrap();
    library
        .merge("b3", &BookPatch::position("epubcfi(/6/4!)", 30))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_check() {
    let (server, _state, _temp_dir) = create_test_server().await;

    let response = server.get("/health").await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
    assert_eq!(body["books"], 0);
}

// =============================================================================
// Book files
// =============================================================================

#[tokio::test]
async fn test_put_then_get_book_file() {
    let (server, state, _temp_dir) = create_test_server().await;
    let data = b"PK\x03\x04fake epub".to_vec();

    server
        .put("/abc123.epub")
        .bytes(Bytes::from(data.clone()))
        .await
        .assert_status(StatusCode::CREATED);
    assert!(state.books_dir.join("abc123.epub").exists());

    let response = server.get("/abc123.epub").await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/epub+zip");
    assert_eq!(response.as_bytes().to_vec(), data);
}

#[tokio::test]
async fn test_get_missing_book_file() {
    let (server, _state, _temp_dir) = create_test_server().await;

    server
        .get("/missing.epub")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    server
        .get("/notes.txt")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_put_rejects_empty_and_oversized_files() {
    let (server, _state, _temp_dir) = create_test_server().await;

    server
        .put("/empty.epub")
        .bytes(Bytes::new())
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    server
        .put("/big.epub")
        .bytes(Bytes::from(vec![0u8; 2 * 1024 * 1024]))
        .await
        .assert_status(StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_delete_book_file_is_idempotent() {
    let (server, state, _temp_dir) = create_test_server().await;
    server
        .put("/gone.epub")
        .bytes(Bytes::from_static(b"PK\x03\x04"))
        .await
        .assert_status(StatusCode::CREATED);

    server
        .delete("/gone.epub")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    server
        .delete("/gone.epub")
        .await
        .assert_status(StatusCode::NO_CONTENT);
    assert!(!state.books_dir.join("gone.epub").exists());
}

// =============================================================================
// Library API
// =============================================================================

#[tokio::test]
async fn test_list_books_empty() {
    let (server, _state, _temp_dir) = create_test_server().await;

    let response = server.get("/api/v1/library").await;

    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["books"].as_array().unwrap().len(), 0);
    assert_eq!(body["total"], 0);
    assert_eq!(body["page"], 1);
    assert_eq!(body["per_page"], 20);
}

#[tokio::test]
async fn test_list_books_search_and_sort() {
    let (server, state, _temp_dir) = create_test_server().await;
    seed_library(&state.library).await;

    let response = server
        .get("/api/v1/library")
        .add_query_param("search", "austen")
        .add_query_param("sort", "title")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["total"], 2);
    assert_eq!(body["books"][0]["title"], "Emma");
    assert_eq!(body["books"][1]["title"], "Persuasion");
    assert_eq!(body["books"][1]["progress"], 30);
}

#[tokio::test]
async fn test_list_books_by_collection() {
    let (server, state, _temp_dir) = create_test_server().await;
    seed_library(&state.library).await;

    let body: Value = server
        .get("/api/v1/library")
        .add_query_param("collection", "finished")
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["id"], "b1");

    let body: Value = server
        .get("/api/v1/library")
        .add_query_param("collection", "reading")
        .await
        .json();
    assert_eq!(body["total"], 1);
    assert_eq!(body["books"][0]["id"], "b3");

    server
        .get("/api/v1/library")
        .add_query_param("collection", "nope")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_books_with_pagination() {
    let (server, state, _temp_dir) = create_test_server().await;
    seed_library(&state.library).await;

    let body: Value = server
        .get("/api/v1/library")
        .add_query_param("page", "2")
        .add_query_param("per_page", "2")
        .await
        .json();
    assert_eq!(body["total"], 3);
    assert_eq!(body["page"], 2);
    assert_eq!(body["books"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_list_books_rejects_unknown_sort() {
    let (server, _state, _temp_dir) = create_test_server().await;
    server
        .get("/api/v1/library")
        .add_query_param("sort", "color")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_book_with_collections() {
    let (server, state, _temp_dir) = create_test_server().await;
    seed_library(&state.library).await;
    let shelf = state.collections.create("Classics", None).await.unwrap();
    state.collections.add_book(&shelf.id, "b2").await.unwrap();

    let response = server.get("/api/v1/library/b2").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Emma");
    assert_eq!(body["collections"][0], shelf.id.as_str());

    server
        .get("/api/v1/library/unknown")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_collections_includes_builtins() {
    let (server, _state, _temp_dir) = create_test_server().await;
    let body: Value = server.get("/api/v1/collections").await.json();
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"all"));
    assert!(ids.contains(&"finished"));
}

// =============================================================================
// Loopback fetch from the reader
// =============================================================================

#[tokio::test]
async fn test_reader_fetches_through_shell() {
    let (state, temp_dir) = create_test_state().await;
    let (addr, handle) = lumina_server::spawn(state, SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();

    let shell = Arc::new(LocalShell::new(temp_dir.path().join("books"), addr.port()));
    let content = ShellContentStore::new(shell.clone(), Duration::from_secs(5));

    content.save("b1", b"PK\x03\x04book".to_vec()).await.unwrap();
    assert_eq!(content.load("b1").await.unwrap(), b"PK\x03\x04book");

    shell.delete_book_file("b1").await.unwrap();
    assert!(matches!(
        content.load("b1").await,
        Err(RetrievalError::NotFound(_))
    ));

    handle.abort();
}
