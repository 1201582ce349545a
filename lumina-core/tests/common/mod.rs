//! Shared fixtures for lumina-core integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use lumina_core::content::{ContentStore, KvContentStore};
use lumina_core::error::{RetrievalError, StorageError};
use lumina_core::render::EpubEngine;
use lumina_core::storage::{keys, MemoryStorage, Runtime, StorageProvider, Store};
use lumina_core::{App, Config};
use std::io::{Cursor, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

// =============================================================================
// EPUB fixtures
// =============================================================================

/// Word that only appears in chapter 3 of [`build_epub`] books
pub const NEEDLE: &str = "lighthouse";

/// Build a minimal EPUB 2 book with `chapters` spine documents
pub fn build_epub(title: &str, author: &str, chapters: usize) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("mimetype", stored).unwrap();
    zip.write_all(b"application/epub+zip").unwrap();

    zip.start_file("META-INF/container.xml", deflated).unwrap();
    zip.write_all(
        br#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#,
    )
    .unwrap();

    let manifest: String = (1..=chapters)
        .map(|i| {
            format!(
                r#"<item id="ch{i}" href="ch{i}.xhtml" media-type="application/xhtml+xml"/>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ");
    let spine: String = (1..=chapters)
        .map(|i| format!(r#"<itemref idref="ch{i}"/>"#))
        .collect::<Vec<_>>()
        .join("\n    ");
    let opf = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" version="2.0" unique-identifier="bookid">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
    <dc:title>{title}</dc:title>
    <dc:creator>{author}</dc:creator>
    <dc:language>en</dc:language>
    <dc:identifier id="bookid">urn:uuid:fixture</dc:identifier>
  </metadata>
  <manifest>
    <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
    {manifest}
  </manifest>
  <spine toc="ncx">
    {spine}
  </spine>
</package>"#
    );
    zip.start_file("OEBPS/content.opf", deflated).unwrap();
    zip.write_all(opf.as_bytes()).unwrap();

    let nav_points: String = (1..=chapters)
        .map(|i| {
            format!(
                r#"<navPoint id="np{i}" playOrder="{i}"><navLabel><text>Chapter {i}</text></navLabel><content src="ch{i}.xhtml"/></navPoint>"#
            )
        })
        .collect::<Vec<_>>()
        .join("\n    ");
    let ncx = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
  <head><meta name="dtb:uid" content="urn:uuid:fixture"/></head>
  <docTitle><text>{title}</text></docTitle>
  <navMap>
    {nav_points}
  </navMap>
</ncx>"#
    );
    zip.start_file("OEBPS/toc.ncx", deflated).unwrap();
    zip.write_all(ncx.as_bytes()).unwrap();

    for i in 1..=chapters {
        let extra = if i == 3 {
            format!(" The old {} keeper waved.", NEEDLE)
        } else {
            String::new()
        };
        let chapter = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>Chapter {i}</title></head>
<body><h1>Chapter {i}</h1><p>Some text for chapter {i}.{extra}</p></body>
</html>"#
        );
        zip.start_file(format!("OEBPS/ch{i}.xhtml"), deflated).unwrap();
        zip.write_all(chapter.as_bytes()).unwrap();
    }

    zip.finish().unwrap().into_inner()
}

// =============================================================================
// Storage doubles
// =============================================================================

/// Memory storage whose writes to the library key can be made to fail
#[derive(Default)]
pub struct FlakyStorage {
    inner: MemoryStorage,
    pub fail_books: AtomicBool,
    pub book_writes: AtomicUsize,
}

#[async_trait]
impl StorageProvider for FlakyStorage {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        if key == keys::BOOKS {
            if self.fail_books.load(Ordering::SeqCst) {
                return Err(StorageError::BackendError("quota exceeded".into()));
            }
            self.book_writes.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.inner.clear().await
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        self.inner.keys().await
    }

    fn name(&self) -> &'static str {
        "flaky"
    }
}

/// Content store that blocks every load until released
pub struct GatedContent {
    inner: KvContentStore,
    pub gate: Arc<Notify>,
    pub entered: Arc<Notify>,
}

#[async_trait]
impl ContentStore for GatedContent {
    async fn save(&self, book_id: &str, content: Vec<u8>) -> Result<(), StorageError> {
        self.inner.save(book_id, content).await
    }

    async fn load(&self, book_id: &str) -> Result<Vec<u8>, RetrievalError> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.load(book_id).await
    }

    async fn delete(&self, book_id: &str) -> Result<(), StorageError> {
        self.inner.delete(book_id).await
    }
}

// =============================================================================
// Application setup
// =============================================================================

pub fn test_config() -> Config {
    let mut config = Config::default().with_data_dir(std::env::temp_dir().join("lumina-tests"));
    config.progress_debounce = Duration::from_millis(100);
    config.surface_wait = Duration::from_millis(200);
    config
}

/// App over flaky memory storage with its surface mounted
pub async fn memory_app() -> (App, Arc<FlakyStorage>) {
    let backend = Arc::new(FlakyStorage::default());
    let content = Arc::new(KvContentStore::new(Store::new(backend.clone())));
    let app = App::assemble(
        test_config(),
        Runtime::Browser,
        backend.clone(),
        content,
        Arc::new(EpubEngine::new()),
    )
    .await;
    app.surface.mount();
    (app, backend)
}

/// App whose content loads block on a gate
pub async fn gated_app() -> (App, Arc<Notify>, Arc<Notify>) {
    let backend = Arc::new(FlakyStorage::default());
    let gate = Arc::new(Notify::new());
    let entered = Arc::new(Notify::new());
    let content = Arc::new(GatedContent {
        inner: KvContentStore::new(Store::new(backend.clone())),
        gate: gate.clone(),
        entered: entered.clone(),
    });
    let app = App::assemble(
        test_config(),
        Runtime::Browser,
        backend,
        content,
        Arc::new(EpubEngine::new()),
    )
    .await;
    app.surface.mount();
    (app, gate, entered)
}
