//! EPUB rendition built on the `epub` crate
//!
//! Positions are spine-granular: every marker addresses the start of one
//! spine document, `epubcfi(/6/<2(i+1)>[<idref>]!)`. That is coarser than a
//! paginating renderer but uses the same marker grammar, so markers written
//! by a finer engine still resolve to the right document.

use super::{BookMetadata, Location, RenderEngine, Rendition, SearchHit, SurfaceHandle};
use crate::error::RenderError;
use crate::types::{HighlightColor, ReadingSettings, TocEntry};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use epub::doc::EpubDoc;
use regex::Regex;
use std::io::Cursor;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use tokio::sync::broadcast;

type Doc = EpubDoc<Cursor<Vec<u8>>>;

/// Maximum number of hits returned by a content search
const MAX_SEARCH_HITS: usize = 50;

/// Characters of context on each side of a search match
const EXCERPT_CONTEXT: usize = 40;

/// Marker addressing the start of spine item `index`
pub fn spine_cfi(index: usize, idref: &str) -> String {
    format!("epubcfi(/6/{}[{}]!)", (index + 1) * 2, idref)
}

fn cfi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^epubcfi\(/6/(\d+)(?:\[([^\]]*)\])?(?:!.*)?\)$").expect("valid CFI pattern")
    })
}

/// Spine index addressed by `cfi`, checked against the spine
fn parse_spine_index(cfi: &str, spine: &[String]) -> Option<usize> {
    let caps = cfi_pattern().captures(cfi.trim())?;
    let step: usize = caps.get(1)?.as_str().parse().ok()?;
    if step < 2 || step % 2 != 0 {
        return None;
    }
    let index = step / 2 - 1;
    let idref = spine.get(index)?;
    match caps.get(2) {
        Some(assertion) if !assertion.as_str().is_empty() && assertion.as_str() != idref => None,
        _ => Some(index),
    }
}

/// Fraction of the book read at the start of spine item `index`
///
/// The last document counts as the end, so a single-document book is
/// complete as soon as it is shown.
fn spine_fraction(index: usize, len: usize) -> f64 {
    if len <= 1 {
        return 1.0;
    }
    index as f64 / (len - 1) as f64
}

/// Engine opening EPUB 2/3 files
#[derive(Debug, Default, Clone)]
pub struct EpubEngine;

impl EpubEngine {
    pub fn new() -> Self {
        Self
    }

    async fn parse(content: Vec<u8>) -> Result<Doc, RenderError> {
        tokio::task::spawn_blocking(move || EpubDoc::from_reader(Cursor::new(content)))
            .await
            .map_err(|e| RenderError::Parse(format!("parser task failed: {}", e)))?
            .map_err(|e| RenderError::Parse(e.to_string()))
    }
}

fn meta_value(doc: &Doc, key: &str) -> Option<String> {
    doc.mdata(key)
        .map(|item| item.value.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn extract_metadata(doc: &mut Doc) -> BookMetadata {
    let creators: Vec<String> = doc
        .metadata
        .iter()
        .filter(|item| item.property == "creator")
        .map(|item| item.value.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    let title = meta_value(doc, "title").unwrap_or_else(|| "Untitled".to_string());
    let author = if creators.is_empty() {
        "Unknown Author".to_string()
    } else {
        creators.join(", ")
    };
    let language = meta_value(doc, "language");
    let cover = doc
        .get_cover()
        .map(|(data, mime)| format!("data:{};base64,{}", mime, STANDARD.encode(data)));

    BookMetadata {
        title,
        author,
        language,
        cover,
    }
}

fn nav_point_to_toc_entry(nav: &epub::doc::NavPoint, level: u32) -> TocEntry {
    let href = nav.content.to_string_lossy().to_string();
    let children = nav
        .children
        .iter()
        .map(|child| nav_point_to_toc_entry(child, level + 1))
        .collect();
    TocEntry::new(nav.label.trim(), href)
        .with_level(level)
        .with_children(children)
}

#[async_trait]
impl RenderEngine for EpubEngine {
    async fn inspect(&self, content: &[u8]) -> Result<BookMetadata, RenderError> {
        let mut doc = Self::parse(content.to_vec()).await?;
        Ok(extract_metadata(&mut doc))
    }

    async fn open(
        &self,
        content: Vec<u8>,
        surface: &SurfaceHandle,
    ) -> Result<Arc<dyn Rendition>, RenderError> {
        let mut doc = Self::parse(content).await?;
        let metadata = extract_metadata(&mut doc);
        let toc = doc
            .toc
            .iter()
            .map(|nav| nav_point_to_toc_entry(nav, 0))
            .collect();
        let spine: Vec<String> = doc.spine.iter().map(|item| item.idref.clone()).collect();
        if spine.is_empty() {
            return Err(RenderError::Parse("book has an empty spine".to_string()));
        }
        let hrefs = spine
            .iter()
            .map(|idref| {
                doc.resources
                    .get(idref.as_str())
                    .map(|r| r.path.to_string_lossy().into_owned())
                    .unwrap_or_else(|| idref.clone())
            })
            .collect();

        tracing::debug!(
            owner = surface.owner(),
            title = %metadata.title,
            spine = spine.len(),
            "Attached EPUB rendition"
        );

        let (events, _) = broadcast::channel(64);
        Ok(Arc::new(EpubRendition {
            doc: Mutex::new(Some(doc)),
            metadata,
            toc,
            spine,
            hrefs,
            position: Mutex::new(None),
            events,
            settings: Mutex::new(None),
            annotations: Mutex::new(Vec::new()),
        }))
    }
}

/// A parsed EPUB attached to a surface
pub struct EpubRendition {
    /// `None` once destroyed
    doc: Mutex<Option<Doc>>,
    metadata: BookMetadata,
    toc: Vec<TocEntry>,
    spine: Vec<String>,
    hrefs: Vec<String>,
    position: Mutex<Option<usize>>,
    events: broadcast::Sender<Location>,
    settings: Mutex<Option<ReadingSettings>>,
    annotations: Mutex<Vec<(String, HighlightColor)>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EpubRendition {
    fn ensure_alive(&self) -> Result<(), RenderError> {
        if lock(&self.doc).is_some() {
            Ok(())
        } else {
            Err(RenderError::Destroyed)
        }
    }

    fn location_at(&self, index: usize) -> Location {
        Location {
            cfi: spine_cfi(index, &self.spine[index]),
            href: self.hrefs[index].clone(),
        }
    }

    fn go_to(&self, index: usize) -> Result<Location, RenderError> {
        self.ensure_alive()?;
        *lock(&self.position) = Some(index);
        let location = self.location_at(index);
        // Ignore errors (no listeners)
        let _ = self.events.send(location.clone());
        Ok(location)
    }
}

#[async_trait]
impl Rendition for EpubRendition {
    fn metadata(&self) -> BookMetadata {
        self.metadata.clone()
    }

    fn toc(&self) -> Vec<TocEntry> {
        self.toc.clone()
    }

    async fn display(&self, target: Option<&str>) -> Result<Location, RenderError> {
        let index = match target {
            None => 0,
            Some(cfi) => parse_spine_index(cfi, &self.spine)
                .ok_or_else(|| RenderError::InvalidTarget(cfi.to_string()))?,
        };
        self.go_to(index)
    }

    async fn next(&self) -> Result<Location, RenderError> {
        let current = lock(&self.position).unwrap_or(0);
        let next = (current + 1).min(self.spine.len() - 1);
        self.go_to(next)
    }

    async fn prev(&self) -> Result<Location, RenderError> {
        let current = lock(&self.position).unwrap_or(0);
        self.go_to(current.saturating_sub(1))
    }

    fn current(&self) -> Option<Location> {
        lock(&self.position).map(|index| self.location_at(index))
    }

    fn percentage_from_cfi(&self, cfi: &str) -> Option<f64> {
        let index = parse_spine_index(cfi, &self.spine)?;
        Some(spine_fraction(index, self.spine.len()))
    }

    fn subscribe(&self) -> broadcast::Receiver<Location> {
        self.events.subscribe()
    }

    fn apply_settings(&self, settings: &ReadingSettings) {
        *lock(&self.settings) = Some(*settings);
    }

    fn add_highlight(&self, cfi_range: &str, color: HighlightColor) {
        lock(&self.annotations).push((cfi_range.to_string(), color));
    }

    fn clear_annotations(&self) {
        lock(&self.annotations).clear();
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, RenderError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits = Vec::new();
        let mut guard = lock(&self.doc);
        let doc = guard.as_mut().ok_or(RenderError::Destroyed)?;

        for (index, idref) in self.spine.iter().enumerate() {
            let Some((html, _mime)) = doc.get_resource_str(idref) else {
                continue;
            };
            let text = html_to_text(&html);
            for excerpt in find_excerpts(&text, &needle) {
                hits.push(SearchHit {
                    cfi: spine_cfi(index, idref),
                    excerpt,
                });
                if hits.len() >= MAX_SEARCH_HITS {
                    return Ok(hits);
                }
            }
        }
        Ok(hits)
    }

    fn destroy(&self) {
        if lock(&self.doc).take().is_some() {
            tracing::debug!(title = %self.metadata.title, "Destroyed EPUB rendition");
        }
        lock(&self.annotations).clear();
    }
}

/// Visible text of an XHTML document with whitespace collapsed
fn html_to_text(html: &str) -> String {
    let document = scraper::Html::parse_document(html);
    let mut text = String::new();
    for node in document.root_element().descendants() {
        if let Some(parent) = node.parent().and_then(|p| p.value().as_element().map(|e| e.name().to_string())) {
            if parent == "script" || parent == "style" || parent == "title" {
                continue;
            }
        }
        if let scraper::Node::Text(t) = node.value() {
            text.push_str(t);
            text.push(' ');
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Excerpts around each case-insensitive occurrence of `needle` (already lowercase)
fn find_excerpts(text: &str, needle: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    // Lowercasing can change byte lengths; then excerpt from the lowered text
    let source = if lower.len() == text.len() { text } else { lower.as_str() };

    let mut excerpts = Vec::new();
    let mut from = 0;
    while let Some(found) = lower[from..].find(needle) {
        let start = from + found;
        let end = start + needle.len();
        let mut lo = start.saturating_sub(EXCERPT_CONTEXT);
        while !source.is_char_boundary(lo) {
            lo -= 1;
        }
        let mut hi = (end + EXCERPT_CONTEXT).min(source.len());
        while !source.is_char_boundary(hi) {
            hi += 1;
        }
        excerpts.push(source[lo..hi].trim().to_string());
        from = end;
    }
    excerpts
}
