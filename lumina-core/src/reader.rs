//! Reader view coordination
//!
//! Holds the view state around an open book: which side panel is showing,
//! the reading settings, and the keyboard mapping for page turns. Settings
//! are an explicit value handed to the rendition, never global state.

use crate::error::SettingsError;
use crate::render::Rendition;
use crate::types::{ReadingSettings, SettingsChange};
use std::fmt;

/// Side panels of the reader; at most one is open
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Panel {
    Toc,
    Bookmarks,
    Search,
    Settings,
    Highlights,
}

/// Keys the reader reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Left,
    Right,
    PageUp,
    PageDown,
    Space,
    Home,
    Escape,
    Char(char),
}

/// Navigation requested by a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Prev,
    Next,
    Start,
}

/// A CSS rule injected into rendered documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: &'static str,
    pub declarations: Vec<(&'static str, String)>,
}

impl fmt::Display for StyleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.selector)?;
        for (property, value) in &self.declarations {
            write!(f, " {}: {} !important;", property, value)?;
        }
        write!(f, " }}")
    }
}

/// Style rules for the given settings
pub fn theme_rules(settings: &ReadingSettings) -> Vec<StyleRule> {
    let (background, foreground) = settings.theme.colors();
    vec![
        StyleRule {
            selector: "body",
            declarations: vec![
                ("background", background.to_string()),
                ("color", foreground.to_string()),
                ("font-family", settings.font_family.stack().to_string()),
                ("font-size", format!("{}%", settings.font_size.percent())),
            ],
        },
        StyleRule {
            selector: "a",
            declarations: vec![("color", "inherit".to_string())],
        },
    ]
}

/// View state of the reader
#[derive(Debug, Clone, Default)]
pub struct ReaderView {
    panel: Option<Panel>,
    settings: ReadingSettings,
}

impl ReaderView {
    pub fn new(settings: ReadingSettings) -> Self {
        Self {
            panel: None,
            settings,
        }
    }

    pub fn settings(&self) -> ReadingSettings {
        self.settings
    }

    pub fn open_panel(&self) -> Option<Panel> {
        self.panel
    }

    pub fn is_open(&self, panel: Panel) -> bool {
        self.panel == Some(panel)
    }

    /// Open `panel`, closing any other, or close it if already open
    pub fn toggle(&mut self, panel: Panel) {
        self.panel = if self.panel == Some(panel) {
            None
        } else {
            Some(panel)
        };
    }

    pub fn close_all(&mut self) {
        self.panel = None;
    }

    /// Map a key press to navigation; Escape closes panels
    pub fn handle_key(&mut self, key: Key) -> Option<NavAction> {
        match key {
            Key::Left | Key::PageUp => Some(NavAction::Prev),
            Key::Right | Key::PageDown | Key::Space => Some(NavAction::Next),
            Key::Home => Some(NavAction::Start),
            Key::Escape => {
                self.close_all();
                None
            }
            Key::Char(_) => None,
        }
    }

    /// Validate and apply a settings change
    ///
    /// Returns the new settings so the caller can persist them.
    pub fn update_settings(
        &mut self,
        change: SettingsChange,
        rendition: Option<&dyn Rendition>,
    ) -> Result<ReadingSettings, SettingsError> {
        let next = self.settings.with_change(change)?;
        self.settings = next;
        if let Some(rendition) = rendition {
            rendition.apply_settings(&next);
        }
        tracing::debug!(
            theme = %next.theme,
            font_size = next.font_size.percent(),
            "Reading settings changed"
        );
        Ok(next)
    }
}
