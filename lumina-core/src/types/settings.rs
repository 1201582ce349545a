//! Reading appearance settings

use crate::error::SettingsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color theme of the reading surface
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Sepia,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Sepia => "sepia",
            Theme::Dark => "dark",
        }
    }

    /// Background and foreground colors
    pub fn colors(self) -> (&'static str, &'static str) {
        match self {
            Theme::Light => ("#ffffff", "#1a1a1a"),
            Theme::Sepia => ("#f4ecd8", "#5b4636"),
            Theme::Dark => ("#1e1e1e", "#e0e0e0"),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "sepia" => Ok(Theme::Sepia),
            "dark" => Ok(Theme::Dark),
            _ => Err(SettingsError::UnknownTheme(s.to_string())),
        }
    }
}

/// Font family applied to book content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FontFamily {
    #[default]
    Serif,
    Sans,
    Mono,
    Dyslexic,
}

impl FontFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::Sans => "sans",
            FontFamily::Mono => "mono",
            FontFamily::Dyslexic => "dyslexic",
        }
    }

    /// CSS font stack
    pub fn stack(self) -> &'static str {
        match self {
            FontFamily::Serif => "Georgia, 'Times New Roman', serif",
            FontFamily::Sans => "'Helvetica Neue', Arial, sans-serif",
            FontFamily::Mono => "'SFMono-Regular', Menlo, monospace",
            FontFamily::Dyslexic => "OpenDyslexic, sans-serif",
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FontFamily {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "serif" => Ok(FontFamily::Serif),
            "sans" | "sans-serif" => Ok(FontFamily::Sans),
            "mono" | "monospace" => Ok(FontFamily::Mono),
            "dyslexic" | "opendyslexic" => Ok(FontFamily::Dyslexic),
            _ => Err(SettingsError::UnknownFont(s.to_string())),
        }
    }
}

/// Font size as a percentage of the book's base size, always in 60..=200
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u16", into = "u16")]
pub struct FontSize(u16);

impl FontSize {
    pub const MIN: u16 = 60;
    pub const MAX: u16 = 200;
    pub const STEP: u16 = 10;

    pub fn new(percent: u16) -> Result<Self, SettingsError> {
        if (Self::MIN..=Self::MAX).contains(&percent) {
            Ok(Self(percent))
        } else {
            Err(SettingsError::FontSizeOutOfRange(percent))
        }
    }

    /// Clamp any value into range
    pub fn clamped(percent: u16) -> Self {
        Self(percent.clamp(Self::MIN, Self::MAX))
    }

    pub fn percent(self) -> u16 {
        self.0
    }

    pub fn larger(self) -> Self {
        Self::clamped(self.0.saturating_add(Self::STEP))
    }

    pub fn smaller(self) -> Self {
        Self::clamped(self.0.saturating_sub(Self::STEP))
    }
}

impl Default for FontSize {
    fn default() -> Self {
        Self(100)
    }
}

impl TryFrom<u16> for FontSize {
    type Error = SettingsError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<FontSize> for u16 {
    fn from(size: FontSize) -> Self {
        size.0
    }
}

/// Process-wide reading appearance
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReadingSettings {
    pub theme: Theme,
    pub font_size: FontSize,
    pub font_family: FontFamily,
}

/// A single settings change requested by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsChange {
    Theme(Theme),
    FontFamily(FontFamily),
    FontSize(u16),
    Larger,
    Smaller,
}

impl ReadingSettings {
    /// Apply a change, validating the font size
    pub fn with_change(self, change: SettingsChange) -> Result<Self, SettingsError> {
        let mut next = self;
        match change {
            SettingsChange::Theme(theme) => next.theme = theme,
            SettingsChange::FontFamily(family) => next.font_family = family,
            SettingsChange::FontSize(percent) => next.font_size = FontSize::new(percent)?,
            SettingsChange::Larger => next.font_size = self.font_size.larger(),
            SettingsChange::Smaller => next.font_size = self.font_size.smaller(),
        }
        Ok(next)
    }
}
