//! Reading settings command

use super::Options;
use anyhow::Result;
use lumina_core::reader::theme_rules;
use lumina_core::types::{FontFamily, Theme};
use lumina_core::{LuminaError, ReadingSettings, SettingsChange};

/// Requested settings changes, applied in field order
pub struct SettingsArgs {
    pub theme: Option<String>,
    pub font: Option<String>,
    pub size: Option<u16>,
    pub larger: bool,
    pub smaller: bool,
}

impl SettingsArgs {
    fn changes(&self) -> Result<Vec<SettingsChange>, LuminaError> {
        let mut changes = Vec::new();
        if let Some(theme) = &self.theme {
            changes.push(SettingsChange::Theme(theme.parse::<Theme>()?));
        }
        if let Some(font) = &self.font {
            changes.push(SettingsChange::FontFamily(font.parse::<FontFamily>()?));
        }
        if let Some(size) = self.size {
            changes.push(SettingsChange::FontSize(size));
        }
        if self.larger {
            changes.push(SettingsChange::Larger);
        }
        if self.smaller {
            changes.push(SettingsChange::Smaller);
        }
        Ok(changes)
    }
}

/// Show reading settings, applying any requested changes first
pub async fn settings(opts: &Options, args: SettingsArgs, css: bool) -> Result<()> {
    let changes = args.changes()?;
    let workspace = super::open(opts).await?;
    let app = &workspace.app;

    let mut current = app.reading_settings().await;
    for change in changes {
        current = app.update_settings(change).await?;
    }

    print_settings(&current);
    if css {
        for rule in theme_rules(&current) {
            println!("{}", rule);
        }
    }
    Ok(())
}

fn print_settings(settings: &ReadingSettings) {
    println!("Theme:     {}", settings.theme.as_str());
    println!("Font:      {}", settings.font_family.as_str());
    println!("Font size: {}%", settings.font_size.percent());
}
