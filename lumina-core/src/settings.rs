//! Reading settings persistence
//!
//! Each setting lives under its own key so a bad value only resets itself.

use crate::error::StorageError;
use crate::storage::{keys, Store};
use crate::types::{FontFamily, FontSize, ReadingSettings, Theme};

#[derive(Clone)]
pub struct SettingsStore {
    store: Store,
}

impl SettingsStore {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Read settings; missing or invalid values fall back to defaults
    pub async fn load(&self) -> ReadingSettings {
        let defaults = ReadingSettings::default();
        let theme = self
            .store
            .get_json::<String>(keys::READING_THEME)
            .await
            .and_then(|s| s.parse::<Theme>().ok())
            .unwrap_or(defaults.theme);
        let font_family = self
            .store
            .get_json::<String>(keys::READING_FONT)
            .await
            .and_then(|s| s.parse::<FontFamily>().ok())
            .unwrap_or(defaults.font_family);
        let font_size = self
            .store
            .get_json::<u16>(keys::READING_FONT_SIZE)
            .await
            .and_then(|n| FontSize::new(n).ok())
            .unwrap_or(defaults.font_size);

        ReadingSettings {
            theme,
            font_size,
            font_family,
        }
    }

    pub async fn save(&self, settings: &ReadingSettings) -> Result<(), StorageError> {
        self.store
            .set_json(keys::READING_THEME, settings.theme.as_str())
            .await?;
        self.store
            .set_json(keys::READING_FONT, settings.font_family.as_str())
            .await?;
        self.store
            .set_json(keys::READING_FONT_SIZE, &settings.font_size.percent())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_roundtrip() {
        let settings_store = SettingsStore::new(Store::new(Arc::new(MemoryStorage::new())));
        let settings = ReadingSettings {
            theme: Theme::Sepia,
            font_size: FontSize::new(140).unwrap(),
            font_family: FontFamily::Mono,
        };
        settings_store.save(&settings).await.unwrap();
        assert_eq!(settings_store.load().await, settings);
    }

    #[tokio::test]
    async fn test_invalid_values_reset_individually() {
        let store = Store::new(Arc::new(MemoryStorage::new()));
        store.set_json(keys::READING_THEME, "dark").await.unwrap();
        store.set_json(keys::READING_FONT_SIZE, &999u16).await.unwrap();
        store.set_json(keys::READING_FONT, "comic").await.unwrap();

        let settings = SettingsStore::new(store).load().await;
        assert_eq!(settings.theme, Theme::Dark);
        assert_eq!(settings.font_size, FontSize::default());
        assert_eq!(settings.font_family, FontFamily::Serif);
    }
}
