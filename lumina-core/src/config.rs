//! Runtime configuration read from the environment

use std::path::PathBuf;
use std::time::Duration;

/// Default maximum size of an imported file (100 MiB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Default debounce window for progress writes
pub const DEFAULT_PROGRESS_DEBOUNCE: Duration = Duration::from_millis(500);

/// Default bound on restoring a saved position
pub const DEFAULT_RESTORE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default bound on fetching content and opening the renderer
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Default bound on waiting for the rendering surface
pub const DEFAULT_SURFACE_WAIT: Duration = Duration::from_millis(2000);

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory for all persisted data
    pub data_dir: PathBuf,

    /// Largest file accepted by import
    pub max_file_size: u64,

    /// Progress persistence debounce window
    pub progress_debounce: Duration,

    /// Timeout for restoring a saved position
    pub restore_timeout: Duration,

    /// Timeout for content retrieval and renderer startup
    pub fetch_timeout: Duration,

    /// How long to wait for the rendering surface to be mounted
    pub surface_wait: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            progress_debounce: DEFAULT_PROGRESS_DEBOUNCE,
            restore_timeout: DEFAULT_RESTORE_TIMEOUT,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            surface_wait: DEFAULT_SURFACE_WAIT,
        }
    }
}

impl Config {
    /// Build configuration from `LUMINA_*` environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let data_dir = lookup("LUMINA_DATA_DIR")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.data_dir);

        Self {
            data_dir,
            max_file_size: parse_number(&lookup, "LUMINA_MAX_FILE_SIZE")
                .unwrap_or(defaults.max_file_size),
            progress_debounce: parse_millis(&lookup, "LUMINA_PROGRESS_DEBOUNCE_MS")
                .unwrap_or(defaults.progress_debounce),
            restore_timeout: parse_millis(&lookup, "LUMINA_RESTORE_TIMEOUT_MS")
                .unwrap_or(defaults.restore_timeout),
            fetch_timeout: parse_millis(&lookup, "LUMINA_FETCH_TIMEOUT_MS")
                .unwrap_or(defaults.fetch_timeout),
            surface_wait: parse_millis(&lookup, "LUMINA_SURFACE_WAIT_MS")
                .unwrap_or(defaults.surface_wait),
        }
    }

    /// Override the data directory
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Directory holding desktop book files served over loopback
    pub fn books_dir(&self) -> PathBuf {
        self.data_dir.join("books")
    }

    /// Directory holding the key-value store
    pub fn store_dir(&self) -> PathBuf {
        self.data_dir.join("store")
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = directories::ProjectDirs::from("com", "lumina", "Lumina Reader") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from("lumina_data")
    }
}

fn parse_number(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Ignoring invalid numeric setting");
            None
        }
    }
}

fn parse_millis(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    parse_number(lookup, key).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(lookup_from(&[("LUMINA_DATA_DIR", "/tmp/lumina")]));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/lumina"));
        assert_eq!(config.max_file_size, DEFAULT_MAX_FILE_SIZE);
        assert_eq!(config.progress_debounce, DEFAULT_PROGRESS_DEBOUNCE);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LUMINA_MAX_FILE_SIZE", "1024"),
            ("LUMINA_PROGRESS_DEBOUNCE_MS", "250"),
            ("LUMINA_RESTORE_TIMEOUT_MS", "100"),
        ]));
        assert_eq!(config.max_file_size, 1024);
        assert_eq!(config.progress_debounce, Duration::from_millis(250));
        assert_eq!(config.restore_timeout, Duration::from_millis(100));
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = Config::from_lookup(lookup_from(&[("LUMINA_FETCH_TIMEOUT_MS", "soon")]));
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
    }

    #[test]
    fn test_books_dir_under_data_dir() {
        let config = Config::default().with_data_dir("/data");
        assert_eq!(config.books_dir(), PathBuf::from("/data/books"));
        assert_eq!(config.store_dir(), PathBuf::from("/data/store"));
    }
}
