use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Debounce floor for search keystrokes.
pub const MIN_SEARCH_DEBOUNCE_MS: u64 = 250;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
    #[serde(default = "default_scroll_debounce_ms")]
    pub scroll_debounce_ms: u64,
    #[serde(default = "default_scroll_threshold_px")]
    pub scroll_threshold_px: f64,
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,
    #[serde(default)]
    pub deletion_secret: Option<String>,
    #[serde(default)]
    pub download_dir: Option<PathBuf>,
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_page_size() -> u32 {
    10
}

fn default_request_timeout_secs() -> u64 {
    100
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_scroll_debounce_ms() -> u64 {
    200
}

fn default_scroll_threshold_px() -> f64 {
    150.0
}

fn default_progress_interval_ms() -> u64 {
    250
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            page_size: default_page_size(),
            request_timeout_secs: default_request_timeout_secs(),
            search_debounce_ms: default_search_debounce_ms(),
            scroll_debounce_ms: default_scroll_debounce_ms(),
            scroll_threshold_px: default_scroll_threshold_px(),
            progress_interval_ms: default_progress_interval_ms(),
            deletion_secret: None,
            download_dir: None,
        }
    }
}

impl AppConfig {
    pub fn config_dir() -> AppResult<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AppError::Config("Cannot find home directory".into()))?;
        Ok(home.join(".songdeck"))
    }

    pub fn config_path() -> AppResult<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Err(AppError::Config(format!(
                "Config file not found at {}",
                path.display()
            )));
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> AppResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Environment variables win over the file so a deployment can point the
    /// player at another backend without editing config.json.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("SONGDECK_API_URL") {
            if !url.trim().is_empty() {
                self.api_base_url = url.trim().to_string();
            }
        }
        if let Ok(secret) = std::env::var("SONGDECK_DELETION_SECRET") {
            self.deletion_secret = Some(secret);
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        url::Url::parse(&self.api_base_url)
            .map_err(|e| AppError::Config(format!("Invalid api_base_url: {}", e)))?;
        if self.page_size == 0 {
            return Err(AppError::Config("page_size must be at least 1".into()));
        }
        if self.search_debounce_ms < MIN_SEARCH_DEBOUNCE_MS {
            return Err(AppError::Config(format!(
                "search_debounce_ms must be at least {}",
                MIN_SEARCH_DEBOUNCE_MS
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(AppError::Config("request_timeout_secs must be positive".into()));
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.search_debounce_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn resolved_download_dir(&self) -> AppResult<PathBuf> {
        if let Some(dir) = &self.download_dir {
            return Ok(dir.clone());
        }
        match dirs::download_dir() {
            Some(dir) => Ok(dir),
            None => Ok(Self::config_dir()?.join("downloads")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_view_policy() {
        let config = AppConfig::default();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(100));
        assert!(config.search_debounce_ms >= MIN_SEARCH_DEBOUNCE_MS);
        assert_eq!(config.scroll_debounce(), Duration::from_millis(200));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "api_base_url": "https://songs.example.com" }"#).unwrap();
        assert_eq!(config.api_base_url, "https://songs.example.com");
        assert_eq!(config.page_size, 10);
        assert!(config.deletion_secret.is_none());
    }

    #[test]
    fn rejects_short_search_debounce() {
        let config = AppConfig {
            search_debounce_ms: 100,
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_bad_base_url() {
        let config = AppConfig {
            api_base_url: "not a url".into(),
            ..AppConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = AppConfig {
            deletion_secret: Some("hunter2".into()),
            page_size: 25,
            ..AppConfig::default()
        };
        config.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.page_size, 25);
        assert_eq!(loaded.deletion_secret.as_deref(), Some("hunter2"));
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = AppConfig::load_from(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
