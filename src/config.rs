use crate::error::{AovError, Result};
use aov_review_common::Locale;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 環境変数でAPIのURLを上書きする
pub const API_URL_ENV: &str = "AOV_API_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub timeout_seconds: u64,
    pub language: Locale,
    pub review_poll_interval_ms: u64,
    pub connection_poll_interval_ms: u64,
    pub jpeg_quality: u8,
    /// ストアの保存先（未指定なら設定ディレクトリ）
    pub storage_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default_config())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| AovError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("aov-review"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    fn default_config() -> Self {
        Self {
            api_url: None,
            timeout_seconds: 60,
            language: Locale::Japanese,
            review_poll_interval_ms: 3000,
            connection_poll_interval_ms: 10000,
            jpeg_quality: 92, // ブラウザcanvasの既定品質
            storage_path: None,
        }
    }

    pub fn get_api_url(&self) -> Result<String> {
        // 環境変数を優先
        if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                return Ok(url);
            }
        }

        self.api_url.clone().ok_or_else(|| {
            AovError::Config(
                "APIのURLが設定されていません。`aov-review config --set-api-url URL` で設定してください"
                    .into(),
            )
        })
    }

    pub fn set_api_url(&mut self, url: String) -> Result<()> {
        self.api_url = Some(url);
        self.save()
    }

    pub fn set_language(&mut self, language: Locale) -> Result<()> {
        self.language = language;
        self.save()
    }

    /// ストアファイルのパス
    pub fn storage_file(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join("store.json")),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn review_poll_interval(&self) -> Duration {
        Duration::from_millis(self.review_poll_interval_ms)
    }

    pub fn connection_poll_interval(&self) -> Duration {
        Duration::from_millis(self.connection_poll_interval_ms)
    }
}
