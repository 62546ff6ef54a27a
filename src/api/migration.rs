//! データ移行（エクスポート・インポート）API

use super::client::ApiClient;
use crate::error::{AovError, Result};
use reqwest::multipart::{Form, Part};
use std::path::Path;

/// 管理者のデータをJSONで取得
pub async fn export_data(client: &ApiClient) -> Result<serde_json::Value> {
    client.get("data-migration/export").await
}

/// JSONファイルを取り込む
pub async fn import_data(client: &ApiClient, json_file: &Path) -> Result<serde_json::Value> {
    let content = std::fs::read(json_file)?;

    // 壊れたファイルは送らない
    let value: serde_json::Value = serde_json::from_slice(&content)?;
    if value.get("admin").is_none() {
        return Err(AovError::Validation(format!(
            "インポートファイルに admin がありません: {}",
            json_file.display()
        )));
    }

    let file_name = json_file
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "import.json".into());
    let part = Part::bytes(content)
        .file_name(file_name)
        .mime_str("application/json")
        .map_err(|e| AovError::Validation(e.to_string()))?;

    client
        .post_multipart("data-migration/import", Form::new().part("json_file", part))
        .await
}
