//! ストアの永続化アダプタ
//!
//! 保存形式は `{"state": {...}, "version": 0}` のJSON。
//! 書き込みは常に状態全体の置き換え（最後の書き込みが勝つ）。

use super::AppState;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// 永続化の境界
pub trait Persistence: Send {
    /// 保存済みの状態（なければ None）
    fn load(&self) -> Result<Option<AppState>>;
    fn save(&self, state: &AppState) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedFile<S> {
    state: S,
    #[serde(default)]
    version: u32,
}

const CURRENT_VERSION: u32 = 0;

pub(crate) fn encode(state: &AppState) -> Result<String> {
    Ok(serde_json::to_string(&PersistedFile {
        state,
        version: CURRENT_VERSION,
    })?)
}

pub(crate) fn decode(content: &str) -> Result<AppState> {
    let file: PersistedFile<AppState> = serde_json::from_str(content)?;
    Ok(file.state)
}

/// JSONファイルへの永続化
#[derive(Debug, Clone)]
pub struct FilePersistence {
    path: PathBuf,
}

impl FilePersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Persistence for FilePersistence {
    fn load(&self) -> Result<Option<AppState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let file: PersistedFile<AppState> = serde_json::from_reader(reader)?;
        Ok(Some(file.state))
    }

    fn save(&self, state: &AppState) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer_pretty(
            writer,
            &PersistedFile {
                state,
                version: CURRENT_VERSION,
            },
        )?;
        Ok(())
    }
}

/// メモリ上の永続化（テスト・一時セッション用）
///
/// ファイルと同じくJSON文字列で保持する。
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    content: Mutex<Option<String>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 保存済みのJSONから作成
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(Some(content.into())),
        }
    }

    /// 保存されているJSON
    pub fn content(&self) -> Option<String> {
        self.content.lock().ok().and_then(|c| c.clone())
    }
}

impl Persistence for MemoryPersistence {
    fn load(&self) -> Result<Option<AppState>> {
        match self.content() {
            Some(content) => Ok(Some(decode(&content)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &AppState) -> Result<()> {
        let content = encode(state)?;
        if let Ok(mut slot) = self.content.lock() {
            *slot = Some(content);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aov_review_common::Locale;

    #[test]
    fn test_encode_wraps_state() {
        let state = AppState::default();
        let json: serde_json::Value = serde_json::from_str(&encode(&state).unwrap()).unwrap();
        assert!(json.get("state").is_some());
        assert_eq!(json["state"]["currentLanguage"], "jp");
        assert_eq!(json["state"]["gridLine"]["color"], "#ffffff");
    }

    #[test]
    fn test_memory_roundtrip() {
        let persistence = MemoryPersistence::new();
        assert!(persistence.load().unwrap().is_none());

        let mut state = AppState::default();
        state.current_language = Locale::English;
        persistence.save(&state).unwrap();

        let loaded = persistence.load().unwrap().unwrap();
        assert_eq!(loaded.current_language, Locale::English);
    }

    #[test]
    fn test_decode_partial_state() {
        // 一部のスライスしか保存されていなくても読み込める
        let state = decode(r##"{"state":{"currentLanguage":"en","gridLine":{"color":"#000000","visibility":true}}}"##)
            .unwrap();
        assert_eq!(state.current_language, Locale::English);
        assert!(state.grid_line.visibility);
        assert!(state.current_account.is_none());
    }
}
