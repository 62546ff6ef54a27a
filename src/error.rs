use aov_review_common::{error_message, ErrorCode, Locale, Surface};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AovError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ログインしていません。`aov-review login` でログインしてください")]
    NotLoggedIn,

    #[error("API呼び出しエラー: {0}")]
    Api(ApiFailure),

    #[error("入力エラー: {0}")]
    Validation(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("画像処理エラー: {0}")]
    Image(#[from] image::ImageError),

    #[error("Base64デコードエラー: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("操作できない状態です: {0}")]
    InvalidState(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] aov_review_common::Error),
}

impl From<ApiFailure> for AovError {
    fn from(failure: ApiFailure) -> Self {
        AovError::Api(failure)
    }
}

impl AovError {
    /// API由来のエラーなら中身を返す
    pub fn api_failure(&self) -> Option<&ApiFailure> {
        match self {
            AovError::Api(failure) => Some(failure),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AovError>;

/// 正規化されたAPIエラー
///
/// レスポンスの形（エラーボディあり・なし、通信不可、タイムアウト）に関係なく
/// `code` で分岐できるようにする。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiFailure {
    pub code: ErrorCode,
    /// HTTPステータス（通信できなかった場合は None）
    pub status: Option<u16>,
    pub message: String,
}

impl ApiFailure {
    pub fn server(status: u16, error_code: Option<u32>, message: impl Into<String>) -> Self {
        Self {
            code: error_code.map(ErrorCode::Server).unwrap_or(ErrorCode::Unknown),
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Network,
            status: None,
            message: message.into(),
        }
    }

    pub fn timeout() -> Self {
        Self {
            code: ErrorCode::Timeout,
            status: None,
            message: "request timed out".into(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// 指定のサーバーコードか
    pub fn has_code(&self, code: u32) -> bool {
        self.code == ErrorCode::Server(code)
    }

    /// 画面・言語に応じた表示メッセージ
    pub fn user_message(&self, surface: Surface, locale: Locale) -> &'static str {
        error_message(surface, locale, self.code)
    }
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "[{}] HTTP {} {}", self.code, status, self.message),
            None => write!(f, "[{}] {}", self.code, self.message),
        }
    }
}
