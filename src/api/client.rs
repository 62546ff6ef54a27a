//! REST APIクライアント
//!
//! - 全リクエストに Bearer トークンを付与
//! - エラーレスポンスを `ApiFailure` に正規化（通信不可は ERR_NETWORK）
//! - `auth/login` 以外で 401 を受けたらトークンを破棄してフックを呼ぶ

use crate::config::Config;
use crate::error::{ApiFailure, Result};
use aov_review_common::types::ErrorPayload;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, warn};

/// 401受信時に呼ばれるフック
pub type UnauthorizedHook = Arc<dyn Fn() + Send + Sync>;

/// ログインAPIのパス（401でもセッションを破棄しない）
pub const LOGIN_PATH: &str = "auth/login";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Arc<RwLock<Option<String>>>,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiFailure::network(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            token: Arc::new(RwLock::new(None)),
            on_unauthorized: None,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.get_api_url()?, config.timeout())
    }

    pub fn with_unauthorized_hook(mut self, hook: UnauthorizedHook) -> Self {
        self.on_unauthorized = Some(hook);
        self
    }

    pub fn with_token(self, token: Option<String>) -> Self {
        self.set_token(token);
        self
    }

    pub fn set_token(&self, token: Option<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = token.filter(|t| !t.is_empty());
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// ベースURLとパスを結合
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.http.request(method, self.url(path));
        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    /// 送信してエラーを正規化
    async fn send(&self, path: &str, builder: RequestBuilder) -> Result<Response> {
        debug!(path, "API request");

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = if e.is_timeout() {
                    ApiFailure::timeout()
                } else {
                    ApiFailure::network(e.to_string())
                };
                warn!(path, "{}", failure);
                return Err(failure.into());
            }
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let payload: ErrorPayload = serde_json::from_str(&body).unwrap_or_default();
        let message = payload.message.unwrap_or(body);
        let failure = ApiFailure::server(status.as_u16(), payload.error_code, message);
        warn!(path, "{}", failure);

        if failure.is_unauthorized() && path != LOGIN_PATH {
            self.set_token(None);
            if let Some(hook) = &self.on_unauthorized {
                hook();
            }
        }

        Err(failure.into())
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiFailure::network(e.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path, self.request(Method::GET, path)).await?;
        Self::decode(response).await
    }

    pub async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let builder = self.request(Method::GET, path).query(query);
        let response = self.send(path, builder).await?;
        Self::decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.send(path, builder).await?;
        Self::decode(response).await
    }

    /// ボディなしのPOST
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.send(path, self.request(Method::POST, path)).await?;
        Self::decode(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(Method::PUT, path).json(body);
        let response = self.send(path, builder).await?;
        Self::decode(response).await
    }

    /// バイナリレスポンス（zipなど）を受け取るPOST
    pub async fn post_for_bytes<B>(&self, path: &str, body: &B) -> Result<Vec<u8>>
    where
        B: Serialize + ?Sized,
    {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.send(path, builder).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiFailure::network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let builder = self.request(Method::POST, path).multipart(form);
        let response = self.send(path, builder).await?;
        Self::decode(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_join() {
        let client = ApiClient::new("https://aov.example.com/api/", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.url("reviews/1"), "https://aov.example.com/api/reviews/1");
        assert_eq!(client.url("/customers"), "https://aov.example.com/api/customers");

        let client = ApiClient::new("http://localhost:8000", DEFAULT_TIMEOUT).unwrap();
        assert_eq!(client.url("auth/login"), "http://localhost:8000/auth/login");
    }

    #[test]
    fn test_empty_token_is_ignored() {
        let client = ApiClient::new("http://localhost", DEFAULT_TIMEOUT)
            .unwrap()
            .with_token(Some(String::new()));
        assert!(client.token().is_none());

        client.set_token(Some("abc".into()));
        assert_eq!(client.token().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_network_error() {
        // 閉じたポートへの接続
        let client = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(5)).unwrap();
        let err = client.get::<serde_json::Value>("customers").await.unwrap_err();
        let failure = err.api_failure().expect("APIエラーではない");
        assert_eq!(failure.code, aov_review_common::ErrorCode::Network);
        assert!(failure.status.is_none());
    }
}
