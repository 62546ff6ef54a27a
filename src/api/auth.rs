//! 管理者認証API

use super::client::{ApiClient, LOGIN_PATH};
use crate::error::{AovError, Result};
use aov_review_common::types::LoginRequest;
use aov_review_common::{validate_string, Account, ValidationKind};

/// ログイン（成功したらクライアントにトークンを設定）
pub async fn login(client: &ApiClient, login_id: &str, password: &str) -> Result<Account> {
    if login_id.is_empty() || password.is_empty() {
        return Err(AovError::Validation("ログインIDとパスワードを入力してください".into()));
    }
    if !validate_string(login_id, ValidationKind::LoginId) {
        return Err(AovError::Validation(format!("ログインIDの形式が不正です: {}", login_id)));
    }

    let account: Account = client
        .post(LOGIN_PATH, &LoginRequest { login_id, password })
        .await?;
    client.set_token(Some(account.token.clone()));
    Ok(account)
}

/// ログアウト（サーバーの応答に関係なくトークンは破棄する）
pub async fn logout(client: &ApiClient) -> Result<()> {
    let result = client.post_empty::<serde_json::Value>("auth/logout").await;
    client.set_token(None);
    result.map(|_| ())
}
