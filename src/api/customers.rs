//! 顧客・コンソール資格情報・QRコードAPI

use super::client::ApiClient;
use crate::error::{AovError, Result};
use aov_review_common::types::{ConsoleCredentials, Customer, QrCodeCustomer};
use aov_review_common::{validate_string, Envelope, ListEnvelope, ValidationKind};
use serde::Serialize;

pub async fn get_customers(client: &ApiClient) -> Result<Vec<Customer>> {
    let list: ListEnvelope<Customer> = client.get("customers").await?;
    Ok(list.data)
}

/// 送信前の形式チェック
pub fn validate_credentials(credentials: &ConsoleCredentials) -> Result<()> {
    if !validate_string(&credentials.customer_name, ValidationKind::Name) {
        return Err(AovError::Validation(format!(
            "顧客名の形式が不正です: {}",
            credentials.customer_name
        )));
    }
    for (field, url) in [("auth_url", &credentials.auth_url), ("base_url", &credentials.base_url)] {
        if !validate_string(url, ValidationKind::Url) {
            return Err(AovError::Validation(format!("{} の形式が不正です: {}", field, url)));
        }
    }
    Ok(())
}

pub async fn get_console_credentials(client: &ApiClient, customer_id: i64) -> Result<ConsoleCredentials> {
    let response: Envelope<ConsoleCredentials> = client
        .get(&format!("customers/{}/console_credentials", customer_id))
        .await?;
    Ok(response.data)
}

pub async fn update_console_credentials(
    client: &ApiClient,
    customer_id: i64,
    credentials: &ConsoleCredentials,
) -> Result<serde_json::Value> {
    validate_credentials(credentials)?;
    client
        .put(&format!("customers/{}/console_credentials", customer_id), credentials)
        .await
}

pub async fn add_customer(client: &ApiClient, credentials: &ConsoleCredentials) -> Result<serde_json::Value> {
    validate_credentials(credentials)?;
    client.post("customers", credentials).await
}

#[derive(Debug, Serialize)]
struct QrCodesRequest<'a> {
    customers: &'a [QrCodeCustomer],
}

/// 施設ごとのQRコードをzipで取得
pub async fn generate_qr_codes(client: &ApiClient, customers: &[QrCodeCustomer]) -> Result<Vec<u8>> {
    if customers.is_empty() {
        return Err(AovError::Validation("顧客が選択されていません".into()));
    }
    client
        .post_for_bytes("customers/qr-codes", &QrCodesRequest { customers })
        .await
}
