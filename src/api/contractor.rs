//! 請負業者アプリ向けAPI
//!
//! 認証はQRコードに含まれる施設トークンを Bearer として使う。

use super::client::ApiClient;
use crate::error::{AovError, Result};
use aov_review_common::types::{
    CreatedReview, DeviceConnection, DeviceImages, FacilityAuth, FacilityDevices, ImageFetchType,
};
use aov_review_common::{ListEnvelope, ProgressReport};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct CreateReviewRequest<'a> {
    image: &'a str,
    device_id: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateReviewResponse {
    data: Option<CreatedReview>,
    message: Option<String>,
}

/// 施設トークンを検証して施設情報を取得
pub async fn verify_facility(client: &ApiClient, token: &str) -> Result<FacilityAuth> {
    client.set_token(Some(token.to_string()));
    client.post_empty("auth/facility").await
}

pub async fn get_facility_devices(client: &ApiClient) -> Result<FacilityDevices> {
    client.get("facility/devices").await
}

pub async fn get_devices_connection_status(client: &ApiClient) -> Result<Vec<DeviceConnection>> {
    let list: ListEnvelope<DeviceConnection> = client.get("facility/devices/connection-status").await?;
    Ok(list.data)
}

/// デバイスのレビュー進捗
pub async fn get_progress_status(client: &ApiClient, device_id: i64) -> Result<ProgressReport> {
    client.get(&format!("facility/devices/{}/status", device_id)).await
}

/// 参考画像（とレビューコメント）またはカメラの最新画像
pub async fn get_device_images(
    client: &ApiClient,
    device_id: i64,
    image_type: ImageFetchType,
) -> Result<DeviceImages> {
    client
        .get_with_query(
            &format!("facility/devices/{}/images", device_id),
            &[("image_type", image_type.code())],
        )
        .await
}

/// 画角の申請
pub async fn create_review(client: &ApiClient, device_id: i64, image: &str) -> Result<i64> {
    let response: CreateReviewResponse = client
        .post("reviews", &CreateReviewRequest { image, device_id })
        .await?;

    match response.data.and_then(|d| d.review_id) {
        Some(review_id) => Ok(review_id),
        None => Err(AovError::InvalidState(
            response
                .message
                .unwrap_or_else(|| "review_id がありません".into()),
        )),
    }
}
