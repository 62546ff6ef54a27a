//! デバイス接続状態API

use super::client::ApiClient;
use super::throttle::Throttle;
use crate::error::Result;
use aov_review_common::types::DeviceConnection;
use aov_review_common::ListEnvelope;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DeviceStatusQuery {
    pub customer_id: Option<i64>,
    pub page: u32,
    pub page_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
    /// `"1,2,3,4"` 形式
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Default for DeviceStatusQuery {
    fn default() -> Self {
        Self {
            customer_id: None,
            page: 1,
            page_size: 20,
            facility_name: None,
            prefecture: None,
            municipality: None,
            status: None,
        }
    }
}

/// 顧客に紐づくデバイスの接続状態（顧客未選択なら None）
pub async fn get_device_status(
    client: &ApiClient,
    query: &DeviceStatusQuery,
) -> Result<Option<ListEnvelope<DeviceConnection>>> {
    if query.customer_id.is_none() {
        return Ok(None);
    }
    let list = client.get_with_query("devices/status", query).await?;
    Ok(Some(list))
}

pub async fn get_device_status_throttled(
    client: &ApiClient,
    throttle: &Throttle,
    query: &DeviceStatusQuery,
) -> Result<Option<ListEnvelope<DeviceConnection>>> {
    if !throttle.try_acquire() {
        return Ok(None);
    }
    get_device_status(client, query).await
}
