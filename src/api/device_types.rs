//! デバイス種別（参照画像）API

use super::client::ApiClient;
use super::Payload;
use crate::error::Result;
use aov_review_common::types::DeviceType;
use aov_review_common::{ensure_present, ListEnvelope};
use serde::Serialize;

#[derive(Debug, Serialize)]
struct DeviceTypeRequest<'a> {
    name: &'a str,
    reference_image: &'a str,
}

#[derive(Debug, Serialize)]
struct ReferenceImageRequest<'a> {
    reference_image: &'a str,
}

fn validate(name: &str, reference_image: &str) -> Result<()> {
    ensure_present("Device type name", name)?;
    ensure_present("Reference image", reference_image)?;
    Ok(())
}

pub async fn get_device_types(client: &ApiClient) -> Result<Vec<DeviceType>> {
    let list: ListEnvelope<DeviceType> = client.get("device-types").await?;
    Ok(list.data)
}

pub async fn get_device_type(client: &ApiClient, device_type_id: i64) -> Result<DeviceType> {
    let payload: Payload<DeviceType> = client.get(&format!("device-types/{}", device_type_id)).await?;
    Ok(payload.into_inner())
}

pub async fn create_device_type(client: &ApiClient, name: &str, reference_image: &str) -> Result<DeviceType> {
    validate(name, reference_image)?;
    let payload: Payload<DeviceType> = client
        .post("device-types", &DeviceTypeRequest { name, reference_image })
        .await?;
    Ok(payload.into_inner())
}

pub async fn edit_device_type(
    client: &ApiClient,
    device_type_id: i64,
    name: &str,
    reference_image: &str,
) -> Result<DeviceType> {
    validate(name, reference_image)?;
    let payload: Payload<DeviceType> = client
        .put(
            &format!("device-types/{}", device_type_id),
            &DeviceTypeRequest { name, reference_image },
        )
        .await?;
    Ok(payload.into_inner())
}

/// 画角調整で作った画像を参照画像として登録
pub async fn update_reference_image(
    client: &ApiClient,
    device_type_id: i64,
    reference_image: &str,
) -> Result<serde_json::Value> {
    ensure_present("Reference image", reference_image)?;
    client
        .put(
            &format!("device-types/{}/reference-image", device_type_id),
            &ReferenceImageRequest { reference_image },
        )
        .await
}
