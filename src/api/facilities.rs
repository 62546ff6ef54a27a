//! 施設・施設種別API

use super::client::ApiClient;
use super::Payload;
use crate::error::{AovError, Result};
use aov_review_common::types::{Facility, FacilityType};
use aov_review_common::{ensure_present, validate_string, ListEnvelope, ValidationKind};
use serde::{Deserialize, Serialize};

/// 施設の作成・更新リクエスト
#[derive(Debug, Clone, Default, Serialize)]
pub struct FacilityForm {
    pub customer_id: i64,
    pub facility_name: String,
    pub facility_type_id: i64,
    pub prefecture: String,
    pub municipality: String,
    pub effective_start_utc: String,
    pub effective_end_utc: String,
}

impl FacilityForm {
    pub fn validate(&self) -> Result<()> {
        ensure_present("facility_name", &self.facility_name)?;
        ensure_present("prefecture", &self.prefecture)?;
        ensure_present("municipality", &self.municipality)?;
        for (field, value) in [
            ("facility_name", &self.facility_name),
            ("prefecture", &self.prefecture),
            ("municipality", &self.municipality),
        ] {
            if !validate_string(value, ValidationKind::Name) {
                return Err(AovError::Validation(format!("{} の形式が不正です: {}", field, value)));
            }
        }
        for (field, value) in [
            ("effective_start_utc", &self.effective_start_utc),
            ("effective_end_utc", &self.effective_end_utc),
        ] {
            if !validate_string(value, ValidationKind::Timestamp) {
                return Err(AovError::Validation(format!("{} の形式が不正です: {}", field, value)));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct FacilitiesResponse {
    #[serde(default)]
    facilities: Vec<Facility>,
}

#[derive(Debug, Serialize)]
struct NameRequest<'a> {
    name: &'a str,
}

pub async fn get_facilities(client: &ApiClient, customer_id: i64) -> Result<Vec<Facility>> {
    let response: FacilitiesResponse = client
        .get_with_query("facilities", &[("customer_id", customer_id)])
        .await?;
    Ok(response.facilities)
}

pub async fn get_facility(client: &ApiClient, facility_id: i64) -> Result<Facility> {
    let payload: Payload<Facility> = client.get(&format!("facilities/{}", facility_id)).await?;
    Ok(payload.into_inner())
}

/// 施設の作成または更新（`facility_id` が 0 なら新規）
pub async fn save_facility(
    client: &ApiClient,
    facility_id: i64,
    form: &FacilityForm,
) -> Result<serde_json::Value> {
    form.validate()?;
    client.post(&format!("facilities/{}", facility_id), form).await
}

pub async fn get_facility_types(client: &ApiClient) -> Result<Vec<FacilityType>> {
    let list: ListEnvelope<FacilityType> = client.get("facility-types").await?;
    Ok(list.data)
}

pub async fn add_facility_type(client: &ApiClient, name: &str) -> Result<serde_json::Value> {
    ensure_present("name", name)?;
    if !validate_string(name, ValidationKind::Name) {
        return Err(AovError::Validation(format!("施設種別名の形式が不正です: {}", name)));
    }
    client.post("facility-types", &NameRequest { name }).await
}
