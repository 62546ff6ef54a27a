//! REST APIの型定義
//!
//! 管理コンソールと請負業者アプリで共有される型:
//! - Review / ReviewResult: レビュー本体と判定コード
//! - DeviceProgressStatus / ProgressReport: 請負業者側の進捗ステータス
//! - Envelope / ListEnvelope: レスポンスの共通ラッパー

use serde::{Deserialize, Deserializer, Serialize};

/// レビュー判定コード
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum ReviewResult {
    /// 1: 未申請
    #[default]
    Initial,
    /// 2: 申請中
    Requesting,
    /// 3: 却下
    Rejected,
    /// 4: 承認
    Approved,
}

impl ReviewResult {
    pub fn code(self) -> u8 {
        match self {
            ReviewResult::Initial => 1,
            ReviewResult::Requesting => 2,
            ReviewResult::Rejected => 3,
            ReviewResult::Approved => 4,
        }
    }

    /// 申請済み（画像取得日時・申請日時を表示できる）
    pub fn is_submitted(self) -> bool {
        matches!(
            self,
            ReviewResult::Requesting | ReviewResult::Rejected | ReviewResult::Approved
        )
    }

    /// 回答済み（回答日時を表示できる）
    pub fn is_answered(self) -> bool {
        matches!(self, ReviewResult::Rejected | ReviewResult::Approved)
    }
}

impl From<u8> for ReviewResult {
    fn from(code: u8) -> Self {
        match code {
            2 => ReviewResult::Requesting,
            3 => ReviewResult::Rejected,
            4 => ReviewResult::Approved,
            _ => ReviewResult::Initial,
        }
    }
}

impl From<ReviewResult> for u8 {
    fn from(result: ReviewResult) -> Self {
        result.code()
    }
}

/// 請負業者アプリで参照するデバイスの進捗ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub enum DeviceProgressStatus {
    RequestingForReview,
    Rejected,
    Approved,
    /// 上記以外のコード（未確認・施設確認済みなど）
    Other(u8),
}

impl DeviceProgressStatus {
    pub fn code(self) -> u8 {
        match self {
            DeviceProgressStatus::RequestingForReview => 2,
            DeviceProgressStatus::Rejected => 3,
            DeviceProgressStatus::Approved => 4,
            DeviceProgressStatus::Other(code) => code,
        }
    }
}

impl From<u8> for DeviceProgressStatus {
    fn from(code: u8) -> Self {
        match code {
            2 => DeviceProgressStatus::RequestingForReview,
            3 => DeviceProgressStatus::Rejected,
            4 => DeviceProgressStatus::Approved,
            other => DeviceProgressStatus::Other(other),
        }
    }
}

impl From<DeviceProgressStatus> for u8 {
    fn from(status: DeviceProgressStatus) -> Self {
        status.code()
    }
}

/// `GET facility/devices/{id}/status` のレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressReport {
    pub status: Option<DeviceProgressStatus>,
    pub review_comment: Option<String>,
}

/// デバイスの接続状態
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionState {
    Connected,
    Disconnected,
    Unknown(String),
}

impl ConnectionState {
    /// 一覧表示で使う色
    pub fn color(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "green",
            ConnectionState::Disconnected => "red",
            ConnectionState::Unknown(_) => "grey",
        }
    }
}

impl From<String> for ConnectionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Connected" => ConnectionState::Connected,
            "Disconnected" => ConnectionState::Disconnected,
            _ => ConnectionState::Unknown(value),
        }
    }
}

impl From<ConnectionState> for String {
    fn from(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => "Connected".to_string(),
            ConnectionState::Disconnected => "Disconnected".to_string(),
            ConnectionState::Unknown(value) => value,
        }
    }
}

/// ログイン中の管理者アカウント
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub login_id: String,
    pub token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub login_id: &'a str,
    pub password: &'a str,
}

/// 顧客
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Customer {
    pub id: i64,
    pub customer_name: String,
    pub created_by: String,
    pub last_updated_by: String,
    pub last_updated_at_utc: Option<String>,
}

/// コンソール資格情報
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleCredentials {
    pub customer_name: String,
    pub auth_url: String,
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub application_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityType {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    pub id: i64,
    pub facility_name: String,
    pub prefecture: String,
    pub municipality: String,
    pub facility_type: Option<FacilityType>,
    pub facility_type_id: Option<i64>,
    pub customer_id: Option<i64>,
    pub effective_start_utc: Option<String>,
    pub effective_end_utc: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceType {
    pub id: i64,
    pub name: String,
    pub sample_image_blob: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Device {
    pub id: i64,
    pub device_id: String,
    pub device_name: String,
    pub device_type_id: Option<i64>,
    pub device_type: Option<DeviceType>,
    pub facility: Option<Facility>,
}

/// レビュー（`GET reviews/{id}` はラッパーなしで返る）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Review {
    pub id: i64,
    pub result: ReviewResult,
    pub image_blob: Option<String>,
    pub image_date_utc: Option<String>,
    pub created_at_utc: Option<String>,
    pub last_updated_at_utc: Option<String>,
    pub review_comment: Option<String>,
    pub device: Option<Device>,
    pub facility: Option<Facility>,
}

/// ダッシュボードの1行（デバイスと最新レビュー）
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LatestReview {
    #[serde(default)]
    pub device: Device,
    /// レビューがない場合、APIは空オブジェクトを返す
    #[serde(default, deserialize_with = "empty_object_as_none")]
    pub latest_review: Option<Review>,
}

/// デバイスのレビュー履歴
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReviewHistory {
    pub reviews: Vec<Review>,
    pub device: Option<Device>,
    pub size: u32,
    pub total: u32,
    pub page: u32,
    pub page_size: u32,
}

/// デバイスの接続状態（一覧の1要素）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConnection {
    #[serde(deserialize_with = "string_or_number")]
    pub device_id: String,
    pub connection_status: ConnectionState,
}

/// 請負業者アプリ: 施設に紐づくデバイス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityDevice {
    pub id: i64,
    pub device_name: String,
    pub result: Option<u8>,
    pub submission_status: Option<u8>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityDevices {
    pub devices: Vec<FacilityDevice>,
}

/// 請負業者アプリ: QRトークン検証結果
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityAuth {
    pub facility_name: String,
    pub prefecture: String,
    pub municipality: String,
}

/// 請負業者アプリ: 画像取得の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFetchType {
    /// 参考画像とレビューコメント
    SampleImage,
    /// カメラの最新画像
    CameraImage,
}

impl ImageFetchType {
    pub fn code(self) -> u8 {
        match self {
            ImageFetchType::SampleImage => 0,
            ImageFetchType::CameraImage => 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceImages {
    pub device_image: Option<String>,
    pub sample_image: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CreatedReview {
    pub review_id: Option<i64>,
}

/// QRコード生成リクエストの顧客単位
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QrCodeCustomer {
    pub customer_id: i64,
    #[serde(default)]
    pub facility_ids: Vec<i64>,
}

/// 単一データのレスポンス `{status_code, error_code, message, data}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
    #[serde(default)]
    pub status_code: u16,
    #[serde(default)]
    pub message: String,
}

/// 一覧レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListEnvelope<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// エラーレスポンス
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorPayload {
    pub error_code: Option<u32>,
    pub status_code: Option<u16>,
    pub message: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

fn empty_object_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<Review>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(other) => serde_json::from_value(other)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_review_result_codes() {
        assert_eq!(ReviewResult::from(1), ReviewResult::Initial);
        assert_eq!(ReviewResult::from(4), ReviewResult::Approved);
        // 未知のコードは初期状態扱い
        assert_eq!(ReviewResult::from(9), ReviewResult::Initial);
        assert_eq!(u8::from(ReviewResult::Rejected), 3);
    }

    #[test]
    fn test_review_result_date_visibility() {
        assert!(!ReviewResult::Initial.is_submitted());
        assert!(ReviewResult::Requesting.is_submitted());
        assert!(!ReviewResult::Requesting.is_answered());
        assert!(ReviewResult::Approved.is_answered());
    }

    #[test]
    fn test_review_deserialize() {
        let json = r#"{
            "id": 12,
            "result": 2,
            "image_blob": "abc",
            "review_comment": "",
            "device": {
                "id": 3,
                "device_id": "Aid-0001",
                "device_name": "入口カメラ",
                "device_type": { "id": 5, "name": "屋外", "sample_image_blob": null }
            },
            "facility": { "facility_name": "本社", "facility_type": { "name": "倉庫" } }
        }"#;

        let review: Review = serde_json::from_str(json).expect("デシリアライズ失敗");
        assert_eq!(review.id, 12);
        assert_eq!(review.result, ReviewResult::Requesting);
        let device = review.device.expect("deviceがない");
        assert_eq!(device.device_name, "入口カメラ");
        assert!(device.device_type.unwrap().sample_image_blob.is_none());
        assert_eq!(review.facility.unwrap().facility_name, "本社");
    }

    #[test]
    fn test_latest_review_empty_object() {
        let json = r#"{ "device": { "id": 1, "device_id": "x", "device_name": "cam" }, "latest_review": {} }"#;
        let row: LatestReview = serde_json::from_str(json).unwrap();
        assert!(row.latest_review.is_none());

        let json = r#"{ "device": { "id": 1 }, "latest_review": { "id": 7, "result": 3 } }"#;
        let row: LatestReview = serde_json::from_str(json).unwrap();
        assert_eq!(row.latest_review.unwrap().result, ReviewResult::Rejected);
    }

    #[test]
    fn test_device_connection_numeric_id() {
        let json = r#"[
            { "device_id": 10, "connection_status": "Connected" },
            { "device_id": "Aid-2", "connection_status": "Standby" }
        ]"#;
        let rows: Vec<DeviceConnection> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].device_id, "10");
        assert_eq!(rows[0].connection_status.color(), "green");
        assert_eq!(
            rows[1].connection_status,
            ConnectionState::Unknown("Standby".to_string())
        );
        assert_eq!(rows[1].connection_status.color(), "grey");
    }

    #[test]
    fn test_progress_report_missing_status() {
        let report: ProgressReport = serde_json::from_str(r#"{ "review_comment": "ok" }"#).unwrap();
        assert!(report.status.is_none());

        let report: ProgressReport = serde_json::from_str(r#"{ "status": 4 }"#).unwrap();
        assert_eq!(report.status, Some(DeviceProgressStatus::Approved));

        let report: ProgressReport = serde_json::from_str(r#"{ "status": 1 }"#).unwrap();
        assert_eq!(report.status, Some(DeviceProgressStatus::Other(1)));
    }

    #[test]
    fn test_account_id_from_string() {
        let json = r#"{ "id": "42", "login_id": "admin", "token": "t" }"#;
        let account: Account = serde_json::from_str(json).unwrap();
        assert_eq!(account.id, "42");
    }

    #[test]
    fn test_list_envelope_defaults() {
        let list: ListEnvelope<Customer> = serde_json::from_str(r#"{ "status_code": 200 }"#).unwrap();
        assert!(list.data.is_empty());
        assert!(list.total.is_none());
    }
}
