//! テスト用のモックバックエンド

#![allow(dead_code)]

use aov_review::api::ApiClient;
use axum::http::{Method, Uri};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// ランダムポートで起動してベースURLを返す
pub async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// モックが受け取ったリクエスト
#[derive(Debug, Clone)]
pub struct Received {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub body: Value,
}

pub type RequestLog = Arc<Mutex<Vec<Received>>>;

/// どのパスにも `reply` を返し、受け取ったリクエストを記録する
pub async fn serve_recording(reply: Value) -> (String, RequestLog) {
    let log = RequestLog::default();
    let recorded = log.clone();
    let app = Router::new().fallback(move |method: Method, uri: Uri, body: String| {
        let recorded = recorded.clone();
        let reply = reply.clone();
        async move {
            recorded.lock().unwrap().push(Received {
                method,
                path: uri.path().to_string(),
                query: uri.query().map(String::from),
                body: serde_json::from_str(&body).unwrap_or(Value::Null),
            });
            Json(reply)
        }
    });
    (serve(app).await, log)
}

/// 記録されたリクエスト（順番どおり）
pub fn received(log: &RequestLog) -> Vec<Received> {
    log.lock().unwrap().clone()
}

pub fn client(base_url: &str) -> ApiClient {
    ApiClient::new(base_url, Duration::from_secs(5)).unwrap()
}

pub fn error_body(error_code: u32, message: &str) -> Value {
    json!({ "error_code": error_code, "status_code": 400, "message": message })
}

/// `GET reviews/{id}` のレスポンス
pub fn review_json(id: i64, result: u8) -> Value {
    json!({
        "id": id,
        "result": result,
        "image_blob": "c3VibWl0dGVk",
        "image_date_utc": "2024-05-01T09:30:00Z",
        "created_at_utc": "2024-05-01T10:00:00Z",
        "last_updated_at_utc": null,
        "review_comment": null,
        "device": {
            "id": 3,
            "device_id": "SN-001",
            "device_name": "入口カメラ",
            "device_type_id": 5,
            "device_type": { "id": 5, "name": "屋内", "sample_image_blob": "cmVmZXJlbmNl" }
        },
        "facility": { "id": 9, "facility_name": "本店", "prefecture": "東京都", "municipality": "港区" }
    })
}
