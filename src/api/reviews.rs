//! レビューAPI

use super::client::ApiClient;
use super::throttle::Throttle;
use crate::error::Result;
use aov_review_common::types::{LatestReview, ReviewHistory};
use aov_review_common::{Envelope, ListEnvelope, Review, ReviewResult};
use serde::{Deserialize, Serialize};

/// ダッシュボードの検索条件
#[derive(Debug, Clone, Default, Serialize)]
pub struct LatestReviewsQuery {
    #[serde(skip)]
    pub customer_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facility_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefecture: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub municipality: Option<String>,
}

#[derive(Debug, Serialize)]
struct DecisionRequest<'a> {
    result: u8,
    comment: Option<&'a str>,
}

/// 承認・却下の結果
#[derive(Debug, Clone, Deserialize)]
pub struct Decision {
    pub result: ReviewResult,
}

#[derive(Debug, Serialize)]
struct HistoryQuery {
    page: u32,
    page_size: u32,
}

/// 顧客のデバイスごとの最新レビュー
///
/// 顧客が未選択なら問い合わせず None を返す。
pub async fn get_latest_reviews(
    client: &ApiClient,
    query: &LatestReviewsQuery,
) -> Result<Option<ListEnvelope<LatestReview>>> {
    let Some(customer_id) = query.customer_id else {
        return Ok(None);
    };

    let path = format!("reviews/customers/{}/latest", customer_id);
    let list = client.get_with_query(&path, query).await?;
    Ok(Some(list))
}

/// 連続呼び出しを間引いた `get_latest_reviews`（間引いた場合は None）
pub async fn get_latest_reviews_throttled(
    client: &ApiClient,
    throttle: &Throttle,
    query: &LatestReviewsQuery,
) -> Result<Option<ListEnvelope<LatestReview>>> {
    if !throttle.try_acquire() {
        return Ok(None);
    }
    get_latest_reviews(client, query).await
}

/// レビュー取得（ラッパーなしで返る）
pub async fn get_review(client: &ApiClient, review_id: i64) -> Result<Review> {
    client.get(&format!("reviews/{}", review_id)).await
}

async fn submit_decision(
    client: &ApiClient,
    review_id: i64,
    result: ReviewResult,
    comment: Option<&str>,
) -> Result<Decision> {
    let body = DecisionRequest {
        result: result.code(),
        comment,
    };
    let response: Envelope<Decision> = client.put(&format!("reviews/{}", review_id), &body).await?;
    Ok(response.data)
}

pub async fn approve_review(client: &ApiClient, review_id: i64) -> Result<Decision> {
    submit_decision(client, review_id, ReviewResult::Approved, None).await
}

pub async fn reject_review(client: &ApiClient, review_id: i64, comment: &str) -> Result<Decision> {
    submit_decision(client, review_id, ReviewResult::Rejected, Some(comment)).await
}

/// デバイスのレビュー履歴
pub async fn get_device_review_history(
    client: &ApiClient,
    device_id: i64,
    page: u32,
    page_size: u32,
) -> Result<ReviewHistory> {
    let path = format!("reviews/devices/{}/history", device_id);
    let response: Envelope<ReviewHistory> = client
        .get_with_query(&path, &HistoryQuery { page, page_size })
        .await?;
    Ok(response.data)
}
