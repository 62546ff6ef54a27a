//! レビュー詳細
//!
//! レビューを取得して表示用に変換し、承認・却下を実行する。
//! 画面遷移は `Outcome::navigate` で呼び出し側に伝える。

use crate::adjuster::EncodedImage;
use crate::api::{device_types, reviews, ApiClient};
use crate::error::{AovError, ApiFailure, Result};
use crate::poller::into_failure;
use aov_review_common::{text, Locale, Review, ReviewResult, Surface, TextKey};
use chrono::{DateTime, NaiveDateTime};
use std::time::Duration;
use tracing::{debug, info};

/// 提出画像がないことを示す値
pub const NO_IMAGE_SUBMITTED: &str = "NoImageSubmitted";
pub const SUBMITTED_IMAGE_NOT_FOUND: &str = "SubmittedImageNotFound";
pub const REFERENCE_IMAGE_NOT_FOUND: &str = "ReferenceImageNotFound";

/// 却下理由の最大文字数
pub const CHARACTER_LIMIT: usize = 255;
/// 完了後にダッシュボードへ戻るまでの時間
pub const NAVIGATE_DELAY: Duration = Duration::from_secs(3);

pub const REVIEW_NOT_FOUND: u32 = 40404;
/// 最新のレビューではない（他の管理者が先に処理した）
pub const NOT_LATEST_REVIEW: [u32; 2] = [40303, 40304];

/// 画像欄の表示内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSlot {
    /// Base64画像
    Image(String),
    NotSubmitted,
    SubmittedNotFound,
    ReferenceNotFound,
}

impl ImageSlot {
    fn submitted(review: &Review) -> Self {
        if review.result == ReviewResult::Initial {
            return ImageSlot::NotSubmitted;
        }
        match &review.image_blob {
            Some(blob) => ImageSlot::Image(blob.clone()),
            None => ImageSlot::SubmittedNotFound,
        }
    }

    fn reference(review: &Review) -> Self {
        review
            .device
            .as_ref()
            .and_then(|d| d.device_type.as_ref())
            .and_then(|t| t.sample_image_blob.clone())
            .map(ImageSlot::Image)
            .unwrap_or(ImageSlot::ReferenceNotFound)
    }

    /// 画像の代わりに出す文言（表示できる画像なら None）
    pub fn fallback(&self) -> Option<TextKey> {
        match self {
            ImageSlot::Image(data) if data.is_empty() => Some(TextKey::FailedToLoadImage),
            ImageSlot::Image(_) => None,
            ImageSlot::NotSubmitted => Some(TextKey::NotSubmitted),
            ImageSlot::SubmittedNotFound => Some(TextKey::SubmittedImageNotFound),
            ImageSlot::ReferenceNotFound => Some(TextKey::ReferenceImageNotFound),
        }
    }

    /// 画像データまたは代替値
    pub fn as_str(&self) -> &str {
        match self {
            ImageSlot::Image(data) => data,
            ImageSlot::NotSubmitted => NO_IMAGE_SUBMITTED,
            ImageSlot::SubmittedNotFound => SUBMITTED_IMAGE_NOT_FOUND,
            ImageSlot::ReferenceNotFound => REFERENCE_IMAGE_NOT_FOUND,
        }
    }
}

/// 表示用のレビュー
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewDetails {
    pub id: i64,
    pub device_name: String,
    pub serial_number: String,
    pub device_id: Option<i64>,
    pub device_type_id: Option<i64>,
    pub device_type_name: String,
    pub facility_name: String,
    pub facility_type_name: String,
    pub image_date: Option<String>,
    pub result: ReviewResult,
    pub requested: Option<String>,
    pub answered: Option<String>,
    pub submitted_image: ImageSlot,
    pub reference_image: ImageSlot,
    pub review_comment: String,
}

impl From<&Review> for ReviewDetails {
    fn from(review: &Review) -> Self {
        let device = review.device.as_ref();
        let device_type = device.and_then(|d| d.device_type.as_ref());
        let facility = review.facility.as_ref();

        Self {
            id: review.id,
            device_name: device.map(|d| d.device_name.clone()).unwrap_or_default(),
            serial_number: device.map(|d| d.device_id.clone()).unwrap_or_default(),
            device_id: device.map(|d| d.id),
            device_type_id: device_type.map(|t| t.id).or(device.and_then(|d| d.device_type_id)),
            device_type_name: device_type.map(|t| t.name.clone()).unwrap_or_default(),
            facility_name: facility.map(|f| f.facility_name.clone()).unwrap_or_default(),
            facility_type_name: facility
                .and_then(|f| f.facility_type.as_ref())
                .map(|t| t.name.clone())
                .unwrap_or_default(),
            image_date: review.image_date_utc.clone(),
            result: review.result,
            requested: review.created_at_utc.clone(),
            answered: review.last_updated_at_utc.clone(),
            submitted_image: ImageSlot::submitted(review),
            reference_image: ImageSlot::reference(review),
            review_comment: review.review_comment.clone().unwrap_or_default(),
        }
    }
}

impl ReviewDetails {
    /// 画像取得日時（申請済みのみ）
    pub fn image_date_label(&self) -> Option<String> {
        self.result
            .is_submitted()
            .then(|| self.image_date.as_deref().and_then(format_datetime))
            .flatten()
    }

    /// 申請日時（申請済みのみ）
    pub fn requested_label(&self) -> Option<String> {
        self.result
            .is_submitted()
            .then(|| self.requested.as_deref().and_then(format_datetime))
            .flatten()
    }

    /// 回答日時（承認・却下済みのみ）
    pub fn answered_label(&self) -> Option<String> {
        self.result
            .is_answered()
            .then(|| self.answered.as_deref().and_then(format_datetime))
            .flatten()
    }
}

/// 日時を `YYYY/MM/DD HH:MM` に整形
///
/// タイムゾーン付きはそのオフセットのまま、なしはUTCとしてそのまま表示する。
pub fn format_datetime(value: &str) -> Option<String> {
    const FORMAT: &str = "%Y/%m/%d %H:%M";
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.format(FORMAT).to_string());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(value, f).ok())
        .map(|dt| dt.format(FORMAT).to_string())
}

/// 画面の状態
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ReviewView {
    #[default]
    Loading,
    Ready(ReviewDetails),
    NotFound,
    /// 取得に失敗（再読み込み待ち）
    Failed,
}

/// 通知
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Success(TextKey),
    Failure(ApiFailure),
}

impl Notice {
    pub fn message(&self, locale: Locale) -> &'static str {
        match self {
            Notice::Success(key) => text(locale, *key),
            Notice::Failure(failure) => failure.user_message(Surface::Admin, locale),
        }
    }
}

/// 操作の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Outcome {
    pub notice: Option<Notice>,
    /// ダッシュボードへ戻るまでの待ち時間
    pub navigate: Option<Duration>,
}

impl Outcome {
    fn success(key: TextKey) -> Self {
        Self {
            notice: Some(Notice::Success(key)),
            navigate: Some(NAVIGATE_DELAY),
        }
    }

    fn failure(failure: ApiFailure) -> Self {
        Self {
            notice: Some(Notice::Failure(failure)),
            navigate: None,
        }
    }
}

/// レビュー詳細画面の状態
pub struct ReviewController {
    client: ApiClient,
    review_id: i64,
    view: ReviewView,
    reject_reason: String,
    done: bool,
    busy: bool,
}

impl ReviewController {
    pub fn new(client: ApiClient, review_id: i64) -> Self {
        Self {
            client,
            review_id,
            view: ReviewView::Loading,
            reject_reason: String::new(),
            done: false,
            busy: false,
        }
    }

    pub fn view(&self) -> &ReviewView {
        &self.view
    }

    pub fn details(&self) -> Option<&ReviewDetails> {
        match &self.view {
            ReviewView::Ready(details) => Some(details),
            _ => None,
        }
    }

    pub fn reject_reason(&self) -> &str {
        &self.reject_reason
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 却下理由の入力（上限を超える入力は受け付けない）
    pub fn set_reject_reason(&mut self, value: &str) -> bool {
        if value.chars().count() > CHARACTER_LIMIT {
            return false;
        }
        self.reject_reason = value.to_string();
        true
    }

    /// 承認・却下できるか
    pub fn can_decide(&self) -> bool {
        !self.done
            && !self.busy
            && matches!(&self.view, ReviewView::Ready(d) if d.result == ReviewResult::Requesting)
    }

    pub fn can_reject(&self) -> bool {
        self.can_decide() && !self.reject_reason.trim().is_empty()
    }

    pub async fn load(&mut self) -> Outcome {
        self.view = ReviewView::Loading;
        match reviews::get_review(&self.client, self.review_id).await {
            Ok(review) => {
                let details = ReviewDetails::from(&review);
                debug!(review_id = details.id, result = ?details.result, "review loaded");
                self.reject_reason = details.review_comment.clone();
                self.view = ReviewView::Ready(details);
                Outcome::default()
            }
            Err(e) => {
                let failure = into_failure(e);
                if failure.has_code(REVIEW_NOT_FOUND) {
                    self.view = ReviewView::NotFound;
                    Outcome {
                        notice: Some(Notice::Failure(failure)),
                        navigate: Some(Duration::ZERO),
                    }
                } else {
                    self.view = ReviewView::Failed;
                    Outcome::failure(failure)
                }
            }
        }
    }

    pub async fn approve(&mut self) -> Outcome {
        if !self.can_decide() {
            return Outcome::default();
        }
        self.busy = true;
        let result = reviews::approve_review(&self.client, self.review_id).await;
        self.busy = false;

        match result {
            Ok(decision) => {
                info!(review_id = self.review_id, "review approved");
                self.finish(decision.result);
                Outcome::success(TextKey::ApproveSuccess)
            }
            Err(e) => self.decision_failed(e),
        }
    }

    /// 却下（理由は前後の空白を除いて送る）
    pub async fn reject(&mut self) -> Outcome {
        if !self.can_reject() {
            return Outcome::default();
        }
        let comment = self.reject_reason.trim().to_string();
        self.busy = true;
        let result = reviews::reject_review(&self.client, self.review_id, &comment).await;
        self.busy = false;

        match result {
            Ok(decision) => {
                info!(review_id = self.review_id, "review rejected");
                self.reject_reason = comment;
                self.finish(decision.result);
                Outcome::success(TextKey::RejectSuccess)
            }
            Err(e) => self.decision_failed(e),
        }
    }

    /// 画角調整した画像を参照画像として登録
    pub async fn replace_reference_image(&mut self, image: &EncodedImage) -> Result<()> {
        let device_type_id = self
            .details()
            .and_then(|d| d.device_type_id)
            .ok_or_else(|| AovError::InvalidState("デバイスタイプが不明です".into()))?;

        device_types::update_reference_image(&self.client, device_type_id, image.base64()).await?;
        if let ReviewView::Ready(details) = &mut self.view {
            details.reference_image = ImageSlot::Image(image.base64().to_string());
        }
        Ok(())
    }

    fn finish(&mut self, result: ReviewResult) {
        self.done = true;
        if let ReviewView::Ready(details) = &mut self.view {
            details.result = result;
            if result == ReviewResult::Rejected {
                details.review_comment = self.reject_reason.clone();
            }
        }
    }

    fn decision_failed(&mut self, err: AovError) -> Outcome {
        let failure = into_failure(err);
        if NOT_LATEST_REVIEW.iter().any(|code| failure.has_code(*code)) {
            self.done = true;
            return Outcome {
                notice: Some(Notice::Failure(failure)),
                navigate: Some(NAVIGATE_DELAY),
            };
        }
        Outcome::failure(failure)
    }
}
