//! 請負業者の画角申請
//!
//! カメラの最新画像を取得し、進捗を確認してから申請する。
//! - 申請中・承認済みのデバイスは申請せず 10002 / 10003 を返す
//! - 画像がない（`DEVICE_IMAGE_NOT_FOUND`）場合は申請できない
//! - 申請中の二重送信は無視する

use crate::api::{contractor, ApiClient};
use crate::error::{ApiFailure, Result};
use crate::poller::{into_failure, Latch, PollHandle};
use aov_review_common::types::{DeviceImages, ImageFetchType};
use aov_review_common::{DeviceProgressStatus, ErrorCode};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// カメラ画像がないことを示す値
pub const DEVICE_IMAGE_NOT_FOUND: &str = "DEVICE_IMAGE_NOT_FOUND";

pub const ALREADY_SUBMITTED: u32 = 10002;
pub const ALREADY_APPROVED: u32 = 10003;

/// 連続撮影の間隔
pub const CAMERA_CAPTURE_INTERVAL: Duration = Duration::from_secs(5);
/// デバイス一覧へ戻るまでの時間
pub const NAVIGATE_BACK_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraImage {
    Image(String),
    NotFound,
}

impl CameraImage {
    pub fn as_str(&self) -> &str {
        match self {
            CameraImage::Image(data) => data,
            CameraImage::NotFound => DEVICE_IMAGE_NOT_FOUND,
        }
    }

    fn submittable(&self) -> Option<&str> {
        match self {
            CameraImage::Image(data) if !data.is_empty() && data != DEVICE_IMAGE_NOT_FOUND => {
                Some(data)
            }
            _ => None,
        }
    }
}

/// 申請の結果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 送信中・画像なしのため何もしていない
    Ignored,
    /// 申請済み（ステータス画面へ）
    Submitted { review_id: i64 },
    /// 申請中または承認済みのため送らなかった（一覧へ戻る）
    Blocked {
        failure: ApiFailure,
        navigate_back: Duration,
    },
    Failed(ApiFailure),
}

fn blocked(code: u32) -> SubmitOutcome {
    SubmitOutcome::Blocked {
        failure: ApiFailure {
            code: ErrorCode::Server(code),
            status: None,
            message: format!("device progress check returned {}", code),
        },
        navigate_back: NAVIGATE_BACK_DELAY,
    }
}

pub struct SubmissionController {
    client: ApiClient,
    device_id: i64,
    camera: Option<CameraImage>,
    sample: Option<DeviceImages>,
    in_flight: bool,
    submitted: bool,
}

impl SubmissionController {
    pub fn new(client: ApiClient, device_id: i64) -> Self {
        Self {
            client,
            device_id,
            camera: None,
            sample: None,
            in_flight: false,
            submitted: false,
        }
    }

    pub fn device_id(&self) -> i64 {
        self.device_id
    }

    pub fn camera_image(&self) -> Option<&CameraImage> {
        self.camera.as_ref()
    }

    /// 参考画像と前回のレビューコメント
    pub fn sample(&self) -> Option<&DeviceImages> {
        self.sample.as_ref()
    }

    pub fn set_camera_image(&mut self, image: CameraImage) {
        self.camera = Some(image);
    }

    pub async fn fetch_sample(&mut self) -> Result<&DeviceImages> {
        let images =
            contractor::get_device_images(&self.client, self.device_id, ImageFetchType::SampleImage)
                .await?;
        Ok(self.sample.insert(images))
    }

    /// カメラの最新画像を取得
    ///
    /// 画像が返らなかった場合、連続撮影中は前回の画像を残す。
    pub async fn capture(&mut self, continuous: bool) -> Result<&CameraImage> {
        let fetched =
            contractor::get_device_images(&self.client, self.device_id, ImageFetchType::CameraImage)
                .await;

        let keep_previous = continuous && self.camera.is_some();
        match fetched {
            Ok(images) => {
                let next = match images.device_image {
                    Some(data) if !data.is_empty() => Some(CameraImage::Image(data)),
                    _ if keep_previous => None,
                    _ => Some(CameraImage::NotFound),
                };
                if let Some(next) = next {
                    self.camera = Some(next);
                }
                Ok(self.camera.get_or_insert(CameraImage::NotFound))
            }
            Err(e) => {
                if !keep_previous {
                    self.camera = Some(CameraImage::NotFound);
                }
                Err(e)
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.in_flight
            && !self.submitted
            && self.camera.as_ref().and_then(CameraImage::submittable).is_some()
    }

    pub async fn submit(&mut self) -> SubmitOutcome {
        if !self.can_submit() {
            return SubmitOutcome::Ignored;
        }
        let Some(image) = self
            .camera
            .as_ref()
            .and_then(CameraImage::submittable)
            .map(str::to_string)
        else {
            return SubmitOutcome::Ignored;
        };

        self.in_flight = true;
        let outcome = self.submit_image(&image).await;
        self.in_flight = false;

        match &outcome {
            SubmitOutcome::Submitted { review_id } => {
                info!(device_id = self.device_id, review_id, "review requested");
                self.submitted = true;
            }
            SubmitOutcome::Blocked { failure, .. } => {
                debug!(device_id = self.device_id, "submission blocked: {}", failure);
                self.submitted = true;
            }
            SubmitOutcome::Failed(failure) => {
                warn!(device_id = self.device_id, "submission failed: {}", failure);
            }
            SubmitOutcome::Ignored => {}
        }
        outcome
    }

    async fn submit_image(&self, image: &str) -> SubmitOutcome {
        let progress = match contractor::get_progress_status(&self.client, self.device_id).await {
            Ok(progress) => progress,
            Err(e) => return SubmitOutcome::Failed(into_failure(e)),
        };

        match progress.status {
            Some(DeviceProgressStatus::RequestingForReview) => blocked(ALREADY_SUBMITTED),
            Some(DeviceProgressStatus::Approved) => blocked(ALREADY_APPROVED),
            _ => match contractor::create_review(&self.client, self.device_id, image).await {
                Ok(review_id) => SubmitOutcome::Submitted { review_id },
                Err(e) => SubmitOutcome::Failed(into_failure(e)),
            },
        }
    }
}

/// 連続撮影を開始（失敗したら止まる）
pub fn spawn_camera_capture(
    client: ApiClient,
    device_id: i64,
    period: Duration,
) -> PollHandle<Option<CameraImage>> {
    let latch = Latch::new();
    let task_latch = latch.clone();
    let (tx, rx) = watch::channel(None);

    let task = tokio::spawn(async move {
        let mut controller = SubmissionController::new(client, device_id);
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if task_latch.is_set() {
                break;
            }
            let result = controller.capture(true).await.cloned();
            if task_latch.is_set() {
                break;
            }
            match result {
                Ok(image) => {
                    tx.send_replace(Some(image));
                }
                Err(e) => {
                    warn!("カメラ画像の取得に失敗: {}", e);
                    tx.send_replace(controller.camera_image().cloned());
                    break;
                }
            }
        }
    });

    PollHandle::from_parts(task, rx, latch)
}
