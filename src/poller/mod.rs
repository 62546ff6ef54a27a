//! 申請ステータスの監視
//!
//! 一定間隔で進捗を問い合わせ、申請中以外になったら停止する。
//! 状態遷移は `transition` に集約し、タイマーの寿命は `PollHandle` が持つ
//! （ハンドルを破棄するとタスクも止まる）。

pub mod connection;

use crate::api::contractor;
use crate::api::ApiClient;
use crate::error::{AovError, ApiFailure, Result};
use aov_review_common::{DeviceProgressStatus, ErrorCode, ProgressReport, TextKey};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// 申請画面の問い合わせ間隔
pub const REVIEW_POLL_INTERVAL: Duration = Duration::from_millis(3000);

/// 監視中の申請状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PollState {
    #[default]
    Requesting,
    Rejected,
    Approved,
    /// 想定外のステータスコード
    Failed(u8),
    /// ステータスが返らなかった（確認中の表示のまま監視を止める）
    Unanswered,
}

impl PollState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, PollState::Requesting)
    }

    /// 画面に表示する文言
    pub fn message_key(self) -> TextKey {
        match self {
            PollState::Requesting | PollState::Unanswered => TextKey::ReviewChecking,
            PollState::Rejected => TextKey::ReviewRejected,
            PollState::Approved => TextKey::ReviewApproved,
            PollState::Failed(_) => TextKey::ReviewFailed,
        }
    }

    fn from_report(status: Option<DeviceProgressStatus>) -> Self {
        match status {
            None => PollState::Unanswered,
            Some(DeviceProgressStatus::RequestingForReview) => PollState::Requesting,
            Some(DeviceProgressStatus::Rejected) => PollState::Rejected,
            Some(DeviceProgressStatus::Approved) => PollState::Approved,
            Some(DeviceProgressStatus::Other(code)) => PollState::Failed(code),
        }
    }
}

/// 問い合わせ結果
#[derive(Debug, Clone)]
pub enum PollEvent {
    Fetched(ProgressReport),
    FetchFailed(ApiFailure),
}

/// 画面に渡す状態
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PollSnapshot {
    pub state: PollState,
    pub comment: Option<String>,
    /// 直近の問い合わせ失敗（成功すると消える）
    pub last_error: Option<ApiFailure>,
    pub fetches: u32,
}

/// 状態遷移
///
/// 終了状態では何も変えない。失敗は状態を変えずにエラーだけ記録する。
pub fn transition(current: &PollSnapshot, event: PollEvent) -> PollSnapshot {
    if current.state.is_terminal() {
        return current.clone();
    }

    match event {
        PollEvent::Fetched(report) => PollSnapshot {
            state: PollState::from_report(report.status),
            comment: report.review_comment,
            last_error: None,
            fetches: current.fetches + 1,
        },
        PollEvent::FetchFailed(failure) => PollSnapshot {
            last_error: Some(failure),
            fetches: current.fetches + 1,
            ..current.clone()
        },
    }
}

/// APIエラー以外も画面表示用に正規化
pub(crate) fn into_failure(err: AovError) -> ApiFailure {
    match err {
        AovError::Api(failure) => failure,
        other => ApiFailure {
            code: ErrorCode::Unknown,
            status: None,
            message: other.to_string(),
        },
    }
}

/// 進捗の取得元
#[async_trait]
pub trait ProgressSource: Send + Sync {
    async fn fetch_progress(&self) -> Result<ProgressReport>;
}

/// APIからデバイスの進捗を取得
pub struct DeviceProgress {
    client: ApiClient,
    device_id: i64,
}

impl DeviceProgress {
    pub fn new(client: ApiClient, device_id: i64) -> Self {
        Self { client, device_id }
    }
}

#[async_trait]
impl ProgressSource for DeviceProgress {
    async fn fetch_progress(&self) -> Result<ProgressReport> {
        contractor::get_progress_status(&self.client, self.device_id).await
    }
}

/// 1回の問い合わせの結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// 停止済みのため問い合わせなし
    Skipped,
    Continue,
    Terminal,
}

/// 停止フラグ（各tickの先頭と問い合わせ後に確認する）
#[derive(Debug, Clone, Default)]
pub struct Latch(Arc<AtomicBool>);

impl Latch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct StatusPoller<S: ProgressSource> {
    source: S,
    snapshot: PollSnapshot,
    latch: Latch,
}

impl<S: ProgressSource> StatusPoller<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshot: PollSnapshot::default(),
            latch: Latch::new(),
        }
    }

    pub fn snapshot(&self) -> &PollSnapshot {
        &self.snapshot
    }

    pub fn latch(&self) -> Latch {
        self.latch.clone()
    }

    pub fn stop(&self) {
        self.latch.set();
    }

    pub fn is_stopped(&self) -> bool {
        self.latch.is_set()
    }

    pub async fn tick(&mut self) -> TickOutcome {
        if self.latch.is_set() {
            return TickOutcome::Skipped;
        }

        let event = match self.source.fetch_progress().await {
            Ok(report) => PollEvent::Fetched(report),
            Err(e) => {
                let failure = into_failure(e);
                warn!("進捗の取得に失敗: {}", failure);
                PollEvent::FetchFailed(failure)
            }
        };

        // 停止後に返ってきた結果は捨てる
        if self.latch.is_set() {
            return TickOutcome::Skipped;
        }

        let next = transition(&self.snapshot, event);
        if next.state != self.snapshot.state {
            info!(from = ?self.snapshot.state, to = ?next.state, "poll state changed");
        }
        self.snapshot = next;

        if self.snapshot.state.is_terminal() {
            self.latch.set();
            TickOutcome::Terminal
        } else {
            TickOutcome::Continue
        }
    }

    /// 一定間隔で問い合わせるタスクを起動（最初の問い合わせは即時）
    pub fn spawn(self, period: Duration) -> PollHandle<PollSnapshot>
    where
        S: 'static,
    {
        let mut poller = self;
        let latch = poller.latch();
        let (tx, rx) = watch::channel(poller.snapshot.clone());

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match poller.tick().await {
                    TickOutcome::Skipped => break,
                    TickOutcome::Continue => {
                        tx.send_replace(poller.snapshot.clone());
                    }
                    TickOutcome::Terminal => {
                        tx.send_replace(poller.snapshot.clone());
                        break;
                    }
                }
            }
            debug!("status poller finished");
        });

        PollHandle { task, rx, latch }
    }
}

/// 監視タスクのハンドル（破棄すると停止）
pub struct PollHandle<T> {
    task: JoinHandle<()>,
    rx: watch::Receiver<T>,
    latch: Latch,
}

impl<T: Clone> PollHandle<T> {
    pub(crate) fn from_parts(task: JoinHandle<()>, rx: watch::Receiver<T>, latch: Latch) -> Self {
        Self { task, rx, latch }
    }

    pub fn snapshot(&self) -> T {
        self.rx.borrow().clone()
    }

    /// 次の更新を待つ（タスク終了なら None）
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn stop(&self) {
        self.latch.set();
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl PollHandle<PollSnapshot> {
    /// 終了状態になるまで待つ
    pub async fn wait_terminal(&mut self) -> PollSnapshot {
        loop {
            let current = self.snapshot();
            if current.state.is_terminal() {
                return current;
            }
            if self.changed().await.is_none() {
                return self.snapshot();
            }
        }
    }
}

impl<T> Drop for PollHandle<T> {
    fn drop(&mut self) {
        self.latch.set();
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// 決められた順に結果を返す
    struct Scripted {
        replies: Mutex<VecDeque<Result<ProgressReport>>>,
        calls: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<ProgressReport>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    replies: Mutex::new(replies.into()),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    #[async_trait]
    impl ProgressSource for Scripted {
        async fn fetch_progress(&self) -> Result<ProgressReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(report(Some(2), None)))
        }
    }

    fn report(status: Option<u8>, comment: Option<&str>) -> ProgressReport {
        ProgressReport {
            status: status.map(DeviceProgressStatus::from),
            review_comment: comment.map(String::from),
        }
    }

    fn network_error() -> AovError {
        ApiFailure::network("connection reset").into()
    }

    #[test]
    fn test_transition_to_terminal() {
        let start = PollSnapshot::default();
        let next = transition(&start, PollEvent::Fetched(report(Some(3), Some("右に寄せてください"))));
        assert_eq!(next.state, PollState::Rejected);
        assert_eq!(next.comment.as_deref(), Some("右に寄せてください"));

        // 終了後のイベントは無視
        let after = transition(&next, PollEvent::Fetched(report(Some(4), None)));
        assert_eq!(after, next);
    }

    #[test]
    fn test_transition_failure_keeps_state() {
        let start = PollSnapshot::default();
        let next = transition(&start, PollEvent::FetchFailed(ApiFailure::network("down")));
        assert_eq!(next.state, PollState::Requesting);
        assert_eq!(next.last_error.as_ref().map(|e| e.code), Some(ErrorCode::Network));

        // 成功するとエラーは消える
        let next = transition(&next, PollEvent::Fetched(report(Some(2), None)));
        assert!(next.last_error.is_none());
    }

    #[test]
    fn test_missing_and_unknown_status() {
        let start = PollSnapshot::default();
        let unanswered = transition(&start, PollEvent::Fetched(report(None, None)));
        assert_eq!(unanswered.state, PollState::Unanswered);
        assert!(unanswered.state.is_terminal());
        assert_eq!(unanswered.state.message_key(), TextKey::ReviewChecking);
        assert_eq!(
            transition(&start, PollEvent::Fetched(report(Some(1), None))).state,
            PollState::Failed(1)
        );
        assert_eq!(PollState::Failed(1).message_key(), TextKey::ReviewFailed);
    }

    #[tokio::test]
    async fn test_no_fetch_after_terminal() {
        let (source, calls) = Scripted::new(vec![Ok(report(Some(4), None))]);
        let mut poller = StatusPoller::new(source);

        assert_eq!(poller.tick().await, TickOutcome::Terminal);
        assert_eq!(poller.snapshot().state, PollState::Approved);
        // 強制的にもう一度呼んでも問い合わせない
        assert_eq!(poller.tick().await, TickOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_missing_status_stops_polling() {
        let (source, calls) = Scripted::new(vec![Ok(report(Some(2), None)), Ok(report(None, None))]);
        let mut poller = StatusPoller::new(source);

        assert_eq!(poller.tick().await, TickOutcome::Continue);
        assert_eq!(poller.tick().await, TickOutcome::Terminal);
        assert_eq!(poller.snapshot().state, PollState::Unanswered);
        assert_eq!(poller.tick().await, TickOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_polling() {
        let (source, calls) = Scripted::new(vec![Err(network_error()), Ok(report(Some(2), None))]);
        let mut poller = StatusPoller::new(source);

        assert_eq!(poller.tick().await, TickOutcome::Continue);
        assert_eq!(poller.snapshot().state, PollState::Requesting);
        assert!(poller.snapshot().last_error.is_some());

        assert_eq!(poller.tick().await, TickOutcome::Continue);
        assert!(poller.snapshot().last_error.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stopped_poller_skips() {
        let (source, calls) = Scripted::new(vec![]);
        let mut poller = StatusPoller::new(source);
        poller.stop();
        assert_eq!(poller.tick().await, TickOutcome::Skipped);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_poller_stops_at_terminal() {
        let (source, calls) = Scripted::new(vec![
            Ok(report(Some(2), None)),
            Err(network_error()),
            Ok(report(Some(4), None)),
        ]);
        let mut handle = StatusPoller::new(source).spawn(REVIEW_POLL_INTERVAL);

        let done = handle.wait_terminal().await;
        assert_eq!(done.state, PollState::Approved);
        assert_eq!(done.fetches, 3);

        tokio::time::sleep(REVIEW_POLL_INTERVAL * 5).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(handle.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handle_stops_polling() {
        let (source, calls) = Scripted::new(vec![]);
        let mut handle = StatusPoller::new(source).spawn(REVIEW_POLL_INTERVAL);

        // 即時の1回目
        handle.changed().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        drop(handle);
        tokio::time::sleep(REVIEW_POLL_INTERVAL * 3).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
