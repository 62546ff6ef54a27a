//! デバイス接続状態の監視
//!
//! 終了状態はなく、ハンドルを破棄するまで問い合わせを続ける。

use super::{into_failure, Latch, PollHandle};
use crate::api::contractor;
use crate::api::ApiClient;
use crate::error::{ApiFailure, Result};
use aov_review_common::types::DeviceConnection;
use aov_review_common::ConnectionState;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

/// 一覧画面の問い合わせ間隔
pub const CONNECTION_POLL_INTERVAL: Duration = Duration::from_millis(10_000);

#[async_trait]
pub trait ConnectionSource: Send + Sync {
    async fn fetch_connections(&self) -> Result<Vec<DeviceConnection>>;
}

pub struct FacilityConnections {
    client: ApiClient,
}

impl FacilityConnections {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ConnectionSource for FacilityConnections {
    async fn fetch_connections(&self) -> Result<Vec<DeviceConnection>> {
        contractor::get_devices_connection_status(&self.client).await
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConnectionSnapshot {
    /// device_id → 接続状態
    pub states: BTreeMap<String, ConnectionState>,
    pub last_error: Option<ApiFailure>,
    pub refreshes: u32,
}

impl ConnectionSnapshot {
    pub fn state_of(&self, device_id: &str) -> Option<&ConnectionState> {
        self.states.get(device_id)
    }

    /// 取得結果で置き換える（失敗時は前回の状態を残す）
    pub fn apply(&mut self, result: std::result::Result<Vec<DeviceConnection>, ApiFailure>) {
        self.refreshes += 1;
        match result {
            Ok(connections) => {
                self.states = connections
                    .into_iter()
                    .map(|c| (c.device_id, c.connection_status))
                    .collect();
                self.last_error = None;
            }
            Err(failure) => self.last_error = Some(failure),
        }
    }
}

pub struct ConnectionMonitor<S: ConnectionSource> {
    source: S,
    snapshot: ConnectionSnapshot,
    latch: Latch,
}

impl<S: ConnectionSource> ConnectionMonitor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            snapshot: ConnectionSnapshot::default(),
            latch: Latch::new(),
        }
    }

    pub fn snapshot(&self) -> &ConnectionSnapshot {
        &self.snapshot
    }

    /// 1回問い合わせる（停止済みなら false）
    pub async fn refresh(&mut self) -> bool {
        if self.latch.is_set() {
            return false;
        }
        let result = self.source.fetch_connections().await.map_err(|e| {
            let failure = into_failure(e);
            warn!("接続状態の取得に失敗: {}", failure);
            failure
        });
        if self.latch.is_set() {
            return false;
        }
        self.snapshot.apply(result);
        true
    }

    pub fn spawn(self, period: Duration) -> PollHandle<ConnectionSnapshot>
    where
        S: 'static,
    {
        let mut monitor = self;
        let latch = monitor.latch.clone();
        let (tx, rx) = watch::channel(monitor.snapshot.clone());

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !monitor.refresh().await {
                    break;
                }
                tx.send_replace(monitor.snapshot.clone());
            }
            debug!("connection monitor finished");
        });

        PollHandle::from_parts(task, rx, latch)
    }
}
