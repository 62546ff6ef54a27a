//! 先頭呼び出しのみ通すスロットル
//!
//! 直前の呼び出しから一定時間内の呼び出しは破棄する（末尾では実行しない）。
//! 絞り込み条件の連続変更でAPIを連打しないために使う。

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_THROTTLE: Duration = Duration::from_millis(500);

#[derive(Debug)]
pub struct Throttle {
    window: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last: Mutex::new(None),
        }
    }

    /// 呼び出してよいか（許可した場合は時刻を記録）
    pub fn try_acquire(&self) -> bool {
        let now = Instant::now();
        let Ok(mut last) = self.last.lock() else {
            return true;
        };
        match *last {
            Some(prev) if now.duration_since(prev) < self.window => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(DEFAULT_THROTTLE)
    }
}
