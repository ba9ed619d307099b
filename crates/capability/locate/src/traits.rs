//! 协作方接口与时钟。

use crate::error::{DirectoryError, LocateError};
use async_trait::async_trait;
use domain::{DeviceDescriptor, DeviceId, LocationResult};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// 设备目录：列出所有待定位设备。
#[async_trait]
pub trait DeviceDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError>;
}

/// 单设备定位器：一次调用返回一个定位结果。
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    async fn locate(&self, device_id: &DeviceId) -> Result<LocationResult, LocateError>;
}

/// 毫秒时间源（缓存年龄计算）。
pub trait Clock: Send + Sync {
    fn now_epoch_ms(&self) -> i64;
}

/// 单调系统时钟：创建时记录一次墙钟时间，之后按 `Instant` 累加。
///
/// 墙钟回拨不会让缓存年龄变为负数。
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    anchor_epoch_ms: i64,
    anchor: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
            .unwrap_or_default();
        Self {
            anchor_epoch_ms,
            anchor: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        let elapsed_ms = i64::try_from(self.anchor.elapsed().as_millis()).unwrap_or(i64::MAX);
        self.anchor_epoch_ms.saturating_add(elapsed_ms)
    }
}
