//! 按设备的定位结果缓存
//!
//! 每台设备最多一个条目，成功定位时整体替换（后写覆盖，不合并）。
//! 条目超过新鲜窗口后不再算命中，但一直保留作为失败兜底，不做淘汰。

use dashmap::DashMap;
use domain::{CacheEntry, DeviceId, LocationReport};
use std::time::Duration;

/// 默认新鲜窗口：60 秒。
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// 设备定位缓存
///
/// 使用 DashMap 分片加锁，不同设备的读写互不阻塞。
pub struct LocationCache {
    entries: DashMap<DeviceId, CacheEntry>,
    freshness_window_ms: i64,
}

impl LocationCache {
    pub fn new(freshness_window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            freshness_window_ms: i64::try_from(freshness_window.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn freshness_window_ms(&self) -> i64 {
        self.freshness_window_ms
    }

    /// 读取条目（不论新旧）。
    pub fn get(&self, device_id: &DeviceId) -> Option<CacheEntry> {
        self.entries
            .get(device_id)
            .map(|entry| entry.value().clone())
    }

    /// 读取新鲜条目：`now - stored_at <= freshness_window` 才返回。
    pub fn get_fresh(&self, device_id: &DeviceId, now_ms: i64) -> Option<CacheEntry> {
        self.get(device_id)
            .filter(|entry| entry.is_fresh(now_ms, self.freshness_window_ms))
    }

    /// 写入（替换）条目；空白 ID 不写入，返回 false。
    pub fn put(&self, device_id: &DeviceId, stored_at_ms: i64, reports: Vec<LocationReport>) -> bool {
        if device_id.is_blank() {
            return false;
        }
        self.entries
            .insert(device_id.clone(), CacheEntry::new(stored_at_ms, reports));
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new(DEFAULT_FRESHNESS_WINDOW)
    }
}
