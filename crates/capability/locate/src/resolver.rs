//! 单设备定位：缓存命中 → 直接返回；未命中 → 超时重试调用定位器；
//! 成功写缓存；失败回退到任意旧缓存，没有缓存则返回空。

use crate::cache::LocationCache;
use crate::retry::RetryPolicy;
use crate::traits::{Clock, DeviceLocator, SystemClock};
use domain::{DeviceDescriptor, DeviceId, LocationReport, reports_from_result};
use fmd_telemetry::{
    record_cache_fallback, record_cache_hit, record_cache_miss, record_cache_store,
    record_locate_failure, record_locate_success,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 单设备解析器，永不向调用方返回错误。
pub struct LocationResolver {
    locator: Arc<dyn DeviceLocator>,
    cache: Arc<LocationCache>,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl LocationResolver {
    pub fn new(locator: Arc<dyn DeviceLocator>, cache: Arc<LocationCache>, policy: RetryPolicy) -> Self {
        Self {
            locator,
            cache,
            policy,
            clock: Arc::new(SystemClock::new()),
        }
    }

    /// 替换时间源（测试中控制缓存年龄）。
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(&self) -> &Arc<LocationCache> {
        &self.cache
    }

    pub async fn resolve(&self, device: &DeviceDescriptor) -> (DeviceId, Vec<LocationReport>) {
        let device_id = device.id.clone();
        if device_id.is_blank() {
            return (device_id, Vec::new());
        }

        let started_at_ms = self.clock.now_epoch_ms();
        if let Some(entry) = self.cache.get_fresh(&device_id, started_at_ms) {
            record_cache_hit();
            debug!(
                target: "fmd.locate",
                device_id = %device_id,
                age_ms = entry.age_ms(started_at_ms),
                reports = entry.reports.len(),
                "cache_hit"
            );
            return (device_id, entry.reports);
        }
        record_cache_miss();
        debug!(target: "fmd.locate", device_id = %device_id, "cache_miss");

        let outcome = self
            .policy
            .call(&device_id, || self.locator.locate(&device_id))
            .await;
        match outcome {
            Ok(result) => {
                let reports = reports_from_result(&result, device.display_name.as_deref());
                record_locate_success();
                info!(
                    target: "fmd.locate",
                    device_id = %device_id,
                    ok = result.success,
                    latitude = ?result.latitude,
                    longitude = ?result.longitude,
                    reports = reports.len(),
                    "locate_succeeded"
                );
                // 空结果同样覆盖旧条目
                self.cache.put(&device_id, started_at_ms, reports.clone());
                record_cache_store();
                (device_id, reports)
            }
            Err(err) => {
                record_locate_failure();
                match self.cache.get(&device_id) {
                    Some(entry) => {
                        record_cache_fallback();
                        warn!(
                            target: "fmd.locate",
                            device_id = %device_id,
                            age_ms = entry.age_ms(self.clock.now_epoch_ms()),
                            reports = entry.reports.len(),
                            error = %err,
                            "cache_fallback"
                        );
                        (device_id, entry.reports)
                    }
                    None => {
                        warn!(
                            target: "fmd.locate",
                            device_id = %device_id,
                            error = %err,
                            "locate_failed_without_cache"
                        );
                        (device_id, Vec::new())
                    }
                }
            }
        }
    }
}
