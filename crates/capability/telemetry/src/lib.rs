//! 追踪初始化、运行 ID 与进程级计数器。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 计数器快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub fan_out_runs: u64,
    pub fan_out_failures: u64,
    pub devices_listed: u64,
    pub devices_skipped_blank: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_fallbacks: u64,
    pub cache_stores: u64,
    pub locate_attempts: u64,
    pub locate_retries: u64,
    pub locate_success: u64,
    pub locate_failure: u64,
    pub fan_out_latency_ms_total: u64,
    pub fan_out_latency_ms_count: u64,
}

/// 进程级计数器。
pub struct TelemetryMetrics {
    fan_out_runs: AtomicU64,
    fan_out_failures: AtomicU64,
    devices_listed: AtomicU64,
    devices_skipped_blank: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_fallbacks: AtomicU64,
    cache_stores: AtomicU64,
    locate_attempts: AtomicU64,
    locate_retries: AtomicU64,
    locate_success: AtomicU64,
    locate_failure: AtomicU64,
    fan_out_latency_ms_total: AtomicU64,
    fan_out_latency_ms_count: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            fan_out_runs: AtomicU64::new(0),
            fan_out_failures: AtomicU64::new(0),
            devices_listed: AtomicU64::new(0),
            devices_skipped_blank: AtomicU64::new(0),
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            cache_fallbacks: AtomicU64::new(0),
            cache_stores: AtomicU64::new(0),
            locate_attempts: AtomicU64::new(0),
            locate_retries: AtomicU64::new(0),
            locate_success: AtomicU64::new(0),
            locate_failure: AtomicU64::new(0),
            fan_out_latency_ms_total: AtomicU64::new(0),
            fan_out_latency_ms_count: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            fan_out_runs: self.fan_out_runs.load(Ordering::Relaxed),
            fan_out_failures: self.fan_out_failures.load(Ordering::Relaxed),
            devices_listed: self.devices_listed.load(Ordering::Relaxed),
            devices_skipped_blank: self.devices_skipped_blank.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_fallbacks: self.cache_fallbacks.load(Ordering::Relaxed),
            cache_stores: self.cache_stores.load(Ordering::Relaxed),
            locate_attempts: self.locate_attempts.load(Ordering::Relaxed),
            locate_retries: self.locate_retries.load(Ordering::Relaxed),
            locate_success: self.locate_success.load(Ordering::Relaxed),
            locate_failure: self.locate_failure.load(Ordering::Relaxed),
            fan_out_latency_ms_total: self.fan_out_latency_ms_total.load(Ordering::Relaxed),
            fan_out_latency_ms_count: self.fan_out_latency_ms_count.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局计数器实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info，可用 RUST_LOG 覆盖）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init();
}

/// 生成一轮扇出的 run_id。
pub fn new_run_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录扇出轮次。
pub fn record_fan_out_run() {
    metrics().fan_out_runs.fetch_add(1, Ordering::Relaxed);
}

/// 记录扇出失败（设备目录不可用）。
pub fn record_fan_out_failure() {
    metrics().fan_out_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录目录返回的设备数。
pub fn record_devices_listed(count: u64) {
    metrics().devices_listed.fetch_add(count, Ordering::Relaxed);
}

/// 记录被跳过的空白设备 ID。
pub fn record_device_skipped_blank() {
    metrics()
        .devices_skipped_blank
        .fetch_add(1, Ordering::Relaxed);
}

pub fn record_cache_hit() {
    metrics().cache_hits.fetch_add(1, Ordering::Relaxed);
}

pub fn record_cache_miss() {
    metrics().cache_misses.fetch_add(1, Ordering::Relaxed);
}

/// 记录失败后回退到旧缓存的次数。
pub fn record_cache_fallback() {
    metrics().cache_fallbacks.fetch_add(1, Ordering::Relaxed);
}

pub fn record_cache_store() {
    metrics().cache_stores.fetch_add(1, Ordering::Relaxed);
}

/// 记录一次定位调用（含重试）。
pub fn record_locate_attempt() {
    metrics().locate_attempts.fetch_add(1, Ordering::Relaxed);
}

pub fn record_locate_retry() {
    metrics().locate_retries.fetch_add(1, Ordering::Relaxed);
}

pub fn record_locate_success() {
    metrics().locate_success.fetch_add(1, Ordering::Relaxed);
}

/// 记录重试耗尽或不可重试的定位失败。
pub fn record_locate_failure() {
    metrics().locate_failure.fetch_add(1, Ordering::Relaxed);
}

/// 记录一轮扇出耗时（毫秒）。
pub fn record_fan_out_latency_ms(latency_ms: u64) {
    let metrics = metrics();
    metrics
        .fan_out_latency_ms_total
        .fetch_add(latency_ms, Ordering::Relaxed);
    metrics
        .fan_out_latency_ms_count
        .fetch_add(1, Ordering::Relaxed);
}
