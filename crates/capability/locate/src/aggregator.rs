//! 扇出聚合
//!
//! 列出全部设备后按目录顺序逐个提交解析任务，`Semaphore` 限制同时在途的
//! 解析数量：先拿到许可再 spawn，任务结束时许可随之释放。
//! 单台设备失败只会导致该设备缺席；目录失败或整轮取消才会终止本轮。

use crate::error::FanOutError;
use crate::resolver::LocationResolver;
use crate::traits::DeviceDirectory;
use domain::{AggregateResult, DeviceId, LocationReport};
use fmd_telemetry::{
    new_run_id, record_device_skipped_blank, record_devices_listed, record_fan_out_failure,
    record_fan_out_latency_ms, record_fan_out_run,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// 默认同时在途的设备解析数。
pub const DEFAULT_MAX_CONCURRENCY: usize = 3;

/// 扇出聚合器。
pub struct FanOutAggregator {
    directory: Arc<dyn DeviceDirectory>,
    resolver: Arc<LocationResolver>,
    max_concurrency: usize,
}

impl FanOutAggregator {
    pub fn new(directory: Arc<dyn DeviceDirectory>, resolver: Arc<LocationResolver>) -> Self {
        Self {
            directory,
            resolver,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// 设置并发上限（最小为 1）。
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// 执行一轮扇出。
    pub async fn run(&self) -> Result<AggregateResult, FanOutError> {
        self.run_until_cancelled(CancellationToken::new()).await
    }

    /// 执行一轮扇出；`cancel` 触发后中止所有在途任务并返回 `Cancelled`。
    pub async fn run_until_cancelled(
        &self,
        cancel: CancellationToken,
    ) -> Result<AggregateResult, FanOutError> {
        let run_id = new_run_id();
        let span = tracing::info_span!("fan_out", run_id = %run_id);
        self.fan_out(cancel).instrument(span).await
    }

    async fn fan_out(&self, cancel: CancellationToken) -> Result<AggregateResult, FanOutError> {
        record_fan_out_run();
        let started_at = Instant::now();

        let listed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FanOutError::Cancelled),
            listed = self.directory.list() => listed,
        };
        let devices = match listed {
            Ok(devices) => devices,
            Err(err) => {
                record_fan_out_failure();
                warn!(target: "fmd.locate", error = %err, "device_directory_failed");
                return Err(FanOutError::Directory(err));
            }
        };
        record_devices_listed(devices.len() as u64);
        info!(
            target: "fmd.locate",
            devices = devices.len(),
            max_concurrency = self.max_concurrency,
            "devices_listed"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));
        let mut tasks: JoinSet<(DeviceId, Vec<LocationReport>)> = JoinSet::new();
        for device in devices {
            if device.id.is_blank() {
                record_device_skipped_blank();
                debug!(target: "fmd.locate", name = ?device.display_name, "device_skipped_blank");
                continue;
            }
            let acquired = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(FanOutError::Cancelled);
                }
                acquired = Arc::clone(&semaphore).acquire_owned() => acquired,
            };
            // 信号量只在本函数内持有，不会被关闭
            let Ok(permit) = acquired else {
                break;
            };
            let resolver = Arc::clone(&self.resolver);
            tasks.spawn(
                async move {
                    let _permit = permit;
                    resolver.resolve(&device).await
                }
                .in_current_span(),
            );
        }

        let mut aggregate = AggregateResult::new();
        loop {
            let joined = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(FanOutError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            match joined {
                Some(Ok((device_id, reports))) => merge_reports(&mut aggregate, device_id, reports),
                Some(Err(err)) => {
                    warn!(target: "fmd.locate", error = %err, "device_task_failed");
                }
                None => break,
            }
        }

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        record_fan_out_latency_ms(elapsed_ms);
        info!(
            target: "fmd.locate",
            devices_with_reports = aggregate.len(),
            elapsed_ms = elapsed_ms,
            "fan_out_completed"
        );
        Ok(aggregate)
    }
}

/// 合并一台设备的结果：空白 ID 与空报告跳过，同一 ID 多次出现时累加。
pub fn merge_reports(aggregate: &mut AggregateResult, device_id: DeviceId, reports: Vec<LocationReport>) {
    if device_id.is_blank() || reports.is_empty() {
        return;
    }
    aggregate.entry(device_id).or_default().extend(reports);
}
