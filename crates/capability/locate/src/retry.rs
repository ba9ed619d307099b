//! 单设备调用的超时与指数退避重试。
//!
//! 每次尝试都套一个硬超时；只有超时类失败会重试，
//! 第 n 次失败后等待 `base_delay * 2^(n-1)` 再发起下一次。

use crate::error::LocateError;
use domain::DeviceId;
use fmd_telemetry::{record_locate_attempt, record_locate_retry};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_LOCATE_TIMEOUT: Duration = Duration::from_secs(25);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// 超时 + 重试策略，不持有任何共享状态。
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    timeout: Duration,
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_LOCATE_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// `max_attempts` 包含首次调用，最小为 1。
    pub fn new(timeout: Duration, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            timeout,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 第 `attempt` 次失败后的等待时间（attempt 从 1 开始）。
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// 执行 `operation`，超时则按退避重试，其余错误直接返回。
    pub async fn call<T, F, Fut>(&self, device_id: &DeviceId, mut operation: F) -> Result<T, LocateError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LocateError>>,
    {
        let mut attempt = 1u32;
        loop {
            record_locate_attempt();
            let outcome = match tokio::time::timeout(self.timeout, operation()).await {
                Ok(outcome) => outcome,
                Err(_) => Err(LocateError::Timeout(format!(
                    "no response within {}ms",
                    self.timeout.as_millis()
                ))),
            };
            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.max_attempts {
                return Err(err);
            }
            let delay = self.backoff_for(attempt);
            warn!(
                target: "fmd.locate",
                device_id = %device_id,
                attempt = attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "locate_retry_scheduled"
            );
            record_locate_retry();
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
