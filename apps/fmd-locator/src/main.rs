//! 扇出定位：列出全部设备、并发定位、输出按设备聚合的 JSON。
//!
//! 默认只执行一轮；设置 `FMD_POLL_INTERVAL_SECONDS` 后按间隔重复执行，
//! 各轮共享同一份缓存。

use domain::AggregateResult;
use fmd_client::FmdClient;
use fmd_config::LocatorConfig;
use fmd_locate::{FanOutAggregator, FanOutError, LocationCache, LocationResolver, RetryPolicy};
use fmd_telemetry::{init_tracing, metrics};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 加载本地 .env（如存在），便于直接 cargo run 启动
    dotenvy::dotenv().ok();
    // 从环境变量加载运行配置
    let config = LocatorConfig::from_env()?;
    // 初始化结构化日志（输出到 stderr，stdout 只留给结果）
    init_tracing();

    let client = Arc::new(FmdClient::new(
        &config.server_url,
        config.email.as_deref(),
        config.password.as_deref(),
        Duration::from_secs(config.http_connect_timeout_seconds),
        Duration::from_secs(config.http_request_timeout_seconds),
    )?);

    if config.health_check {
        match client.health().await {
            Ok(status) => info!(
                target: "fmd.app",
                server = %client.base_url(),
                status = ?status,
                "health_check_passed"
            ),
            Err(err) => warn!(
                target: "fmd.app",
                server = %client.base_url(),
                error = %err,
                "health_check_failed"
            ),
        }
    }

    let resolver = Arc::new(LocationResolver::new(
        client.clone(),
        Arc::new(location_cache(&config)),
        retry_policy(&config),
    ));
    let aggregator =
        FanOutAggregator::new(client, resolver).with_max_concurrency(config.max_concurrency);

    // Ctrl-C 取消整轮扇出
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });

    let poll_interval = config.poll_interval_seconds.map(Duration::from_secs);
    let stdout = std::io::stdout();
    run_passes(&aggregator, poll_interval, cancel, &mut stdout.lock()).await?;
    Ok(())
}

/// 执行扇出：单轮模式下错误直接返回；轮询模式下目录失败只记日志，取消则正常结束。
async fn run_passes<W: Write>(
    aggregator: &FanOutAggregator,
    poll_interval: Option<Duration>,
    cancel: CancellationToken,
    out: &mut W,
) -> Result<u64, Box<dyn std::error::Error>> {
    let mut passes = 0u64;
    loop {
        match aggregator.run_until_cancelled(cancel.clone()).await {
            Ok(aggregate) => {
                passes += 1;
                writeln!(out, "{}", render(&aggregate)?)?;
                out.flush()?;
                log_counters();
            }
            Err(FanOutError::Cancelled) if poll_interval.is_some() => break,
            Err(err @ FanOutError::Directory(_)) if poll_interval.is_some() => {
                warn!(target: "fmd.app", error = %err, "poll_pass_failed");
            }
            Err(err) => return Err(err.into()),
        }

        let Some(interval) = poll_interval else {
            break;
        };
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
    Ok(passes)
}

fn log_counters() {
    let snapshot = metrics().snapshot();
    info!(
        target: "fmd.app",
        devices_listed = snapshot.devices_listed,
        cache_hits = snapshot.cache_hits,
        cache_fallbacks = snapshot.cache_fallbacks,
        locate_attempts = snapshot.locate_attempts,
        locate_retries = snapshot.locate_retries,
        locate_success = snapshot.locate_success,
        locate_failure = snapshot.locate_failure,
        fan_out_latency_ms = snapshot.fan_out_latency_ms_total,
        "pass_finished"
    );
}

fn location_cache(config: &LocatorConfig) -> LocationCache {
    LocationCache::new(Duration::from_millis(config.cache_freshness_ms))
}

fn retry_policy(config: &LocatorConfig) -> RetryPolicy {
    RetryPolicy::new(
        Duration::from_secs(config.locate_timeout_seconds),
        config.locate_max_attempts,
        Duration::from_millis(config.retry_base_delay_ms),
    )
}

fn render(aggregate: &AggregateResult) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(aggregate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use domain::{DeviceDescriptor, DeviceId, LocationResult, reports_from_result};
    use fmd_locate::{DeviceDirectory, DeviceLocator, DirectoryError, LocateError};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct OneDevice;

    #[async_trait]
    impl DeviceDirectory for OneDevice {
        async fn list(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError> {
            Ok(vec![DeviceDescriptor::new("d1", Some("Keys".to_string()))])
        }
    }

    struct Unreachable;

    #[async_trait]
    impl DeviceDirectory for Unreachable {
        async fn list(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError> {
            Err(DirectoryError::Transport("connection refused".to_string()))
        }
    }

    #[derive(Default)]
    struct CountingLocator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl DeviceLocator for CountingLocator {
        async fn locate(&self, _device_id: &DeviceId) -> Result<LocationResult, LocateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(located())
        }
    }

    fn located() -> LocationResult {
        LocationResult {
            success: true,
            latitude: Some(10.0),
            longitude: Some(20.0),
            timestamp: Some("1700000000".to_string()),
        }
    }

    fn pipeline(
        directory: Arc<dyn DeviceDirectory>,
        locator: Arc<CountingLocator>,
    ) -> FanOutAggregator {
        let resolver = Arc::new(LocationResolver::new(
            locator,
            Arc::new(location_cache(&config())),
            retry_policy(&config()),
        ));
        FanOutAggregator::new(directory, resolver)
    }

    fn config() -> LocatorConfig {
        LocatorConfig {
            server_url: "https://fmd.example.com".to_string(),
            email: None,
            password: None,
            max_concurrency: 3,
            cache_freshness_ms: 60_000,
            locate_timeout_seconds: 25,
            locate_max_attempts: 3,
            retry_base_delay_ms: 1_000,
            http_connect_timeout_seconds: 10,
            http_request_timeout_seconds: 30,
            health_check: true,
            poll_interval_seconds: None,
        }
    }

    #[test]
    fn pipeline_settings_follow_config() {
        let config = config();
        let policy = retry_policy(&config);
        assert_eq!(policy.timeout(), Duration::from_secs(25));
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.backoff_for(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(2));
        assert_eq!(location_cache(&config).freshness_window_ms(), 60_000);
    }

    #[test]
    fn output_is_keyed_by_device_id() {
        let mut aggregate = AggregateResult::new();
        aggregate.insert(DeviceId::new("d1"), reports_from_result(&located(), None));

        let rendered: serde_json::Value =
            serde_json::from_str(&render(&aggregate).expect("render")).expect("json");
        assert_eq!(rendered["d1"][0]["latitude"], 10.0);
        assert_eq!(rendered["d1"][0]["statusCode"], 3);
        assert_eq!(rendered["d1"][0]["observedAtEpochMs"], 1_700_000_000_000i64);
    }

    #[tokio::test]
    async fn single_pass_writes_one_document() {
        let locator = Arc::new(CountingLocator::default());
        let aggregator = pipeline(Arc::new(OneDevice), locator.clone());

        let mut out = Vec::new();
        let passes = run_passes(&aggregator, None, CancellationToken::new(), &mut out)
            .await
            .expect("pass");
        assert_eq!(passes, 1);
        let rendered: serde_json::Value = serde_json::from_slice(&out).expect("json");
        assert_eq!(rendered["d1"][0]["label"], "Keys");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn single_pass_directory_failure_is_an_error() {
        let aggregator = pipeline(Arc::new(Unreachable), Arc::new(CountingLocator::default()));
        let mut out = Vec::new();
        let err = run_passes(&aggregator, None, CancellationToken::new(), &mut out)
            .await
            .expect_err("directory failure");
        assert!(err.to_string().contains("connection refused"));
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn polling_reuses_cache_until_cancelled() {
        let locator = Arc::new(CountingLocator::default());
        let aggregator = pipeline(Arc::new(OneDevice), locator.clone());
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let mut out = Vec::new();
        let (passes, ()) = tokio::join!(
            run_passes(&aggregator, Some(Duration::from_secs(10)), cancel, &mut out),
            async move {
                tokio::time::sleep(Duration::from_secs(25)).await;
                trigger.cancel();
            }
        );
        // 第 0、10、20 秒各一轮，均落在 60 秒新鲜窗口内
        assert_eq!(passes.expect("polling"), 3);
        assert_eq!(locator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn polling_survives_directory_failures() {
        let aggregator = pipeline(Arc::new(Unreachable), Arc::new(CountingLocator::default()));
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();

        let mut out = Vec::new();
        let (passes, ()) = tokio::join!(
            run_passes(&aggregator, Some(Duration::from_secs(10)), cancel, &mut out),
            async move {
                tokio::time::sleep(Duration::from_secs(15)).await;
                trigger.cancel();
            }
        );
        assert_eq!(passes.expect("polling"), 0);
        assert!(out.is_empty());
    }
}
