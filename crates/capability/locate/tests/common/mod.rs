#![allow(dead_code)]

use async_trait::async_trait;
use domain::{DeviceDescriptor, DeviceId, LocationResult};
use fmd_locate::{Clock, DeviceDirectory, DeviceLocator, DirectoryError, LocateError};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// 可手动推进的时钟。
pub struct ManualClock {
    now_ms: AtomicI64,
}

impl ManualClock {
    pub fn new(now_ms: i64) -> Self {
        Self {
            now_ms: AtomicI64::new(now_ms),
        }
    }

    pub fn advance_ms(&self, delta_ms: i64) {
        self.now_ms.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

/// 单台设备的脚本化行为。
#[derive(Clone)]
pub enum Behavior {
    Respond(LocationResult),
    Fail(LocateError),
    /// 永不返回，由超时策略打断。
    Hang,
    /// 等待一段时间后返回。
    Slow(Duration, LocationResult),
}

/// 按设备 ID 返回脚本化结果的定位器，记录调用次数与并发峰值。
pub struct ScriptedLocator {
    behaviors: Mutex<HashMap<String, Behavior>>,
    calls: Mutex<HashMap<String, Vec<Instant>>>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl ScriptedLocator {
    pub fn new() -> Self {
        Self {
            behaviors: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            in_flight: AtomicUsize::new(0),
            peak_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with(self, device_id: &str, behavior: Behavior) -> Self {
        self.set(device_id, behavior);
        self
    }

    pub fn set(&self, device_id: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .expect("behaviors")
            .insert(device_id.to_string(), behavior);
    }

    pub fn calls(&self, device_id: &str) -> usize {
        self.call_instants(device_id).len()
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("calls").values().map(Vec::len).sum()
    }

    pub fn call_instants(&self, device_id: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .expect("calls")
            .get(device_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// 在途计数守卫：future 被丢弃（含取消）时同样递减。
struct InFlightGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl DeviceLocator for ScriptedLocator {
    async fn locate(&self, device_id: &DeviceId) -> Result<LocationResult, LocateError> {
        self.calls
            .lock()
            .expect("calls")
            .entry(device_id.as_str().to_string())
            .or_default()
            .push(Instant::now());
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlightGuard {
            in_flight: &self.in_flight,
        };

        let behavior = self
            .behaviors
            .lock()
            .expect("behaviors")
            .get(device_id.as_str())
            .cloned()
            .unwrap_or(Behavior::Fail(LocateError::Transport("unknown device".to_string())));
        match behavior {
            Behavior::Respond(result) => Ok(result),
            Behavior::Fail(err) => Err(err),
            Behavior::Hang => std::future::pending().await,
            Behavior::Slow(delay, result) => {
                tokio::time::sleep(delay).await;
                Ok(result)
            }
        }
    }
}

/// 固定返回的设备目录。
pub struct StaticDirectory {
    outcome: Result<Vec<DeviceDescriptor>, DirectoryError>,
    calls: AtomicUsize,
}

impl StaticDirectory {
    pub fn devices(ids: &[&str]) -> Self {
        Self {
            outcome: Ok(ids
                .iter()
                .map(|id| DeviceDescriptor::new(*id, None))
                .collect()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: DirectoryError) -> Self {
        Self {
            outcome: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceDirectory for StaticDirectory {
    async fn list(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}

pub fn located(latitude: f64, longitude: f64) -> LocationResult {
    LocationResult {
        success: true,
        latitude: Some(latitude),
        longitude: Some(longitude),
        timestamp: Some("1700000000".to_string()),
    }
}

pub fn not_located() -> LocationResult {
    LocationResult {
        success: false,
        latitude: None,
        longitude: None,
        timestamp: None,
    }
}

pub fn timeout() -> LocateError {
    LocateError::Timeout("forced timeout".to_string())
}
