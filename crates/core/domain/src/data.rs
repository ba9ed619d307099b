use crate::DeviceId;
use crate::time::parse_time_to_epoch_ms;
use serde::Serialize;
use std::collections::BTreeMap;

/// 服务端确认定位成功时的状态码。
pub const STATUS_CODE_OK: i32 = 3;
/// 未确认的位置（例如最后已知位置）。
pub const STATUS_CODE_UNCONFIRMED: i32 = 0;
/// 服务端不返回精度，统一按 50 米上报。
pub const DEFAULT_ACCURACY_METERS: i64 = 50;
/// 设备没有显示名时使用的标签。
pub const DEFAULT_REPORT_LABEL: &str = "Google FMD";

/// 单次定位调用的原始结果。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocationResult {
    pub success: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: Option<String>,
}

/// 设备位置报告。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReport {
    pub recorded_at_epoch_ms: i64,
    pub label: String,
    pub observed_at_epoch_ms: i64,
    pub status_code: i32,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: i64,
    pub confidence: i32,
}

/// 缓存条目：写入时间 + 该次成功定位得到的报告。
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub stored_at_epoch_ms: i64,
    pub reports: Vec<LocationReport>,
}

impl CacheEntry {
    pub fn new(stored_at_epoch_ms: i64, reports: Vec<LocationReport>) -> Self {
        Self {
            stored_at_epoch_ms,
            reports,
        }
    }

    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.stored_at_epoch_ms)
    }

    /// 年龄不超过新鲜窗口（含边界）即为命中。
    pub fn is_fresh(&self, now_ms: i64, freshness_window_ms: i64) -> bool {
        self.age_ms(now_ms) <= freshness_window_ms
    }
}

/// 聚合结果：设备 ID → 报告列表，按设备 ID 排序；没有报告的设备不出现。
pub type AggregateResult = BTreeMap<DeviceId, Vec<LocationReport>>;

/// 将一次定位结果转换为 0 或 1 条报告。
///
/// 缺少任一坐标时不产生报告；`success=false` 但带坐标时仍上报，
/// 状态码与置信度降为 0。
pub fn reports_from_result(
    result: &LocationResult,
    display_name: Option<&str>,
) -> Vec<LocationReport> {
    let (Some(latitude), Some(longitude)) = (result.latitude, result.longitude) else {
        return Vec::new();
    };
    let observed_at = result
        .timestamp
        .as_deref()
        .map(parse_time_to_epoch_ms)
        .unwrap_or(0);
    let (status_code, confidence) = if result.success {
        (STATUS_CODE_OK, 1)
    } else {
        (STATUS_CODE_UNCONFIRMED, 0)
    };
    vec![LocationReport {
        recorded_at_epoch_ms: observed_at,
        label: display_name.unwrap_or(DEFAULT_REPORT_LABEL).to_string(),
        observed_at_epoch_ms: observed_at,
        status_code,
        latitude,
        longitude,
        accuracy_meters: DEFAULT_ACCURACY_METERS,
        confidence,
    }]
}
