pub mod data;
pub mod time;

pub use data::{
    AggregateResult, CacheEntry, DEFAULT_ACCURACY_METERS, DEFAULT_REPORT_LABEL, LocationReport,
    LocationResult, STATUS_CODE_OK, STATUS_CODE_UNCONFIRMED, reports_from_result,
};
pub use time::parse_time_to_epoch_ms;

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// 设备标识：去除首尾空白后的不透明字符串。
///
/// 空白 ID 允许构造（目录可能返回空值），但不会进入缓存或聚合结果。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 是否为空白 ID（去空白后为空）。
    pub fn is_blank(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DeviceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for DeviceId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// 设备目录中的一台设备。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub id: DeviceId,
    pub display_name: Option<String>,
}

impl DeviceDescriptor {
    pub fn new(id: impl Into<DeviceId>, display_name: Option<String>) -> Self {
        Self {
            id: id.into(),
            display_name,
        }
    }
}
