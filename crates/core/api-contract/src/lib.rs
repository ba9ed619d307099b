//! 定位服务端的 JSON 线上契约。
//!
//! 所有响应字段均为可选，未知字段忽略。

use serde::{Deserialize, Deserializer, Serialize};

/// `GET health` 响应体。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthResponse {
    pub status: Option<String>,
}

/// `GET google/devices` 响应中的单台设备。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceResponse {
    pub name: Option<String>,
    pub canonic_id: Option<String>,
}

/// `POST google/locate` 请求体。
#[derive(Debug, Clone, Serialize)]
pub struct LocateRequest {
    pub canonic_id: String,
}

impl LocateRequest {
    pub fn new(canonic_id: impl Into<String>) -> Self {
        Self {
            canonic_id: canonic_id.into(),
        }
    }
}

/// `POST google/locate` 响应体。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocateResponse {
    pub ok: Option<bool>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub google_maps: Option<String>,
    /// 服务端可能返回字符串或数字，统一保留为文本。
    #[serde(default, deserialize_with = "deserialize_time")]
    pub time: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TimeField {
    Text(String),
    Number(serde_json::Number),
}

fn deserialize_time<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let field = Option::<TimeField>::deserialize(deserializer)?;
    Ok(field.map(|field| match field {
        TimeField::Text(text) => text,
        TimeField::Number(number) => number.to_string(),
    }))
}
