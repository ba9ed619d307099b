//! 定位程序运行配置加载。

use std::env;
use url::Url;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 定位程序运行配置。
#[derive(Debug, Clone)]
pub struct LocatorConfig {
    pub server_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub max_concurrency: usize,
    pub cache_freshness_ms: u64,
    pub locate_timeout_seconds: u64,
    pub locate_max_attempts: u32,
    pub retry_base_delay_ms: u64,
    pub http_connect_timeout_seconds: u64,
    pub http_request_timeout_seconds: u64,
    pub health_check: bool,
    /// 轮询间隔；`None` 表示只执行一轮。
    pub poll_interval_seconds: Option<u64>,
}

impl LocatorConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_url = env::var("FMD_SERVER_URL")
            .map_err(|_| ConfigError::Missing("FMD_SERVER_URL".to_string()))?;
        if !validate_server_url(&server_url) {
            return Err(ConfigError::Invalid(
                "FMD_SERVER_URL".to_string(),
                server_url,
            ));
        }
        let email = read_optional("FMD_EMAIL");
        let password = read_optional("FMD_PASSWORD");
        let max_concurrency = read_u64_with_default("FMD_MAX_CONCURRENCY", 3)?;
        let max_concurrency = non_zero("FMD_MAX_CONCURRENCY", max_concurrency)? as usize;
        let cache_freshness_ms = read_u64_with_default("FMD_CACHE_FRESHNESS_MS", 60_000)?;
        let locate_timeout_seconds = read_u64_with_default("FMD_LOCATE_TIMEOUT_SECONDS", 25)?;
        let locate_max_attempts = read_u32_with_default("FMD_LOCATE_MAX_ATTEMPTS", 3)?;
        let locate_max_attempts =
            non_zero("FMD_LOCATE_MAX_ATTEMPTS", u64::from(locate_max_attempts))? as u32;
        let retry_base_delay_ms = read_u64_with_default("FMD_RETRY_BASE_DELAY_MS", 1_000)?;
        let http_connect_timeout_seconds =
            read_u64_with_default("FMD_HTTP_CONNECT_TIMEOUT_SECONDS", 10)?;
        let http_request_timeout_seconds =
            read_u64_with_default("FMD_HTTP_REQUEST_TIMEOUT_SECONDS", 30)?;
        let http_request_timeout_seconds =
            non_zero("FMD_HTTP_REQUEST_TIMEOUT_SECONDS", http_request_timeout_seconds)?;
        let health_check = read_bool_with_default("FMD_HEALTH_CHECK", true);
        let poll_interval_seconds = match read_u64_with_default("FMD_POLL_INTERVAL_SECONDS", 0)? {
            0 => None,
            seconds => Some(seconds),
        };

        Ok(Self {
            server_url,
            email,
            password,
            max_concurrency,
            cache_freshness_ms,
            locate_timeout_seconds,
            locate_max_attempts,
            retry_base_delay_ms,
            http_connect_timeout_seconds,
            http_request_timeout_seconds,
            health_check,
            poll_interval_seconds,
        })
    }
}

/// 校验服务端根地址：仅允许 http/https，且不能带路径、查询或片段。
///
/// 解析后空路径与 `/` 无法区分，两者都视为根地址。
pub fn validate_server_url(raw: &str) -> bool {
    let Ok(url) = Url::parse(raw.trim()) else {
        return false;
    };
    if !matches!(url.scheme(), "http" | "https") {
        return false;
    }
    if url.host_str().is_none_or(str::is_empty) {
        return false;
    }
    if url.query().is_some() || url.fragment().is_some() {
        return false;
    }
    matches!(url.path(), "" | "/")
}

fn non_zero(key: &str, value: u64) -> Result<u64, ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid(key.to_string(), value.to_string()));
    }
    Ok(value)
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_u32_with_default(key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.trim().is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
