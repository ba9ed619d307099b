//! 定位流水线错误类型
//!
//! - `DirectoryError`：设备目录不可用，整轮扇出失败
//! - `LocateError`：单设备定位失败，仅 `Timeout` 可重试
//! - `FanOutError`：整轮扇出的终止原因

/// 设备目录错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory transport error: {0}")]
    Transport(String),
    #[error("directory auth error: {0}")]
    Auth(String),
    #[error("directory response malformed: {0}")]
    Malformed(String),
}

/// 单设备定位错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum LocateError {
    #[error("locate timeout: {0}")]
    Timeout(String),
    #[error("locate transport error: {0}")]
    Transport(String),
    #[error("locate auth error: {0}")]
    Auth(String),
    #[error("locate response malformed: {0}")]
    Malformed(String),
}

impl LocateError {
    /// 只有超时允许重试。
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// 扇出整轮失败。
#[derive(Debug, thiserror::Error)]
pub enum FanOutError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
    #[error("fan-out cancelled")]
    Cancelled,
}
