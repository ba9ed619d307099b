//! HTTP 客户端错误及其到协作方错误的映射。

use fmd_locate::{DirectoryError, LocateError};

/// 访问定位服务端时的错误。
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClientError {
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unauthorized: {0}")]
    Auth(String),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("invalid server url: {0}")]
    InvalidUrl(String),
}

impl ClientError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout(err.to_string());
        }
        if err.is_decode() {
            return Self::Malformed(err.to_string());
        }
        Self::Transport(err.to_string())
    }
}

impl From<ClientError> for DirectoryError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Auth(message) => DirectoryError::Auth(message),
            ClientError::Malformed(message) => DirectoryError::Malformed(message),
            other => DirectoryError::Transport(other.to_string()),
        }
    }
}

impl From<ClientError> for LocateError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Timeout(message) => LocateError::Timeout(message),
            ClientError::Auth(message) => LocateError::Auth(message),
            ClientError::Malformed(message) => LocateError::Malformed(message),
            other => LocateError::Transport(other.to_string()),
        }
    }
}
