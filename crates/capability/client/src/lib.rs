//! # 定位服务端 HTTP 客户端
//!
//! `FmdClient` 同时实现 `DeviceDirectory` 与 `DeviceLocator`：
//!
//! - `GET health`：健康检查
//! - `GET google/devices`：设备目录
//! - `POST google/locate`：单设备定位
//!
//! 请求统一携带 Basic 认证头（凭据齐全时），HTTP 错误按
//! 超时 / 认证 / 状态码 / 解析失败 / 传输失败分类后映射为协作方错误。

pub mod client;
pub mod error;

pub use client::{FmdClient, basic_auth_header, normalize_base_url};
pub use error::ClientError;
