//! 基于 reqwest 的定位服务端客户端。

use crate::error::ClientError;
use api_contract::{DeviceResponse, HealthResponse, LocateRequest, LocateResponse};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use domain::{DeviceDescriptor, DeviceId, LocationResult};
use fmd_locate::{DeviceDirectory, DeviceLocator, DirectoryError, LocateError};
use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const HEALTH_PATH: &str = "health";
const DEVICES_PATH: &str = "google/devices";
const LOCATE_PATH: &str = "google/locate";

/// 定位服务端客户端：设备目录 + 单设备定位 + 健康检查。
pub struct FmdClient {
    http: reqwest::Client,
    base_url: Url,
    authorization: Option<String>,
}

impl FmdClient {
    /// 构建客户端；`request_timeout` 限制单个请求的总耗时。
    pub fn new(
        server_url: &str,
        email: Option<&str>,
        password: Option<&str>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = normalize_base_url(server_url)?;
        // 整个请求（含读取响应体）的上限，覆盖健康检查与设备目录
        let http = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(ClientError::from_reqwest)?;
        Ok(Self {
            http,
            base_url,
            authorization: basic_auth_header(email, password),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `GET health`，返回服务端报告的状态文本。
    pub async fn health(&self) -> Result<Option<String>, ClientError> {
        let request = self.http.get(self.endpoint(HEALTH_PATH)?);
        let health: HealthResponse = self.send(request).await?;
        Ok(health.status)
    }

    /// `GET google/devices`。
    pub async fn devices(&self) -> Result<Vec<DeviceResponse>, ClientError> {
        let request = self.http.get(self.endpoint(DEVICES_PATH)?);
        self.send(request).await
    }

    /// `POST google/locate`。
    pub async fn locate_device(&self, canonic_id: &str) -> Result<LocateResponse, ClientError> {
        let request = self
            .http
            .post(self.endpoint(LOCATE_PATH)?)
            .json(&LocateRequest::new(canonic_id));
        self.send(request).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|err| ClientError::InvalidUrl(err.to_string()))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let request = match &self.authorization {
            Some(value) => request.header(AUTHORIZATION, value),
            None => request,
        };
        let response = request.send().await.map_err(ClientError::from_reqwest)?;
        let status = response.status();
        if let Some(err) = classify_status(status) {
            warn!(target: "fmd.client", status = status.as_u16(), "server_rejected_request");
            return Err(err);
        }
        let body = response.bytes().await.map_err(ClientError::from_reqwest)?;
        serde_json::from_slice(&body).map_err(|err| ClientError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl DeviceDirectory for FmdClient {
    async fn list(&self) -> Result<Vec<DeviceDescriptor>, DirectoryError> {
        let devices = self.devices().await?;
        debug!(target: "fmd.client", count = devices.len(), "devices_received");
        Ok(devices.into_iter().map(descriptor_from_response).collect())
    }
}

#[async_trait]
impl DeviceLocator for FmdClient {
    async fn locate(&self, device_id: &DeviceId) -> Result<LocationResult, LocateError> {
        let response = self.locate_device(device_id.as_str()).await?;
        debug!(
            target: "fmd.client",
            device_id = %device_id,
            ok = ?response.ok,
            latitude = ?response.latitude,
            longitude = ?response.longitude,
            "locate_response"
        );
        Ok(result_from_response(response))
    }
}

/// 保证根地址以 `/` 结尾，使相对路径拼接在其后。
pub fn normalize_base_url(raw: &str) -> Result<Url, ClientError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    };
    let url = Url::parse(&with_slash).map_err(|_| ClientError::InvalidUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl(raw.to_string()));
    }
    Ok(url)
}

/// Basic 认证头；邮箱或密码为空时不发送。
pub fn basic_auth_header(email: Option<&str>, password: Option<&str>) -> Option<String> {
    let email = email.map(str::trim).unwrap_or_default();
    let password = password.map(str::trim).unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        return None;
    }
    let encoded = STANDARD.encode(format!("{email}:{password}"));
    Some(format!("Basic {encoded}"))
}

fn classify_status(status: StatusCode) -> Option<ClientError> {
    if status.is_success() {
        return None;
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Some(ClientError::Auth(status.to_string()))
        }
        _ => Some(ClientError::Status(status.as_u16())),
    }
}

fn descriptor_from_response(device: DeviceResponse) -> DeviceDescriptor {
    DeviceDescriptor::new(device.canonic_id.unwrap_or_default(), device.name)
}

fn result_from_response(response: LocateResponse) -> LocationResult {
    LocationResult {
        success: response.ok.unwrap_or(false),
        latitude: response.latitude,
        longitude: response.longitude,
        timestamp: response.time,
    }
}
