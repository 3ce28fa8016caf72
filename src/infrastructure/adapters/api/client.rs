//! API Client - 带 Bearer 鉴权的 HTTP 客户端
//!
//! 每个请求都带 `Authorization: Bearer <token>`，token 按以下优先级解析:
//! 1. 单次调用显式传入的 key
//! 2. 运行时通过 `set_api_key` 设置的 key（立即对后续请求生效，无需重建客户端）
//! 3. 启动时从配置/环境变量解析的默认 key

use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use reqwest::{Client, Method, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::application::ports::ApiError;

/// 默认 API 地址
pub const DEFAULT_BASE_URL: &str = "https://api.sws.speechify.com";

/// API key 解析器
#[derive(Debug, Default)]
pub struct ApiKeyResolver {
    default_key: Option<String>,
    runtime_key: RwLock<Option<String>>,
}

fn non_blank(key: &str) -> Option<String> {
    let key = key.trim();
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

impl ApiKeyResolver {
    /// `default_key` 为启动时解析的默认值（环境变量/配置文件）
    pub fn new(default_key: Option<String>) -> Self {
        Self {
            default_key: default_key.as_deref().and_then(non_blank),
            runtime_key: RwLock::new(None),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 设置运行时 key；空白字符串等同于清除
    pub fn set_api_key(&self, key: &str) {
        let mut guard = self
            .runtime_key
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = non_blank(key);
        tracing::debug!(has_key = guard.is_some(), "Runtime API key updated");
    }

    pub fn clear_api_key(&self) {
        self.set_api_key("");
    }

    /// 解析本次请求使用的 key
    pub fn resolve(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(key) = explicit.and_then(non_blank) {
            return Some(key);
        }

        let runtime = self
            .runtime_key
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        runtime.or_else(|| self.default_key.clone())
    }
}

/// API 客户端配置
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// API 基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 60,
        }
    }
}

impl ApiClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// 请求体
#[derive(Debug)]
pub enum ApiBody {
    Empty,
    Json(serde_json::Value),
    /// Content-Type 由传输层设置（含 multipart boundary）
    Multipart(Form),
}

/// 一次 API 请求
#[derive(Debug)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub body: ApiBody,
    pub headers: Vec<(String, String)>,
    /// 单次调用显式指定的 key
    pub api_key: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: ApiBody::Empty,
            headers: Vec::new(),
            api_key: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post_json<B: Serialize>(path: impl Into<String>, body: &B) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(body).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let mut request = Self::new(Method::POST, path);
        request.body = ApiBody::Json(value);
        Ok(request)
    }

    pub fn post_multipart(path: impl Into<String>, form: Form) -> Self {
        let mut request = Self::new(Method::POST, path);
        request.body = ApiBody::Multipart(form);
        request
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }
}

/// API 客户端
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
    keys: Arc<ApiKeyResolver>,
}

impl ApiClient {
    /// 创建新的 API 客户端
    pub fn new(config: ApiClientConfig, keys: Arc<ApiKeyResolver>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        Ok(Self {
            client,
            config,
            keys,
        })
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn keys(&self) -> &Arc<ApiKeyResolver> {
        &self.keys
    }

    /// 设置运行时 key，对之后的所有请求生效
    pub fn set_api_key(&self, key: &str) {
        self.keys.set_api_key(key);
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// 构建带鉴权头的请求（不发送）
    pub fn build(&self, request: ApiRequest) -> Result<Request, ApiError> {
        let token = self
            .keys
            .resolve(request.api_key.as_deref())
            .ok_or(ApiError::MissingApiKey)?;

        let mut builder = self
            .client
            .request(request.method, self.url(&request.path))
            .bearer_auth(token);

        // 鉴权头只由解析器决定
        for (name, value) in request.headers {
            if name.eq_ignore_ascii_case(AUTHORIZATION.as_str()) {
                tracing::warn!(path = %request.path, "Ignoring caller-supplied Authorization header");
                continue;
            }
            builder = builder.header(name, value);
        }

        builder = match request.body {
            ApiBody::Empty => builder,
            ApiBody::Json(value) => builder.json(&value),
            ApiBody::Multipart(form) => builder.multipart(form),
        };

        builder
            .build()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))
    }

    /// 发送请求；非 2xx 返回 HttpError
    pub async fn request(&self, request: ApiRequest) -> Result<Response, ApiError> {
        let method = request.method.clone();
        let path = request.path.clone();
        let http_request = self.build(request)?;

        tracing::debug!(method = %method, path = %path, "API request");

        let response = self.client.execute(http_request).await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout
            } else if e.is_connect() {
                ApiError::NetworkError(format!("Cannot connect to API: {}", e))
            } else {
                ApiError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                method = %method,
                path = %path,
                status = status.as_u16(),
                "API request failed"
            );
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(method = %method, path = %path, status = status.as_u16(), "API response");
        Ok(response)
    }

    /// GET 并解析 JSON
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.request(ApiRequest::get(path)).await?;
        Self::decode(response).await
    }

    /// POST JSON 并解析 JSON
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let response = self.request(ApiRequest::post_json(path, body)?).await?;
        Self::decode(response).await
    }

    /// POST multipart 并解析 JSON
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: Form,
    ) -> Result<T, ApiError> {
        let response = self.request(ApiRequest::post_multipart(path, form)).await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};

    fn client(default_key: Option<&str>) -> ApiClient {
        let keys = ApiKeyResolver::new(default_key.map(str::to_string)).arc();
        ApiClient::new(ApiClientConfig::default(), keys).unwrap()
    }

    fn auth(request: &Request) -> String {
        request
            .headers()
            .get(AUTHORIZATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_config_default() {
        let config = ApiClientConfig::default();
        assert_eq!(config.base_url, "https://api.sws.speechify.com");
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_config_builder() {
        let config = ApiClientConfig::new("http://localhost:9000").with_timeout(5);
        assert_eq!(config.base_url, "http://localhost:9000");
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_key_priority() {
        let resolver = ApiKeyResolver::new(Some("env-key".to_string()));
        assert_eq!(resolver.resolve(None).as_deref(), Some("env-key"));

        resolver.set_api_key("runtime-key");
        assert_eq!(resolver.resolve(None).as_deref(), Some("runtime-key"));
        assert_eq!(resolver.resolve(Some("call-key")).as_deref(), Some("call-key"));
        assert_eq!(resolver.resolve(Some("   ")).as_deref(), Some("runtime-key"));

        resolver.clear_api_key();
        assert_eq!(resolver.resolve(None).as_deref(), Some("env-key"));
    }

    #[test]
    fn test_blank_default_is_ignored() {
        let resolver = ApiKeyResolver::new(Some("  ".to_string()));
        assert!(resolver.resolve(None).is_none());
    }

    #[test]
    fn test_every_request_has_bearer_token() {
        let client = client(Some("env-key"));
        let request = client.build(ApiRequest::get("/v1/voices")).unwrap();

        assert_eq!(request.url().as_str(), "https://api.sws.speechify.com/v1/voices");
        assert_eq!(auth(&request), "Bearer env-key");
    }

    #[test]
    fn test_key_change_applies_without_rebuilding_client() {
        let client = client(None);
        assert!(matches!(
            client.build(ApiRequest::get("/v1/voices")),
            Err(ApiError::MissingApiKey)
        ));

        client.set_api_key("widget-key");
        let request = client.build(ApiRequest::get("/v1/voices")).unwrap();
        assert_eq!(auth(&request), "Bearer widget-key");

        let request = client
            .build(ApiRequest::get("/v1/voices").with_api_key("explicit"))
            .unwrap();
        assert_eq!(auth(&request), "Bearer explicit");
    }

    #[test]
    fn test_json_body_and_extra_headers() {
        let client = client(Some("k"));
        let request = client
            .build(
                ApiRequest::post_json("v1/audio/speech", &serde_json::json!({"input": "hi"}))
                    .unwrap()
                    .with_header("X-Trace", "abc"),
            )
            .unwrap();

        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.headers().get("X-Trace").unwrap(), "abc");
        assert_eq!(
            request.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );
    }

    #[test]
    fn test_caller_authorization_header_cannot_replace_token() {
        let client = client(Some("env-key"));
        let request = client
            .build(
                ApiRequest::get("/v1/voices")
                    .with_header("Authorization", "Bearer other")
                    .with_header("authorization", "Basic Zm9vOmJhcg=="),
            )
            .unwrap();

        assert_eq!(request.headers().get_all(AUTHORIZATION).iter().count(), 1);
        assert_eq!(auth(&request), "Bearer env-key");
    }

    #[test]
    fn test_multipart_boundary_set_by_transport() {
        let client = client(Some("k"));
        let form = Form::new().text("name", "Ada");
        let request = client
            .build(ApiRequest::post_multipart("/v1/voices", form))
            .unwrap();

        let content_type = request.headers().get(CONTENT_TYPE).unwrap().to_str().unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }
}
