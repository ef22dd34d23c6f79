//! WHO ICD-11 API 客户端
//!
//! 负责OAuth2客户端凭证认证和节点获取，实现爬虫所需的 [`NodeSource`] 能力。

// 标准库导入
use std::time::Duration;

// 第三方crate导入
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, AUTHORIZATION};
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

// 本地模块导入
use crate::api_constants::{crawler_config, icd_api};
use crate::crawler::NodeSource;
use crate::error::Result;
use crate::icd_error;
use crate::node::{Node, NodeId};

/// ICD API 连接配置
#[derive(Debug, Clone)]
pub struct IcdApiConfig {
    /// OAuth2 客户端ID
    pub client_id: String,
    /// OAuth2 客户端密钥
    pub client_secret: String,
    /// 令牌端点
    pub token_endpoint: String,
    /// API 根地址
    pub base_url: String,
    /// 发布版本
    pub release_id: String,
    /// 线性化名称
    pub linearization: String,
    /// API-Version 请求头
    pub api_version: String,
    /// Accept-Language 请求头
    pub accept_language: String,
    /// 请求超时时间（秒）
    pub timeout: u64,
}

impl IcdApiConfig {
    /// 使用凭证和默认端点创建配置
    pub fn new(client_id: &str, client_secret: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            token_endpoint: icd_api::TOKEN_ENDPOINT.to_string(),
            base_url: icd_api::BASE_URL.to_string(),
            release_id: icd_api::DEFAULT_RELEASE_ID.to_string(),
            linearization: icd_api::DEFAULT_LINEARIZATION.to_string(),
            api_version: icd_api::API_VERSION.to_string(),
            accept_language: icd_api::ACCEPT_LANGUAGE.to_string(),
            timeout: crawler_config::DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// 从环境变量读取凭证（支持 `.env` 文件）
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let client_id = read_env(icd_api::CLIENT_ID_ENV)?;
        let client_secret = read_env(icd_api::CLIENT_SECRET_ENV)?;
        Ok(Self::new(&client_id, &client_secret))
    }

    /// 设置发布版本
    pub fn release(mut self, release_id: &str) -> Self {
        self.release_id = release_id.to_string();
        self
    }

    /// 设置线性化名称
    pub fn linearization(mut self, linearization: &str) -> Self {
        self.linearization = linearization.to_string();
        self
    }

    /// 设置请求超时
    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// 线性化根节点地址
    pub fn root_uri(&self) -> String {
        format!(
            "{}/release/11/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.release_id,
            self.linearization
        )
    }

    /// 单个节点地址
    pub fn node_uri(&self, id: &NodeId) -> String {
        format!("{}/{}", self.root_uri(), id)
    }

    /// 校验端点地址
    fn validate(&self) -> Result<()> {
        for (field, value) in [("token_endpoint", &self.token_endpoint), ("base_url", &self.base_url)] {
            Url::parse(value).map_err(|e| icd_error!(config, field, format!("{}: {}", value, e)))?;
        }
        if self.client_id.is_empty() || self.client_secret.is_empty() {
            return Err(icd_error!(config, "credentials", "客户端ID和密钥不能为空"));
        }
        Ok(())
    }
}

fn read_env(name: &str) -> Result<String> {
    std::env::var(name).map_err(|_| icd_error!(config, name, "环境变量未设置"))
}

/// 令牌端点响应
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// 缓存的访问令牌
#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now + chrono::Duration::seconds(icd_api::TOKEN_EXPIRY_MARGIN_SECONDS)
    }
}

/// ICD-11 API 客户端
pub struct IcdClient {
    config: IcdApiConfig,
    client: Client,
    token: Mutex<Option<AccessToken>>,
}

impl IcdClient {
    /// 创建客户端
    pub fn new(config: IcdApiConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self {
            config,
            client,
            token: Mutex::new(None),
        })
    }

    /// 获取有效的访问令牌，必要时重新申请
    async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_valid(Utc::now())) {
            return Ok(token.value.clone());
        }

        let token = self.request_token().await?;
        let value = token.value.clone();
        *cached = Some(token);
        Ok(value)
    }

    /// 通过客户端凭证流程申请令牌
    async fn request_token(&self) -> Result<AccessToken> {
        debug!("申请访问令牌: {}", self.config.token_endpoint);

        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", icd_api::SCOPE),
            ("grant_type", icd_api::GRANT_TYPE),
        ];

        let response = self
            .client
            .post(&self.config.token_endpoint)
            .form(&params)
            .send()
            .await
            .map_err(|e| icd_error!(auth, format!("令牌请求失败: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(icd_error!(auth, format!("令牌端点返回 {}: {}", status, body)));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| icd_error!(auth, format!("令牌响应解析失败: {}", e)))?;

        let lifetime = token
            .expires_in
            .unwrap_or(icd_api::DEFAULT_TOKEN_LIFETIME_SECONDS);
        info!("🔑 已获取访问令牌，有效期 {} 秒", lifetime);

        Ok(AccessToken {
            value: token.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(lifetime),
        })
    }

    /// 构造API请求头
    async fn headers(&self) -> Result<HeaderMap> {
        let token = self.access_token().await?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| icd_error!(auth, format!("令牌包含非法字符: {}", e)))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&self.config.accept_language)
                .map_err(|e| icd_error!(config, "accept_language", e))?,
        );
        headers.insert(
            "api-version",
            HeaderValue::from_str(&self.config.api_version)
                .map_err(|e| icd_error!(config, "api_version", e))?,
        );
        Ok(headers)
    }

    /// 获取并解析一个节点
    async fn get_node_at(&self, uri: &str) -> Result<Node> {
        let response = self
            .client
            .get(uri)
            .headers(self.headers().await?)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(icd_error!(network, format!("{} 返回 {}", uri, status), status.as_u16()));
        }

        match response.json::<Value>().await? {
            Value::Object(node) => Ok(node),
            other => Err(icd_error!(schema, uri, "<body>", format!("响应不是JSON对象: {}", type_name(&other)))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl NodeSource for IcdClient {
    async fn fetch_root(&self) -> Result<Node> {
        let uri = self.config.root_uri();
        info!("📥 获取线性化根节点: {}", uri);
        self.get_node_at(&uri).await
    }

    async fn fetch_node(&self, id: &NodeId) -> Result<Node> {
        self.get_node_at(&self.config.node_uri(id)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = IcdApiConfig::new("id", "secret");
        assert_eq!(config.token_endpoint, "https://icdaccessmanagement.who.int/connect/token");
        assert_eq!(config.release_id, "2022-02");
        assert_eq!(config.linearization, "mms");
        assert_eq!(config.api_version, "v2");
        assert_eq!(config.accept_language, "en");
        assert_eq!(config.timeout, 30);
    }

    #[test]
    fn test_uris() {
        let config = IcdApiConfig::new("id", "secret").release("2024-01");
        assert_eq!(config.root_uri(), "https://id.who.int/icd/release/11/2024-01/mms");
        assert_eq!(
            config.node_uri(&NodeId::from("1435254666")),
            "https://id.who.int/icd/release/11/2024-01/mms/1435254666"
        );
    }

    #[test]
    fn test_config_builder() {
        let config = IcdApiConfig::new("id", "secret")
            .linearization("icf")
            .timeout(5);
        assert_eq!(config.linearization, "icf");
        assert_eq!(config.timeout, 5);
    }

    #[test]
    fn test_config_validation() {
        assert!(IcdApiConfig::new("id", "secret").validate().is_ok());
        assert!(IcdApiConfig::new("", "secret").validate().is_err());

        let mut config = IcdApiConfig::new("id", "secret");
        config.base_url = "not a url".to_string();
        assert!(IcdClient::new(config).is_err());
    }

    #[test]
    fn test_token_validity_margin() {
        let now = Utc::now();
        let fresh = AccessToken {
            value: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(3600),
        };
        let expiring = AccessToken {
            value: "t".to_string(),
            expires_at: now + chrono::Duration::seconds(10),
        };
        assert!(fresh.is_valid(now));
        assert!(!expiring.is_valid(now));
    }

    #[test]
    fn test_token_response_without_expiry() {
        let token: TokenResponse =
            serde_json::from_str(r#"{"access_token": "abc", "token_type": "Bearer"}"#).unwrap();
        assert_eq!(token.access_token, "abc");
        assert!(token.expires_in.is_none());
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host_fails() {
        let mut config = IcdApiConfig::new("id", "secret").timeout(2);
        config.token_endpoint = "http://127.0.0.1:9/connect/token".to_string();
        let client = IcdClient::new(config).unwrap();

        let result = client.fetch_node(&NodeId::from("1")).await;
        assert!(matches!(result, Err(crate::error::Icd11Error::Authentication { .. })));
    }
}
