// ==========================================
// 营销对账系统 - REST 记录存储
// ==========================================
// 后端约定:
// - Firebase RTDB: {base}/{collection}.json, {base}/{collection}/{id}.json
//   POST 返回 {"name": "<id>"}
// - Supabase (PostgREST): {base}/rest/v1/{collection}?id=eq.{id}
//   需 apikey + Authorization 头，POST 使用 Prefer: return=representation
// ==========================================

use crate::domain::types::BackendKind;
use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::store::RecordStore;
use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// 单个远端端点的连接参数
#[derive(Debug, Clone)]
pub struct RemoteSettings {
    pub base_url: String,
    pub backend: BackendKind,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl RemoteSettings {
    pub fn new(base_url: impl Into<String>, backend: BackendKind) -> Self {
        Self {
            base_url: base_url.into(),
            backend,
            api_key: None,
            timeout: Duration::from_millis(10_000),
            max_attempts: 1,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

#[derive(Clone)]
pub struct RestRecordStore {
    settings: RemoteSettings,
    http: reqwest::Client,
}

impl RestRecordStore {
    pub fn new(settings: RemoteSettings) -> RemoteResult<Self> {
        if settings.base_url.trim().is_empty() {
            return Err(RemoteError::NotConfigured("base_url 为空".to_string()));
        }
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { settings, http })
    }

    pub fn backend(&self) -> BackendKind {
        self.settings.backend
    }

    fn base(&self) -> &str {
        self.settings.base_url.trim().trim_end_matches('/')
    }

    /// 集合地址
    pub fn collection_url(&self, collection: &str) -> String {
        match self.settings.backend {
            BackendKind::Firebase => format!("{}/{}.json", self.base(), collection),
            BackendKind::Supabase => format!("{}/rest/v1/{}", self.base(), collection),
        }
    }

    /// 单条记录地址
    pub fn record_url(&self, collection: &str, id: &str) -> String {
        match self.settings.backend {
            BackendKind::Firebase => format!("{}/{}/{}.json", self.base(), collection, id),
            BackendKind::Supabase => {
                format!("{}/rest/v1/{}?id=eq.{}", self.base(), collection, id)
            }
        }
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut builder = self.http.request(method, url);
        if let Some(key) = self.settings.api_key.as_deref() {
            builder = match self.settings.backend {
                BackendKind::Firebase => builder.query(&[("auth", key)]),
                BackendKind::Supabase => builder
                    .header("apikey", key)
                    .header("Authorization", format!("Bearer {}", key)),
            };
        }
        builder
    }

    /// 按配置重试（max_attempts 至少为 1）
    async fn with_retry<T, F, Fut>(&self, what: &str, op: F) -> RemoteResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "远端请求失败，准备重试: {} (第{}/{}次): {}",
                        what,
                        attempt,
                        attempts,
                        e
                    );
                    tokio::time::sleep(self.settings.retry_backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send(&self, builder: RequestBuilder, url: &str) -> RemoteResult<reqwest::Response> {
        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RemoteError::UnexpectedStatus {
                status,
                url: url.to_string(),
            });
        }
        Ok(response)
    }

    async fn write(
        &self,
        method: Method,
        url: String,
        body: Option<&Value>,
    ) -> RemoteResult<()> {
        let url = url.as_str();
        let method = &method;
        self.with_retry(url, move || async move {
            let mut builder = self.request(method.clone(), url);
            if let Some(body) = body {
                builder = builder.json(body);
            }
            self.send(builder, url).await.map(|_| ())
        })
        .await
    }
}

/// 解析新建响应中的远端ID
pub fn parse_created_id(backend: BackendKind, body: &Value) -> RemoteResult<String> {
    let id = match backend {
        BackendKind::Firebase => body.get("name").and_then(Value::as_str).map(str::to_string),
        BackendKind::Supabase => {
            let row = match body {
                Value::Array(rows) => rows.first(),
                other => Some(other),
            };
            row.and_then(|r| r.get("id")).and_then(|id| match id {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        }
    };
    id.ok_or_else(|| RemoteError::Decode(format!("新建响应缺少ID: {}", body)))
}

#[async_trait]
impl RecordStore for RestRecordStore {
    async fn fetch_collection(&self, collection: &str) -> RemoteResult<Value> {
        let url = self.collection_url(collection);
        let url = url.as_str();
        self.with_retry(url, move || async move {
            let mut builder = self.request(Method::GET, url);
            if self.settings.backend == BackendKind::Supabase {
                builder = builder.query(&[("select", "*")]);
            }
            let response = self.send(builder, url).await?;
            if response.status() == StatusCode::NO_CONTENT {
                return Ok(Value::Null);
            }
            Ok(response.json::<Value>().await?)
        })
        .await
    }

    async fn create(&self, collection: &str, payload: &Value) -> RemoteResult<String> {
        let url = self.collection_url(collection);
        let url = url.as_str();
        let backend = self.settings.backend;
        self.with_retry(url, move || async move {
            let mut builder = self.request(Method::POST, url).json(payload);
            if backend == BackendKind::Supabase {
                builder = builder.header("Prefer", "return=representation");
            }
            let body = self.send(builder, url).await?.json::<Value>().await?;
            parse_created_id(backend, &body)
        })
        .await
    }

    async fn update(&self, collection: &str, id: &str, patch: &Value) -> RemoteResult<()> {
        let url = self.record_url(collection, id);
        self.write(Method::PATCH, url, Some(patch)).await
    }

    async fn replace(&self, collection: &str, id: &str, payload: &Value) -> RemoteResult<()> {
        let url = self.record_url(collection, id);
        // PostgREST 的 PUT 要求主键出现在请求体中
        let body = match (self.settings.backend, payload) {
            (BackendKind::Supabase, Value::Object(map)) if !map.contains_key("id") => {
                let mut map = map.clone();
                map.insert("id".to_string(), Value::String(id.to_string()));
                Value::Object(map)
            }
            _ => payload.clone(),
        };
        self.write(Method::PUT, url, Some(&body)).await
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()> {
        let url = self.record_url(collection, id);
        self.write(Method::DELETE, url, None).await
    }
}
