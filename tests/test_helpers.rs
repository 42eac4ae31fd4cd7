// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 进程内远端存储、内存数据库、AppState 组装
// ==========================================

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;
use tempfile::NamedTempFile;

use mkt_recon::app::AppState;
use mkt_recon::config::{defaults, AppConfig, SourceConfig};
use mkt_recon::domain::types::BackendKind;
use mkt_recon::remote::{RecordStore, RemoteError, RemoteResult, StoreRegistry};
use mkt_recon::repository::merge_top_level;

pub const MARKETING: &str = defaults::MARKETING_COLLECTION;
pub const ORDERS: &str = defaults::ORDERS_COLLECTION;
pub const AUDITS: &str = defaults::AUDIT_COLLECTION;

// ==========================================
// FakeStore - 进程内远端存储
// ==========================================
// 行为对齐 Firebase RTDB: 集合返回对象集合，新建返回推送键
#[derive(Default)]
pub struct FakeStore {
    data: Mutex<HashMap<String, BTreeMap<String, Value>>>,
    offline: AtomicBool,
    next_id: AtomicUsize,
    writes: AtomicUsize,
    raw_bodies: Mutex<HashMap<String, Value>>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// 模拟断网（所有调用失败）
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn seed(&self, collection: &str, id: &str, value: Value) {
        self.data
            .lock()
            .unwrap()
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), value);
    }

    /// 固定某集合的原始读取负载（如带空洞的数组）
    pub fn set_raw_body(&self, collection: &str, body: Value) {
        self.raw_bodies
            .lock()
            .unwrap()
            .insert(collection.to_string(), body);
    }

    pub fn get(&self, collection: &str, id: &str) -> Option<Value> {
        self.data
            .lock()
            .unwrap()
            .get(collection)
            .and_then(|c| c.get(id).cloned())
    }

    pub fn records(&self, collection: &str) -> Vec<(String, Value)> {
        self.data
            .lock()
            .unwrap()
            .get(collection)
            .map(|c| c.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default()
    }

    /// 成功写入次数
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn ensure_online(&self) -> RemoteResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(RemoteError::Unavailable("fake store offline".to_string()));
        }
        Ok(())
    }

    fn mutate<F>(&self, collection: &str, f: F) -> RemoteResult<()>
    where
        F: FnOnce(&mut BTreeMap<String, Value>),
    {
        self.ensure_online()?;
        let mut data = self.data.lock().unwrap();
        f(data.entry(collection.to_string()).or_default());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FakeStore {
    async fn fetch_collection(&self, collection: &str) -> RemoteResult<Value> {
        self.ensure_online()?;
        if let Some(raw) = self.raw_bodies.lock().unwrap().get(collection) {
            return Ok(raw.clone());
        }
        let data = self.data.lock().unwrap();
        let body = data
            .get(collection)
            .map(|c| Value::Object(c.clone().into_iter().collect()))
            .unwrap_or(Value::Null);
        Ok(body)
    }

    async fn create(&self, collection: &str, payload: &Value) -> RemoteResult<String> {
        self.ensure_online()?;
        let id = format!("-N{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        let key = id.clone();
        self.mutate(collection, |c| {
            c.insert(key, payload.clone());
        })?;
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, patch: &Value) -> RemoteResult<()> {
        self.mutate(collection, |c| {
            let base = c
                .remove(id)
                .unwrap_or_else(|| Value::Object(Default::default()));
            c.insert(id.to_string(), merge_top_level(base, patch));
        })
    }

    async fn replace(&self, collection: &str, id: &str, payload: &Value) -> RemoteResult<()> {
        self.mutate(collection, |c| {
            c.insert(id.to_string(), payload.clone());
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()> {
        self.mutate(collection, |c| {
            c.remove(id);
        })
    }
}

// ==========================================
// 测试环境
// ==========================================

/// 测试配置（不含远端地址；路由由测试注入）
pub fn test_config() -> AppConfig {
    AppConfig {
        marketing: SourceConfig {
            base_url: String::new(),
            backend: BackendKind::Firebase,
            collection: MARKETING.to_string(),
        },
        orders: SourceConfig {
            base_url: String::new(),
            backend: BackendKind::Firebase,
            collection: ORDERS.to_string(),
        },
        audit_collection: AUDITS.to_string(),
        api_key: None,
        request_timeout_ms: 1_000,
        max_attempts: 1,
        retry_backoff_ms: 0,
        strip_numeric_suffix: true,
        cancel_tokens: vec![
            "huy".to_string(),
            "cancel".to_string(),
            "cancelled".to_string(),
        ],
        include_unmatched_actual: false,
    }
}

/// 测试环境：内存库 + 两个进程内远端（审计集合与订单同库）
pub struct TestEnv {
    pub conn: Arc<Mutex<Connection>>,
    pub state: AppState,
    pub marketing: Arc<FakeStore>,
    pub orders: Arc<FakeStore>,
}

pub fn build_env() -> TestEnv {
    let conn = mkt_recon::db::open_in_memory_shared().expect("内存库初始化失败");
    let marketing = FakeStore::new();
    let orders = FakeStore::new();

    let stores = StoreRegistry::new()
        .with_route(MARKETING, marketing.clone())
        .with_route(ORDERS, orders.clone())
        .with_route(AUDITS, orders.clone());

    let state =
        AppState::with_stores(conn.clone(), test_config(), stores).expect("AppState 初始化失败");

    TestEnv {
        conn,
        state,
        marketing,
        orders,
    }
}

/// 创建临时数据库文件（需要保持 NamedTempFile 存活）
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file
        .path()
        .to_str()
        .ok_or("临时路径不是合法 UTF-8")?
        .to_string();
    Ok((temp_file, db_path))
}
