// ==========================================
// 营销对账系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::db::{ensure_schema, open_sqlite_connection};
use crate::domain::types::BackendKind;
use crate::importer::data_cleaner::DEFAULT_CANCEL_TOKENS;
use crate::remote::RemoteSettings;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ==========================================
// AppConfig - 配置快照
// ==========================================

/// 单个数据源（后端 + 集合）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub base_url: String,
    pub backend: BackendKind,
    pub collection: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub marketing: SourceConfig,
    pub orders: SourceConfig,
    pub audit_collection: String,
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    pub strip_numeric_suffix: bool,
    pub cancel_tokens: Vec<String>,
    pub include_unmatched_actual: bool,
}

impl AppConfig {
    /// 某数据源的远端连接参数
    pub fn remote_settings(&self, source: &SourceConfig) -> RemoteSettings {
        RemoteSettings {
            base_url: source.base_url.clone(),
            backend: source.backend,
            api_key: self.api_key.clone(),
            timeout: Duration::from_millis(self.request_timeout_ms),
            max_attempts: self.max_attempts,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;
        ensure_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self.get_config_value(key)?.unwrap_or_else(|| default.to_string()))
    }

    fn get_parsed_or<T: std::str::FromStr>(&self, key: &str, default: T) -> Result<T, Box<dyn Error>> {
        match self.get_config_value(key)? {
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置格式错误，使用默认值");
                    Ok(default)
                }
            },
            None => Ok(default),
        }
    }

    fn get_bool_or(&self, key: &str, default: bool) -> Result<bool, Box<dyn Error>> {
        let value = self.get_config_value(key)?;
        Ok(match value.as_deref().map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "true" || v == "1" => true,
            Some(v) if v == "false" || v == "0" => false,
            _ => default,
        })
    }

    /// 写入配置（UPSERT）
    pub fn set(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!("配置已更新: {}", key);
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key"
        )?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        let json_value = json!(config_map);
        Ok(serde_json::to_string(&json_value)?)
    }

    // ===== 数据源配置 =====

    fn load_source(
        &self,
        url_key: &str,
        backend_key: &str,
        collection_key: &str,
        default_collection: &str,
    ) -> Result<SourceConfig, Box<dyn Error>> {
        Ok(SourceConfig {
            base_url: self.get_config_or_default(url_key, "")?.trim().to_string(),
            backend: BackendKind::from_str(&self.get_config_or_default(backend_key, "FIREBASE")?),
            collection: self.get_config_or_default(collection_key, default_collection)?,
        })
    }

    /// 获取取消判定词（JSON 数组）
    ///
    /// 配置不存在或格式错误时使用内置词表
    pub fn get_cancel_tokens(&self) -> Result<Vec<String>, Box<dyn Error>> {
        let default = || DEFAULT_CANCEL_TOKENS.iter().map(|s| s.to_string()).collect();
        let raw = match self.get_config_value(config_keys::CANCEL_TOKENS)? {
            Some(v) => v,
            None => return Ok(default()),
        };
        let tokens: Vec<String> = serde_json::from_str(&raw).unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::CANCEL_TOKENS,
                raw_value = %raw,
                "取消判定词配置格式错误，使用内置词表"
            );
            default()
        });
        Ok(tokens)
    }

    /// 组装配置快照
    pub fn load_app_config(&self) -> Result<AppConfig, Box<dyn Error>> {
        let api_key = self
            .get_config_value(config_keys::API_KEY)?
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        Ok(AppConfig {
            marketing: self.load_source(
                config_keys::MARKETING_BASE_URL,
                config_keys::MARKETING_BACKEND,
                config_keys::MARKETING_COLLECTION,
                defaults::MARKETING_COLLECTION,
            )?,
            orders: self.load_source(
                config_keys::ORDERS_BASE_URL,
                config_keys::ORDERS_BACKEND,
                config_keys::ORDERS_COLLECTION,
                defaults::ORDERS_COLLECTION,
            )?,
            audit_collection: self
                .get_config_or_default(config_keys::AUDIT_COLLECTION, defaults::AUDIT_COLLECTION)?,
            api_key,
            request_timeout_ms: self
                .get_parsed_or(config_keys::REQUEST_TIMEOUT_MS, defaults::REQUEST_TIMEOUT_MS)?,
            max_attempts: self.get_parsed_or(config_keys::MAX_ATTEMPTS, defaults::MAX_ATTEMPTS)?,
            retry_backoff_ms: self
                .get_parsed_or(config_keys::RETRY_BACKOFF_MS, defaults::RETRY_BACKOFF_MS)?,
            strip_numeric_suffix: self.get_bool_or(config_keys::STRIP_NUMERIC_SUFFIX, true)?,
            cancel_tokens: self.get_cancel_tokens()?,
            include_unmatched_actual: self
                .get_bool_or(config_keys::INCLUDE_UNMATCHED_ACTUAL, false)?,
        })
    }
}

// ==========================================
// 默认值
// ==========================================
pub mod defaults {
    pub const MARKETING_COLLECTION: &str = "bao_cao_mkt";
    pub const ORDERS_COLLECTION: &str = "don_hang";
    pub const AUDIT_COLLECTION: &str = "change_logs";
    pub const REQUEST_TIMEOUT_MS: u64 = 10_000;
    pub const MAX_ATTEMPTS: u32 = 1; // 一次尝试，失败即回退
    pub const RETRY_BACKOFF_MS: u64 = 500;
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 营销自报数据源
    pub const MARKETING_BASE_URL: &str = "marketing_base_url";
    pub const MARKETING_BACKEND: &str = "marketing_backend";
    pub const MARKETING_COLLECTION: &str = "marketing_collection";

    // 实际订单数据源
    pub const ORDERS_BASE_URL: &str = "orders_base_url";
    pub const ORDERS_BACKEND: &str = "orders_backend";
    pub const ORDERS_COLLECTION: &str = "orders_collection";

    // 审计
    pub const AUDIT_COLLECTION: &str = "audit_collection";

    // 访问与重试
    pub const API_KEY: &str = "api_key";
    pub const REQUEST_TIMEOUT_MS: &str = "request_timeout_ms";
    pub const MAX_ATTEMPTS: &str = "max_attempts";
    pub const RETRY_BACKOFF_MS: &str = "retry_backoff_ms";

    // 对账规则
    pub const STRIP_NUMERIC_SUFFIX: &str = "strip_numeric_suffix";
    pub const CANCEL_TOKENS: &str = "cancel_tokens"; // JSON 数组
    pub const INCLUDE_UNMATCHED_ACTUAL: &str = "include_unmatched_actual";
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_manager() -> ConfigManager {
        ConfigManager::from_connection(crate::db::open_in_memory_shared().unwrap()).unwrap()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = setup_manager().load_app_config().unwrap();

        assert_eq!(config.marketing.backend, BackendKind::Firebase);
        assert_eq!(config.marketing.base_url, "");
        assert_eq!(config.orders.collection, defaults::ORDERS_COLLECTION);
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.max_attempts, 1);
        assert!(config.strip_numeric_suffix);
        assert!(!config.include_unmatched_actual);
        assert_eq!(config.cancel_tokens.len(), DEFAULT_CANCEL_TOKENS.len());
        assert_eq!(config.api_key, None);
    }

    #[test]
    fn test_set_overrides_and_upserts() {
        let manager = setup_manager();
        manager.set(config_keys::ORDERS_BACKEND, "SUPABASE").unwrap();
        manager.set(config_keys::MAX_ATTEMPTS, "2").unwrap();
        manager.set(config_keys::MAX_ATTEMPTS, "3").unwrap();
        manager.set(config_keys::STRIP_NUMERIC_SUFFIX, "false").unwrap();
        manager.set(config_keys::CANCEL_TOKENS, r#"["huy","hoan"]"#).unwrap();

        let config = manager.load_app_config().unwrap();
        assert_eq!(config.orders.backend, BackendKind::Supabase);
        assert_eq!(config.max_attempts, 3);
        assert!(!config.strip_numeric_suffix);
        assert_eq!(config.cancel_tokens, vec!["huy".to_string(), "hoan".to_string()]);
    }

    #[test]
    fn test_malformed_values_fall_back() {
        let manager = setup_manager();
        manager.set(config_keys::REQUEST_TIMEOUT_MS, "abc").unwrap();
        manager.set(config_keys::CANCEL_TOKENS, "not json").unwrap();

        let config = manager.load_app_config().unwrap();
        assert_eq!(config.request_timeout_ms, defaults::REQUEST_TIMEOUT_MS);
        assert_eq!(config.cancel_tokens.len(), DEFAULT_CANCEL_TOKENS.len());
    }

    #[test]
    fn test_remote_settings() {
        let manager = setup_manager();
        manager.set(config_keys::API_KEY, "secret").unwrap();
        manager.set(config_keys::REQUEST_TIMEOUT_MS, "2500").unwrap();

        let config = manager.load_app_config().unwrap();
        let settings = config.remote_settings(&config.marketing);
        assert_eq!(settings.api_key.as_deref(), Some("secret"));
        assert_eq!(settings.timeout, Duration::from_millis(2500));
        assert_eq!(settings.max_attempts, 1);
    }
}
