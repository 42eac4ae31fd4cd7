// ==========================================
// 营销对账系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{RecordApi, ReportApi, ReportSettings, SyncGateway};
use crate::config::{AppConfig, ConfigManager, SourceConfig};
use crate::remote::{RecordStore, RestRecordStore, StoreRegistry};
use crate::repository::{AuditLogRepository, MirrorRepository, OutboxRepository};

/// 应用状态
///
/// 包含所有API实例和共享资源
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的配置快照
    pub config: AppConfig,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 报表API
    pub report_api: Arc<ReportApi>,

    /// 记录回写API
    pub record_api: Arc<RecordApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并建表
    /// 2. 读取配置，按数据源构建远端存储
    /// 3. 创建所有API实例
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = crate::db::open_shared(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        let config = config_manager
            .load_app_config()
            .map_err(|e| format!("无法加载配置: {}", e))?;

        let stores = build_store_registry(&config);
        Ok(Self::assemble(db_path, conn, config_manager, config, stores))
    }

    /// 使用指定远端存储创建（测试与嵌入场景）
    pub fn with_stores(
        conn: Arc<Mutex<Connection>>,
        config: AppConfig,
        stores: StoreRegistry,
    ) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );
        Ok(Self::assemble(
            ":memory:".to_string(),
            conn,
            config_manager,
            config,
            stores,
        ))
    }

    fn assemble(
        db_path: String,
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        config: AppConfig,
        stores: StoreRegistry,
    ) -> Self {
        // ==========================================
        // 初始化Repository层
        // ==========================================
        let mirror_repo = Arc::new(MirrorRepository::new(conn.clone()));
        let outbox_repo = Arc::new(OutboxRepository::new(conn.clone()));
        let audit_repo = Arc::new(AuditLogRepository::new(conn));

        let gateway = Arc::new(SyncGateway::new(
            stores,
            mirror_repo,
            outbox_repo,
            audit_repo.clone(),
        ));

        // ==========================================
        // 初始化API层
        // ==========================================
        let report_api = Arc::new(ReportApi::new(
            gateway.clone(),
            ReportSettings {
                marketing_collection: config.marketing.collection.clone(),
                orders_collection: config.orders.collection.clone(),
                strip_numeric_suffix: config.strip_numeric_suffix,
                cancel_tokens: config.cancel_tokens.clone(),
            },
        ));
        let record_api = Arc::new(RecordApi::new(
            gateway,
            audit_repo,
            config.audit_collection.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Self {
            db_path,
            config,
            config_manager,
            report_api,
            record_api,
        }
    }
}

/// 按配置构建远端存储路由
///
/// 未配置 base_url 的数据源不注册，读写时自动降级到本地镜像/发件箱
pub fn build_store_registry(config: &AppConfig) -> StoreRegistry {
    let mut registry = StoreRegistry::new();

    if let Some(store) = build_store(config, "营销自报", &config.marketing) {
        registry = registry.with_route(&config.marketing.collection, store);
    }
    if let Some(store) = build_store(config, "实际订单", &config.orders) {
        // 审计集合与订单同库
        registry = registry
            .with_route(&config.orders.collection, store.clone())
            .with_route(&config.audit_collection, store);
    }
    registry
}

fn build_store(config: &AppConfig, label: &str, source: &SourceConfig) -> Option<Arc<dyn RecordStore>> {
    if source.base_url.trim().is_empty() {
        tracing::warn!("{}数据源未配置 base_url，将仅使用本地镜像", label);
        return None;
    }
    match RestRecordStore::new(config.remote_settings(source)) {
        Ok(store) => Some(Arc::new(store)),
        Err(e) => {
            tracing::warn!("{}数据源初始化失败，将仅使用本地镜像: {}", label, e);
            None
        }
    }
}

// ==========================================
// 默认数据库路径辅助函数
// ==========================================

/// 获取默认数据库路径
///
/// # 返回
/// - 环境变量 MKT_RECON_DB_PATH（非空时）
/// - 用户数据目录/mkt-recon/mkt_recon.db
/// - 回退: ./mkt_recon.db
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("MKT_RECON_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./mkt_recon.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("mkt-recon");
        // 目录创建失败时保持回退路径
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("mkt_recon.db");
        }
    }

    path.to_string_lossy().to_string()
}
