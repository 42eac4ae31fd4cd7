// ==========================================
// 营销对账系统 - 配置层
// ==========================================
// 职责: 数据源、重试策略与对账规则配置
// 存储: config_kv 表
// ==========================================

pub mod config_manager;

// 重导出核心配置管理器
pub use config_manager::{config_keys, defaults, AppConfig, ConfigManager, SourceConfig};
