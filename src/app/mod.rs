// ==========================================
// 营销对账系统 - 应用层
// ==========================================
// 职责: 组装仓储、远端存储与 API，供命令行入口使用
// ==========================================

pub mod state;

// 重导出
pub use state::{build_store_registry, get_default_db_path, AppState};
