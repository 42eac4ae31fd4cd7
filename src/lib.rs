// ==========================================
// 营销对账系统 - 核心库
// ==========================================
// 职责: 营销自报数据与实际订单按员工对账
// 技术栈: Rust + SQLite（本地镜像/发件箱）+ REST（Firebase / Supabase）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 引擎层 - 对账规则（纯函数）
pub mod engine;

// 导入层 - 远端负载与导出文件
pub mod importer;

// 远端存储层
pub mod remote;

// 数据仓储层 - 镜像/发件箱/审计
pub mod repository;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 服务门面
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{BackendKind, CheckResult, ViewerRole, WriteKind};

// 领域实体
pub use domain::{
    ActualOrderRecord, AggregateRow, ChangeAudit, DegradedNotice, DrainReport, FilterCriteria,
    MarketingActivityRecord, RatioSet, ReconcileOptions, ReconcileResult, SearchField,
    ViewerScope, WriteOutcome,
};

// 引擎
pub use engine::{ExactNameKey, JoinKeyPolicy, NameNormalizer, ReconcileEngine};

// API
pub use api::{ApiError, ApiResult, RecordApi, ReportApi, ReportResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "营销对账系统";
