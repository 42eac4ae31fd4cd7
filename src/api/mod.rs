// ==========================================
// 营销对账系统 - API 层
// ==========================================
// 职责: 服务门面，供命令行入口调用
// ==========================================

pub mod error;
pub mod record_api;
pub mod report_api;
pub mod sync_gateway;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use record_api::RecordApi;
pub use report_api::{ReportApi, ReportResponse, ReportSettings};
pub use sync_gateway::{object_id, overlay_pending, FetchOutcome, SyncGateway};
