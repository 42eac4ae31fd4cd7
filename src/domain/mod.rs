// ==========================================
// 营销对账系统 - 领域模型层
// ==========================================
// 职责: 定义输入记录、对账输出、审计与同步实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod audit_log;
pub mod criteria;
pub mod record;
pub mod report;
pub mod sync;
pub mod types;

// 重导出核心类型
pub use audit_log::ChangeAudit;
pub use criteria::{FilterCriteria, ReconcileOptions, SearchField, ViewerScope};
pub use record::{ActualOrderRecord, MarketingActivityRecord, RecordFields};
pub use report::{safe_div, AggregateRow, RatioSet, ReconcileResult, TOTALS_LABEL};
pub use sync::{DegradedNotice, DrainReport, MirrorRecord, OutboxEntry, WriteOutcome};
pub use types::{BackendKind, CheckResult, ViewerRole, WriteKind};
