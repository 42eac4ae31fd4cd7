// ==========================================
// 营销对账系统 - 引擎层
// ==========================================
// 职责: 姓名规范化、过滤谓词、对账聚合
// 红线: Engine 不做 I/O，所有方法均为纯函数
// ==========================================

pub mod filter;
pub mod name_normalizer;
pub mod reconcile;

// 重导出核心引擎
pub use filter::{build_predicate, shift_tokens, RecordPredicate};
pub use name_normalizer::{fold_text, ExactNameKey, JoinKeyPolicy, NameNormalizer};
pub use reconcile::{compute_totals, ReconcileEngine, StaffCollator};
