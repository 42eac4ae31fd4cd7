// ==========================================
// 营销对账系统 - 变更审计数据仓储
// ==========================================
// 对齐: change_audit 表
// 红线: 所有回写必须记录
// ==========================================

mod core;
mod queries;


pub use core::AuditLogRepository;
