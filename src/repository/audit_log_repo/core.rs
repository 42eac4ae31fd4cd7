use crate::domain::audit_log::ChangeAudit;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::format_ts;
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AuditLogRepository - 变更审计仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    /// 创建新的审计仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入审计记录
    ///
    /// # 返回
    /// - `Ok(audit_id)`: 成功插入
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, audit: &ChangeAudit) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO change_audit (
                audit_id, collection, entity_id, change_type,
                old_value_json, new_value_json, actor, changed_at,
                reverted, detail, remote_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                audit.audit_id,
                audit.collection,
                audit.entity_id,
                audit.change_type.as_str(),
                audit.old_value.as_ref().map(|v| v.to_string()),
                audit.new_value.as_ref().map(|v| v.to_string()),
                audit.actor,
                format_ts(&audit.changed_at),
                audit.reverted as i64,
                audit.detail,
                audit.remote_id,
            ],
        )?;

        Ok(audit.audit_id.clone())
    }

    /// 标记为已撤销
    ///
    /// # 返回
    /// - Ok(true): 本次完成标记
    /// - Ok(false): 之前已撤销
    pub fn mark_reverted(&self, audit_id: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE change_audit SET reverted = 1 WHERE audit_id = ?1 AND reverted = 0",
            params![audit_id],
        )?;
        Ok(rows > 0)
    }

    /// 离线新建同步后，审计中的本地ID改为远端ID
    ///
    /// 同时处理被审计记录ID与审计文档自身的远端ID
    pub fn remap_ids(&self, collection: &str, old_id: &str, new_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let entity_rows = conn.execute(
            "UPDATE change_audit SET entity_id = ?3 WHERE collection = ?1 AND entity_id = ?2",
            params![collection, old_id, new_id],
        )?;
        let remote_rows = conn.execute(
            "UPDATE change_audit SET remote_id = ?2 WHERE remote_id = ?1",
            params![old_id, new_id],
        )?;
        Ok(entity_rows + remote_rows)
    }
}
