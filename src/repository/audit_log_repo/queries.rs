use super::core::AuditLogRepository;
use crate::domain::audit_log::ChangeAudit;
use crate::domain::types::WriteKind;
use crate::repository::error::RepositoryResult;
use crate::repository::parse_ts;
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT audit_id, collection, entity_id, change_type,
           old_value_json, new_value_json, actor, changed_at,
           reverted, detail, remote_id
    FROM change_audit
"#;

impl AuditLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 audit_id 查询
    pub fn find_by_id(&self, audit_id: &str) -> RepositoryResult<Option<ChangeAudit>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE audit_id = ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![audit_id], |row| self.map_row(row)) {
            Ok(audit) => Ok(Some(audit)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某条记录的变更历史（最新在前）
    pub fn find_by_entity(&self, collection: &str, entity_id: &str) -> RepositoryResult<Vec<ChangeAudit>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE collection = ? AND entity_id = ? ORDER BY changed_at DESC, rowid DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let audits = stmt
            .query_map(params![collection, entity_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(audits)
    }

    /// 查询最近的审计记录
    pub fn find_recent(&self, limit: i32) -> RepositoryResult<Vec<ChangeAudit>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY changed_at DESC, rowid DESC LIMIT ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let audits = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(audits)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn map_row(&self, row: &Row) -> SqliteResult<ChangeAudit> {
        let change_type_str: String = row.get(3)?;
        let change_type = WriteKind::from_str(&change_type_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("未知变更类型: {}", change_type_str).into(),
            )
        })?;

        let old_value_str: Option<String> = row.get(4)?;
        let new_value_str: Option<String> = row.get(5)?;
        let changed_at_str: String = row.get(7)?;

        Ok(ChangeAudit {
            audit_id: row.get(0)?,
            collection: row.get(1)?,
            entity_id: row.get(2)?,
            change_type,
            old_value: old_value_str.and_then(|s| serde_json::from_str(&s).ok()),
            new_value: new_value_str.and_then(|s| serde_json::from_str(&s).ok()),
            actor: row.get(6)?,
            changed_at: parse_ts(7, &changed_at_str)?,
            reverted: row.get::<_, i64>(8)? != 0,
            detail: row.get(9)?,
            remote_id: row.get(10)?,
        })
    }
}
