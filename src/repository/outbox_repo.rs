// ==========================================
// 营销对账系统 - 发件箱仓储
// ==========================================
// 对齐: outbox 表
// 规则: 按 created_at 先后回放；同步成功后保留记录（synced=1）用于追溯
// ==========================================

use crate::domain::sync::OutboxEntry;
use crate::domain::types::WriteKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str = r#"
    SELECT op_id, collection, record_id, kind, payload_json, synced,
           attempts, last_error, remote_id, created_at, synced_at
    FROM outbox
"#;

pub struct OutboxRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OutboxRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 入队
    pub fn enqueue(&self, entry: &OutboxEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO outbox (
                op_id, collection, record_id, kind, payload_json, synced,
                attempts, last_error, remote_id, created_at, synced_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                entry.op_id,
                entry.collection,
                entry.record_id,
                entry.kind.as_str(),
                entry.payload.as_ref().map(|v| v.to_string()),
                entry.synced as i64,
                entry.attempts,
                entry.last_error,
                entry.remote_id,
                format_ts(&entry.created_at),
                entry.synced_at.as_ref().map(format_ts),
            ],
        )?;

        tracing::info!(
            "写入已加入发件箱: op_id={}, kind={}, collection={}",
            entry.op_id,
            entry.kind.as_str(),
            entry.collection
        );
        Ok(entry.op_id.clone())
    }

    /// 未同步的写入（最早的在前）
    pub fn list_pending(&self) -> RepositoryResult<Vec<OutboxEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE synced = 0 ORDER BY created_at, rowid", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map([], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    /// 某集合未同步的写入（最早的在前）
    pub fn list_pending_for(&self, collection: &str) -> RepositoryResult<Vec<OutboxEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE synced = 0 AND collection = ?1 ORDER BY created_at, rowid",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params![collection], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn find_by_id(&self, op_id: &str) -> RepositoryResult<Option<OutboxEntry>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE op_id = ?1", SELECT_COLUMNS);
        let entry = conn.query_row(&sql, params![op_id], map_row).optional()?;
        Ok(entry)
    }

    pub fn count_pending(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM outbox WHERE synced = 0", [], |row| {
            row.get(0)
        })?;
        Ok(count as usize)
    }

    /// 标记同步成功
    pub fn mark_synced(&self, op_id: &str, remote_id: Option<&str>) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE outbox
            SET synced = 1, attempts = attempts + 1, remote_id = ?2,
                last_error = NULL, synced_at = ?3
            WHERE op_id = ?1
            "#,
            params![op_id, remote_id, format_ts(&Utc::now().naive_utc())],
        )?;
        if rows == 0 {
            return Err(RepositoryError::NotFound {
                entity: "OutboxEntry".to_string(),
                id: op_id.to_string(),
            });
        }
        Ok(())
    }

    /// 记录一次失败
    pub fn record_failure(&self, op_id: &str, error: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE outbox SET attempts = attempts + 1, last_error = ?2 WHERE op_id = ?1",
            params![op_id, error],
        )?;
        Ok(())
    }

    /// 离线新建同步后，后续待同步写入改指向远端ID
    pub fn remap_record_id(&self, old_id: &str, new_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE outbox SET record_id = ?2 WHERE synced = 0 AND record_id = ?1",
            params![old_id, new_id],
        )?;
        Ok(rows)
    }

    /// 待同步审计文档中的 entityId 改指向远端ID
    pub fn remap_audit_entity_id(
        &self,
        collection: &str,
        old_id: &str,
        new_id: &str,
    ) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE outbox
            SET payload = json_set(payload, '$.entityId', ?3)
            WHERE synced = 0
              AND json_valid(payload)
              AND json_extract(payload, '$.collection') = ?1
              AND json_extract(payload, '$.entityId') = ?2
            "#,
            params![collection, old_id, new_id],
        )?;
        Ok(rows)
    }
}

fn map_row(row: &Row) -> SqliteResult<OutboxEntry> {
    let kind_str: String = row.get(3)?;
    let kind = WriteKind::from_str(&kind_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("未知写入类型: {}", kind_str).into(),
        )
    })?;

    let payload_str: Option<String> = row.get(4)?;
    let created_at_str: String = row.get(9)?;
    let synced_at_str: Option<String> = row.get(10)?;

    Ok(OutboxEntry {
        op_id: row.get(0)?,
        collection: row.get(1)?,
        record_id: row.get(2)?,
        kind,
        payload: payload_str.and_then(|s| serde_json::from_str(&s).ok()),
        synced: row.get::<_, i64>(5)? != 0,
        attempts: row.get(6)?,
        last_error: row.get(7)?,
        remote_id: row.get(8)?,
        created_at: parse_ts(9, &created_at_str)?,
        synced_at: synced_at_str.map(|s| parse_ts(10, &s)).transpose()?,
    })
}
