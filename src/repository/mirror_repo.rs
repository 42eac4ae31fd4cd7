// ==========================================
// 营销对账系统 - 本地镜像仓储
// ==========================================
// 对齐: record_mirror 表
// 用途: 远端读取失败时的回退数据源；删除以墓碑保存
// ==========================================

use crate::domain::sync::MirrorRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::{format_ts, parse_ts};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct MirrorRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MirrorRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 用远端快照整体刷新某集合（远端即真相，旧墓碑一并清除）
    pub fn replace_collection(
        &self,
        collection: &str,
        records: &[(String, Value)],
    ) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let now = format_ts(&Utc::now().naive_utc());

        tx.execute(
            "DELETE FROM record_mirror WHERE collection = ?1",
            params![collection],
        )?;

        let mut count = 0;
        for (record_id, payload) in records {
            tx.execute(
                r#"
                INSERT OR REPLACE INTO record_mirror (
                    collection, record_id, payload_json, deleted, updated_at
                ) VALUES (?1, ?2, ?3, 0, ?4)
                "#,
                params![collection, record_id, payload.to_string(), now],
            )?;
            count += 1;
        }

        tx.commit()?;
        tracing::debug!("镜像已刷新: collection={}, count={}", collection, count);
        Ok(count)
    }

    /// 写入或覆盖单条记录（本地写入路径）
    pub fn upsert(&self, collection: &str, record_id: &str, payload: &Value) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO record_mirror (collection, record_id, payload_json, deleted, updated_at)
            VALUES (?1, ?2, ?3, 0, ?4)
            ON CONFLICT(collection, record_id) DO UPDATE SET
                payload_json = excluded.payload_json,
                deleted = 0,
                updated_at = excluded.updated_at
            "#,
            params![
                collection,
                record_id,
                payload.to_string(),
                format_ts(&Utc::now().naive_utc())
            ],
        )?;
        Ok(())
    }

    /// 局部合并（PATCH 语义：顶层字段覆盖）
    ///
    /// 镜像中没有该记录时以补丁本身作为记录内容
    pub fn merge_patch(&self, collection: &str, record_id: &str, patch: &Value) -> RepositoryResult<Value> {
        let merged = match self.find(collection, record_id)? {
            Some(existing) if !existing.deleted => merge_top_level(existing.payload, patch),
            _ => patch.clone(),
        };
        self.upsert(collection, record_id, &merged)?;
        Ok(merged)
    }

    /// 写入删除墓碑
    pub fn mark_deleted(&self, collection: &str, record_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO record_mirror (collection, record_id, payload_json, deleted, updated_at)
            VALUES (?1, ?2, 'null', 1, ?3)
            ON CONFLICT(collection, record_id) DO UPDATE SET
                deleted = 1,
                updated_at = excluded.updated_at
            "#,
            params![collection, record_id, format_ts(&Utc::now().naive_utc())],
        )?;
        Ok(())
    }

    /// 记录改名（离线新建同步后，本地ID → 远端ID）
    pub fn rename(&self, collection: &str, old_id: &str, new_id: &str) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE OR REPLACE record_mirror SET record_id = ?3 WHERE collection = ?1 AND record_id = ?2",
            params![collection, old_id, new_id],
        )?;
        Ok(rows)
    }

    pub fn find(&self, collection: &str, record_id: &str) -> RepositoryResult<Option<MirrorRecord>> {
        let conn = self.get_conn()?;
        let found = conn
            .query_row(
                r#"
                SELECT collection, record_id, payload_json, deleted, updated_at
                FROM record_mirror
                WHERE collection = ?1 AND record_id = ?2
                "#,
                params![collection, record_id],
                map_row,
            )
            .optional()?;
        Ok(found)
    }

    /// 集合内未删除的记录（按写入顺序）
    pub fn list_live(&self, collection: &str) -> RepositoryResult<Vec<MirrorRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT collection, record_id, payload_json, deleted, updated_at
            FROM record_mirror
            WHERE collection = ?1 AND deleted = 0
            ORDER BY rowid
            "#,
        )?;

        let records = stmt
            .query_map(params![collection], map_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(records)
    }
}

/// 顶层字段合并；任一方不是对象时补丁整体覆盖
pub fn merge_top_level(base: Value, patch: &Value) -> Value {
    match (base, patch) {
        (Value::Object(mut base), Value::Object(patch)) => {
            for (k, v) in patch {
                base.insert(k.clone(), v.clone());
            }
            Value::Object(base)
        }
        (_, patch) => patch.clone(),
    }
}

fn map_row(row: &Row) -> SqliteResult<MirrorRecord> {
    let payload_str: String = row.get(2)?;
    let updated_at_str: String = row.get(4)?;
    Ok(MirrorRecord {
        collection: row.get(0)?,
        record_id: row.get(1)?,
        payload: serde_json::from_str(&payload_str).unwrap_or(Value::Null),
        deleted: row.get::<_, i64>(3)? != 0,
        updated_at: parse_ts(4, &updated_at_str)?,
    })
}
