// ==========================================
// 营销对账系统 - 远端/本地同步网关
// ==========================================
// 读: 远端 → 刷新镜像 → 叠加未同步写入；远端失败 → 镜像 + 叠加 + 降级提示
// 写: 先远端；失败 → 写镜像 + 入发件箱（对调用方视为成功，queued=true）
// 回放: 按先后顺序，遇到第一个失败即停止
// ==========================================

use crate::api::error::ApiResult;
use crate::domain::sync::{DegradedNotice, DrainReport, OutboxEntry};
use crate::domain::types::WriteKind;
use crate::importer::payload::normalize_payload;
use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::registry::StoreRegistry;
use crate::remote::store::apply_write;
use crate::repository::{merge_top_level, AuditLogRepository, MirrorRepository, OutboxRepository};
use serde_json::{Map, Value};
use std::sync::Arc;

/// 读取结果
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub objects: Vec<Map<String, Value>>,
    pub degraded: Option<DegradedNotice>,
}

pub struct SyncGateway {
    stores: StoreRegistry,
    mirror: Arc<MirrorRepository>,
    outbox: Arc<OutboxRepository>,
    audit_repo: Arc<AuditLogRepository>,
}

impl SyncGateway {
    pub fn new(
        stores: StoreRegistry,
        mirror: Arc<MirrorRepository>,
        outbox: Arc<OutboxRepository>,
        audit_repo: Arc<AuditLogRepository>,
    ) -> Self {
        Self {
            stores,
            mirror,
            outbox,
            audit_repo,
        }
    }

    pub fn mirror(&self) -> &MirrorRepository {
        &self.mirror
    }

    pub fn outbox(&self) -> &OutboxRepository {
        &self.outbox
    }

    // ==========================================
    // 读路径
    // ==========================================

    /// 读取集合（带镜像回退与未同步写入叠加）
    pub async fn fetch_objects(&self, collection: &str) -> ApiResult<FetchOutcome> {
        let (base, degraded) = match self.fetch_remote(collection).await {
            Ok(objects) => {
                let snapshot: Vec<(String, Value)> = objects
                    .iter()
                    .map(|o| (object_id(o).unwrap_or_default(), Value::Object(o.clone())))
                    .filter(|(id, _)| !id.is_empty())
                    .collect();
                if let Err(e) = self.mirror.replace_collection(collection, &snapshot) {
                    tracing::warn!("镜像刷新失败（不影响本次读取）: {}: {}", collection, e);
                }
                (objects, None)
            }
            Err(e) => {
                let objects = self.mirror_objects(collection)?;
                tracing::warn!(
                    "远端读取失败，改用本地镜像: collection={}, mirror_records={}, error={}",
                    collection,
                    objects.len(),
                    e
                );
                let notice = DegradedNotice {
                    collection: collection.to_string(),
                    reason: e.to_string(),
                    mirror_records: objects.len(),
                };
                (objects, Some(notice))
            }
        };

        let pending = self.outbox.list_pending_for(collection)?;
        let objects = overlay_pending(base, &pending);

        Ok(FetchOutcome { objects, degraded })
    }

    async fn fetch_remote(&self, collection: &str) -> RemoteResult<Vec<Map<String, Value>>> {
        let store = self.stores.store_for(collection)?;
        let body = store.fetch_collection(collection).await?;
        normalize_payload(body).map_err(|e| RemoteError::Decode(e.to_string()))
    }

    fn mirror_objects(&self, collection: &str) -> ApiResult<Vec<Map<String, Value>>> {
        let records = self.mirror.list_live(collection)?;
        Ok(records
            .into_iter()
            .filter_map(|r| match r.payload {
                Value::Object(mut map) => {
                    map.insert("id".to_string(), Value::String(r.record_id));
                    Some(map)
                }
                _ => None,
            })
            .collect())
    }

    // ==========================================
    // 写路径
    // ==========================================

    /// 回写一条记录
    ///
    /// # 返回
    /// - (record_id, queued): 远端ID（或排队时的客户端 UUID）与是否进入发件箱
    pub async fn write(
        &self,
        collection: &str,
        kind: WriteKind,
        record_id: Option<&str>,
        payload: Option<&Value>,
    ) -> ApiResult<(String, bool)> {
        // 有积压时先尝试回放，保证写入顺序
        if self.outbox.count_pending()? > 0 {
            let report = self.drain().await?;
            if report.remaining > 0 {
                tracing::info!("发件箱仍有 {} 条积压，新写入直接排队", report.remaining);
                return self.enqueue(collection, kind, record_id, payload);
            }
        }

        let resolved = match record_id {
            Some(id) => Some(self.resolve_id(id)?),
            None => None,
        };
        let record_id = resolved.as_deref();

        let direct = match self.stores.store_for(collection) {
            Ok(store) => apply_write(store.as_ref(), kind, collection, record_id, payload).await,
            Err(e) => Err(e),
        };

        match direct {
            Ok(created_id) => {
                let id = created_id
                    .or_else(|| record_id.map(str::to_string))
                    .unwrap_or_default();
                self.apply_to_mirror(collection, kind, &id, payload)?;
                Ok((id, false))
            }
            Err(e) => {
                tracing::warn!(
                    "远端写入失败，转入发件箱: collection={}, kind={}, error={}",
                    collection,
                    kind.as_str(),
                    e
                );
                self.enqueue(collection, kind, record_id, payload)
            }
        }
    }

    fn enqueue(
        &self,
        collection: &str,
        kind: WriteKind,
        record_id: Option<&str>,
        payload: Option<&Value>,
    ) -> ApiResult<(String, bool)> {
        let entry = OutboxEntry::new(
            collection,
            record_id.map(str::to_string),
            kind,
            payload.cloned(),
        );
        let local_id = entry.local_record_id().to_string();
        self.apply_to_mirror(collection, kind, &local_id, payload)?;
        self.outbox.enqueue(&entry)?;
        Ok((local_id, true))
    }

    fn apply_to_mirror(
        &self,
        collection: &str,
        kind: WriteKind,
        record_id: &str,
        payload: Option<&Value>,
    ) -> ApiResult<()> {
        let empty = Value::Object(Map::new());
        let body = payload.unwrap_or(&empty);
        match kind {
            WriteKind::Create | WriteKind::Replace => {
                self.mirror.upsert(collection, record_id, body)?;
            }
            WriteKind::Update => {
                self.mirror.merge_patch(collection, record_id, body)?;
            }
            WriteKind::Delete => self.mirror.mark_deleted(collection, record_id)?,
        }
        Ok(())
    }

    // ==========================================
    // 回放
    // ==========================================

    /// 回放发件箱（最早的在前，遇到第一个失败即停止）
    pub async fn drain(&self) -> ApiResult<DrainReport> {
        let mut report = DrainReport::default();

        loop {
            // 每次重新读取，使前一条新建的ID改写对后续条目生效
            let next = self.outbox.list_pending()?.into_iter().next();
            let Some(entry) = next else { break };

            let result = match self.stores.store_for(&entry.collection) {
                Ok(store) => {
                    apply_write(
                        store.as_ref(),
                        entry.kind,
                        &entry.collection,
                        entry.record_id.as_deref(),
                        entry.payload.as_ref(),
                    )
                    .await
                }
                Err(e) => Err(e),
            };

            match result {
                Ok(remote_id) => {
                    self.outbox.mark_synced(&entry.op_id, remote_id.as_deref())?;
                    if let Some(new_id) = remote_id.as_deref() {
                        self.remap_local_id(&entry.collection, entry.local_record_id(), new_id)?;
                    }
                    report.synced += 1;
                }
                Err(e) => {
                    let message = e.to_string();
                    self.outbox.record_failure(&entry.op_id, &message)?;
                    tracing::warn!(
                        "发件箱回放中断: op_id={}, attempts={}, error={}",
                        entry.op_id,
                        entry.attempts + 1,
                        message
                    );
                    report.last_error = Some(message);
                    break;
                }
            }
        }

        report.remaining = self.outbox.count_pending()?;
        if report.synced > 0 {
            tracing::info!(
                "发件箱回放完成: synced={}, remaining={}",
                report.synced,
                report.remaining
            );
        }
        Ok(report)
    }

    /// 已同步的离线新建：客户端 UUID 换成远端ID
    pub fn resolve_id(&self, record_id: &str) -> ApiResult<String> {
        let resolved = self
            .outbox
            .find_by_id(record_id)?
            .filter(|e| e.synced && e.kind == WriteKind::Create)
            .and_then(|e| e.remote_id)
            .unwrap_or_else(|| record_id.to_string());
        Ok(resolved)
    }

    /// 客户端 UUID → 远端ID
    fn remap_local_id(&self, collection: &str, local_id: &str, remote_id: &str) -> ApiResult<()> {
        if local_id == remote_id {
            return Ok(());
        }
        self.outbox.remap_record_id(local_id, remote_id)?;
        self.outbox.remap_audit_entity_id(collection, local_id, remote_id)?;
        self.mirror.rename(collection, local_id, remote_id)?;
        self.audit_repo.remap_ids(collection, local_id, remote_id)?;
        tracing::debug!("本地ID已映射: {} → {} ({})", local_id, remote_id, collection);
        Ok(())
    }
}

/// 记录ID（字符串或数字）
pub fn object_id(object: &Map<String, Value>) -> Option<String> {
    match object.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// 叠加未同步写入
///
/// - 删除优先：命中即移除
/// - 更新：命中ID时合并字段
/// - 替换：命中ID时整体覆盖，未命中时追加
/// - 新建：以客户端 UUID 追加（已存在则跳过）
pub fn overlay_pending(
    mut objects: Vec<Map<String, Value>>,
    pending: &[OutboxEntry],
) -> Vec<Map<String, Value>> {
    for entry in pending {
        let id = entry.local_record_id();
        let position = objects.iter().position(|o| object_id(o).as_deref() == Some(id));

        match entry.kind {
            WriteKind::Delete => {
                if let Some(pos) = position {
                    objects.remove(pos);
                }
            }
            WriteKind::Update => {
                if let (Some(pos), Some(patch)) = (position, entry.payload.as_ref()) {
                    let merged = merge_top_level(Value::Object(objects[pos].clone()), patch);
                    if let Value::Object(map) = merged {
                        objects[pos] = map;
                    }
                }
            }
            WriteKind::Replace | WriteKind::Create => {
                let Some(Value::Object(map)) = entry.payload.as_ref() else {
                    continue;
                };
                let mut map = map.clone();
                map.insert("id".to_string(), Value::String(id.to_string()));
                match (position, entry.kind) {
                    (Some(pos), WriteKind::Replace) => objects[pos] = map,
                    (Some(_), _) => {}
                    (None, _) => objects.push(map),
                }
            }
        }
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn test_overlay_delete_wins_and_updates_merge() {
        let base = vec![
            obj(json!({"id": "a", "x": 1})),
            obj(json!({"id": "b", "x": 2})),
        ];
        let pending = vec![
            OutboxEntry::new("c", Some("a".into()), WriteKind::Update, Some(json!({"x": 10}))),
            OutboxEntry::new("c", Some("b".into()), WriteKind::Update, Some(json!({"x": 20}))),
            OutboxEntry::new("c", Some("b".into()), WriteKind::Delete, None),
        ];

        let merged = overlay_pending(base, &pending);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0]["x"], 10);
    }

    #[test]
    fn test_overlay_create_appends_with_client_uuid() {
        let create = OutboxEntry::new("c", None, WriteKind::Create, Some(json!({"x": 1})));
        let merged = overlay_pending(Vec::new(), std::slice::from_ref(&create));

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0]["id"], create.op_id.as_str());
        assert!(!create.op_id.starts_with("local_"));

        // 已在镜像中的新建不重复追加
        let merged = overlay_pending(merged, std::slice::from_ref(&create));
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_overlay_replace_overwrites_on_id() {
        let base = vec![obj(json!({"id": "a", "x": 1, "y": 1}))];
        let pending = vec![OutboxEntry::new(
            "c",
            Some("a".into()),
            WriteKind::Replace,
            Some(json!({"x": 5})),
        )];

        let merged = overlay_pending(base, &pending);
        assert_eq!(merged[0], obj(json!({"id": "a", "x": 5})));
    }

    #[test]
    fn test_object_id_variants() {
        assert_eq!(object_id(&obj(json!({"id": " k "}))).as_deref(), Some("k"));
        assert_eq!(object_id(&obj(json!({"id": 7}))).as_deref(), Some("7"));
        assert_eq!(object_id(&obj(json!({"id": ""}))), None);
        assert_eq!(object_id(&obj(json!({}))), None);
    }
}
