// ==========================================
// 营销对账系统 - 记录回写 API
// ==========================================
// 职责: 新建/更新/替换/删除、撤销、发件箱回放
// 红线: 每次回写都写入变更审计（本地表 + 远端审计集合）
// ==========================================

use std::sync::Arc;

use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::api::sync_gateway::SyncGateway;
use crate::domain::audit_log::ChangeAudit;
use crate::domain::sync::{DrainReport, WriteOutcome};
use crate::domain::types::WriteKind;
use crate::repository::AuditLogRepository;

// ==========================================
// RecordApi - 记录回写 API
// ==========================================
pub struct RecordApi {
    gateway: Arc<SyncGateway>,
    audit_repo: Arc<AuditLogRepository>,
    audit_collection: String,
}

impl RecordApi {
    pub fn new(
        gateway: Arc<SyncGateway>,
        audit_repo: Arc<AuditLogRepository>,
        audit_collection: impl Into<String>,
    ) -> Self {
        Self {
            gateway,
            audit_repo,
            audit_collection: audit_collection.into(),
        }
    }

    // ==========================================
    // 回写接口
    // ==========================================

    /// 新建记录
    pub async fn create(&self, collection: &str, payload: Value, actor: &str) -> ApiResult<WriteOutcome> {
        validate_collection(collection)?;
        validate_object(&payload)?;
        self.write_with_audit(collection, WriteKind::Create, None, Some(payload), actor, None)
            .await
    }

    /// 局部更新
    pub async fn update(
        &self,
        collection: &str,
        record_id: &str,
        patch: Value,
        actor: &str,
    ) -> ApiResult<WriteOutcome> {
        validate_collection(collection)?;
        validate_record_id(record_id)?;
        validate_object(&patch)?;
        self.write_with_audit(collection, WriteKind::Update, Some(record_id), Some(patch), actor, None)
            .await
    }

    /// 整体替换
    pub async fn replace(
        &self,
        collection: &str,
        record_id: &str,
        payload: Value,
        actor: &str,
    ) -> ApiResult<WriteOutcome> {
        validate_collection(collection)?;
        validate_record_id(record_id)?;
        validate_object(&payload)?;
        self.write_with_audit(collection, WriteKind::Replace, Some(record_id), Some(payload), actor, None)
            .await
    }

    /// 删除记录
    pub async fn delete(&self, collection: &str, record_id: &str, actor: &str) -> ApiResult<WriteOutcome> {
        validate_collection(collection)?;
        validate_record_id(record_id)?;
        self.write_with_audit(collection, WriteKind::Delete, Some(record_id), None, actor, None)
            .await
    }

    /// 撤销一次变更
    ///
    /// # 规则
    /// - 新建 → 删除；删除 → 以旧值重建；更新/替换 → 以旧值整体替换
    /// - 原审计记录标记 reverted（本地 + 远端），撤销本身另记一条审计
    /// - 已撤销的记录不可再次撤销
    pub async fn revert(&self, audit_id: &str, actor: &str) -> ApiResult<WriteOutcome> {
        let original = self
            .audit_repo
            .find_by_id(audit_id)?
            .ok_or_else(|| ApiError::NotFound(format!("变更审计(id={})不存在", audit_id)))?;

        if original.reverted {
            return Err(ApiError::BusinessRuleViolation(format!(
                "变更 {} 已撤销，不能重复撤销",
                audit_id
            )));
        }

        let (kind, payload) = original.inverse();
        if kind != WriteKind::Delete && payload.is_none() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "变更 {} 缺少旧值，无法撤销",
                audit_id
            )));
        }

        let outcome = self
            .write_with_audit(
                &original.collection,
                kind,
                Some(&original.entity_id),
                payload,
                actor,
                Some(format!("撤销 {}", audit_id)),
            )
            .await?;

        if !self.audit_repo.mark_reverted(audit_id)? {
            return Err(ApiError::BusinessRuleViolation(format!(
                "变更 {} 已被并发撤销",
                audit_id
            )));
        }

        // 远端审计文档同步标记（未同步时 remote_id 为客户端 UUID，回放时改写）
        let refreshed = self.audit_repo.find_by_id(audit_id)?;
        if let Some(remote_id) = refreshed.and_then(|a| a.remote_id) {
            self.gateway
                .write(
                    &self.audit_collection,
                    WriteKind::Update,
                    Some(&remote_id),
                    Some(&json!({ "reverted": true })),
                )
                .await?;
        }

        tracing::info!("变更已撤销: audit_id={}, actor={}", audit_id, actor);
        Ok(outcome)
    }

    /// 回放发件箱
    pub async fn drain_outbox(&self) -> ApiResult<DrainReport> {
        self.gateway.drain().await
    }

    /// 发件箱积压条数
    pub fn pending_count(&self) -> ApiResult<usize> {
        Ok(self.gateway.outbox().count_pending()?)
    }

    /// 最近的变更（最新在前，供撤销时查找 audit_id）
    pub fn recent_changes(&self, limit: usize) -> ApiResult<Vec<ChangeAudit>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        let limit = i32::try_from(limit).unwrap_or(i32::MAX);
        Ok(self.audit_repo.find_recent(limit)?)
    }

    /// 某条记录的变更历史（最新在前）
    pub fn history(&self, collection: &str, record_id: &str) -> ApiResult<Vec<ChangeAudit>> {
        let resolved = self.gateway.resolve_id(record_id)?;
        Ok(self.audit_repo.find_by_entity(collection, &resolved)?)
    }

    // ==========================================
    // 内部
    // ==========================================

    async fn write_with_audit(
        &self,
        collection: &str,
        kind: WriteKind,
        record_id: Option<&str>,
        payload: Option<Value>,
        actor: &str,
        detail: Option<String>,
    ) -> ApiResult<WriteOutcome> {
        let resolved = match record_id {
            Some(id) => Some(self.gateway.resolve_id(id)?),
            None => None,
        };
        let record_id = resolved.as_deref();

        // 旧值取自本地镜像（最近一次已知内容）
        let old_value = match record_id {
            Some(id) => self
                .gateway
                .mirror()
                .find(collection, id)?
                .filter(|r| !r.deleted)
                .map(|r| r.payload),
            None => None,
        };

        let (id, queued) = self
            .gateway
            .write(collection, kind, record_id, payload.as_ref())
            .await?;

        let new_value = match kind {
            WriteKind::Delete => None,
            _ => self
                .gateway
                .mirror()
                .find(collection, &id)?
                .filter(|r| !r.deleted)
                .map(|r| r.payload)
                .or(payload),
        };

        let mut audit = ChangeAudit::new(collection, &id, kind, actor).with_values(old_value, new_value);
        if let Some(detail) = detail {
            audit = audit.with_detail(detail);
        }
        let audit_id = self.record_audit(audit).await?;

        Ok(WriteOutcome {
            record_id: id,
            queued,
            audit_id,
        })
    }

    /// 写入审计：本地表 + 远端审计集合（失败时经发件箱）
    async fn record_audit(&self, mut audit: ChangeAudit) -> ApiResult<String> {
        let (remote_id, _queued) = self
            .gateway
            .write(
                &self.audit_collection,
                WriteKind::Create,
                None,
                Some(&audit.to_remote_payload()),
            )
            .await?;
        audit.remote_id = Some(remote_id);
        Ok(self.audit_repo.insert(&audit)?)
    }
}

fn validate_collection(collection: &str) -> ApiResult<()> {
    if collection.trim().is_empty() {
        return Err(ApiError::InvalidInput("集合名不能为空".to_string()));
    }
    Ok(())
}

fn validate_record_id(record_id: &str) -> ApiResult<()> {
    if record_id.trim().is_empty() {
        return Err(ApiError::InvalidInput("记录ID不能为空".to_string()));
    }
    Ok(())
}

fn validate_object(payload: &Value) -> ApiResult<()> {
    if !payload.is_object() {
        return Err(ApiError::InvalidInput("写入内容必须是 JSON 对象".to_string()));
    }
    Ok(())
}
