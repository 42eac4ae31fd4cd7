// ==========================================
// 营销对账系统 - 变更审计领域模型
// ==========================================
// 红线: 所有回写必须记录
// 用途: 审计追踪、撤销（按 old_value 回放）
// 对齐: change_audit 表 / 远端审计集合
// ==========================================

use crate::domain::types::WriteKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

// ==========================================
// ChangeAudit - 变更审计
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeAudit {
    // ===== 主键 =====
    pub audit_id: String,

    // ===== 变更对象 =====
    pub collection: String,    // 所属集合
    pub entity_id: String,     // 记录ID
    pub change_type: WriteKind, // 变更类型

    // ===== 变更内容 =====
    pub old_value: Option<JsonValue>, // 变更前（新建时为 None）
    pub new_value: Option<JsonValue>, // 变更后（删除时为 None）

    // ===== 元信息 =====
    pub actor: String,              // 操作人
    pub changed_at: NaiveDateTime,  // 变更时间
    pub reverted: bool,             // 是否已撤销
    pub detail: Option<String>,     // 备注
    pub remote_id: Option<String>,  // 远端审计文档ID（未同步前为 None）
}

impl ChangeAudit {
    /// 创建新的审计记录
    pub fn new(
        collection: &str,
        entity_id: &str,
        change_type: WriteKind,
        actor: &str,
    ) -> Self {
        Self {
            audit_id: uuid::Uuid::new_v4().to_string(),
            collection: collection.to_string(),
            entity_id: entity_id.to_string(),
            change_type,
            old_value: None,
            new_value: None,
            actor: actor.to_string(),
            changed_at: chrono::Utc::now().naive_utc(),
            reverted: false,
            detail: None,
            remote_id: None,
        }
    }

    /// 设置变更前后值
    pub fn with_values(mut self, old_value: Option<JsonValue>, new_value: Option<JsonValue>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    /// 设置备注
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// 远端审计集合的文档格式
    pub fn to_remote_payload(&self) -> JsonValue {
        json!({
            "auditId": self.audit_id,
            "collection": self.collection,
            "entityId": self.entity_id,
            "changeType": self.change_type.as_str(),
            "oldValue": self.old_value,
            "newValue": self.new_value,
            "actorIdentity": self.actor,
            "timestamp": self.changed_at.format("%Y-%m-%dT%H:%M:%S").to_string(),
            "reverted": self.reverted,
        })
    }

    /// 撤销该变更所需的写入（类型 + 负载）
    ///
    /// - 新建 → 删除
    /// - 删除 → 以旧值重建
    /// - 更新/替换 → 以旧值整体替换
    pub fn inverse(&self) -> (WriteKind, Option<JsonValue>) {
        match self.change_type {
            WriteKind::Create => (WriteKind::Delete, None),
            WriteKind::Delete => (WriteKind::Replace, self.old_value.clone()),
            WriteKind::Update | WriteKind::Replace => (WriteKind::Replace, self.old_value.clone()),
        }
    }
}
