// ==========================================
// 营销对账系统 - 本地镜像与发件箱模型
// ==========================================
// 远端写入失败时：写本地镜像 + 入发件箱，恢复网络后按序回放
// 新建记录使用客户端 UUID，同步成功后记录远端分配的ID
// ==========================================

use crate::domain::types::WriteKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// OutboxEntry - 待同步写入
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboxEntry {
    pub op_id: String,                 // 操作ID（新建记录时同时作为本地记录ID）
    pub collection: String,            // 目标集合
    pub record_id: Option<String>,     // 目标记录ID（新建时为 None）
    pub kind: WriteKind,               // 写入类型
    pub payload: Option<JsonValue>,    // 写入内容（删除时为 None）
    pub synced: bool,                  // 是否已同步
    pub attempts: i32,                 // 已尝试次数
    pub last_error: Option<String>,    // 最近一次失败原因
    pub remote_id: Option<String>,     // 远端分配的ID（仅新建）
    pub created_at: NaiveDateTime,
    pub synced_at: Option<NaiveDateTime>,
}

impl OutboxEntry {
    /// 创建待同步写入
    pub fn new(
        collection: &str,
        record_id: Option<String>,
        kind: WriteKind,
        payload: Option<JsonValue>,
    ) -> Self {
        Self {
            op_id: uuid::Uuid::new_v4().to_string(),
            collection: collection.to_string(),
            record_id,
            kind,
            payload,
            synced: false,
            attempts: 0,
            last_error: None,
            remote_id: None,
            created_at: chrono::Utc::now().naive_utc(),
            synced_at: None,
        }
    }

    /// 本地可见的记录ID（新建记录未同步前使用 op_id）
    pub fn local_record_id(&self) -> &str {
        self.record_id.as_deref().unwrap_or(&self.op_id)
    }
}

// ==========================================
// MirrorRecord - 本地镜像记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorRecord {
    pub collection: String,
    pub record_id: String,
    pub payload: JsonValue,
    pub deleted: bool, // 删除墓碑
    pub updated_at: NaiveDateTime,
}

// ==========================================
// WriteOutcome - 回写结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub record_id: String, // 远端ID，或排队时的本地ID
    pub queued: bool,      // true = 远端失败，已进入发件箱
    pub audit_id: String,
}

// ==========================================
// DrainReport - 发件箱回放结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrainReport {
    pub synced: usize,
    pub remaining: usize,
    pub last_error: Option<String>,
}

// ==========================================
// DegradedNotice - 降级提示
// ==========================================
// 远端读取失败、改由本地镜像提供数据时产生
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradedNotice {
    pub collection: String,
    pub reason: String,
    pub mirror_records: usize, // 镜像提供的记录数
}
