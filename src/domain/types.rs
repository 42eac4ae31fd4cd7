// ==========================================
// 营销对账系统 - 领域类型定义
// ==========================================
// 职责: 订单检查结果、后端类型、写入类型、查看角色
// 序列化格式: SCREAMING_SNAKE_CASE (与本地库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单检查结果 (Check Result)
// ==========================================
// 源数据中的“Kết quả check”为自由文本，多种写法需归一到三类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckResult {
    Ok,        // 正常
    Cancelled, // 已取消 (Huỷ / Hủy / Huy)
    #[default]
    Other,     // 其他/未检查
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckResult::Ok => write!(f, "OK"),
            CheckResult::Cancelled => write!(f, "CANCELLED"),
            CheckResult::Other => write!(f, "OTHER"),
        }
    }
}

// ==========================================
// 后端类型 (Backend Kind)
// ==========================================
// Firebase RTDB 与 Supabase PostgREST 的 URL 约定不同
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackendKind {
    Firebase,
    Supabase,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Firebase => write!(f, "FIREBASE"),
            BackendKind::Supabase => write!(f, "SUPABASE"),
        }
    }
}

impl BackendKind {
    /// 从配置字符串解析（未知值回退 Firebase）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "SUPABASE" => BackendKind::Supabase,
            _ => BackendKind::Firebase,
        }
    }
}

// ==========================================
// 写入类型 (Write Kind)
// ==========================================
// 对应 POST / PATCH / PUT / DELETE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteKind {
    Create,
    Update,
    Replace,
    Delete,
}

impl WriteKind {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteKind::Create => "CREATE",
            WriteKind::Update => "UPDATE",
            WriteKind::Replace => "REPLACE",
            WriteKind::Delete => "DELETE",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(WriteKind::Create),
            "UPDATE" => Some(WriteKind::Update),
            "REPLACE" => Some(WriteKind::Replace),
            "DELETE" => Some(WriteKind::Delete),
            _ => None,
        }
    }
}

impl fmt::Display for WriteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 查看角色 (Viewer Role)
// ==========================================
// 角色来自前端本地存储，未经认证，仅用于数据范围收窄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViewerRole {
    Admin,  // 全部可见
    Leader, // 本组可见
    Staff,  // 仅本人可见
}

impl ViewerRole {
    /// 从字符串解析（未知角色按最小权限处理）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "admin" | "quản lý" | "quan ly" => ViewerRole::Admin,
            "leader" | "trưởng nhóm" | "truong nhom" => ViewerRole::Leader,
            _ => ViewerRole::Staff,
        }
    }
}
