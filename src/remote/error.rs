// ==========================================
// 营销对账系统 - 远端访问错误类型
// ==========================================
// 所有远端错误在服务层都是可恢复的（降级到本地镜像/发件箱）
// ==========================================

use reqwest::StatusCode;
use thiserror::Error;

/// 远端访问错误类型
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("非预期状态码: {status} ({url})")]
    UnexpectedStatus { status: StatusCode, url: String },

    #[error("响应解析失败: {0}")]
    Decode(String),

    #[error("远端未配置: {0}")]
    NotConfigured(String),

    #[error("远端不可用: {0}")]
    Unavailable(String),
}

/// Result 类型别名
pub type RemoteResult<T> = Result<T, RemoteError>;
