// ==========================================
// 营销对账系统 - 远端记录存储 Trait
// ==========================================
// 实现者: RestRecordStore（Firebase / Supabase REST）
// 测试中可替换为进程内实现
// ==========================================

use crate::domain::types::WriteKind;
use crate::remote::error::{RemoteError, RemoteResult};
use async_trait::async_trait;
use serde_json::Value;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 读取整个集合（原始负载：数组或对象集合）
    async fn fetch_collection(&self, collection: &str) -> RemoteResult<Value>;

    /// 新建记录，返回远端分配的ID
    async fn create(&self, collection: &str, payload: &Value) -> RemoteResult<String>;

    /// 局部更新 (PATCH)
    async fn update(&self, collection: &str, id: &str, patch: &Value) -> RemoteResult<()>;

    /// 整体替换 (PUT)
    async fn replace(&self, collection: &str, id: &str, payload: &Value) -> RemoteResult<()>;

    /// 删除
    async fn delete(&self, collection: &str, id: &str) -> RemoteResult<()>;
}

/// 按写入类型分派
///
/// # 返回
/// - Ok(Some(id)): 新建成功，远端ID
/// - Ok(None): 更新/替换/删除成功
pub async fn apply_write(
    store: &dyn RecordStore,
    kind: WriteKind,
    collection: &str,
    record_id: Option<&str>,
    payload: Option<&Value>,
) -> RemoteResult<Option<String>> {
    let empty = Value::Null;
    let body = payload.unwrap_or(&empty);

    let id = match (kind, record_id) {
        (WriteKind::Create, _) => return store.create(collection, body).await.map(Some),
        (_, Some(id)) => id,
        (_, None) => {
            return Err(RemoteError::Decode(format!("{} 缺少记录ID", kind.as_str())));
        }
    };

    match kind {
        WriteKind::Update => store.update(collection, id, body).await?,
        WriteKind::Replace => store.replace(collection, id, body).await?,
        WriteKind::Delete => store.delete(collection, id).await?,
        WriteKind::Create => {}
    }
    Ok(None)
}
