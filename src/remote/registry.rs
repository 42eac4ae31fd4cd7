// ==========================================
// 营销对账系统 - 集合 → 远端存储路由
// ==========================================
// 营销自报与实际订单可能位于不同后端；审计集合与订单同库
// ==========================================

use crate::remote::error::{RemoteError, RemoteResult};
use crate::remote::store::RecordStore;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct StoreRegistry {
    routes: HashMap<String, Arc<dyn RecordStore>>,
}

impl StoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为指定集合注册存储
    pub fn with_route(mut self, collection: &str, store: Arc<dyn RecordStore>) -> Self {
        self.routes.insert(collection.to_string(), store);
        self
    }

    pub fn store_for(&self, collection: &str) -> RemoteResult<Arc<dyn RecordStore>> {
        self.routes
            .get(collection)
            .cloned()
            .ok_or_else(|| RemoteError::NotConfigured(format!("集合 {} 未配置远端", collection)))
    }
}
