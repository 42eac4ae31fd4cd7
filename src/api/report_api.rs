// ==========================================
// 营销对账系统 - 报表 API
// ==========================================
// 职责: 并发读取两类数据源 → 字段映射 → 对账
// 降级: 任一数据源远端失败时改用本地镜像，并在结果中附带降级提示
// ==========================================

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::api::error::ApiResult;
use crate::api::sync_gateway::SyncGateway;
use crate::domain::criteria::{FilterCriteria, ReconcileOptions};
use crate::domain::record::{ActualOrderRecord, MarketingActivityRecord};
use crate::domain::report::ReconcileResult;
use crate::domain::sync::DegradedNotice;
use crate::engine::{NameNormalizer, ReconcileEngine};
use crate::importer::{DataCleaner, FieldMapper, UniversalFileParser};

/// 报表结果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportResponse {
    pub result: ReconcileResult,
    pub degraded: Vec<DegradedNotice>,
}

/// 报表 API 的规则参数
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub marketing_collection: String,
    pub orders_collection: String,
    pub strip_numeric_suffix: bool,
    pub cancel_tokens: Vec<String>,
}

// ==========================================
// ReportApi - 报表 API
// ==========================================
pub struct ReportApi {
    gateway: Arc<SyncGateway>,
    settings: ReportSettings,
    mapper: FieldMapper,
    engine: ReconcileEngine,
}

impl ReportApi {
    pub fn new(gateway: Arc<SyncGateway>, settings: ReportSettings) -> Self {
        let mapper = FieldMapper::new(DataCleaner::new(settings.cancel_tokens.clone()));
        let engine = ReconcileEngine::with_key_policy(Box::new(NameNormalizer::new(
            settings.strip_numeric_suffix,
        )));
        Self {
            gateway,
            settings,
            mapper,
            engine,
        }
    }

    /// 生成对账报表
    ///
    /// # 参数
    /// - criteria: 过滤条件
    /// - options: 未匹配订单开关 + 可见范围
    ///
    /// # 返回
    /// - Ok(ReportResponse): 对账结果 + 降级提示（远端全部成功时为空）
    /// - Err(ApiError): 本地镜像也不可读时
    pub async fn build_report(
        &self,
        criteria: &FilterCriteria,
        options: &ReconcileOptions,
    ) -> ApiResult<ReportResponse> {
        let (marketing, orders) = futures::future::join(
            self.gateway.fetch_objects(&self.settings.marketing_collection),
            self.gateway.fetch_objects(&self.settings.orders_collection),
        )
        .await;
        let (marketing, orders) = (marketing?, orders?);

        let degraded: Vec<DegradedNotice> = marketing
            .degraded
            .into_iter()
            .chain(orders.degraded)
            .collect();

        let marketing_records = self.mapper.map_marketing_all(&marketing.objects);
        let actual_records = self.mapper.map_order_all(&orders.objects);

        tracing::info!(
            "对账输入: marketing={}, orders={}, degraded={}",
            marketing_records.len(),
            actual_records.len(),
            degraded.len()
        );

        let result = self.reconcile(&marketing_records, &actual_records, criteria, options);
        Ok(ReportResponse { result, degraded })
    }

    /// 离线对账（导出的 CSV / Excel / JSON 快照）
    pub fn reconcile_files(
        &self,
        marketing_file: &Path,
        orders_file: &Path,
        criteria: &FilterCriteria,
        options: &ReconcileOptions,
    ) -> ApiResult<ReconcileResult> {
        let parser = UniversalFileParser;
        let marketing_records = self
            .mapper
            .map_marketing_all(&parser.parse_objects(marketing_file)?);
        let actual_records = self.mapper.map_order_all(&parser.parse_objects(orders_file)?);

        Ok(self.reconcile(&marketing_records, &actual_records, criteria, options))
    }

    /// 对已映射的记录执行对账
    pub fn reconcile(
        &self,
        marketing_records: &[MarketingActivityRecord],
        actual_records: &[ActualOrderRecord],
        criteria: &FilterCriteria,
        options: &ReconcileOptions,
    ) -> ReconcileResult {
        self.engine
            .reconcile(marketing_records, actual_records, criteria, options)
    }
}
