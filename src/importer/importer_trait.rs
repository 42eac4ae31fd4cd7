// ==========================================
// 营销对账系统 - 导入 Trait
// ==========================================
// 职责: 定义导入管道各阶段接口（不包含实现）
// 阶段: 文件解析 → 负载规范化 → 字段映射（含清洗）
// ==========================================

use crate::domain::record::{ActualOrderRecord, MarketingActivityRecord};
use crate::importer::error::ImportResult;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::Path;

// ==========================================
// FileParser Trait
// ==========================================
// 用途: 文件解析接口（首行为表头）
// 实现者: CsvParser, ExcelParser
pub trait FileParser: Send + Sync {
    /// 解析文件为原始行（表头 → 单元格文本），跳过全空行
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>>;
}

// ==========================================
// RecordMapper Trait
// ==========================================
// 用途: 越南语字段名对象 → 标准记录
// 红线: 不失败；缺失/损坏字段按空串、0、无日期处理
pub trait RecordMapper: Send + Sync {
    /// 映射营销自报记录
    fn map_marketing(&self, object: &Map<String, Value>) -> MarketingActivityRecord;

    /// 映射实际订单记录
    fn map_order(&self, object: &Map<String, Value>) -> ActualOrderRecord;
}
