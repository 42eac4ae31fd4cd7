// ==========================================
// 营销对账系统 - 字段映射器实现
// ==========================================
// 职责: 越南语源字段 → 标准字段映射 + 类型转换
// 说明: 各页面/后端的字段名不统一，按别名列表依次查找首个非空值
// ==========================================

use crate::domain::record::{ActualOrderRecord, MarketingActivityRecord};
use crate::importer::data_cleaner::DataCleaner;
use crate::importer::importer_trait::RecordMapper;
use serde_json::{Map, Value};
use std::collections::HashMap;

// ===== 营销自报字段别名 =====
const MKT_ID: &[&str] = &["id", "ID"];
const MKT_STAFF: &[&str] = &["Tên", "Tên NV", "Tên nhân viên", "Nhân viên", "Marketing", "staffName", "name"];
const MKT_TEAM: &[&str] = &["Team", "Nhóm", "team"];
const MKT_DATE: &[&str] = &["Ngày", "Ngày báo cáo", "date"];
const MKT_SHIFT: &[&str] = &["Ca", "Ca làm", "shift"];
const MKT_PRODUCT: &[&str] = &["Sản_phẩm", "Sản phẩm", "product"];
const MKT_MARKET: &[&str] = &["Thị_trường", "Thị trường", "market"];
const MKT_AD_SPEND: &[&str] = &["CPQC", "Chi phí quảng cáo", "Chi_phí_QC", "adSpend"];
const MKT_MESSAGES: &[&str] = &["Số_Mess_Cmt", "Số Mess/Cmt", "Số mess", "messageCount"];
const MKT_ORDERS: &[&str] = &["Số_đơn", "Số đơn", "orderCount"];
const MKT_REVENUE: &[&str] = &["Doanh_số", "Doanh số", "revenue"];

// ===== 实际订单字段别名 =====
const ORD_ID: &[&str] = &["id", "Mã đơn hàng", "Mã đơn"];
const ORD_STAFF: &[&str] = &["Nhân viên marketing", "NV Marketing", "Marketing", "staffName"];
const ORD_TEAM: &[&str] = &["Team", "Nhóm", "team"];
const ORD_DATE: &[&str] = &["Ngày lên đơn", "Ngày đặt", "Ngày", "date"];
const ORD_PRODUCT: &[&str] = &["Mặt hàng", "Sản phẩm", "product"];
const ORD_MARKET: &[&str] = &["Khu vực", "Thị trường", "market"];
const ORD_SHIFT: &[&str] = &["Ca", "shiftTokens", "shift"];
const ORD_AMOUNT: &[&str] = &["Tổng tiền VNĐ", "Tổng tiền", "totalAmount"];
const ORD_CHECK: &[&str] = &["Kết quả check", "Kết quả Check", "checkResult"];

static NULL: Value = Value::Null;

// ==========================================
// FieldMapper - 字段映射器
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    cleaner: DataCleaner,
}

impl FieldMapper {
    pub fn new(cleaner: DataCleaner) -> Self {
        Self { cleaner }
    }

    /// 按别名取首个非空值
    fn lookup<'a>(&self, object: &'a Map<String, Value>, aliases: &[&str]) -> &'a Value {
        aliases
            .iter()
            .filter_map(|alias| object.get(*alias))
            .find(|v| match v {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            })
            .unwrap_or(&NULL)
    }

    fn text(&self, object: &Map<String, Value>, aliases: &[&str]) -> String {
        self.cleaner.clean_text(self.lookup(object, aliases))
    }

    fn id(&self, object: &Map<String, Value>, aliases: &[&str]) -> Option<String> {
        self.cleaner.normalize_null(Some(self.text(object, aliases)))
    }

    /// 批量映射营销自报记录
    pub fn map_marketing_all(&self, objects: &[Map<String, Value>]) -> Vec<MarketingActivityRecord> {
        objects.iter().map(|o| self.map_marketing(o)).collect()
    }

    /// 批量映射实际订单记录
    pub fn map_order_all(&self, objects: &[Map<String, Value>]) -> Vec<ActualOrderRecord> {
        objects.iter().map(|o| self.map_order(o)).collect()
    }
}

impl RecordMapper for FieldMapper {
    fn map_marketing(&self, object: &Map<String, Value>) -> MarketingActivityRecord {
        MarketingActivityRecord {
            id: self.id(object, MKT_ID),
            staff_name: self.text(object, MKT_STAFF),
            team: self.text(object, MKT_TEAM),
            date: self.cleaner.parse_date(self.lookup(object, MKT_DATE)),
            shift: self.text(object, MKT_SHIFT),
            product: self.text(object, MKT_PRODUCT),
            market: self.text(object, MKT_MARKET),
            ad_spend: self.cleaner.coerce_amount(self.lookup(object, MKT_AD_SPEND)),
            message_count: self.cleaner.coerce_count(self.lookup(object, MKT_MESSAGES)),
            order_count: self.cleaner.coerce_count(self.lookup(object, MKT_ORDERS)),
            revenue: self.cleaner.coerce_amount(self.lookup(object, MKT_REVENUE)),
        }
    }

    fn map_order(&self, object: &Map<String, Value>) -> ActualOrderRecord {
        ActualOrderRecord {
            id: self.id(object, ORD_ID),
            staff_name: self.text(object, ORD_STAFF),
            team: self.text(object, ORD_TEAM),
            date: self.cleaner.parse_date(self.lookup(object, ORD_DATE)),
            product: self.text(object, ORD_PRODUCT),
            market: self.text(object, ORD_MARKET),
            shift_tokens: self.text(object, ORD_SHIFT),
            total_amount: self.cleaner.coerce_amount(self.lookup(object, ORD_AMOUNT)),
            check_result: self.cleaner.parse_check_result(self.lookup(object, ORD_CHECK)),
        }
    }
}

/// 文件行（表头 → 文本）转为 JSON 对象，复用同一套映射
pub fn row_to_object(row: HashMap<String, String>) -> Map<String, Value> {
    row.into_iter().map(|(k, v)| (k, Value::String(v))).collect()
}
