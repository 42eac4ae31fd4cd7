// ==========================================
// 营销对账系统 - 输入记录模型
// ==========================================
// 两类输入:
// - MarketingActivityRecord: 营销人员自报（每人每天每班次每产品一行）
// - ActualOrderRecord: 实际订单（系统记录，每单一行）
// ==========================================

use crate::domain::types::CheckResult;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// MarketingActivityRecord - 营销自报记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketingActivityRecord {
    pub id: Option<String>,          // 源记录ID (对象键或 id 字段)
    pub staff_name: String,          // 营销人员姓名 (自由文本)
    pub team: String,                // 所属团队
    pub date: Option<NaiveDateTime>, // 报告日期 (None = 缺失或无法解析)
    pub shift: String,               // 班次 (可能为逗号分隔的多值)
    pub product: String,             // 产品
    pub market: String,              // 市场
    pub ad_spend: f64,               // 广告费 (>=0)
    pub message_count: u64,          // 咨询数
    pub order_count: u64,            // 自报成交单数
    pub revenue: f64,                // 自报成交金额
}

// ==========================================
// ActualOrderRecord - 实际订单记录
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActualOrderRecord {
    pub id: Option<String>,
    pub staff_name: String,
    pub team: String,
    pub date: Option<NaiveDateTime>, // 下单日期
    pub product: String,
    pub market: String,
    pub shift_tokens: String,        // 逗号分隔的班次标记
    pub total_amount: f64,           // 订单金额 (>=0)
    pub check_result: CheckResult,   // 检查结果
}

// ==========================================
// RecordFields - 过滤器可见的公共字段
// ==========================================
// 两类记录通过该 trait 共用同一个过滤谓词
pub trait RecordFields {
    fn staff_name(&self) -> &str;
    fn team(&self) -> &str;
    fn date(&self) -> Option<NaiveDateTime>;
    fn product(&self) -> &str;
    fn market(&self) -> &str;
    fn shift(&self) -> &str;
}

impl RecordFields for MarketingActivityRecord {
    fn staff_name(&self) -> &str {
        &self.staff_name
    }
    fn team(&self) -> &str {
        &self.team
    }
    fn date(&self) -> Option<NaiveDateTime> {
        self.date
    }
    fn product(&self) -> &str {
        &self.product
    }
    fn market(&self) -> &str {
        &self.market
    }
    fn shift(&self) -> &str {
        &self.shift
    }
}

impl RecordFields for ActualOrderRecord {
    fn staff_name(&self) -> &str {
        &self.staff_name
    }
    fn team(&self) -> &str {
        &self.team
    }
    fn date(&self) -> Option<NaiveDateTime> {
        self.date
    }
    fn product(&self) -> &str {
        &self.product
    }
    fn market(&self) -> &str {
        &self.market
    }
    fn shift(&self) -> &str {
        &self.shift_tokens
    }
}

impl ActualOrderRecord {
    /// 是否为取消单
    pub fn is_cancelled(&self) -> bool {
        self.check_result == CheckResult::Cancelled
    }
}
