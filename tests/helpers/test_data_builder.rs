// ==========================================
// 测试数据构建器 - 用于集成测试
// ==========================================

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use mkt_recon::domain::record::{ActualOrderRecord, MarketingActivityRecord};
use mkt_recon::domain::types::CheckResult;
use serde_json::{json, Value};

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, s))
        .unwrap()
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ==========================================
// MarketingActivityRecord 构建器
// ==========================================

pub struct MarketingBuilder {
    record: MarketingActivityRecord,
}

impl MarketingBuilder {
    pub fn new(staff_name: &str) -> Self {
        Self {
            record: MarketingActivityRecord {
                staff_name: staff_name.to_string(),
                team: "A".to_string(),
                date: Some(at(2025, 1, 1, 0, 0, 0)),
                shift: "Sáng".to_string(),
                product: "P1".to_string(),
                market: "VN".to_string(),
                ..Default::default()
            },
        }
    }

    pub fn team(mut self, team: &str) -> Self {
        self.record.team = team.to_string();
        self
    }

    pub fn date(mut self, date: Option<NaiveDateTime>) -> Self {
        self.record.date = date;
        self
    }

    pub fn messages(mut self, count: u64) -> Self {
        self.record.message_count = count;
        self
    }

    pub fn orders(mut self, count: u64, revenue: f64) -> Self {
        self.record.order_count = count;
        self.record.revenue = revenue;
        self
    }

    pub fn ad_spend(mut self, amount: f64) -> Self {
        self.record.ad_spend = amount;
        self
    }

    pub fn build(self) -> MarketingActivityRecord {
        self.record
    }
}

// ==========================================
// ActualOrderRecord 构建器
// ==========================================

pub struct OrderBuilder {
    record: ActualOrderRecord,
}

impl OrderBuilder {
    pub fn new(staff_name: &str, amount: f64) -> Self {
        Self {
            record: ActualOrderRecord {
                staff_name: staff_name.to_string(),
                team: "A".to_string(),
                date: Some(at(2025, 1, 1, 0, 0, 0)),
                product: "P1".to_string(),
                market: "VN".to_string(),
                shift_tokens: "Sáng".to_string(),
                total_amount: amount,
                check_result: CheckResult::Ok,
                ..Default::default()
            },
        }
    }

    pub fn team(mut self, team: &str) -> Self {
        self.record.team = team.to_string();
        self
    }

    pub fn date(mut self, date: Option<NaiveDateTime>) -> Self {
        self.record.date = date;
        self
    }

    pub fn cancelled(mut self) -> Self {
        self.record.check_result = CheckResult::Cancelled;
        self
    }

    pub fn build(self) -> ActualOrderRecord {
        self.record
    }
}

// ==========================================
// 远端原始文档（越南语字段名）
// ==========================================

pub fn marketing_doc(name: &str, team: &str, messages: u64, orders: u64, revenue: u64) -> Value {
    json!({
        "Tên": name,
        "Team": team,
        "Ngày": "2025-01-01",
        "Ca": "Sáng",
        "Sản_phẩm": "P1",
        "Thị_trường": "VN",
        "CPQC": 100000,
        "Số_Mess_Cmt": messages,
        "Số_đơn": orders,
        "Doanh_số": revenue,
    })
}

pub fn order_doc(name: &str, team: &str, amount: &str, check: &str) -> Value {
    json!({
        "Nhân viên marketing": name,
        "Team": team,
        "Ngày lên đơn": "2025-01-01",
        "Mặt hàng": "P1",
        "Khu vực": "VN",
        "Ca": "Sáng",
        "Tổng tiền VNĐ": amount,
        "Kết quả check": check,
    })
}
