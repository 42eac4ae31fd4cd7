// ==========================================
// 营销对账系统 - 对账输出模型
// ==========================================
// AggregateRow: 按规范化姓名聚合的一行（自报 + 实际）
// RatioSet: 派生比率，分母为 0 时取 0（不产生 NaN/Infinity）
// ==========================================

use serde::{Deserialize, Serialize};

/// 合计行显示名
pub const TOTALS_LABEL: &str = "Tổng";

// ==========================================
// RatioSet - 派生比率
// ==========================================
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RatioSet {
    pub closing_rate: f64,       // 成交率 = 自报单数 / 咨询数
    pub cost_per_message: f64,   // 单条咨询成本 = 广告费 / 咨询数
    pub cost_per_order: f64,     // 单均成本 = 广告费 / 自报单数
    pub cost_to_revenue: f64,    // 费效比 = 广告费 / 自报金额
    pub average_order_value: f64, // 客单价 = 自报金额 / 自报单数
}

/// 安全除法：分母为 0 或结果非有限数时返回 0
pub fn safe_div(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let v = numerator / denominator;
    if v.is_finite() {
        v
    } else {
        0.0
    }
}

// ==========================================
// AggregateRow - 聚合行
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateRow {
    // ===== 身份 =====
    pub staff_name: String, // 首次出现的原始姓名（显示用）
    pub team: String,

    // ===== 自报汇总 =====
    pub message_count: u64,
    pub ad_spend: f64,
    pub self_order_count: u64,
    pub self_revenue: f64,

    // ===== 实际订单汇总 =====
    pub actual_order_count: u64,
    pub actual_revenue: f64,
    pub cancelled_order_count: u64, // 取消单另计，不从实际单中扣除
    pub cancelled_revenue: f64,

    // ===== 标记 =====
    pub is_unmatched_actual: bool, // 仅由“显示未匹配订单”选项引入的行

    // ===== 派生 =====
    pub ratios: RatioSet,
}

impl AggregateRow {
    /// 创建空行
    pub fn new(staff_name: &str, team: &str, is_unmatched_actual: bool) -> Self {
        Self {
            staff_name: staff_name.to_string(),
            team: team.to_string(),
            is_unmatched_actual,
            ..Default::default()
        }
    }

    /// 计入一单实际订单
    pub fn add_actual_order(&mut self, amount: f64, cancelled: bool) {
        self.actual_order_count += 1;
        self.actual_revenue += amount;
        if cancelled {
            self.cancelled_order_count += 1;
            self.cancelled_revenue += amount;
        }
    }

    /// 按列累加另一行（用于合计）
    pub fn accumulate(&mut self, other: &AggregateRow) {
        self.message_count += other.message_count;
        self.ad_spend += other.ad_spend;
        self.self_order_count += other.self_order_count;
        self.self_revenue += other.self_revenue;
        self.actual_order_count += other.actual_order_count;
        self.actual_revenue += other.actual_revenue;
        self.cancelled_order_count += other.cancelled_order_count;
        self.cancelled_revenue += other.cancelled_revenue;
    }

    /// 由本行自身的累计值重新计算派生比率
    pub fn refresh_ratios(&mut self) {
        let messages = self.message_count as f64;
        let orders = self.self_order_count as f64;
        self.ratios = RatioSet {
            closing_rate: safe_div(orders, messages),
            cost_per_message: safe_div(self.ad_spend, messages),
            cost_per_order: safe_div(self.ad_spend, orders),
            cost_to_revenue: safe_div(self.ad_spend, self.self_revenue),
            average_order_value: safe_div(self.self_revenue, orders),
        };
    }
}

// ==========================================
// ReconcileResult - 对账结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileResult {
    pub rows: Vec<AggregateRow>,
    pub totals: AggregateRow,
}
