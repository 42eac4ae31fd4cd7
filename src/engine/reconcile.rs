// ==========================================
// 营销对账系统 - 对账引擎
// ==========================================
// 输入: 营销自报记录 + 实际订单记录 + 过滤条件 + 选项
// 输出: 按姓名键聚合的行 + 合计行
// 红线: 无状态引擎，纯函数；不修改输入、不返回错误
// ==========================================

use crate::domain::criteria::{FilterCriteria, ReconcileOptions};
use crate::domain::record::{ActualOrderRecord, MarketingActivityRecord};
use crate::domain::report::{AggregateRow, ReconcileResult, TOTALS_LABEL};
use crate::engine::filter::RecordPredicate;
use crate::engine::name_normalizer::{fold_text, JoinKeyPolicy, NameNormalizer};
use icu_collator::{Collator, CollatorOptions};
use icu_locid::locale;
use std::cmp::Ordering;
use std::collections::HashMap;

// ==========================================
// ReconcileEngine - 对账引擎
// ==========================================
pub struct ReconcileEngine {
    key_policy: Box<dyn JoinKeyPolicy>,
}

impl Default for ReconcileEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconcileEngine {
    /// 创建对账引擎（默认模糊姓名键）
    pub fn new() -> Self {
        Self {
            key_policy: Box::new(NameNormalizer::default()),
        }
    }

    /// 使用指定连接键策略
    pub fn with_key_policy(key_policy: Box<dyn JoinKeyPolicy>) -> Self {
        Self { key_policy }
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 执行对账
    ///
    /// # 流程
    /// 1. 过滤自报记录，按姓名键分组求和（首个原始姓名/团队用于显示）
    /// 2. 过滤实际订单，命中分组的计入该行（取消单另计）
    /// 3. 未命中的订单: 开启 include_unmatched_actual 时按原始姓名进入旁表，
    ///    团队取订单上的团队；无日期的未命中订单直接丢弃
    /// 4. 合并、计算比率、按 团队 → 姓名 排序（同值保持首见顺序）
    /// 5. 合计 = 各行逐列求和，比率由合计值重新计算
    pub fn reconcile(
        &self,
        marketing_records: &[MarketingActivityRecord],
        actual_records: &[ActualOrderRecord],
        criteria: &FilterCriteria,
        options: &ReconcileOptions,
    ) -> ReconcileResult {
        let predicate = RecordPredicate::new(criteria, &options.scope, self.key_policy.as_ref());

        // 1. 自报分组
        let mut seeded: Vec<AggregateRow> = Vec::new();
        let mut seeded_index: HashMap<String, usize> = HashMap::new();

        for record in marketing_records.iter().filter(|r| predicate.matches(*r)) {
            let key = self.key_policy.join_key(&record.staff_name);
            let idx = *seeded_index.entry(key).or_insert_with(|| {
                seeded.push(AggregateRow::new(
                    record.staff_name.trim(),
                    record.team.trim(),
                    false,
                ));
                seeded.len() - 1
            });

            let row = &mut seeded[idx];
            row.message_count += record.message_count;
            row.ad_spend += record.ad_spend;
            row.self_order_count += record.order_count;
            row.self_revenue += record.revenue;
        }

        // 2-3. 实际订单
        let mut unmatched: Vec<AggregateRow> = Vec::new();
        let mut unmatched_index: HashMap<&str, usize> = HashMap::new();
        let mut dropped = 0usize;

        for record in actual_records.iter().filter(|r| predicate.matches(*r)) {
            let key = self.key_policy.join_key(&record.staff_name);

            if let Some(&idx) = seeded_index.get(&key) {
                seeded[idx].add_actual_order(record.total_amount, record.is_cancelled());
                continue;
            }

            if !options.include_unmatched_actual || record.date.is_none() {
                dropped += 1;
                continue;
            }

            let idx = *unmatched_index
                .entry(record.staff_name.as_str())
                .or_insert_with(|| {
                    unmatched.push(AggregateRow::new(
                        record.staff_name.trim(),
                        record.team.trim(),
                        true,
                    ));
                    unmatched.len() - 1
                });
            unmatched[idx].add_actual_order(record.total_amount, record.is_cancelled());
        }

        tracing::debug!(
            "对账完成: 自报分组={}, 未匹配行={}, 丢弃订单={}",
            seeded.len(),
            unmatched.len(),
            dropped
        );

        // 4. 合并 + 比率 + 排序
        let mut rows = seeded;
        rows.extend(unmatched);
        for row in rows.iter_mut() {
            row.refresh_ratios();
        }
        let collator = StaffCollator::new();
        rows.sort_by(|a, b| {
            collator
                .compare(&a.team, &b.team)
                .then_with(|| collator.compare(&a.staff_name, &b.staff_name))
        });

        // 5. 合计
        let totals = compute_totals(&rows);

        ReconcileResult { rows, totals }
    }
}

/// 合计行：逐列求和后重新计算比率（不对各行比率取平均）
pub fn compute_totals(rows: &[AggregateRow]) -> AggregateRow {
    let mut totals = AggregateRow::new(TOTALS_LABEL, "", false);
    for row in rows {
        totals.accumulate(row);
    }
    totals.refresh_ratios();
    totals
}

// ==========================================
// StaffCollator - 越南语排序
// ==========================================
// ă/â 排在 a 之后、đ 排在 d 之后，声调为次级差异
// 排序规则数据不可用时退化为去声调比较
pub struct StaffCollator {
    collator: Option<Collator>,
}

impl Default for StaffCollator {
    fn default() -> Self {
        Self::new()
    }
}

impl StaffCollator {
    pub fn new() -> Self {
        let collator = match Collator::try_new(&locale!("vi").into(), CollatorOptions::new()) {
            Ok(c) => Some(c),
            Err(e) => {
                tracing::warn!("越南语排序规则加载失败，改用去声调比较: {}", e);
                None
            }
        };
        Self { collator }
    }

    /// 比较两个名称；排序规则相等时按原文比较，保证全序
    pub fn compare(&self, a: &str, b: &str) -> Ordering {
        let primary = match &self.collator {
            Some(collator) => collator.compare(a, b),
            None => fold_text(a).cmp(&fold_text(b)),
        };
        primary.then_with(|| a.cmp(b))
    }
}
