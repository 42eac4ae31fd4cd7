// ==========================================
// 营销对账系统 - 过滤谓词
// ==========================================
// 职责: 两类记录共用的过滤逻辑，各维度 AND 组合
// - 日期: 两端包含，按天比较；设置了日期过滤时缺日期的记录被排除
// - 产品/市场/团队: 空选择 = 不过滤；否则必须精确命中
// - 班次: 记录值按逗号拆分去空白，任一标记命中即通过
// - 搜索: 白名单字段不区分大小写子串匹配
// - 可见范围: 组长按团队、员工按姓名键收窄
// ==========================================

use crate::domain::criteria::{FilterCriteria, SearchField, ViewerScope};
use crate::domain::record::RecordFields;
use crate::engine::name_normalizer::{JoinKeyPolicy, NameNormalizer};
use std::collections::BTreeSet;

static DEFAULT_KEY_POLICY: NameNormalizer = NameNormalizer {
    strip_numeric_suffix: true,
};

/// 拆分班次字段
pub fn shift_tokens(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(',').map(str::trim).filter(|t| !t.is_empty())
}

// ==========================================
// RecordPredicate - 过滤谓词
// ==========================================
pub struct RecordPredicate<'a> {
    criteria: &'a FilterCriteria,
    shift_selection: BTreeSet<String>,
    search_lower: String,
    scope: ScopeCheck,
    key_policy: &'a dyn JoinKeyPolicy,
}

enum ScopeCheck {
    All,
    Team(String),
    StaffKey(String),
}

impl<'a> RecordPredicate<'a> {
    /// 构造谓词
    ///
    /// # 参数
    /// - criteria: 过滤条件
    /// - scope: 查看者可见范围
    /// - key_policy: 员工范围比较所用的姓名键策略
    pub fn new(
        criteria: &'a FilterCriteria,
        scope: &ViewerScope,
        key_policy: &'a dyn JoinKeyPolicy,
    ) -> Self {
        let shift_selection = criteria
            .shifts
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let scope = match scope {
            ViewerScope::All => ScopeCheck::All,
            ViewerScope::Team(team) => ScopeCheck::Team(team.trim().to_string()),
            ViewerScope::Staff(name) => ScopeCheck::StaffKey(key_policy.join_key(name)),
        };

        Self {
            criteria,
            shift_selection,
            search_lower: criteria.search_text.trim().to_lowercase(),
            scope,
            key_policy,
        }
    }

    /// 记录是否通过全部过滤维度
    pub fn matches<R: RecordFields + ?Sized>(&self, record: &R) -> bool {
        self.matches_date(record)
            && facet_matches(&self.criteria.products, record.product())
            && facet_matches(&self.criteria.markets, record.market())
            && facet_matches(&self.criteria.teams, record.team())
            && self.matches_shift(record)
            && self.matches_search(record)
            && self.matches_scope(record)
    }

    fn matches_date<R: RecordFields + ?Sized>(&self, record: &R) -> bool {
        if !self.criteria.has_date_filter() {
            return true;
        }
        let day = match record.date() {
            Some(ts) => ts.date(),
            None => return false,
        };
        if let Some(start) = self.criteria.start_date {
            if day < start {
                return false;
            }
        }
        if let Some(end) = self.criteria.end_date {
            if day > end {
                return false;
            }
        }
        true
    }

    fn matches_shift<R: RecordFields + ?Sized>(&self, record: &R) -> bool {
        if self.shift_selection.is_empty() {
            return true;
        }
        shift_tokens(record.shift()).any(|t| self.shift_selection.contains(t))
    }

    fn matches_search<R: RecordFields + ?Sized>(&self, record: &R) -> bool {
        if self.search_lower.is_empty() {
            return true;
        }
        self.criteria.search_fields.iter().any(|field| {
            let value = match field {
                SearchField::Name => record.staff_name(),
                SearchField::Team => record.team(),
                SearchField::Product => record.product(),
                SearchField::Market => record.market(),
            };
            value.to_lowercase().contains(&self.search_lower)
        })
    }

    fn matches_scope<R: RecordFields + ?Sized>(&self, record: &R) -> bool {
        match &self.scope {
            ScopeCheck::All => true,
            ScopeCheck::Team(team) => record.team().trim() == team,
            ScopeCheck::StaffKey(key) => self.key_policy.join_key(record.staff_name()) == *key,
        }
    }
}

fn facet_matches(selection: &BTreeSet<String>, value: &str) -> bool {
    selection.is_empty() || selection.contains(value)
}

/// 构造不带可见范围限制的谓词闭包
pub fn build_predicate<'a, R: RecordFields>(
    criteria: &'a FilterCriteria,
) -> impl Fn(&R) -> bool + 'a {
    let predicate = RecordPredicate::new(criteria, &ViewerScope::All, &DEFAULT_KEY_POLICY);
    move |record: &R| predicate.matches(record)
}
