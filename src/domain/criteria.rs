// ==========================================
// 营销对账系统 - 过滤条件与对账选项
// ==========================================

use crate::domain::types::ViewerRole;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// SearchField - 全文搜索字段白名单
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchField {
    Name,
    Team,
    Product,
    Market,
}

impl SearchField {
    pub fn all() -> BTreeSet<SearchField> {
        [
            SearchField::Name,
            SearchField::Team,
            SearchField::Product,
            SearchField::Market,
        ]
        .into_iter()
        .collect()
    }
}

// ==========================================
// FilterCriteria - 过滤条件
// ==========================================
// 空集合 / None / 空字符串 = 该维度不过滤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub start_date: Option<NaiveDate>, // 含
    pub end_date: Option<NaiveDate>,   // 含
    pub products: BTreeSet<String>,
    pub markets: BTreeSet<String>,
    pub teams: BTreeSet<String>,
    pub shifts: BTreeSet<String>,
    pub search_text: String,
    pub search_fields: BTreeSet<SearchField>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            products: BTreeSet::new(),
            markets: BTreeSet::new(),
            teams: BTreeSet::new(),
            shifts: BTreeSet::new(),
            search_text: String::new(),
            search_fields: SearchField::all(),
        }
    }
}

impl FilterCriteria {
    /// 设置日期范围
    pub fn with_date_range(mut self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        self.start_date = start;
        self.end_date = end;
        self
    }

    /// 设置搜索关键字
    pub fn with_search(mut self, text: &str) -> Self {
        self.search_text = text.to_string();
        self
    }

    /// 是否设置了日期过滤
    pub fn has_date_filter(&self) -> bool {
        self.start_date.is_some() || self.end_date.is_some()
    }
}

// ==========================================
// ViewerScope - 数据可见范围
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ViewerScope {
    #[default]
    All,
    Team(String),
    Staff(String),
}

impl ViewerScope {
    /// 由角色 + 团队 + 姓名推导可见范围
    ///
    /// 组长缺少团队信息时退化为仅本人可见
    pub fn from_role(role: ViewerRole, team: &str, staff_name: &str) -> Self {
        match role {
            ViewerRole::Admin => ViewerScope::All,
            ViewerRole::Leader if !team.trim().is_empty() => {
                ViewerScope::Team(team.trim().to_string())
            }
            ViewerRole::Leader | ViewerRole::Staff => {
                ViewerScope::Staff(staff_name.trim().to_string())
            }
        }
    }
}

// ==========================================
// ReconcileOptions - 对账选项
// ==========================================
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReconcileOptions {
    pub include_unmatched_actual: bool,
    pub scope: ViewerScope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_from_role() {
        assert_eq!(
            ViewerScope::from_role(ViewerRole::Admin, "A", "x"),
            ViewerScope::All
        );
        assert_eq!(
            ViewerScope::from_role(ViewerRole::Leader, " A ", "x"),
            ViewerScope::Team("A".to_string())
        );
        assert_eq!(
            ViewerScope::from_role(ViewerRole::Leader, "", "Mai Anh"),
            ViewerScope::Staff("Mai Anh".to_string())
        );
    }

    #[test]
    fn test_default_criteria_searches_all_fields() {
        let c = FilterCriteria::default();
        assert_eq!(c.search_fields.len(), 4);
        assert!(!c.has_date_filter());
    }
}
