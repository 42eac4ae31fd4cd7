// ==========================================
// 营销对账系统 - 数据清洗器
// ==========================================
// 职责: TRIM / 数值容错转换 / 日期解析 / 检查结果归一
// 红线: 清洗永不失败，无法识别的值落到默认值（空串、0、无日期、Other）
// ==========================================

use crate::domain::types::CheckResult;
use crate::engine::name_normalizer::fold_text;
use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::Value;

/// 默认取消标记（去声调小写后比较）
pub const DEFAULT_CANCEL_TOKENS: &[&str] = &["huy", "cancel", "cancelled", "canceled"];

/// 金额中需要剔除的货币标记
const CURRENCY_MARKS: &[&str] = &["vnđ", "vnd", "đ", "₫"];

/// 日期时间格式（按顺序尝试）
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

/// 日期格式（按顺序尝试）
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d", "%Y%m%d"];

// ==========================================
// DataCleaner - 数据清洗器
// ==========================================
#[derive(Debug, Clone)]
pub struct DataCleaner {
    cancel_tokens: Vec<String>,
}

impl Default for DataCleaner {
    fn default() -> Self {
        Self::new(DEFAULT_CANCEL_TOKENS.iter().map(|s| s.to_string()).collect())
    }
}

impl DataCleaner {
    /// 创建清洗器
    ///
    /// # 参数
    /// - cancel_tokens: 取消标记（内部会去声调小写）
    pub fn new(cancel_tokens: Vec<String>) -> Self {
        let cancel_tokens = cancel_tokens
            .iter()
            .map(|t| collapse(&fold_text(t)))
            .filter(|t| !t.is_empty())
            .collect();
        Self { cancel_tokens }
    }

    /// 文本字段：字符串去首尾空白，数字/布尔转文本，其余为空串
    pub fn clean_text(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => String::new(),
        }
    }

    /// 空白字符串标准化为 None
    pub fn normalize_null(&self, value: Option<String>) -> Option<String> {
        value.and_then(|v| {
            let trimmed = v.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        })
    }

    /// 金额字段（>=0，非有限数或负数按 0）
    pub fn coerce_amount(&self, value: &Value) -> f64 {
        let raw = match value {
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => parse_amount_str(s).unwrap_or(0.0),
            _ => 0.0,
        };
        if raw.is_finite() && raw > 0.0 {
            raw
        } else {
            0.0
        }
    }

    /// 计数字段（四舍五入为非负整数）
    pub fn coerce_count(&self, value: &Value) -> u64 {
        self.coerce_amount(value).round() as u64
    }

    /// 日期字段（本地时间；无法解析返回 None）
    ///
    /// 数值: 19000101..=29991231 视为 YYYYMMDD，否则视为毫秒时间戳
    pub fn parse_date(&self, value: &Value) -> Option<NaiveDateTime> {
        match value {
            Value::String(s) => parse_date_str(s),
            Value::Number(n) => {
                let v = n.as_i64()?;
                if (19_000_101..=29_991_231).contains(&v) {
                    parse_date_str(&v.to_string())
                } else {
                    Local
                        .timestamp_millis_opt(v)
                        .single()
                        .map(|dt| dt.naive_local())
                }
            }
            _ => None,
        }
    }

    /// 检查结果归一：OK → Ok；命中取消标记（整词或前缀词）→ Cancelled；其余 Other
    pub fn parse_check_result(&self, value: &Value) -> CheckResult {
        let text = collapse(&fold_text(&self.clean_text(value)));
        if text.is_empty() {
            return CheckResult::Other;
        }
        if text == "ok" {
            return CheckResult::Ok;
        }
        let cancelled = self.cancel_tokens.iter().any(|token| {
            text == *token
                || text
                    .strip_prefix(token.as_str())
                    .map_or(false, |rest| rest.starts_with(' '))
        });
        if cancelled {
            CheckResult::Cancelled
        } else {
            CheckResult::Other
        }
    }
}

/// 合并空白
fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 解析金额文本
///
/// - 剔除货币标记与空白
/// - "1.000.000" / "1,000,000" 视为千分位
/// - 单个逗号且无点号时视为小数点（"2,5"）
fn parse_amount_str(raw: &str) -> Option<f64> {
    let mut s: String = raw.trim().to_lowercase();
    for mark in CURRENCY_MARKS {
        s = s.replace(mark, "");
    }
    let s: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    if s.is_empty() {
        return None;
    }

    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };

    let cleaned = if is_grouped(digits, '.') {
        digits.replace('.', "")
    } else if is_grouped(digits, ',') {
        digits.replace(',', "")
    } else if digits.matches(',').count() == 1 && !digits.contains('.') {
        digits.replace(',', ".")
    } else {
        digits.to_string()
    };

    format!("{}{}", sign, cleaned).parse::<f64>().ok()
}

/// 是否为千分位分组数字（首段 1-3 位，其余各段恰好 3 位）
fn is_grouped(s: &str, sep: char) -> bool {
    let parts: Vec<&str> = s.split(sep).collect();
    if parts.len() < 2 {
        return false;
    }
    let all_digits = |p: &str| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit());
    all_digits(parts[0])
        && parts[0].len() <= 3
        && parts[1..].iter().all(|p| p.len() == 3 && all_digits(p))
}

/// 解析日期文本
fn parse_date_str(raw: &str) -> Option<NaiveDateTime> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0);
        }
    }

    tracing::debug!("无法解析日期: {}", s);
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_text_basic() {
        let cleaner = DataCleaner::default();
        assert_eq!(cleaner.clean_text(&json!("  hello  ")), "hello");
        assert_eq!(cleaner.clean_text(&json!(12)), "12");
        assert_eq!(cleaner.clean_text(&Value::Null), "");
    }

    #[test]
    fn test_normalize_null() {
        let cleaner = DataCleaner::default();
        assert_eq!(cleaner.normalize_null(Some("  ".to_string())), None);
        assert_eq!(
            cleaner.normalize_null(Some("  value  ".to_string())),
            Some("value".to_string())
        );
        assert_eq!(cleaner.normalize_null(None), None);
    }

    #[test]
    fn test_coerce_amount_vietnamese_formats() {
        let cleaner = DataCleaner::default();
        assert_eq!(cleaner.coerce_amount(&json!(900000)), 900_000.0);
        assert_eq!(cleaner.coerce_amount(&json!("1.000.000")), 1_000_000.0);
        assert_eq!(cleaner.coerce_amount(&json!("1,000,000 đ")), 1_000_000.0);
        assert_eq!(cleaner.coerce_amount(&json!("500.000 VNĐ")), 500_000.0);
        assert_eq!(cleaner.coerce_amount(&json!("2,5")), 2.5);
        assert_eq!(cleaner.coerce_amount(&json!("1.5")), 1.5);
    }

    #[test]
    fn test_coerce_amount_garbage_is_zero() {
        let cleaner = DataCleaner::default();
        assert_eq!(cleaner.coerce_amount(&json!("abc")), 0.0);
        assert_eq!(cleaner.coerce_amount(&json!("-200")), 0.0);
        assert_eq!(cleaner.coerce_amount(&Value::Null), 0.0);
        assert_eq!(cleaner.coerce_amount(&json!({"x": 1})), 0.0);
        assert_eq!(cleaner.coerce_count(&json!("3")), 3);
    }

    #[test]
    fn test_parse_date_formats() {
        let cleaner = DataCleaner::default();
        let day = NaiveDate::from_ymd_opt(2025, 1, 20).unwrap();

        for raw in ["2025-01-20", "20/01/2025", "20250120"] {
            let parsed = cleaner.parse_date(&json!(raw)).unwrap();
            assert_eq!(parsed.date(), day, "format {}", raw);
        }

        let parsed = cleaner.parse_date(&json!("2025-01-20T23:59:59")).unwrap();
        assert_eq!(parsed, day.and_hms_opt(23, 59, 59).unwrap());

        let parsed = cleaner.parse_date(&json!(20250120)).unwrap();
        assert_eq!(parsed.date(), day);
    }

    #[test]
    fn test_parse_date_invalid() {
        let cleaner = DataCleaner::default();
        assert_eq!(cleaner.parse_date(&json!("hôm qua")), None);
        assert_eq!(cleaner.parse_date(&json!("")), None);
        assert_eq!(cleaner.parse_date(&Value::Null), None);
    }

    #[test]
    fn test_parse_check_result_spellings() {
        let cleaner = DataCleaner::default();
        for raw in ["Huỷ", "Hủy", "Huy", "hủy đơn", " HỦY "] {
            assert_eq!(
                cleaner.parse_check_result(&json!(raw)),
                CheckResult::Cancelled,
                "spelling {}",
                raw
            );
        }
        assert_eq!(cleaner.parse_check_result(&json!("OK")), CheckResult::Ok);
        assert_eq!(cleaner.parse_check_result(&json!("ok ")), CheckResult::Ok);
        assert_eq!(cleaner.parse_check_result(&json!("Huyền")), CheckResult::Other);
        assert_eq!(cleaner.parse_check_result(&Value::Null), CheckResult::Other);
    }

    #[test]
    fn test_custom_cancel_tokens() {
        let cleaner = DataCleaner::new(vec!["Hoàn".to_string()]);
        assert_eq!(cleaner.parse_check_result(&json!("hoàn")), CheckResult::Cancelled);
        assert_eq!(cleaner.parse_check_result(&json!("Huỷ")), CheckResult::Other);
    }
}
