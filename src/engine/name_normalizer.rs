// ==========================================
// 营销对账系统 - 姓名规范化器
// ==========================================
// 职责: 生成对账/分组用的姓名键
// 规则: 去首尾空白 → 小写 → 去越南语声调 → 合并空白 → 去尾部纯数字词
// 说明: 尾部数字剥离是独立开关（"Trần Thị B 2" 视为 "Trần Thị B"），
//       末尾带数字的不同员工会被合并，按需关闭
// ==========================================

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// 折叠文本：小写 + 去组合声调符号 + đ→d
///
/// 不处理空白；供姓名键、检查结果识别与排序比较复用
pub fn fold_text(raw: &str) -> String {
    raw.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == 'đ' { 'd' } else { c })
        .collect()
}

// ==========================================
// JoinKeyPolicy - 连接键策略
// ==========================================
// 对账引擎只依赖该 trait，上游若提供稳定员工ID可替换为精确匹配
pub trait JoinKeyPolicy: Send + Sync {
    /// 由原始姓名生成连接键
    fn join_key(&self, raw: &str) -> String;
}

// ==========================================
// NameNormalizer - 模糊姓名键
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NameNormalizer {
    /// 是否剥离尾部纯数字词
    pub strip_numeric_suffix: bool,
}

impl Default for NameNormalizer {
    fn default() -> Self {
        Self {
            strip_numeric_suffix: true,
        }
    }
}

impl NameNormalizer {
    pub fn new(strip_numeric_suffix: bool) -> Self {
        Self {
            strip_numeric_suffix,
        }
    }

    /// 规范化姓名（空输入返回空串，不会失败）
    pub fn normalize(&self, raw: &str) -> String {
        let folded = fold_text(raw.trim());
        let mut words: Vec<&str> = folded.split_whitespace().collect();

        if self.strip_numeric_suffix {
            // 循环剥离保证幂等: "b 2 3" → "b"
            while words.len() > 1 {
                match words.last() {
                    Some(w) if w.chars().all(|c| c.is_ascii_digit()) => {
                        words.pop();
                    }
                    _ => break,
                }
            }
        }

        words.join(" ")
    }
}

impl JoinKeyPolicy for NameNormalizer {
    fn join_key(&self, raw: &str) -> String {
        self.normalize(raw)
    }
}

// ==========================================
// ExactNameKey - 精确键（仅去首尾空白）
// ==========================================
#[derive(Debug, Clone, Copy, Default)]
pub struct ExactNameKey;

impl JoinKeyPolicy for ExactNameKey {
    fn join_key(&self, raw: &str) -> String {
        raw.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_vietnamese() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("Nguyễn Văn A"), n.normalize("nguyen van a"));
        assert_eq!(n.normalize("Nguyễn Văn A"), "nguyen van a");
        assert_eq!(n.normalize("Đặng Thu Hà"), "dang thu ha");
    }

    #[test]
    fn test_strip_numeric_suffix() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("Trần Thị B 2"), n.normalize("Trần Thị B"));
        // 非独立数字词不剥离
        assert_eq!(n.normalize("Lan2"), "lan2");
        // 单独数字不剥离为空
        assert_eq!(n.normalize("2"), "2");
    }

    #[test]
    fn test_strip_numeric_suffix_disabled() {
        let n = NameNormalizer::new(false);
        assert_ne!(n.normalize("Trần Thị B 2"), n.normalize("Trần Thị B"));
    }

    #[test]
    fn test_whitespace_and_empty() {
        let n = NameNormalizer::default();
        assert_eq!(n.normalize("  Mai    Anh \t"), "mai anh");
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
    }

    #[test]
    fn test_idempotent() {
        let n = NameNormalizer::default();
        for raw in [
            "Nguyễn Văn A",
            "Trần Thị B 2 3",
            "  ĐỖ   Hùng 10 ",
            "İstanbul",
            "Lê\u{0301} Ánh",
            "",
            "42",
        ] {
            let once = n.normalize(raw);
            assert_eq!(n.normalize(&once), once, "not idempotent for {:?}", raw);
        }
    }

    #[test]
    fn test_exact_key_policy() {
        let policy = ExactNameKey;
        assert_eq!(policy.join_key("  Mai Anh "), "Mai Anh");
        assert_ne!(policy.join_key("Mai Anh 2"), policy.join_key("Mai Anh"));
    }
}
