// ==========================================
// 营销对账系统 - 负载规范化
// ==========================================
// 远端返回两种结构:
// - 数组（Supabase / Firebase 数字键）
// - 对象集合（Firebase push 键 → 记录），取其值，键补为 id
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use serde_json::{Map, Value};

/// 将远端负载规范化为记录对象列表
///
/// - null → 空列表
/// - 数组元素缺少 id 时以原始下标为 id（Firebase 数字键，空洞不影响编号）
/// - 数组/对象集合中的非对象元素（如 Firebase 删除留下的 null）被跳过
/// - 其余标量 → PayloadShape 错误
pub fn normalize_payload(body: Value) -> ImportResult<Vec<Map<String, Value>>> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => Ok(items
            .into_iter()
            .enumerate()
            .filter_map(|(idx, item)| match item {
                Value::Object(mut map) => {
                    if !has_id(&map) {
                        map.insert("id".to_string(), Value::String(idx.to_string()));
                    }
                    Some(map)
                }
                _ => None,
            })
            .collect()),
        Value::Object(entries) => Ok(entries
            .into_iter()
            .filter_map(|(key, item)| match item {
                Value::Object(mut map) => {
                    if !map.contains_key("id") {
                        map.insert("id".to_string(), Value::String(key));
                    }
                    Some(map)
                }
                _ => None,
            })
            .collect()),
        other => Err(ImportError::PayloadShape(kind_of(&other).to_string())),
    }
}

fn has_id(map: &Map<String, Value>) -> bool {
    match map.get("id") {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Number(_)) => true,
        _ => false,
    }
}

fn kind_of(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
