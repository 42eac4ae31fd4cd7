// ==========================================
// 营销对账系统 - 文件解析器实现
// ==========================================
// 用途: 离线对账（导出的 CSV / Excel / JSON 快照）
// 支持: Excel (.xlsx/.xls) / CSV (.csv) / JSON (.json)
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::field_mapper::row_to_object;
use crate::importer::importer_trait::FileParser;
use crate::importer::payload::normalize_payload;
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

fn ensure_exists(path: &Path) -> ImportResult<()> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    Ok(())
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl FileParser for CsvParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "csv" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let file = File::open(file_path)?;
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true) // 允许行长度不一致
            .from_reader(file);

        // 表头（去掉 Excel 导出的 BOM）
        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
            .collect();

        let mut records = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row_map = HashMap::new();

            for (col_idx, value) in record.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), value.trim().to_string());
                }
            }

            // 跳过完全空白的行
            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_to_raw_records(&self, file_path: &Path) -> ImportResult<Vec<HashMap<String, String>>> {
        ensure_exists(file_path)?;

        let ext = extension_of(file_path);
        if ext != "xlsx" && ext != "xls" {
            return Err(ImportError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(file_path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无工作表".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ImportError::ExcelParseError(e.to_string()))?;

        // 提取表头（第一行）
        let mut rows = range.rows();
        let header_row = rows
            .next()
            .ok_or_else(|| ImportError::ExcelParseError("Excel 文件无数据行".to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();

        let mut records = Vec::new();
        for data_row in rows {
            let mut row_map = HashMap::new();

            for (col_idx, cell) in data_row.iter().enumerate() {
                if let Some(header) = headers.get(col_idx) {
                    row_map.insert(header.clone(), cell.to_string().trim().to_string());
                }
            }

            if row_map.values().all(|v| v.is_empty()) {
                continue;
            }

            records.push(row_map);
        }

        Ok(records)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 解析为记录对象（供 FieldMapper 使用）
    pub fn parse_objects<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Vec<Map<String, Value>>> {
        let path = file_path.as_ref();
        let ext = extension_of(path);

        let objects = match ext.as_str() {
            "csv" => CsvParser
                .parse_to_raw_records(path)?
                .into_iter()
                .map(row_to_object)
                .collect(),
            "xlsx" | "xls" => ExcelParser
                .parse_to_raw_records(path)?
                .into_iter()
                .map(row_to_object)
                .collect(),
            "json" => {
                ensure_exists(path)?;
                let body: Value = serde_json::from_reader(File::open(path)?)?;
                normalize_payload(body)?
            }
            _ => return Err(ImportError::UnsupportedFormat(ext)),
        };

        tracing::info!("文件解析完成: {} ({} 行)", path.display(), objects.len());
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn temp_with_suffix(suffix: &str) -> tempfile::NamedTempFile {
        Builder::new().suffix(suffix).tempfile().unwrap()
    }

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = temp_with_suffix(".csv");
        writeln!(temp_file, "Tên,Team,Số_đơn").unwrap();
        writeln!(temp_file, "Mai Anh,A,2").unwrap();
        writeln!(temp_file, "Lan,B,3").unwrap();

        let records = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get("Tên"), Some(&"Mai Anh".to_string()));
        assert_eq!(records[1].get("Số_đơn"), Some(&"3".to_string()));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_to_raw_records(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[test]
    fn test_csv_parser_skip_empty_rows() {
        let mut temp_file = temp_with_suffix(".csv");
        writeln!(temp_file, "Tên,Số_đơn").unwrap();
        writeln!(temp_file, "Mai Anh,2").unwrap();
        writeln!(temp_file, ",").unwrap();
        writeln!(temp_file, "Lan,3").unwrap();

        let records = CsvParser.parse_to_raw_records(temp_file.path()).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn test_universal_parser_json_object_of_objects() {
        let mut temp_file = temp_with_suffix(".json");
        write!(temp_file, r#"{{"k1": {{"Tên": "Mai Anh"}}, "k2": {{"Tên": "Lan"}}}}"#).unwrap();

        let objects = UniversalFileParser.parse_objects(temp_file.path()).unwrap();
        assert_eq!(objects.len(), 2);
    }

    #[test]
    fn test_universal_parser_unsupported() {
        let temp_file = temp_with_suffix(".txt");
        let result = UniversalFileParser.parse_objects(temp_file.path());
        assert!(matches!(result, Err(ImportError::UnsupportedFormat(_))));
    }
}
