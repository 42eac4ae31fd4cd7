// ==========================================
// 营销对账系统 - 导入层
// ==========================================
// 职责: 远端 JSON / 导出文件 → 标准记录
// 支持: JSON 负载（数组/对象集合）, Excel, CSV
// ==========================================

pub mod data_cleaner;
pub mod error;
pub mod field_mapper;
pub mod file_parser;
pub mod importer_trait;
pub mod payload;

// 重导出核心类型
pub use data_cleaner::{DataCleaner, DEFAULT_CANCEL_TOKENS};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{row_to_object, FieldMapper};
pub use file_parser::{CsvParser, ExcelParser, UniversalFileParser};
pub use importer_trait::{FileParser, RecordMapper};
pub use payload::normalize_payload;
