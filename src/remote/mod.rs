// ==========================================
// 营销对账系统 - 远端存储层
// ==========================================
// 职责: 与托管 JSON 存储（Firebase / Supabase）交互
// ==========================================

pub mod error;
pub mod registry;
pub mod rest_client;
pub mod store;

pub use error::{RemoteError, RemoteResult};
pub use registry::StoreRegistry;
pub use rest_client::{parse_created_id, RemoteSettings, RestRecordStore};
pub use store::{apply_write, RecordStore};
