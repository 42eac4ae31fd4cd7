// 运维工具: 回放本地发件箱中积压的离线写入
//
// 用法:
//   cargo run --bin drain_outbox -- [db_path]
//
// 不生成报表，只回放一次；剩余条目保留在发件箱

use mkt_recon::app::{get_default_db_path, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    mkt_recon::logging::init();

    let db_path = std::env::args()
        .nth(1)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(get_default_db_path);

    let state = AppState::new(db_path)?;

    let pending = state.record_api.pending_count()?;
    if pending == 0 {
        println!("outbox empty");
        return Ok(());
    }

    let report = state.record_api.drain_outbox().await?;
    println!(
        "synced={} remaining={}{}",
        report.synced,
        report.remaining,
        report
            .last_error
            .map(|e| format!(" last_error={}", e))
            .unwrap_or_default()
    );
    Ok(())
}
