// ==========================================
// 营销对账系统 - 命令行主入口
// ==========================================
// 子命令:
//   report [from] [to] [--include-unmatched] [--role R --team T --staff N]
//   import <marketing-file> <orders-file> [--include-unmatched]
//   sync
//   audit [limit]
//   revert <audit_id> --actor A
// 输出: stdout 为 JSON（pretty），日志写 stderr
// ==========================================

use std::error::Error;
use std::path::Path;

use chrono::NaiveDate;

use mkt_recon::app::{get_default_db_path, AppState};
use mkt_recon::{FilterCriteria, ReconcileOptions, ViewerRole, ViewerScope};

const USAGE: &str = "\
用法:
  mkt-recon report [from] [to] [--include-unmatched] [--role R --team T --staff N]
  mkt-recon import <marketing-file> <orders-file> [--include-unmatched]
  mkt-recon sync
  mkt-recon audit [limit]
  mkt-recon revert <audit_id> --actor A

日期格式: YYYY-MM-DD
数据库路径: 环境变量 MKT_RECON_DB_PATH（默认用户数据目录）";

/// 解析后的命令行参数
#[derive(Debug, Default)]
struct CliArgs {
    positional: Vec<String>,
    include_unmatched: bool,
    role: Option<String>,
    team: String,
    staff: String,
    actor: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--include-unmatched" => parsed.include_unmatched = true,
            "--role" | "--team" | "--staff" | "--actor" => {
                let value = args
                    .next()
                    .ok_or_else(|| format!("参数 {} 缺少取值", arg))?;
                match arg.as_str() {
                    "--role" => parsed.role = Some(value),
                    "--team" => parsed.team = value,
                    "--actor" => parsed.actor = Some(value),
                    _ => parsed.staff = value,
                }
            }
            flag if flag.starts_with("--") => return Err(format!("未知参数: {}", flag)),
            _ => parsed.positional.push(arg),
        }
    }
    Ok(parsed)
}

fn parse_date(raw: Option<&String>) -> Result<Option<NaiveDate>, String> {
    match raw.map(|s| s.trim()).filter(|s| !s.is_empty()) {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(Some)
            .map_err(|e| format!("日期格式错误 '{}': {}", s, e)),
        None => Ok(None),
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    mkt_recon::logging::init();

    let mut raw = std::env::args().skip(1);
    let Some(command) = raw.next() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    let args = parse_args(raw)?;

    tracing::info!("{} v{} - {}", mkt_recon::APP_NAME, mkt_recon::VERSION, command);

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);
    let state = AppState::new(db_path)?;

    let scope = match args.role.as_deref() {
        Some(role) => ViewerScope::from_role(ViewerRole::from_str(role), &args.team, &args.staff),
        None => ViewerScope::All,
    };
    let options = ReconcileOptions {
        include_unmatched_actual: args.include_unmatched || state.config.include_unmatched_actual,
        scope,
    };

    match command.as_str() {
        "report" => {
            let criteria = FilterCriteria::default().with_date_range(
                parse_date(args.positional.first())?,
                parse_date(args.positional.get(1))?,
            );
            let response = state.report_api.build_report(&criteria, &options).await?;
            for notice in &response.degraded {
                eprintln!(
                    "[降级] {}: 远端不可用，使用本地镜像 {} 条 ({})",
                    notice.collection, notice.mirror_records, notice.reason
                );
            }
            print_json(&response)?;
        }
        "import" => {
            let (Some(marketing), Some(orders)) = (args.positional.first(), args.positional.get(1))
            else {
                return Err(format!("import 需要两个文件参数\n{}", USAGE).into());
            };
            let result = state.report_api.reconcile_files(
                Path::new(marketing),
                Path::new(orders),
                &FilterCriteria::default(),
                &options,
            )?;
            print_json(&result)?;
        }
        "sync" => {
            let report = state.record_api.drain_outbox().await?;
            print_json(&report)?;
        }
        "audit" => {
            let limit = match args.positional.first() {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|e| format!("limit 格式错误 '{}': {}", raw, e))?,
                None => 20,
            };
            let audits = state.record_api.recent_changes(limit)?;
            print_json(&audits)?;
        }
        "revert" => {
            let Some(audit_id) = args.positional.first() else {
                return Err(format!("revert 需要 audit_id\n{}", USAGE).into());
            };
            let Some(actor) = args.actor.as_deref() else {
                return Err(format!("revert 需要 --actor\n{}", USAGE).into());
            };
            let outcome = state.record_api.revert(audit_id, actor).await?;
            if outcome.queued {
                eprintln!("[离线] 撤销已写入发件箱，待 sync 回放");
            }
            print_json(&outcome)?;
        }
        other => {
            return Err(format!("未知子命令: {}\n{}", other, USAGE).into());
        }
    }

    Ok(())
}
