// ==========================================
// 远端/本地同步集成测试
// ==========================================
// 场景: 远端读取失败回退镜像、离线写入排队、发件箱回放与ID映射
// ==========================================

mod test_helpers;

#[path = "helpers/test_data_builder.rs"]
mod test_data_builder;

use mkt_recon::domain::criteria::{FilterCriteria, ReconcileOptions};
use mkt_recon::domain::types::WriteKind;
use mkt_recon::repository::{MirrorRepository, OutboxRepository};
use serde_json::json;
use test_data_builder::{marketing_doc, order_doc};
use test_helpers::{build_env, TestEnv, AUDITS, MARKETING, ORDERS};

fn seed_basic(env: &TestEnv) {
    env.marketing
        .seed(MARKETING, "m1", marketing_doc("Mai Anh", "A", 10, 2, 1_000_000));
    env.orders
        .seed(ORDERS, "o1", order_doc("Mai Anh", "A", "900000", "OK"));
}

// ==========================================
// 读路径
// ==========================================

#[tokio::test]
async fn test_report_falls_back_to_mirror_when_remote_down() {
    let env = build_env();
    seed_basic(&env);

    let online = env
        .state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .expect("在线报表失败");
    assert!(online.degraded.is_empty());
    assert_eq!(online.result.rows.len(), 1);

    env.marketing.set_offline(true);
    env.orders.set_offline(true);

    let offline = env
        .state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .expect("降级不应报错");

    assert_eq!(offline.result, online.result);
    assert_eq!(offline.degraded.len(), 2);
    let collections: Vec<&str> = offline
        .degraded
        .iter()
        .map(|n| n.collection.as_str())
        .collect();
    assert!(collections.contains(&MARKETING));
    assert!(collections.contains(&ORDERS));
    assert!(offline.degraded.iter().all(|n| n.mirror_records == 1));
}

#[tokio::test]
async fn test_each_source_degrades_independently() {
    let env = build_env();
    seed_basic(&env);
    env.orders.set_offline(true);

    // 订单镜像为空，营销数据仍来自远端
    let response = env
        .state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .unwrap();

    assert_eq!(response.degraded.len(), 1);
    assert_eq!(response.degraded[0].collection, ORDERS);
    assert_eq!(response.degraded[0].mirror_records, 0);
    assert_eq!(response.result.rows.len(), 1);
    assert_eq!(response.result.rows[0].message_count, 10);
    assert_eq!(response.result.rows[0].actual_order_count, 0);
}

#[tokio::test]
async fn test_remote_fetch_refreshes_mirror() {
    let env = build_env();
    seed_basic(&env);

    env.state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .unwrap();

    let mirror = MirrorRepository::new(env.conn.clone());
    let cached = mirror.find(ORDERS, "o1").unwrap().expect("镜像中应有 o1");
    assert_eq!(cached.payload["Nhân viên marketing"], "Mai Anh");
    assert!(!cached.deleted);
}

#[tokio::test]
async fn test_array_payload_with_holes_keeps_remote_index_ids() {
    let env = build_env();
    env.marketing
        .seed(MARKETING, "m1", marketing_doc("Mai Anh", "A", 10, 2, 1_000_000));
    env.orders.set_raw_body(
        ORDERS,
        json!([
            null,
            order_doc("Mai Anh", "A", "100000", "OK"),
            order_doc("Mai Anh", "A", "200000", "OK")
        ]),
    );

    let response = env
        .state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!(response.result.rows[0].actual_order_count, 2);

    // Firebase 数字键 1、2：空洞不能让后续记录错位
    let mirror = MirrorRepository::new(env.conn.clone());
    assert!(mirror.find(ORDERS, "0").unwrap().is_none());
    let first = mirror.find(ORDERS, "1").unwrap().expect("镜像中应有 1");
    assert_eq!(first.payload["Tổng tiền VNĐ"], "100000");
    let second = mirror.find(ORDERS, "2").unwrap().expect("镜像中应有 2");
    assert_eq!(second.payload["Tổng tiền VNĐ"], "200000");

    env.state
        .record_api
        .update(ORDERS, "2", json!({"Kết quả check": "Huỷ"}), "admin")
        .await
        .unwrap();
    assert_eq!(env.orders.get(ORDERS, "2").unwrap()["Kết quả check"], "Huỷ");
    assert!(env.orders.get(ORDERS, "1").is_none());
}

// ==========================================
// 写路径
// ==========================================

#[tokio::test]
async fn test_offline_create_is_queued_with_client_uuid() {
    let env = build_env();
    seed_basic(&env);
    env.orders.set_offline(true);

    let outcome = env
        .state
        .record_api
        .create(ORDERS, order_doc("Mai Anh", "A", "500000", "OK"), "mai.anh")
        .await
        .expect("离线写入对调用方视为成功");

    assert!(outcome.queued);
    assert!(!outcome.record_id.starts_with("local_"));
    assert!(uuid::Uuid::parse_str(&outcome.record_id).is_ok());

    // 记录本身 + 审计文档
    assert_eq!(env.state.record_api.pending_count().unwrap(), 2);
    assert_eq!(env.orders.write_count(), 0);

    // 离线报表可见排队中的订单
    let response = env
        .state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .unwrap();
    assert_eq!(response.result.rows[0].actual_order_count, 1);
    assert_eq!(response.result.rows[0].actual_revenue, 500_000.0);
}

#[tokio::test]
async fn test_pending_overlay_applies_over_fresh_remote_read() {
    let env = build_env();
    seed_basic(&env);

    // 先在线读取一次，使 o1 进入镜像
    env.state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .unwrap();

    // 订单远端短暂不可用期间删除 o1
    env.orders.set_offline(true);
    env.state
        .record_api
        .delete(ORDERS, "o1", "admin")
        .await
        .unwrap();
    env.orders.set_offline(false);

    // 不回放，直接读：远端仍有 o1，待同步删除优先
    let outbox = OutboxRepository::new(env.conn.clone());
    let pending = outbox.list_pending_for(ORDERS).unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].kind, WriteKind::Delete);

    let outcome = env
        .state
        .report_api
        .build_report(&FilterCriteria::default(), &ReconcileOptions::default())
        .await
        .unwrap();
    assert!(outcome.degraded.is_empty());
    assert_eq!(outcome.result.rows[0].actual_order_count, 0);
    assert!(env.orders.get(ORDERS, "o1").is_some());
}

// ==========================================
// 回放
// ==========================================

#[tokio::test]
async fn test_drain_replays_in_order_and_remaps_ids() {
    let env = build_env();
    seed_basic(&env);
    env.orders.set_offline(true);

    let created = env
        .state
        .record_api
        .create(ORDERS, order_doc("Mai Anh", "A", "100000", "OK"), "mai.anh")
        .await
        .unwrap();
    let client_id = created.record_id.clone();

    // 对尚未同步的新建记录继续修改
    let updated = env
        .state
        .record_api
        .update(ORDERS, &client_id, json!({"Tổng tiền VNĐ": "200000"}), "mai.anh")
        .await
        .unwrap();
    assert!(updated.queued);
    assert_eq!(updated.record_id, client_id);
    assert_eq!(env.state.record_api.pending_count().unwrap(), 4);

    // 仍离线：回放在第一条失败处停止
    let stalled = env.state.record_api.drain_outbox().await.unwrap();
    assert_eq!(stalled.synced, 0);
    assert_eq!(stalled.remaining, 4);
    assert!(stalled.last_error.is_some());

    env.orders.set_offline(false);
    let report = env.state.record_api.drain_outbox().await.unwrap();
    assert_eq!(report.synced, 4);
    assert_eq!(report.remaining, 0);
    assert!(report.last_error.is_none());

    // 远端只有一条新订单，且已应用更新
    let outbox = OutboxRepository::new(env.conn.clone());
    let synced_create = outbox.find_by_id(&client_id).unwrap().unwrap();
    assert!(synced_create.synced);
    let remote_id = synced_create.remote_id.expect("新建应记录远端ID");
    assert_ne!(remote_id, client_id);

    let remote = env.orders.get(ORDERS, &remote_id).expect("远端应有新订单");
    assert_eq!(remote["Tổng tiền VNĐ"], "200000");
    assert_eq!(env.orders.records(ORDERS).len(), 2);
    assert_eq!(env.orders.records(AUDITS).len(), 2);

    // 镜像与审计均改用远端ID
    let mirror = MirrorRepository::new(env.conn.clone());
    assert!(mirror.find(ORDERS, &client_id).unwrap().is_none());
    assert!(mirror.find(ORDERS, &remote_id).unwrap().is_some());

    let history = env.state.record_api.history(ORDERS, &client_id).unwrap();
    assert_eq!(history.len(), 2);
    assert!(history.iter().all(|a| a.entity_id == remote_id));
    assert!(history
        .iter()
        .all(|a| a.remote_id.as_deref().map_or(false, |id| id.starts_with("-N"))));
}

#[tokio::test]
async fn test_drained_remote_audit_points_at_remote_id() {
    let env = build_env();
    seed_basic(&env);
    env.orders.set_offline(true);

    let created = env
        .state
        .record_api
        .create(ORDERS, order_doc("Lan", "B", "300000", "OK"), "lan")
        .await
        .unwrap();
    assert!(created.queued);

    env.orders.set_offline(false);
    let report = env.state.record_api.drain_outbox().await.unwrap();
    assert_eq!(report.remaining, 0);

    let remote_id = env.state.record_api.history(ORDERS, &created.record_id).unwrap()[0]
        .entity_id
        .clone();
    assert_ne!(remote_id, created.record_id);
    assert!(env.orders.get(ORDERS, &remote_id).is_some());

    let audits = env.orders.records(AUDITS);
    assert_eq!(audits.len(), 1);
    assert_eq!(audits[0].1["entityId"], remote_id.as_str());
}

#[tokio::test]
async fn test_new_write_drains_backlog_first() {
    let env = build_env();
    seed_basic(&env);
    env.orders.set_offline(true);

    env.state
        .record_api
        .update(ORDERS, "o1", json!({"Kết quả check": "Huỷ"}), "admin")
        .await
        .unwrap();
    assert_eq!(env.state.record_api.pending_count().unwrap(), 2);

    env.orders.set_offline(false);
    let outcome = env
        .state
        .record_api
        .update(ORDERS, "o1", json!({"Kết quả check": "OK"}), "admin")
        .await
        .unwrap();

    // 积压先回放，再直接写远端：最终值为最后一次写入
    assert!(!outcome.queued);
    assert_eq!(env.state.record_api.pending_count().unwrap(), 0);
    let remote = env.orders.get(ORDERS, "o1").unwrap();
    assert_eq!(remote["Kết quả check"], "OK");
}
