//! 스냅샷 병합 + 경고 확인 통합 테스트.
//!
//! 대시보드 파사드로 풀 병합, 푸시 병합, 낙관적 확인이 함께 동작하는지 검증.

mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use chrono::Utc;
use common::{alert, at, server, test_config, MockApi};
use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::alert::AckState;
use sqlaudit_core::models::payload::OverviewPayload;
use sqlaudit_core::models::snapshot::ServerScope;
use sqlaudit_core::ports::api_client::AcknowledgeResponse;
use sqlaudit_core::ports::push::PushEvent;
use sqlaudit_sync::acknowledge::AckError;
use sqlaudit_sync::dashboard::Dashboard;
use sqlaudit_sync::reconcile::{MergeOutcome, PullResult};
use tokio::sync::Notify;

fn dashboard(api: MockApi) -> (Dashboard, Arc<MockApi>) {
    let api = Arc::new(api);
    (Dashboard::new(test_config(), api.clone(), None), api)
}

fn alert_ids(dashboard: &Dashboard) -> Vec<i64> {
    dashboard.snapshot().alerts.iter().map(|a| a.alert_id).collect()
}

#[tokio::test]
async fn acknowledge_is_pending_before_server_answers() {
    let gate = Arc::new(Notify::new());
    let api = MockApi {
        ack_gate: Some(gate.clone()),
        ..MockApi::with_alerts(vec![alert(5, 1, 0)])
    };
    let (dashboard, api) = dashboard(api);
    dashboard.refresh_now().await.unwrap();

    // 1. 첫 poll 에서 낙관적 단계가 끝나고 서버 응답을 기다린다
    let ack = dashboard.acknowledge(5, Some("checking".into()));
    tokio::pin!(ack);
    assert!(futures::poll!(&mut ack).is_pending());
    assert!(dashboard.snapshot().alert(5).unwrap().ack.is_pending());
    assert_eq!(api.ack_requests.lock().len(), 1);

    // 2. 응답 후 Confirmed
    gate.notify_one();
    let state = ack.await.unwrap();
    assert!(state.is_confirmed());
    assert!(dashboard.snapshot().alert(5).unwrap().ack.is_confirmed());
}

#[tokio::test]
async fn acknowledge_twice_is_rejected_while_pending() {
    let (dashboard, _) = dashboard(MockApi::with_alerts(vec![alert(5, 1, 0)]));
    dashboard.refresh_now().await.unwrap();

    dashboard.acknowledgements().begin(5, None).unwrap();
    let second = dashboard.acknowledge(5, None).await;
    assert_matches!(second, Err(AckError::AlreadyAcknowledgedOrUnknown { alert_id: 5 }));

    let unknown = dashboard.acknowledge(42, None).await;
    assert_matches!(unknown, Err(AckError::AlreadyAcknowledgedOrUnknown { alert_id: 42 }));
}

#[tokio::test]
async fn acknowledge_network_failure_restores_unacknowledged() {
    let api = MockApi::with_alerts(vec![alert(5, 1, 0)]);
    *api.ack_result.lock() = Some(Err(CoreError::Network("connection reset".into())));
    let (dashboard, _) = dashboard(api);
    dashboard.refresh_now().await.unwrap();

    let result = dashboard.acknowledge(5, None).await;
    assert_matches!(result, Err(AckError::Failed { alert_id: 5, .. }));
    assert_eq!(dashboard.snapshot().alert(5).unwrap().ack, AckState::Unacknowledged);
}

#[tokio::test]
async fn acknowledge_keeps_request_notes_when_response_omits_them() {
    let api = MockApi::with_alerts(vec![alert(5, 1, 0)]);
    *api.ack_result.lock() = Some(Ok(AcknowledgeResponse {
        acknowledged_by: Some("dba".into()),
        acknowledged_date: Some(at(3).to_rfc3339()),
        notes: None,
    }));
    let (dashboard, _) = dashboard(api);
    dashboard.refresh_now().await.unwrap();

    dashboard.acknowledge(5, Some("index rebuild scheduled".into())).await.unwrap();
    assert_eq!(
        dashboard.snapshot().alert(5).unwrap().ack,
        AckState::Confirmed {
            acknowledged_by: Some("dba".into()),
            acknowledged_at: at(3),
            notes: Some("index rebuild scheduled".into()),
        }
    );
}

#[tokio::test]
async fn older_alert_update_does_not_clobber_pending() {
    let (dashboard, _) = dashboard(MockApi::with_alerts(vec![alert(5, 1, 0)]));
    dashboard.refresh_now().await.unwrap();
    dashboard.acknowledgements().begin(5, None).unwrap();

    // 확인 요청(현재 시각)보다 오래된 타임스탬프
    let outcome = dashboard
        .engine()
        .merge_push(PushEvent::AlertUpdate(alert(5, 1, 1)), Utc::now());

    assert_eq!(outcome, MergeOutcome::Unchanged);
    assert!(dashboard.snapshot().alert(5).unwrap().ack.is_pending());
}

#[tokio::test]
async fn empty_active_alerts_keep_only_pending_alert() {
    let (dashboard, api) = dashboard(MockApi::with_alerts(vec![
        alert(1, 1, 0),
        alert(5, 1, 0),
        alert(7, 2, 0),
    ]));
    dashboard.refresh_now().await.unwrap();
    dashboard.acknowledgements().begin(5, None).unwrap();

    api.set_alerts(vec![]);
    dashboard.refresh_now().await.unwrap();

    assert_eq!(alert_ids(&dashboard), vec![5]);
    assert!(dashboard.snapshot().alert(5).unwrap().ack.is_pending());
}

#[tokio::test]
async fn server_status_push_after_pull_only_adds_server() {
    let (dashboard, _) = dashboard(MockApi::with_alerts(vec![alert(1, 1, 0)]));
    dashboard.refresh_now().await.unwrap();
    let before = dashboard.snapshot();

    let outcome = dashboard
        .engine()
        .merge_push(PushEvent::ServerStatusUpdate(server(9, "Warning")), at(5));
    assert_matches!(outcome, MergeOutcome::Applied { .. });

    let after = dashboard.snapshot();
    assert_eq!(after.servers.len(), 2);
    assert!(after.server(9).is_some());
    assert_eq!(after.alerts, before.alerts);
    assert_eq!(after.metrics, before.metrics);
    assert_eq!(after.databases, before.databases);
    assert_eq!(after.slow_queries, before.slow_queries);
    assert_eq!(after.security_events, before.security_events);
    assert_eq!(after.server_status, before.server_status);
    assert_eq!(after.last_updated, before.last_updated);
}

#[tokio::test]
async fn pull_from_before_stop_start_cycle_is_discarded() {
    let (dashboard, _) = dashboard(MockApi::with_alerts(vec![]));
    let generation = dashboard.engine().gate().current();

    dashboard.start(ServerScope::All);
    dashboard.stop().await;
    dashboard.start(ServerScope::All);
    dashboard.stop().await;
    let revision = dashboard.snapshot().revision;

    let outcome = dashboard.engine().merge_pull(PullResult {
        generation,
        scope: ServerScope::All,
        overview: OverviewPayload {
            active_alerts: Some(vec![alert(99, 1, 0)]),
            ..Default::default()
        },
        servers: None,
        received_at: at(0),
    });

    assert_eq!(outcome, MergeOutcome::Discarded);
    assert_eq!(dashboard.snapshot().revision, revision);
    assert!(dashboard.snapshot().alert(99).is_none());
}

#[tokio::test]
async fn in_flight_refresh_across_restart_is_discarded() {
    let (dashboard, api) = dashboard(MockApi::with_alerts(vec![]));
    let gate = api.hold_next_overview();
    let mut events = dashboard.events();

    // 1. 수동 풀이 개요 응답을 기다리는 중
    let refresh = dashboard.refresh_now();
    tokio::pin!(refresh);
    assert!(futures::poll!(&mut refresh).is_pending());
    assert_eq!(api.overview_calls(), 1);

    // 2. 그 사이 중지/재시작, 새 세대의 풀이 먼저 끝난다
    dashboard.start(ServerScope::All);
    dashboard.stop().await;
    dashboard.start(ServerScope::All);
    api.set_alerts(vec![alert(99, 1, 0)]);

    // 3. 지난 세대의 응답은 병합되지 않는다
    gate.notify_one();
    assert_eq!(refresh.await.unwrap(), MergeOutcome::Discarded);

    let mut stale_seen = false;
    while let Ok(event) = events.try_recv() {
        stale_seen |= matches!(
            event,
            sqlaudit_sync::events::SyncEvent::StalePullDiscarded { .. }
        );
    }
    assert!(stale_seen);
    dashboard.stop().await;
}

#[tokio::test]
async fn malformed_pull_keeps_last_good_snapshot() {
    let (dashboard, api) = dashboard(MockApi::with_alerts(vec![alert(1, 1, 0)]));
    dashboard.refresh_now().await.unwrap();
    let good = dashboard.snapshot();
    let mut events = dashboard.events();

    let mut broken = alert(2, 1, 0);
    broken.alert_id = None;
    api.set_alerts(vec![broken]);

    let outcome = dashboard.refresh_now().await.unwrap();
    assert_matches!(outcome, MergeOutcome::Rejected(_));
    assert_eq!(dashboard.snapshot(), good);
    assert_matches!(
        events.recv().await.unwrap(),
        sqlaudit_sync::events::SyncEvent::PayloadRejected { source: "pull", .. }
    );
}

#[tokio::test]
async fn scoped_pull_drops_alerts_of_other_servers() {
    let (dashboard, api) = dashboard(MockApi::with_alerts(vec![
        alert(1, 1, 0),
        alert(2, 2, 0),
    ]));
    dashboard.set_scope(ServerScope::Server(2));
    dashboard.refresh_now().await.unwrap();

    assert_eq!(alert_ids(&dashboard), vec![2]);
    assert_eq!(api.overview_scopes.lock().as_slice(), &[ServerScope::Server(2)]);
    assert_eq!(dashboard.snapshot().scope, ServerScope::Server(2));
}
