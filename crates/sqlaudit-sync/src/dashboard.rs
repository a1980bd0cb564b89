//! 대시보드 파사드.
//!
//! 저장소, 병합 엔진, 확인 워크플로, 스케줄러를 묶는다. 뷰 레이어의 유일한 진입점.

use std::sync::Arc;

use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::alert::AckState;
use sqlaudit_core::models::metric::{available_metric_types, MetricSeries};
use sqlaudit_core::models::payload::into_samples;
use sqlaudit_core::models::security::{Page, SecurityEvent, SecurityEventQuery};
use sqlaudit_core::models::snapshot::{DashboardSnapshot, ServerScope};
use sqlaudit_core::ports::api_client::DashboardApi;
use sqlaudit_core::ports::push::PushChannel;
use tokio::sync::{broadcast, watch};
use tracing::debug;

use crate::acknowledge::{AckError, AckWorkflow};
use crate::connectivity::{PushStatus, SyncHealth};
use crate::events::{SyncEvent, SyncEventBus};
use crate::reconcile::{MergeOutcome, ReconciliationEngine};
use crate::scheduler::{Scheduler, SchedulerState, SyncConfig};
use crate::series::build_series;
use crate::store::SnapshotStore;

/// 대시보드 동기화 코어
pub struct Dashboard {
    config: SyncConfig,
    api: Arc<dyn DashboardApi>,
    store: Arc<SnapshotStore>,
    engine: Arc<ReconciliationEngine>,
    acks: AckWorkflow,
    scheduler: Scheduler,
    events: Arc<SyncEventBus>,
}

impl Dashboard {
    /// 새 대시보드 생성 (Idle, 빈 스냅샷)
    pub fn new(
        config: SyncConfig,
        api: Arc<dyn DashboardApi>,
        push: Option<Arc<dyn PushChannel>>,
    ) -> Self {
        let events = Arc::new(SyncEventBus::default());
        let store = Arc::new(SnapshotStore::default());
        let engine = Arc::new(ReconciliationEngine::new(store.clone(), events.clone()));
        let acks = AckWorkflow::new(store.clone(), api.clone(), events.clone());
        let scheduler = Scheduler::new(
            config.clone(),
            engine.clone(),
            api.clone(),
            push,
            events.clone(),
        );
        Self {
            config,
            api,
            store,
            engine,
            acks,
            scheduler,
            events,
        }
    }

    // ============================================================
    // 수명 주기
    // ============================================================

    pub fn start(&self, scope: ServerScope) {
        self.scheduler.start(scope);
    }

    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub fn set_scope(&self, scope: ServerScope) {
        self.scheduler.set_scope(scope);
    }

    pub async fn refresh_now(&self) -> Result<MergeOutcome, CoreError> {
        self.scheduler.refresh_now().await
    }

    // ============================================================
    // 읽기
    // ============================================================

    /// 현재 스냅샷
    pub fn snapshot(&self) -> Arc<DashboardSnapshot> {
        self.store.get_snapshot()
    }

    /// 스냅샷 교체 구독
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.store.subscribe()
    }

    /// 병합 엔진 (푸시 이벤트를 직접 주입하는 호출자용)
    pub fn engine(&self) -> &Arc<ReconciliationEngine> {
        &self.engine
    }

    /// 현재 스냅샷의 최신 메트릭으로 만든 시계열
    pub fn series(&self, metric_type: &str) -> MetricSeries {
        build_series(&self.snapshot().metrics, metric_type, self.config.max_chart_points)
    }

    /// 현재 스냅샷 메트릭에 있는 유형 목록
    pub fn metric_types(&self) -> Vec<String> {
        available_metric_types(&self.snapshot().metrics)
    }

    /// 서버별 메트릭 시계열 (최근 `hours` 시간, 기본값은 설정)
    ///
    /// 스냅샷에는 반영하지 않는다.
    pub async fn server_series(
        &self,
        server_id: i64,
        metric_type: &str,
        hours: Option<u32>,
    ) -> Result<MetricSeries, CoreError> {
        let hours = hours.unwrap_or(self.config.default_chart_hours);
        let payloads = self.api.fetch_server_metrics(server_id, hours).await?;
        let samples = into_samples(payloads).inspect_err(|e| {
            self.events.publish(SyncEvent::PayloadRejected {
                source: "server metrics",
                reason: e.to_string(),
            });
        })?;
        debug!("서버 {server_id} 메트릭 {}개 수신 ({hours}시간)", samples.len());
        Ok(build_series(&samples, metric_type, self.config.max_chart_points))
    }

    /// 보안 이벤트 페이지 (활성 범위, 기본 조회 기간)
    pub async fn security_events(&self, page: u32) -> Result<Page<SecurityEvent>, CoreError> {
        let query = SecurityEventQuery {
            server_id: self.store.scope().server_id(),
            hours: self.config.default_chart_hours,
            page: page.max(1),
            page_size: self.config.security_page_size,
        };
        let response = self.api.fetch_security_events(&query).await?;
        response.into_page(query.page, query.page_size)
    }

    // ============================================================
    // 경고 확인
    // ============================================================

    pub async fn acknowledge(
        &self,
        alert_id: i64,
        notes: Option<String>,
    ) -> Result<AckState, AckError> {
        self.acks.acknowledge(alert_id, notes).await
    }

    /// 확인 워크플로 (낙관적 단계를 따로 호출하려는 경우)
    pub fn acknowledgements(&self) -> &AckWorkflow {
        &self.acks
    }

    // ============================================================
    // 상태
    // ============================================================

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.events.subscribe()
    }

    pub fn health(&self) -> watch::Receiver<SyncHealth> {
        self.scheduler.health().subscribe()
    }

    pub fn push_status(&self) -> PushStatus {
        self.scheduler.push_status()
    }

    pub fn state(&self) -> SchedulerState {
        self.scheduler.state()
    }

    /// 스케줄러 상태 변경 구독
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.scheduler.subscribe_state()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use parking_lot::Mutex;
    use sqlaudit_core::models::payload::{
        AlertPayload, MetricPayload, OverviewPayload, SecurityEventPayload, SecurityEventsResponse,
        ServerPayload,
    };
    use sqlaudit_core::ports::api_client::{AcknowledgeRequest, AcknowledgeResponse};

    #[derive(Default)]
    struct MockApi {
        metrics: Vec<MetricPayload>,
        metric_requests: Mutex<Vec<(i64, u32)>>,
        security_queries: Mutex<Vec<SecurityEventQuery>>,
    }

    #[async_trait]
    impl DashboardApi for MockApi {
        async fn fetch_overview(&self, _scope: ServerScope) -> Result<OverviewPayload, CoreError> {
            Ok(OverviewPayload {
                latest_metrics: Some(self.metrics.clone()),
                ..Default::default()
            })
        }
        async fn fetch_servers(&self) -> Result<Vec<ServerPayload>, CoreError> {
            Ok(vec![])
        }
        async fn fetch_server_metrics(
            &self,
            server_id: i64,
            hours: u32,
        ) -> Result<Vec<MetricPayload>, CoreError> {
            self.metric_requests.lock().push((server_id, hours));
            Ok(self.metrics.clone())
        }
        async fn fetch_alerts(&self, _scope: ServerScope) -> Result<Vec<AlertPayload>, CoreError> {
            Ok(vec![])
        }
        async fn acknowledge_alert(
            &self,
            _alert_id: i64,
            _request: &AcknowledgeRequest,
        ) -> Result<AcknowledgeResponse, CoreError> {
            Ok(AcknowledgeResponse::default())
        }
        async fn fetch_security_events(
            &self,
            query: &SecurityEventQuery,
        ) -> Result<SecurityEventsResponse, CoreError> {
            self.security_queries.lock().push(query.clone());
            Ok(SecurityEventsResponse::List(vec![SecurityEventPayload {
                event_id: Some(1),
                timestamp: Some("2025-03-01T09:00:00Z".into()),
                ..Default::default()
            }]))
        }
    }

    fn metric(metric_type: &str, value: f64, minute: i64) -> MetricPayload {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap() + Duration::minutes(minute);
        MetricPayload {
            server_id: Some(1),
            metric_type: Some(metric_type.into()),
            metric_name: Some(format!("{metric_type} Usage")),
            value: Some(value),
            unit: Some("%".into()),
            timestamp: Some(at.to_rfc3339()),
            ..Default::default()
        }
    }

    fn dashboard(api: MockApi) -> (Dashboard, Arc<MockApi>) {
        let api = Arc::new(api);
        let config = SyncConfig {
            max_chart_points: 2,
            ..SyncConfig::default()
        };
        (Dashboard::new(config, api.clone(), None), api)
    }

    #[tokio::test]
    async fn series_reads_from_current_snapshot() {
        let (dashboard, _) = dashboard(MockApi {
            metrics: vec![metric("CPU", 10.0, 1), metric("CPU", 20.0, 2), metric("CPU", 30.0, 3)],
            ..Default::default()
        });
        assert!(dashboard.series("CPU").is_empty());

        assert!(dashboard.refresh_now().await.unwrap().is_applied());
        let series = dashboard.series("cpu");
        assert_eq!(series.len(), 2);
        assert_eq!(series.last().unwrap().value, 30.0);
        assert_eq!(dashboard.metric_types(), vec!["CPU".to_string()]);
    }

    #[tokio::test]
    async fn server_series_uses_default_window() {
        let (dashboard, api) = dashboard(MockApi {
            metrics: vec![metric("Memory", 50.0, 1)],
            ..Default::default()
        });
        let series = dashboard.server_series(3, "Memory", None).await.unwrap();
        assert_eq!(series.len(), 1);
        dashboard.server_series(3, "Memory", Some(6)).await.unwrap();
        assert_eq!(api.metric_requests.lock().as_slice(), &[(3, 24), (3, 6)]);
    }

    #[tokio::test]
    async fn security_events_follow_scope() {
        let (dashboard, api) = dashboard(MockApi::default());
        dashboard.set_scope(ServerScope::Server(7));

        let page = dashboard.security_events(0).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.page_number, 1);

        let query = api.security_queries.lock()[0].clone();
        assert_eq!(query.server_id, Some(7));
        assert_eq!(query.page, 1);
        assert_eq!(query.page_size, 25);
    }

    #[tokio::test]
    async fn starts_idle_without_push() {
        let (dashboard, _) = dashboard(MockApi::default());
        assert_eq!(dashboard.state(), SchedulerState::Idle);
        assert_eq!(dashboard.push_status(), PushStatus::Disabled);
        assert_eq!(*dashboard.health().borrow(), SyncHealth::Healthy);
    }

    #[tokio::test]
    async fn state_subscription_sees_start_and_stop() {
        let (dashboard, _) = dashboard(MockApi::default());
        let mut state = dashboard.subscribe_state();

        dashboard.start(ServerScope::Server(2));
        assert!(state.has_changed().unwrap());
        assert_eq!(
            *state.borrow_and_update(),
            SchedulerState::Running {
                scope: ServerScope::Server(2)
            }
        );

        dashboard.stop().await;
        assert!(state.has_changed().unwrap());
        assert_eq!(*state.borrow_and_update(), SchedulerState::Idle);
    }
}
