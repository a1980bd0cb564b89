//! 통합 테스트 공용 Mock 포트.
//!
//! `MockApi`: 응답을 바꿔 끼울 수 있는 REST 포트, 호출 기록 포함.
//! `MockPush`: 연결마다 이벤트 채널을 만들고 그룹 구독 호출을 기록하는 푸시 포트.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::payload::{
    AlertPayload, MetricPayload, OverviewPayload, SecurityEventsResponse, ServerPayload,
};
use sqlaudit_core::models::security::SecurityEventQuery;
use sqlaudit_core::models::snapshot::ServerScope;
use sqlaudit_core::ports::api_client::{AcknowledgeRequest, AcknowledgeResponse, DashboardApi};
use sqlaudit_core::ports::push::{PushChannel, PushConnection, PushControl, PushEvent};
use sqlaudit_sync::scheduler::SyncConfig;
use tokio::sync::{mpsc, Notify};

// ============================================================
// 픽스처
// ============================================================

pub fn at(minute: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap() + chrono::Duration::minutes(minute)
}

pub fn alert(id: i64, server_id: i64, minute: i64) -> AlertPayload {
    AlertPayload {
        alert_id: Some(id),
        alert_name: Some(format!("alert-{id}")),
        alert_type: Some("Performance".into()),
        server_id: Some(server_id),
        server_name: Some(format!("SQL{server_id:02}")),
        severity: Some("High".into()),
        message: Some("threshold exceeded".into()),
        timestamp: Some(at(minute).to_rfc3339()),
        is_acknowledged: Some(false),
        ..Default::default()
    }
}

pub fn server(id: i64, status: &str) -> ServerPayload {
    ServerPayload {
        server_id: Some(id),
        server_name: Some(format!("SQL{id:02}")),
        status: Some(status.into()),
        last_seen: Some(at(0).to_rfc3339()),
        ..Default::default()
    }
}

/// 경고 전용 풀 없는 테스트용 설정
pub fn test_config() -> SyncConfig {
    SyncConfig {
        alerts_refresh_interval: None,
        ..SyncConfig::default()
    }
}

pub fn network_error() -> CoreError {
    CoreError::Network("connection refused".into())
}

pub fn auth_error() -> CoreError {
    CoreError::Auth("token expired".into())
}

/// 조건이 참이 될 때까지 짧게 대기 (일시정지 시간에서도 동작)
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

// ============================================================
// MockApi
// ============================================================

#[derive(Default)]
pub struct MockApi {
    pub overview: Mutex<OverviewPayload>,
    pub servers: Mutex<Vec<ServerPayload>>,
    pub alerts: Mutex<Vec<AlertPayload>>,
    /// 설정되면 모든 조회 요청이 이 에러로 실패
    pub failure: Mutex<Option<fn() -> CoreError>>,
    /// 확인 요청 응답 (None이면 기본 응답)
    pub ack_result: Mutex<Option<Result<AcknowledgeResponse, CoreError>>>,
    /// 설정되면 확인 요청이 알림을 받을 때까지 대기
    pub ack_gate: Option<Arc<Notify>>,
    /// 설정되면 다음 개요 요청 한 번이 알림을 받을 때까지 대기
    pub overview_gate: Mutex<Option<Arc<Notify>>>,
    pub overview_scopes: Mutex<Vec<ServerScope>>,
    pub alert_scopes: Mutex<Vec<ServerScope>>,
    pub ack_requests: Mutex<Vec<(i64, AcknowledgeRequest)>>,
}

impl MockApi {
    pub fn with_alerts(alerts: Vec<AlertPayload>) -> Self {
        let api = Self::default();
        api.set_alerts(alerts);
        *api.servers.lock() = vec![server(1, "Online")];
        api
    }

    /// 개요의 activeAlerts 와 /alerts 응답을 함께 바꾼다
    pub fn set_alerts(&self, alerts: Vec<AlertPayload>) {
        self.overview.lock().active_alerts = Some(alerts.clone());
        *self.alerts.lock() = alerts;
    }

    /// 다음 개요 요청을 붙잡아 둘 알림 설치
    pub fn hold_next_overview(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.overview_gate.lock() = Some(gate.clone());
        gate
    }

    pub fn fail_with(&self, failure: fn() -> CoreError) {
        *self.failure.lock() = Some(failure);
    }

    pub fn recover(&self) {
        *self.failure.lock() = None;
    }

    pub fn overview_calls(&self) -> usize {
        self.overview_scopes.lock().len()
    }

    fn check_failure(&self) -> Result<(), CoreError> {
        match *self.failure.lock() {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DashboardApi for MockApi {
    async fn fetch_overview(&self, scope: ServerScope) -> Result<OverviewPayload, CoreError> {
        self.overview_scopes.lock().push(scope);
        let gate = self.overview_gate.lock().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.check_failure()?;
        Ok(self.overview.lock().clone())
    }

    async fn fetch_servers(&self) -> Result<Vec<ServerPayload>, CoreError> {
        self.check_failure()?;
        Ok(self.servers.lock().clone())
    }

    async fn fetch_server_metrics(
        &self,
        _server_id: i64,
        _hours: u32,
    ) -> Result<Vec<MetricPayload>, CoreError> {
        self.check_failure()?;
        Ok(vec![])
    }

    async fn fetch_alerts(&self, scope: ServerScope) -> Result<Vec<AlertPayload>, CoreError> {
        self.alert_scopes.lock().push(scope);
        self.check_failure()?;
        Ok(self.alerts.lock().clone())
    }

    async fn acknowledge_alert(
        &self,
        alert_id: i64,
        request: &AcknowledgeRequest,
    ) -> Result<AcknowledgeResponse, CoreError> {
        self.ack_requests.lock().push((alert_id, request.clone()));
        if let Some(gate) = &self.ack_gate {
            gate.notified().await;
        }
        self.ack_result
            .lock()
            .take()
            .unwrap_or_else(|| Ok(AcknowledgeResponse::default()))
    }

    async fn fetch_security_events(
        &self,
        _query: &SecurityEventQuery,
    ) -> Result<SecurityEventsResponse, CoreError> {
        self.check_failure()?;
        Ok(SecurityEventsResponse::List(vec![]))
    }
}

// ============================================================
// MockPush
// ============================================================

#[derive(Default)]
pub struct MockPush {
    /// 앞에서부터 소비되는 연결 실패 목록
    pub connect_failures: Mutex<VecDeque<fn() -> CoreError>>,
    pub connects: AtomicUsize,
    /// 그룹/종료 호출 기록 ("join:all-servers", "leave:server-3", "close")
    pub calls: Arc<Mutex<Vec<String>>>,
    senders: Mutex<Vec<mpsc::Sender<PushEvent>>>,
}

impl MockPush {
    /// 처음 `count` 번의 연결 시도를 실패시킨다
    pub fn failing_first(count: usize, failure: fn() -> CoreError) -> Self {
        Self {
            connect_failures: Mutex::new(std::iter::repeat(failure).take(count).collect()),
            ..Self::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn has_call(&self, call: &str) -> bool {
        self.calls.lock().iter().any(|c| c == call)
    }

    /// 가장 최근 연결로 이벤트 전송
    pub async fn send(&self, event: PushEvent) {
        let sender = self.senders.lock().last().cloned();
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// 모든 연결의 전송 계층 끊기
    pub fn drop_connections(&self) {
        self.senders.lock().clear();
    }
}

#[async_trait]
impl PushChannel for MockPush {
    async fn connect(&self) -> Result<PushConnection, CoreError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = self.connect_failures.lock().pop_front() {
            return Err(make());
        }
        let (tx, rx) = mpsc::channel(16);
        self.senders.lock().push(tx);
        Ok(PushConnection {
            events: rx,
            control: Box::new(MockControl {
                calls: self.calls.clone(),
            }),
        })
    }
}

struct MockControl {
    calls: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl PushControl for MockControl {
    async fn join_group(&self, group: &str) -> Result<(), CoreError> {
        self.calls.lock().push(format!("join:{group}"));
        Ok(())
    }

    async fn leave_group(&self, group: &str) -> Result<(), CoreError> {
        self.calls.lock().push(format!("leave:{group}"));
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        self.calls.lock().push("close".to_string());
        Ok(())
    }
}
