//! 대시보드 스냅샷 (집계 루트) 과 서버 범위 필터.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::{Alert, Severity};
use super::inventory::{DatabaseSummary, SlowQuery};
use super::metric::MetricSample;
use super::security::SecurityEvent;
use super::server::{Server, ServerStatusSummary};

/// 활성 서버 범위 필터
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ServerScope {
    /// 전체 서버
    #[default]
    All,
    /// 단일 서버
    Server(i64),
}

impl ServerScope {
    /// `Option<i64>` (CLI 인자, 쿼리 파라미터) 에서 생성
    pub fn from_server_id(server_id: Option<i64>) -> Self {
        match server_id {
            Some(id) => ServerScope::Server(id),
            None => ServerScope::All,
        }
    }

    /// REST `serverId` 쿼리 파라미터 값
    pub fn server_id(&self) -> Option<i64> {
        match self {
            ServerScope::All => None,
            ServerScope::Server(id) => Some(*id),
        }
    }

    /// 푸시 구독 그룹 이름
    pub fn group_name(&self) -> String {
        match self {
            ServerScope::All => "all-servers".to_string(),
            ServerScope::Server(id) => format!("server-{id}"),
        }
    }

    /// 해당 서버 ID의 엔티티가 이 범위에 속하는지
    ///
    /// 서버 ID가 없는 엔티티는 걸러낼 근거가 없으므로 통과시킨다.
    pub fn admits(&self, server_id: Option<i64>) -> bool {
        match (self, server_id) {
            (ServerScope::All, _) => true,
            (ServerScope::Server(_), None) => true,
            (ServerScope::Server(scope), Some(id)) => *scope == id,
        }
    }
}

impl std::fmt::Display for ServerScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerScope::All => write!(f, "all"),
            ServerScope::Server(id) => write!(f, "server {id}"),
        }
    }
}

/// 대시보드 스냅샷
///
/// 한 번에 하나의 스냅샷만 살아 있으며 뷰는 항상 이 스냅샷을 통해 읽는다.
/// 교체는 `Arc` 단위로 이루어지므로 읽는 쪽이 부분 갱신을 관찰할 수 없다.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    /// 교체마다 1씩 증가
    pub revision: u64,
    /// 이 스냅샷이 반영하는 서버 범위
    pub scope: ServerScope,
    /// 서버가 보고한 마지막 갱신 시각 (아직 수신 전이면 None)
    pub last_updated: Option<DateTime<Utc>>,
    /// 개요 응답의 서버 상태 집계
    pub server_status: ServerStatusSummary,
    pub servers: Vec<Server>,
    pub alerts: Vec<Alert>,
    /// 개요의 최신 메트릭
    pub metrics: Vec<MetricSample>,
    pub databases: Vec<DatabaseSummary>,
    pub slow_queries: Vec<SlowQuery>,
    pub security_events: Vec<SecurityEvent>,
}

impl DashboardSnapshot {
    /// 빈 초기 스냅샷
    pub fn empty(scope: ServerScope) -> Self {
        Self {
            scope,
            ..Self::default()
        }
    }

    /// 서버 ID로 조회
    pub fn server(&self, server_id: i64) -> Option<&Server> {
        self.servers.iter().find(|s| s.server_id == server_id)
    }

    /// 경고 ID로 조회
    pub fn alert(&self, alert_id: i64) -> Option<&Alert> {
        self.alerts.iter().find(|a| a.alert_id == alert_id)
    }

    /// 서버 컬렉션에서 직접 계산한 상태 집계
    pub fn server_counts(&self) -> ServerStatusSummary {
        ServerStatusSummary::from_servers(&self.servers)
    }

    /// 심각도별 경고 수 (높은 심각도 먼저)
    pub fn alerts_by_severity(&self) -> Vec<(Severity, usize)> {
        let mut counts: BTreeMap<Severity, usize> = BTreeMap::new();
        for alert in &self.alerts {
            *counts.entry(alert.severity).or_default() += 1;
        }
        counts.into_iter().rev().collect()
    }

    /// 아직 확인되지 않은 경고
    pub fn unacknowledged_alerts(&self) -> impl Iterator<Item = &Alert> {
        self.alerts.iter().filter(|a| a.ack.is_unacknowledged())
    }

    /// 확인 요청 중인 경고 ID
    pub fn pending_alert_ids(&self) -> Vec<i64> {
        self.alerts
            .iter()
            .filter(|a| a.ack.is_pending())
            .map(|a| a.alert_id)
            .collect()
    }
}
