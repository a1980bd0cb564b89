//! 병합 엔진.
//!
//! 풀 결과와 푸시 이벤트를 현재 스냅샷에 병합해 새 스냅샷으로 교체한다.
//!
//! 우선순위:
//! - 풀 결과는 담긴 컬렉션을 통째로 교체한다. 단, 확인 요청 중(Pending)인 경고의
//!   로컬 상태는 풀이 그 경고를 확인됨으로 보고하기 전까지 유지된다.
//! - `ServerStatusUpdate` 는 서버 하나만 upsert 한다.
//! - `AlertUpdate` 는 경고 하나를 upsert 하되, 로컬이 Pending 이고 들어온 타임스탬프가
//!   확인 요청보다 새롭지 않으면 로컬을 유지한다.
//! - `DashboardUpdate` 는 풀 병합과 같다.
//!
//! 검증은 스냅샷 잠금 밖에서 먼저 수행하고, 세대 확인과 병합은 잠금 안에서 수행한다.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::alert::Alert;
use sqlaudit_core::models::payload::{
    self, AlertPayload, Overview, OverviewPayload, ServerPayload,
};
use sqlaudit_core::models::server::Server;
use sqlaudit_core::models::snapshot::{DashboardSnapshot, ServerScope};
use sqlaudit_core::ports::push::PushEvent;
use tracing::{debug, warn};

use crate::events::{SyncEvent, SyncEventBus};
use crate::store::SnapshotStore;

/// 풀 세대 카운터
///
/// 시작/중지/범위 변경마다 증가한다. 풀 결과의 세대가 현재 세대와 다르면 폐기된다.
#[derive(Debug, Clone, Default)]
pub struct GenerationGate(Arc<AtomicU64>);

impl GenerationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// 현재 세대
    pub fn current(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }

    /// 세대 증가, 새 세대 반환
    pub fn advance(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// 전체 풀 결과
#[derive(Debug, Clone)]
pub struct PullResult {
    /// 요청 시점의 세대
    pub generation: u64,
    /// 요청 시점의 범위
    pub scope: ServerScope,
    pub overview: OverviewPayload,
    /// 서버 목록 (없으면 기존 목록 유지)
    pub servers: Option<Vec<ServerPayload>>,
    pub received_at: DateTime<Utc>,
}

/// 경고 전용 풀 결과
#[derive(Debug, Clone)]
pub struct AlertsPullResult {
    pub generation: u64,
    pub scope: ServerScope,
    pub alerts: Vec<AlertPayload>,
    pub received_at: DateTime<Utc>,
}

/// 병합 결과
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// 새 스냅샷으로 교체됨
    Applied { revision: u64 },
    /// 병합했지만 바뀐 것이 없음 (로컬 Pending 우선 등)
    Unchanged,
    /// 잘못된 페이로드 거부, 스냅샷 변경 없음
    Rejected(String),
    /// 세대가 지난 풀 결과 폐기
    Discarded,
    /// 활성 범위 밖의 푸시 이벤트
    Filtered,
}

impl MergeOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MergeOutcome::Applied { .. })
    }
}

/// 병합 엔진
pub struct ReconciliationEngine {
    store: Arc<SnapshotStore>,
    gate: GenerationGate,
    events: Arc<SyncEventBus>,
}

impl ReconciliationEngine {
    /// 새 병합 엔진 생성
    pub fn new(store: Arc<SnapshotStore>, events: Arc<SyncEventBus>) -> Self {
        Self {
            store,
            gate: GenerationGate::new(),
            events,
        }
    }

    /// 세대 카운터 (스케줄러와 공유)
    pub fn gate(&self) -> &GenerationGate {
        &self.gate
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// 전체 풀 결과 병합
    pub fn merge_pull(&self, pull: PullResult) -> MergeOutcome {
        let received_at = pull.received_at;
        let validated = pull.overview.into_overview(received_at).and_then(|overview| {
            let servers = pull
                .servers
                .map(|list| payload::into_servers(list, received_at))
                .transpose()?;
            Ok((overview, servers))
        });
        let (overview, servers) = match validated {
            Ok(v) => v,
            Err(e) => return self.reject("pull", e),
        };

        let gate = &self.gate;
        let mut stale = None;
        let revision = self.store.apply(|current| {
            let now = gate.current();
            if pull.generation != now {
                stale = Some(now);
                return None;
            }
            Some(merge_overview(current, overview, servers, pull.scope))
        });

        match (revision, stale) {
            (Some(revision), _) => {
                debug!("풀 병합 완료: rev={revision}, gen={}", pull.generation);
                MergeOutcome::Applied { revision }
            }
            (None, Some(current)) => self.discard(pull.generation, current),
            (None, None) => MergeOutcome::Unchanged,
        }
    }

    /// 경고 전용 풀 결과 병합 (경고 컬렉션만 교체)
    pub fn merge_alerts_pull(&self, pull: AlertsPullResult) -> MergeOutcome {
        let alerts = match payload::into_alerts(pull.alerts) {
            Ok(alerts) => alerts,
            Err(e) => return self.reject("alerts pull", e),
        };

        let gate = &self.gate;
        let mut stale = None;
        let revision = self.store.apply(|current| {
            let now = gate.current();
            if pull.generation != now {
                stale = Some(now);
                return None;
            }
            let alerts = scoped(alerts, pull.scope, |a| a.server_id);
            Some(DashboardSnapshot {
                scope: pull.scope,
                alerts: carry_local_ack(&current.alerts, alerts, pull.scope),
                ..current.clone()
            })
        });

        match (revision, stale) {
            (Some(revision), _) => MergeOutcome::Applied { revision },
            (None, Some(current)) => self.discard(pull.generation, current),
            (None, None) => MergeOutcome::Unchanged,
        }
    }

    /// 푸시 이벤트 병합
    pub fn merge_push(&self, event: PushEvent, received_at: DateTime<Utc>) -> MergeOutcome {
        match event {
            PushEvent::DashboardUpdate(p) => self.merge_dashboard_update(p, received_at),
            PushEvent::AlertUpdate(p) => self.merge_alert_update(p),
            PushEvent::ServerStatusUpdate(p) => self.merge_server_update(p, received_at),
        }
    }

    fn merge_dashboard_update(&self, p: OverviewPayload, received_at: DateTime<Utc>) -> MergeOutcome {
        let overview = match p.into_overview(received_at) {
            Ok(o) => o,
            Err(e) => return self.reject("DashboardUpdate", e),
        };
        let revision = self
            .store
            .apply(|current| Some(merge_overview(current, overview, None, current.scope)));
        revision.map_or(MergeOutcome::Unchanged, |revision| MergeOutcome::Applied {
            revision,
        })
    }

    fn merge_server_update(&self, p: ServerPayload, received_at: DateTime<Utc>) -> MergeOutcome {
        let server = match p.into_server(received_at) {
            Ok(s) => s,
            Err(e) => return self.reject("ServerStatusUpdate", e),
        };

        let mut filtered = false;
        let revision = self.store.apply(|current| {
            if !current.scope.admits(Some(server.server_id)) {
                filtered = true;
                return None;
            }
            let mut servers = current.servers.clone();
            upsert_server(&mut servers, server);
            Some(DashboardSnapshot {
                servers,
                ..current.clone()
            })
        });

        match revision {
            Some(revision) => MergeOutcome::Applied { revision },
            None if filtered => MergeOutcome::Filtered,
            None => MergeOutcome::Unchanged,
        }
    }

    fn merge_alert_update(&self, p: AlertPayload) -> MergeOutcome {
        let incoming = match p.into_alert() {
            Ok(a) => a,
            Err(e) => return self.reject("AlertUpdate", e),
        };

        let mut filtered = false;
        let revision = self.store.apply(|current| {
            if !current.scope.admits(incoming.server_id) {
                filtered = true;
                return None;
            }
            let mut alerts = current.alerts.clone();
            match alerts.iter().position(|a| a.alert_id == incoming.alert_id) {
                Some(index) => {
                    let local = &alerts[index];
                    if local_pending_wins(local, &incoming) {
                        debug!(
                            "AlertUpdate({}) 무시: 로컬 확인 요청이 더 최신",
                            incoming.alert_id
                        );
                        return None;
                    }
                    let merged = keep_confirmed(local, incoming);
                    alerts[index] = merged;
                }
                None => alerts.insert(0, incoming),
            }
            Some(DashboardSnapshot {
                alerts,
                ..current.clone()
            })
        });

        match revision {
            Some(revision) => MergeOutcome::Applied { revision },
            None if filtered => MergeOutcome::Filtered,
            None => MergeOutcome::Unchanged,
        }
    }

    fn reject(&self, source: &'static str, error: CoreError) -> MergeOutcome {
        warn!("{source} 페이로드 거부, 스냅샷 유지: {error}");
        let reason = error.to_string();
        self.events.publish(SyncEvent::PayloadRejected {
            source,
            reason: reason.clone(),
        });
        MergeOutcome::Rejected(reason)
    }

    fn discard(&self, generation: u64, current: u64) -> MergeOutcome {
        debug!("지난 세대 풀 결과 폐기: gen={generation}, 현재={current}");
        self.events.publish(SyncEvent::StalePullDiscarded {
            generation,
            current,
        });
        MergeOutcome::Discarded
    }
}

/// 개요 기반 스냅샷 생성 (풀 병합, DashboardUpdate 공용)
fn merge_overview(
    current: &DashboardSnapshot,
    overview: Overview,
    servers: Option<Vec<Server>>,
    scope: ServerScope,
) -> DashboardSnapshot {
    let alerts = scoped(overview.alerts, scope, |a| a.server_id);
    DashboardSnapshot {
        revision: current.revision,
        scope,
        last_updated: Some(overview.last_updated),
        server_status: overview.server_status,
        servers: servers.unwrap_or_else(|| current.servers.clone()),
        alerts: carry_local_ack(&current.alerts, alerts, scope),
        metrics: scoped(overview.metrics, scope, |m| m.server_id),
        databases: overview.databases,
        slow_queries: overview.slow_queries,
        security_events: overview.security_events,
    }
}

/// 활성 범위 밖의 항목 제거
fn scoped<T>(items: Vec<T>, scope: ServerScope, server_id: impl Fn(&T) -> Option<i64>) -> Vec<T> {
    match scope {
        ServerScope::All => items,
        ServerScope::Server(_) => items
            .into_iter()
            .filter(|item| scope.admits(server_id(item)))
            .collect(),
    }
}

/// 권위 있는 경고 목록에 로컬 확인 상태를 이어 붙인다
///
/// - 로컬 Pending 은 들어온 경고가 확인됨이 아니면 유지된다.
/// - 로컬 Confirmed 는 미확인으로 되돌아가지 않는다.
/// - 목록에 없는 Pending 경고는 범위 안에 있으면 뒤에 그대로 남는다.
fn carry_local_ack(local: &[Alert], incoming: Vec<Alert>, scope: ServerScope) -> Vec<Alert> {
    let mut merged: Vec<Alert> = incoming
        .into_iter()
        .map(|alert| match local.iter().find(|l| l.alert_id == alert.alert_id) {
            Some(l) if l.ack.is_pending() && !alert.ack.is_confirmed() => alert.with_ack(l.ack.clone()),
            Some(l) => keep_confirmed(l, alert),
            None => alert,
        })
        .collect();

    for pending in local.iter().filter(|l| l.ack.is_pending()) {
        let present = merged.iter().any(|a| a.alert_id == pending.alert_id);
        if !present && scope.admits(pending.server_id) {
            merged.push(pending.clone());
        }
    }
    merged
}

/// 로컬이 Confirmed 인데 들어온 값이 미확인이면 로컬 확인 상태를 유지
fn keep_confirmed(local: &Alert, incoming: Alert) -> Alert {
    if local.ack.is_confirmed() && !incoming.ack.is_confirmed() {
        incoming.with_ack(local.ack.clone())
    } else {
        incoming
    }
}

/// 로컬 Pending 이 들어온 `AlertUpdate` 보다 우선하는지
///
/// 들어온 값이 확인됨이면 권위 있는 확정이므로 받아들인다.
fn local_pending_wins(local: &Alert, incoming: &Alert) -> bool {
    match local.ack.pending_since() {
        Some(requested_at) => {
            !incoming.ack.is_confirmed() && incoming.last_occurrence <= requested_at
        }
        None => false,
    }
}

fn upsert_server(servers: &mut Vec<Server>, server: Server) {
    match servers.iter_mut().find(|s| s.server_id == server.server_id) {
        Some(existing) => *existing = server,
        None => servers.push(server),
    }
}
