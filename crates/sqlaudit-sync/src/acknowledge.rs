//! 경고 확인 워크플로.
//!
//! 1. 낙관적 단계: 미확인 경고를 즉시 Pending 으로 바꾸고 스냅샷을 교체한다 (동기).
//! 2. 서버에 확인 요청을 보낸다 (자동 재시도 없음).
//! 3. 성공하면 Confirmed, 실패하면 Unacknowledged 로 되돌린다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::alert::AckState;
use sqlaudit_core::models::payload::parse_timestamp;
use sqlaudit_core::ports::api_client::{AcknowledgeRequest, AcknowledgeResponse, DashboardApi};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{SyncEvent, SyncEventBus};
use crate::store::SnapshotStore;

/// 경고 확인 에러
#[derive(Debug, Error)]
pub enum AckError {
    /// 경고가 없거나 미확인 상태가 아님 (스냅샷 변경 없음)
    #[error("경고 {alert_id} 는 이미 확인되었거나 존재하지 않습니다")]
    AlreadyAcknowledgedOrUnknown { alert_id: i64 },

    /// 서버 확인 실패, 미확인 상태로 롤백됨
    #[error("경고 {alert_id} 확인 실패: {source}")]
    Failed {
        alert_id: i64,
        #[source]
        source: CoreError,
    },
}

impl AckError {
    pub fn alert_id(&self) -> i64 {
        match self {
            AckError::AlreadyAcknowledgedOrUnknown { alert_id } => *alert_id,
            AckError::Failed { alert_id, .. } => *alert_id,
        }
    }
}

/// 낙관적 단계가 끝난 확인 요청
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAck {
    pub alert_id: i64,
    pub request: AcknowledgeRequest,
    pub requested_at: DateTime<Utc>,
}

/// 경고 확인 워크플로
pub struct AckWorkflow {
    store: Arc<SnapshotStore>,
    api: Arc<dyn DashboardApi>,
    events: Arc<SyncEventBus>,
}

impl AckWorkflow {
    pub fn new(
        store: Arc<SnapshotStore>,
        api: Arc<dyn DashboardApi>,
        events: Arc<SyncEventBus>,
    ) -> Self {
        Self { store, api, events }
    }

    /// 확인 요청 전체 (낙관적 단계 + 서버 요청 + 확정/롤백)
    ///
    /// 성공하면 기록된 Confirmed 상태를 반환한다.
    pub async fn acknowledge(
        &self,
        alert_id: i64,
        notes: Option<String>,
    ) -> Result<AckState, AckError> {
        let pending = self.begin(alert_id, notes)?;
        self.dispatch(pending).await
    }

    /// 낙관적 단계: Unacknowledged → Pending
    ///
    /// 네트워크 왕복 전에 스냅샷을 교체한다. 경고가 없거나 미확인 상태가 아니면
    /// 스냅샷을 건드리지 않고 거부한다 (같은 경고의 동시 확인 포함).
    pub fn begin(&self, alert_id: i64, notes: Option<String>) -> Result<PendingAck, AckError> {
        let requested_at = Utc::now();
        let revision = self.store.apply(|current| {
            let index = current.alerts.iter().position(|a| a.alert_id == alert_id)?;
            let next_ack = current.alerts[index].ack.begin(requested_at, notes.clone())?;
            let mut next = current.clone();
            next.alerts[index].ack = next_ack;
            Some(next)
        });

        match revision {
            Some(revision) => {
                debug!("경고 {alert_id} 확인 요청 중 (rev={revision})");
                Ok(PendingAck {
                    alert_id,
                    request: AcknowledgeRequest { notes },
                    requested_at,
                })
            }
            None => {
                debug!("경고 {alert_id} 확인 거부: 미확인 상태 아님");
                Err(AckError::AlreadyAcknowledgedOrUnknown { alert_id })
            }
        }
    }

    /// 서버 요청 후 확정 또는 롤백
    pub async fn dispatch(&self, pending: PendingAck) -> Result<AckState, AckError> {
        let alert_id = pending.alert_id;
        match self.api.acknowledge_alert(alert_id, &pending.request).await {
            Ok(response) => {
                let confirmed = confirmed_state(response, pending.request.notes);
                self.store.apply(|current| {
                    let index = current.alerts.iter().position(|a| a.alert_id == alert_id)?;
                    let alert = &current.alerts[index];
                    if alert.ack.is_confirmed() {
                        return None;
                    }
                    let mut next = current.clone();
                    next.alerts[index] = alert.with_ack(confirmed.clone());
                    Some(next)
                });
                info!("경고 {alert_id} 확인 완료");
                Ok(confirmed)
            }
            Err(e) => {
                warn!("경고 {alert_id} 확인 실패, 롤백: {e}");
                let requested_at = pending.requested_at;
                self.store.apply(|current| {
                    let index = current.alerts.iter().position(|a| {
                        a.alert_id == alert_id && a.ack.pending_since() == Some(requested_at)
                    })?;
                    let mut next = current.clone();
                    next.alerts[index].ack = next.alerts[index].ack.rollback();
                    Some(next)
                });
                if e.is_auth() {
                    self.events.publish(SyncEvent::AuthenticationRequired {
                        message: e.to_string(),
                    });
                }
                Err(AckError::Failed {
                    alert_id,
                    source: e,
                })
            }
        }
    }
}

/// 서버 응답으로 Confirmed 상태 구성
///
/// 응답에 메모가 없으면 요청 메모를 유지하고, 확인 시각이 없거나 해석할 수 없으면 현재 시각을 쓴다.
fn confirmed_state(response: AcknowledgeResponse, request_notes: Option<String>) -> AckState {
    let acknowledged_at = response
        .acknowledged_date
        .as_deref()
        .and_then(|raw| match parse_timestamp("acknowledgedDate", raw) {
            Ok(at) => Some(at),
            Err(e) => {
                warn!("확인 응답 시각 무시: {e}");
                None
            }
        })
        .unwrap_or_else(Utc::now);

    AckState::Unacknowledged.confirm(
        response.acknowledged_by,
        acknowledged_at,
        response.notes.or(request_notes),
    )
}
