//! 경고(Alert) 모델과 확인(acknowledge) 상태 전이표.
//!
//! 확인 상태는 UI가 로컬에서 변경할 수 있는 유일한 필드다.
//!
//! | 현재 상태     | begin   | confirm   | rollback       |
//! |--------------|---------|-----------|----------------|
//! | Unacknowledged | Pending | Confirmed | Unacknowledged |
//! | Pending        | 거부     | Confirmed | Unacknowledged |
//! | Confirmed      | 거부     | Confirmed | Confirmed      |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 경고 심각도
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Severity::Info => "Info",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        };
        write!(f, "{name}")
    }
}

/// 경고 확인 상태 (tagged state)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AckState {
    /// 미확인
    Unacknowledged,
    /// 확인 요청 전송됨, 서버 응답 대기 중 (낙관적 상태)
    Pending {
        /// 확인 요청 시각
        requested_at: DateTime<Utc>,
        /// 요청 메모
        notes: Option<String>,
    },
    /// 서버가 확인을 승인함
    Confirmed {
        /// 확인한 사용자
        acknowledged_by: Option<String>,
        /// 확인 시각
        acknowledged_at: DateTime<Utc>,
        /// 메모
        notes: Option<String>,
    },
}

impl AckState {
    pub fn is_unacknowledged(&self) -> bool {
        matches!(self, AckState::Unacknowledged)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, AckState::Pending { .. })
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, AckState::Confirmed { .. })
    }

    /// 낙관적 확인 시작: Unacknowledged → Pending
    ///
    /// 다른 상태에서는 `None`을 반환한다 (이미 확인 중이거나 확인됨).
    pub fn begin(&self, requested_at: DateTime<Utc>, notes: Option<String>) -> Option<AckState> {
        match self {
            AckState::Unacknowledged => Some(AckState::Pending {
                requested_at,
                notes,
            }),
            _ => None,
        }
    }

    /// 서버 확인 반영: 어떤 상태에서든 Confirmed로 전이
    ///
    /// 이미 Confirmed인 경우 기존 값을 유지한다.
    pub fn confirm(
        &self,
        acknowledged_by: Option<String>,
        acknowledged_at: DateTime<Utc>,
        notes: Option<String>,
    ) -> AckState {
        match self {
            AckState::Confirmed { .. } => self.clone(),
            _ => AckState::Confirmed {
                acknowledged_by,
                acknowledged_at,
                notes,
            },
        }
    }

    /// 확인 실패 롤백: Pending → Unacknowledged, 나머지는 그대로
    pub fn rollback(&self) -> AckState {
        match self {
            AckState::Pending { .. } => AckState::Unacknowledged,
            other => other.clone(),
        }
    }

    /// Pending 상태의 요청 시각
    pub fn pending_since(&self) -> Option<DateTime<Utc>> {
        match self {
            AckState::Pending { requested_at, .. } => Some(*requested_at),
            _ => None,
        }
    }
}

/// 활성 경고
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// 경고 ID
    pub alert_id: i64,
    /// 경고 이름
    pub alert_name: String,
    /// 경고 유형 (Performance, Security, Backup 등)
    pub alert_type: Option<String>,
    /// 발생 서버 ID (서버 범위 필터에 사용)
    pub server_id: Option<i64>,
    /// 발생 서버 이름
    pub server_name: String,
    /// 심각도
    pub severity: Severity,
    /// 메시지
    pub message: String,
    /// 최초 발생 시각
    pub first_occurrence: DateTime<Utc>,
    /// 마지막 발생 시각 (서버 타임스탬프)
    pub last_occurrence: DateTime<Utc>,
    /// 발생 횟수
    pub occurrence_count: u32,
    /// 확인 상태
    pub ack: AckState,
}

impl Alert {
    /// 확인 상태만 바꾼 복제본
    pub fn with_ack(&self, ack: AckState) -> Alert {
        Alert {
            ack,
            ..self.clone()
        }
    }
}
