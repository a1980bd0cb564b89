//! 모니터링 대상 서버 모델.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// 서버 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerStatus {
    Online,
    Warning,
    Offline,
}

impl std::fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStatus::Online => write!(f, "Online"),
            ServerStatus::Warning => write!(f, "Warning"),
            ServerStatus::Offline => write!(f, "Offline"),
        }
    }
}

/// 모니터링 대상 DB 서버
///
/// 풀 스냅샷 또는 `ServerStatusUpdate` 푸시로만 생성/갱신되며 UI가 직접 변경하지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// 서버 ID
    pub server_id: i64,
    /// 표시 이름
    pub server_name: String,
    /// 현재 상태
    pub status: ServerStatus,
    /// 마지막 하트비트 시각
    pub last_seen: DateTime<Utc>,
    /// 활성 경고 수
    pub alert_count: u32,
    /// 모니터링 활성 여부
    pub is_active: bool,
    /// 설명 (선택)
    pub description: Option<String>,
}

impl Server {
    /// 마지막 하트비트 이후 경과 시간 (미래 시각이면 0)
    pub fn heartbeat_age(&self, now: DateTime<Utc>) -> Duration {
        let age = now - self.last_seen;
        if age < Duration::zero() {
            Duration::zero()
        } else {
            age
        }
    }
}

/// 서버 상태 집계 (개요 응답의 `serverStatus`)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerStatusSummary {
    pub total_servers: u32,
    pub online_servers: u32,
    pub warning_servers: u32,
    pub offline_servers: u32,
}

impl ServerStatusSummary {
    /// 서버 목록에서 집계 계산
    pub fn from_servers(servers: &[Server]) -> Self {
        let mut summary = Self {
            total_servers: servers.len() as u32,
            ..Self::default()
        };
        for server in servers {
            match server.status {
                ServerStatus::Online => summary.online_servers += 1,
                ServerStatus::Warning => summary.warning_servers += 1,
                ServerStatus::Offline => summary.offline_servers += 1,
            }
        }
        summary
    }
}
