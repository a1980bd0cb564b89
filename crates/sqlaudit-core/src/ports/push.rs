//! 실시간 푸시 채널 포트.
//!
//! 구현: `sqlaudit-network` crate (WebSocket 허브 클라이언트)
//!
//! 콜백 등록 대신 명시적 연결 객체를 돌려준다. 이벤트는 채널로 받고,
//! 구독 해제와 종료는 [`PushControl`] 핸들로 수행한다.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::CoreError;
use crate::models::payload::{AlertPayload, OverviewPayload, ServerPayload};

/// 서버가 보내는 푸시 이벤트
#[derive(Debug, Clone)]
pub enum PushEvent {
    /// 집계 갱신 (풀 병합과 동일하게 처리)
    DashboardUpdate(OverviewPayload),
    /// 단일 경고 갱신
    AlertUpdate(AlertPayload),
    /// 단일 서버 상태 갱신
    ServerStatusUpdate(ServerPayload),
}

impl PushEvent {
    /// 로그용 이벤트 이름
    pub fn kind(&self) -> &'static str {
        match self {
            PushEvent::DashboardUpdate(_) => "DashboardUpdate",
            PushEvent::AlertUpdate(_) => "AlertUpdate",
            PushEvent::ServerStatusUpdate(_) => "ServerStatusUpdate",
        }
    }
}

/// 열린 푸시 연결
///
/// `events` 채널이 닫히면 전송 계층이 끊어진 것이다.
pub struct PushConnection {
    pub events: mpsc::Receiver<PushEvent>,
    pub control: Box<dyn PushControl>,
}

impl std::fmt::Debug for PushConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PushConnection")
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

/// 푸시 연결 제어 핸들 (아웃바운드 메시지)
#[async_trait]
pub trait PushControl: Send + Sync {
    /// 그룹 구독 (`server-{id}` 또는 `all-servers`)
    async fn join_group(&self, group: &str) -> Result<(), CoreError>;

    /// 그룹 구독 해제
    async fn leave_group(&self, group: &str) -> Result<(), CoreError>;

    /// 연결 종료
    async fn close(&self) -> Result<(), CoreError>;
}

/// 푸시 채널 팩토리
#[async_trait]
pub trait PushChannel: Send + Sync {
    /// 새 연결 수립
    async fn connect(&self) -> Result<PushConnection, CoreError>;
}
