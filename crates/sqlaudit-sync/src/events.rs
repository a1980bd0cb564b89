//! 동기화 이벤트 버스.
//!
//! `tokio::broadcast` 기반. 뷰 레이어는 배너, 재인증 유도 등에 이 이벤트를 사용한다.

use tokio::sync::broadcast;
use tracing::debug;

use crate::connectivity::PushStatus;

/// 동기화 이벤트
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// 풀 요청 실패 (전송 계층). 마지막 정상 스냅샷은 유지된다.
    PullFailed { message: String },
    /// 잘못된 페이로드 거부. 스냅샷은 변경되지 않는다.
    PayloadRejected { source: &'static str, reason: String },
    /// 세대가 지난 풀 결과 폐기
    StalePullDiscarded { generation: u64, current: u64 },
    /// 푸시 채널 상태 변경
    PushStatusChanged(PushStatus),
    /// 인증 만료/누락. 호출자가 재인증해야 한다.
    AuthenticationRequired { message: String },
}

/// 동기화 이벤트 버스
pub struct SyncEventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl SyncEventBus {
    /// 새 이벤트 버스 생성
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// 이벤트 발행 (구독자가 없으면 버림)
    pub fn publish(&self, event: SyncEvent) {
        debug!("동기화 이벤트 발행: {:?}", event);
        let _ = self.tx.send(event);
    }

    /// 구독자 생성
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }
}

impl Default for SyncEventBus {
    fn default() -> Self {
        Self::new(128)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_and_receive() {
        let bus = SyncEventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(SyncEvent::PushStatusChanged(PushStatus::Connected));

        assert_eq!(
            rx.recv().await.unwrap(),
            SyncEvent::PushStatusChanged(PushStatus::Connected)
        );
    }

    #[tokio::test]
    async fn multiple_subscribers() {
        let bus = SyncEventBus::new(16);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.publish(SyncEvent::PullFailed {
            message: "timeout".to_string(),
        });

        assert!(matches!(rx1.recv().await.unwrap(), SyncEvent::PullFailed { .. }));
        assert!(matches!(rx2.recv().await.unwrap(), SyncEvent::PullFailed { .. }));
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = SyncEventBus::default();
        bus.publish(SyncEvent::AuthenticationRequired {
            message: "expired".to_string(),
        });
    }
}
