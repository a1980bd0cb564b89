//! 동기화 연결 상태 관리.
//!
//! 풀 요청의 연속 실패를 추적해 대시보드 배너 상태를 결정하고,
//! 푸시 채널의 연결 상태를 정의한다.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// 기본 오프라인 전환 임계값 (연속 실패 횟수)
pub const DEFAULT_OFFLINE_THRESHOLD: u64 = 3;

/// 풀 동기화 상태 (비치명적 배너)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncHealth {
    /// 마지막 풀 성공
    Healthy,
    /// 최근 풀 실패, 마지막 정상 스냅샷 표시 중
    Degraded,
    /// 연속 실패가 임계값에 도달
    Offline,
}

impl std::fmt::Display for SyncHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncHealth::Healthy => write!(f, "Healthy"),
            SyncHealth::Degraded => write!(f, "Degraded"),
            SyncHealth::Offline => write!(f, "Offline"),
        }
    }
}

/// 푸시 채널 상태 (Running 내부 상태)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushStatus {
    /// 푸시 비활성 (설정 또는 인증 실패)
    Disabled,
    /// 구독 중
    Connected,
    /// 연결 시도 중 (최초 연결 포함)
    Reconnecting,
}

impl std::fmt::Display for PushStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PushStatus::Disabled => write!(f, "Disabled"),
            PushStatus::Connected => write!(f, "Connected"),
            PushStatus::Reconnecting => write!(f, "Reconnecting"),
        }
    }
}

/// 풀 상태 추적기
///
/// 성공하면 즉시 Healthy, 실패하면 Degraded, 임계값 이상 연속 실패하면 Offline.
pub struct PullHealth {
    /// 연속 실패 횟수
    failure_count: AtomicU64,
    /// 오프라인 전환 임계값
    offline_threshold: u64,
    /// 상태 변경 브로드캐스트
    status_tx: watch::Sender<SyncHealth>,
}

impl PullHealth {
    /// 새 상태 추적기 생성
    pub fn new(offline_threshold: u64) -> Self {
        let (status_tx, _) = watch::channel(SyncHealth::Healthy);
        Self {
            failure_count: AtomicU64::new(0),
            offline_threshold: offline_threshold.max(1),
            status_tx,
        }
    }

    /// 현재 상태
    pub fn status(&self) -> SyncHealth {
        *self.status_tx.borrow()
    }

    /// 상태 변경 수신기 생성
    pub fn subscribe(&self) -> watch::Receiver<SyncHealth> {
        self.status_tx.subscribe()
    }

    /// 연속 실패 횟수
    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    /// 풀 성공 기록
    pub fn record_success(&self) {
        self.failure_count.store(0, Ordering::Relaxed);
        let changed = self.status_tx.send_if_modified(|status| {
            let was_healthy = *status == SyncHealth::Healthy;
            *status = SyncHealth::Healthy;
            !was_healthy
        });
        if changed {
            info!("풀 동기화 복구됨");
        }
    }

    /// 풀 실패 기록
    pub fn record_failure(&self) {
        let count = self.failure_count.fetch_add(1, Ordering::Relaxed) + 1;
        debug!("풀 실패 기록 (연속 {}회)", count);

        let next = if count >= self.offline_threshold {
            SyncHealth::Offline
        } else {
            SyncHealth::Degraded
        };
        let changed = self.status_tx.send_if_modified(|status| {
            let changed = *status != next;
            *status = next;
            changed
        });
        if changed && next == SyncHealth::Offline {
            warn!("연속 {}회 풀 실패, 오프라인 표시", count);
        }
    }
}

impl Default for PullHealth {
    fn default() -> Self {
        Self::new(DEFAULT_OFFLINE_THRESHOLD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_state_is_healthy() {
        let health = PullHealth::default();
        assert_eq!(health.status(), SyncHealth::Healthy);
        assert_eq!(health.failure_count(), 0);
    }

    #[test]
    fn threshold_triggers_offline() {
        let health = PullHealth::new(3);

        health.record_failure();
        assert_eq!(health.status(), SyncHealth::Degraded);
        health.record_failure();
        assert_eq!(health.status(), SyncHealth::Degraded);
        health.record_failure();
        assert_eq!(health.status(), SyncHealth::Offline);
    }

    #[test]
    fn success_resets_failures() {
        let health = PullHealth::new(2);
        health.record_failure();
        health.record_failure();
        assert_eq!(health.status(), SyncHealth::Offline);

        health.record_success();
        assert_eq!(health.failure_count(), 0);
        assert_eq!(health.status(), SyncHealth::Healthy);
    }

    #[tokio::test]
    async fn subscribe_receives_changes() {
        let health = PullHealth::new(1);
        let mut rx = health.subscribe();
        assert_eq!(*rx.borrow(), SyncHealth::Healthy);

        health.record_failure();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SyncHealth::Offline);

        health.record_success();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), SyncHealth::Healthy);
    }
}
