//! 스냅샷 저장소.
//!
//! 현재 [`DashboardSnapshot`] 하나를 `watch` 채널에 `Arc` 로 보관한다.
//! 모든 변경은 채널의 쓰기 잠금 안에서 현재 값을 읽고 새 값으로 통째로 교체하므로,
//! 병합끼리 끼어들지 않고 읽는 쪽은 항상 완성된 스냅샷만 본다.

use std::sync::Arc;

use sqlaudit_core::models::snapshot::{DashboardSnapshot, ServerScope};
use tokio::sync::watch;
use tracing::debug;

/// 스냅샷 저장소
pub struct SnapshotStore {
    tx: watch::Sender<Arc<DashboardSnapshot>>,
}

impl SnapshotStore {
    /// 빈 스냅샷으로 시작
    pub fn new(scope: ServerScope) -> Self {
        let (tx, _) = watch::channel(Arc::new(DashboardSnapshot::empty(scope)));
        Self { tx }
    }

    /// 현재 스냅샷 (부수 효과 없음)
    pub fn get_snapshot(&self) -> Arc<DashboardSnapshot> {
        self.tx.borrow().clone()
    }

    /// 현재 활성 범위
    pub fn scope(&self) -> ServerScope {
        self.tx.borrow().scope
    }

    /// 스냅샷 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardSnapshot>> {
        self.tx.subscribe()
    }

    /// 스냅샷 원자적 교체
    ///
    /// 리비전은 저장소가 부여한다. 새 리비전을 반환한다.
    pub fn replace(&self, snapshot: DashboardSnapshot) -> u64 {
        let mut revision = 0;
        self.tx.send_modify(|current| {
            let mut next = snapshot;
            next.revision = current.revision + 1;
            revision = next.revision;
            *current = Arc::new(next);
        });
        debug!("스냅샷 교체: rev={revision}");
        revision
    }

    /// 현재 스냅샷을 읽어 새 스냅샷을 만드는 변경
    ///
    /// `f` 가 `None` 을 반환하면 스냅샷은 그대로이고 구독자에게 알리지 않는다.
    /// 적용되면 새 리비전을 반환한다.
    pub fn apply<F>(&self, f: F) -> Option<u64>
    where
        F: FnOnce(&DashboardSnapshot) -> Option<DashboardSnapshot>,
    {
        let mut revision = None;
        self.tx.send_if_modified(|current| match f(current.as_ref()) {
            Some(mut next) => {
                next.revision = current.revision + 1;
                revision = Some(next.revision);
                *current = Arc::new(next);
                true
            }
            None => false,
        });
        revision
    }

    /// 활성 범위 변경
    ///
    /// 컬렉션은 다음 풀이 교체할 때까지 마지막 정상 값을 유지한다.
    pub fn set_scope(&self, scope: ServerScope) -> Option<u64> {
        self.apply(|current| {
            (current.scope != scope).then(|| DashboardSnapshot {
                scope,
                ..current.clone()
            })
        })
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(ServerScope::All)
    }
}
