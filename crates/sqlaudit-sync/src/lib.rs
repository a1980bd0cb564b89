//! # sqlaudit-sync
//!
//! 대시보드 동기화 파이프라인.
//! 스냅샷 저장소, 풀/푸시 병합 엔진, 경고 확인 워크플로, 메트릭 시계열 축소,
//! 풀 주기와 푸시 구독을 관리하는 스케줄러를 담는다.
//! 네트워크는 `sqlaudit-core` 의 포트 trait 으로만 접근한다.

pub mod acknowledge;
pub mod connectivity;
pub mod dashboard;
pub mod events;
pub mod reconcile;
pub mod scheduler;
pub mod series;
pub mod store;
