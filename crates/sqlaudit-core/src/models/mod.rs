//! SQLAUDIT 도메인 모델.
//!
//! 대시보드가 다루는 서버, 경고, 메트릭, 보안 이벤트와 집계 스냅샷을 정의한다.
//! 서버 JSON 형태는 [`payload`] 모듈의 DTO가 담당하고, 나머지 모델은 검증을 통과한 값만 담는다.

pub mod alert;
pub mod inventory;
pub mod metric;
pub mod payload;
pub mod security;
pub mod server;
pub mod snapshot;
