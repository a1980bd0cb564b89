//! 대시보드 REST API 포트.
//!
//! 구현: `sqlaudit-network` crate (reqwest)
//!
//! 풀 응답은 검증 전 와이어 DTO 그대로 반환한다. 검증과 거부는 병합 엔진이 맡는다.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::payload::{
    AlertPayload, MetricPayload, OverviewPayload, SecurityEventsResponse, ServerPayload,
};
use crate::models::security::SecurityEventQuery;
use crate::models::snapshot::ServerScope;

/// 경고 확인 요청 본문
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// 경고 확인 응답
///
/// 서버가 빈 본문을 돌려줄 수 있으므로 모든 필드가 선택이다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcknowledgeResponse {
    pub acknowledged_by: Option<String>,
    pub acknowledged_date: Option<String>,
    pub notes: Option<String>,
}

/// 대시보드 API 클라이언트
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// 대시보드 개요 (스냅샷 형태)
    async fn fetch_overview(&self, scope: ServerScope) -> Result<OverviewPayload, CoreError>;

    /// 서버 목록
    async fn fetch_servers(&self) -> Result<Vec<ServerPayload>, CoreError>;

    /// 서버별 메트릭 (최근 `hours` 시간)
    async fn fetch_server_metrics(
        &self,
        server_id: i64,
        hours: u32,
    ) -> Result<Vec<MetricPayload>, CoreError>;

    /// 활성 경고 목록
    async fn fetch_alerts(&self, scope: ServerScope) -> Result<Vec<AlertPayload>, CoreError>;

    /// 경고 확인
    ///
    /// 구현체는 이 요청을 자동 재시도하지 않는다.
    async fn acknowledge_alert(
        &self,
        alert_id: i64,
        request: &AcknowledgeRequest,
    ) -> Result<AcknowledgeResponse, CoreError>;

    /// 보안 이벤트 페이지 조회
    async fn fetch_security_events(
        &self,
        query: &SecurityEventQuery,
    ) -> Result<SecurityEventsResponse, CoreError>;
}
