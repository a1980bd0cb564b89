//! HTTP REST API 클라이언트.
//!
//! `DashboardApi` 포트 구현. JWT 인증 헤더 자동 주입 + 조회 요청 재시도.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use sqlaudit_core::error::CoreError;
use sqlaudit_core::models::payload::{
    AlertPayload, MetricPayload, OverviewPayload, SecurityEventsResponse, ServerPayload,
};
use sqlaudit_core::models::security::SecurityEventQuery;
use sqlaudit_core::models::snapshot::ServerScope;
use sqlaudit_core::ports::api_client::{AcknowledgeRequest, AcknowledgeResponse, DashboardApi};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::auth::TokenManager;

/// 기본 재시도 횟수
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Retry-After 헤더가 없을 때 대기 시간 (초)
const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// 재시도 백오프 상한
const MAX_BACKOFF: Duration = Duration::from_secs(30);

type Query = Vec<(&'static str, String)>;

/// 재시도 가능한 에러인지 판별
fn is_retryable(error: &CoreError) -> bool {
    matches!(
        error,
        CoreError::Network(_) | CoreError::ServiceUnavailable(_) | CoreError::RateLimit { .. }
    )
}

fn scope_query(scope: ServerScope) -> Query {
    scope
        .server_id()
        .map(|id| vec![("serverId", id.to_string())])
        .unwrap_or_default()
}

/// REST API 클라이언트 (`DashboardApi` 포트 구현)
///
/// 조회(GET)는 전송 계층 실패 시 지수 백오프로 재시도하고,
/// 경고 확인(POST)은 한 번만 보낸다.
pub struct HttpDashboardClient {
    client: reqwest::Client,
    base_url: String,
    token_manager: Arc<TokenManager>,
    max_retries: u32,
}

impl HttpDashboardClient {
    /// 새 HTTP API 클라이언트 생성
    pub fn new(
        base_url: &str,
        token_manager: Arc<TokenManager>,
        timeout: Duration,
    ) -> Result<Self, CoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::Network(format!("HTTP 클라이언트 빌드 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token_manager,
            max_retries: DEFAULT_MAX_RETRIES,
        })
    }

    /// 재시도 횟수 설정
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// 연결 확인: 서버 목록을 조회해 서버 수를 반환
    pub async fn test_connection(&self) -> Result<usize, CoreError> {
        let servers = self.fetch_servers().await?;
        debug!("연결 확인 성공: 서버 {}대", servers.len());
        Ok(servers.len())
    }

    /// Authorization 헤더가 포함된 요청 빌더 반환
    async fn authorized_request(
        &self,
        method: reqwest::Method,
        path: &str,
    ) -> Result<reqwest::RequestBuilder, CoreError> {
        let token = self.token_manager.get_token().await?;
        let url = format!("{}{}", self.base_url, path);
        Ok(self.client.request(method, &url).bearer_auth(token))
    }

    /// 응답 상태 코드 확인 및 에러 매핑
    async fn check_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<reqwest::Response, CoreError> {
        let status = resp.status();

        if status.is_success() {
            return Ok(resp);
        }

        let status_code = status.as_u16();
        let retry_after = resp
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());
        let text = resp.text().await.unwrap_or_else(|e| {
            warn!("응답 본문 읽기 실패: {e}");
            String::new()
        });

        match status_code {
            401 => Err(CoreError::Auth(format!("인증 실패: {text}"))),
            404 => Err(CoreError::NotFound {
                resource_type: "API".to_string(),
                id: text,
            }),
            429 => Err(CoreError::RateLimit {
                retry_after_secs: retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
            }),
            503 => Err(CoreError::ServiceUnavailable(text)),
            400..=499 => Err(CoreError::Rejected {
                status: status_code,
                message: text,
            }),
            _ => Err(CoreError::Internal(format!("API 에러 ({status}): {text}"))),
        }
    }

    /// 재시도가 포함된 요청 실행
    ///
    /// exponential backoff: 1s → 2s → 4s (최대 30s)
    async fn execute_with_retry<F, Fut, T>(&self, operation: F) -> Result<T, CoreError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let mut last_error = CoreError::Internal("요청 실패".to_string());
        let mut delay = Duration::from_secs(1);

        for attempt in 0..=self.max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if !is_retryable(&e) || attempt == self.max_retries {
                        return Err(e);
                    }

                    warn!(
                        "요청 실패 (시도 {}/{}): {e}, {delay:?} 후 재시도",
                        attempt + 1,
                        self.max_retries + 1
                    );

                    if let CoreError::RateLimit { retry_after_secs } = &e {
                        delay = Duration::from_secs(*retry_after_secs).min(MAX_BACKOFF);
                    }

                    last_error = e;
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(MAX_BACKOFF);
                }
            }
        }

        Err(last_error)
    }

    /// 인증된 GET 요청 + JSON 역직렬화 (재시도 포함)
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Query,
        what: &str,
    ) -> Result<T, CoreError> {
        self.execute_with_retry(|| async {
            let req = self
                .authorized_request(reqwest::Method::GET, path)
                .await?;

            let resp = req
                .query(&query)
                .send()
                .await
                .map_err(|e| CoreError::Network(format!("{what} 요청 실패: {e}")))?;

            let resp = self.check_response(resp).await?;
            let body = resp
                .text()
                .await
                .map_err(|e| CoreError::Network(format!("{what} 응답 수신 실패: {e}")))?;

            Ok(serde_json::from_str::<T>(&body)?)
        })
        .await
    }
}

#[async_trait]
impl DashboardApi for HttpDashboardClient {
    async fn fetch_overview(&self, scope: ServerScope) -> Result<OverviewPayload, CoreError> {
        debug!("개요 조회: scope={scope}");
        self.get_json("/dashboard/overview", scope_query(scope), "개요")
            .await
    }

    async fn fetch_servers(&self) -> Result<Vec<ServerPayload>, CoreError> {
        debug!("서버 목록 조회");
        self.get_json("/dashboard/servers", Vec::new(), "서버 목록")
            .await
    }

    async fn fetch_server_metrics(
        &self,
        server_id: i64,
        hours: u32,
    ) -> Result<Vec<MetricPayload>, CoreError> {
        debug!("서버 메트릭 조회: server_id={server_id}, hours={hours}");
        let path = format!("/dashboard/servers/{server_id}/metrics");
        self.get_json(&path, vec![("hours", hours.to_string())], "서버 메트릭")
            .await
    }

    async fn fetch_alerts(&self, scope: ServerScope) -> Result<Vec<AlertPayload>, CoreError> {
        debug!("경고 목록 조회: scope={scope}");
        self.get_json("/alerts", scope_query(scope), "경고 목록")
            .await
    }

    async fn acknowledge_alert(
        &self,
        alert_id: i64,
        request: &AcknowledgeRequest,
    ) -> Result<AcknowledgeResponse, CoreError> {
        debug!("경고 확인 요청: alert_id={alert_id}");

        let path = format!("/alerts/{alert_id}/acknowledge");
        let req = self
            .authorized_request(reqwest::Method::POST, &path)
            .await?;

        let resp = req
            .json(request)
            .send()
            .await
            .map_err(|e| CoreError::Network(format!("경고 확인 요청 실패: {e}")))?;

        let resp = self.check_response(resp).await?;
        let body = resp
            .text()
            .await
            .map_err(|e| CoreError::Network(format!("경고 확인 응답 수신 실패: {e}")))?;

        if body.trim().is_empty() {
            return Ok(AcknowledgeResponse::default());
        }
        match serde_json::from_str::<AcknowledgeResponse>(&body) {
            Ok(parsed) => Ok(parsed),
            Err(e) => {
                debug!("경고 확인 응답 본문 무시 (형식 불일치): {e}");
                Ok(AcknowledgeResponse::default())
            }
        }
    }

    async fn fetch_security_events(
        &self,
        query: &SecurityEventQuery,
    ) -> Result<SecurityEventsResponse, CoreError> {
        debug!(
            "보안 이벤트 조회: server={:?}, page={}/{}",
            query.server_id, query.page, query.page_size
        );
        let mut params: Query = Vec::new();
        if let Some(id) = query.server_id {
            params.push(("serverId", id.to_string()));
        }
        params.push(("hours", query.hours.to_string()));
        params.push(("page", query.page.to_string()));
        params.push(("pageSize", query.page_size.to_string()));

        self.get_json("/security/events", params, "보안 이벤트")
            .await
    }
}
