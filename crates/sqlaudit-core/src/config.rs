//! 애플리케이션 설정 구조체.
//!
//! 서버 URL, 풀 주기, 푸시 활성화, 차트 기본값 등 런타임 설정을 정의한다.
//! 설정은 시작 시 한 번 읽어 각 컴포넌트 생성자에 명시적으로 전달한다.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CoreError;

/// REST API 주소 환경 변수
pub const ENV_BASE_URL: &str = "SQLAUDIT_BASE_URL";
/// 푸시 허브 주소 환경 변수
pub const ENV_HUB_URL: &str = "SQLAUDIT_HUB_URL";

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 서버 연결 설정
    pub server: ServerConfig,
    /// 대시보드 동기화 설정
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// 서버 연결 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// REST API 기본 URL (예: "https://localhost:7001/api")
    pub base_url: String,
    /// 푸시 허브 URL (예: "https://localhost:7001/auditHub")
    pub hub_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 조회(GET) 요청 최대 재시도 횟수
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// 푸시 재연결 최대 지연 (초)
    #[serde(default = "default_push_max_retry_secs")]
    pub push_max_retry_secs: u64,
}

/// 대시보드 동기화 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// 전체 풀 주기 (밀리초)
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// 경고 전용 풀 주기 (밀리초, None이면 비활성)
    #[serde(default = "default_alerts_refresh_interval_ms")]
    pub alerts_refresh_interval_ms: Option<u64>,
    /// 실시간 푸시 사용 여부
    #[serde(default = "default_true")]
    pub push_enabled: bool,
    /// 차트 기본 조회 기간 (시간)
    #[serde(default = "default_chart_hours")]
    pub default_chart_hours: u32,
    /// 차트 최대 점 개수
    #[serde(default = "default_max_chart_points")]
    pub max_chart_points: usize,
    /// 보안 이벤트 페이지 크기
    #[serde(default = "default_security_page_size")]
    pub security_page_size: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval_ms(),
            alerts_refresh_interval_ms: default_alerts_refresh_interval_ms(),
            push_enabled: true,
            default_chart_hours: default_chart_hours(),
            max_chart_points: default_max_chart_points(),
            security_page_size: default_security_page_size(),
        }
    }
}

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "https://localhost:7001/api".to_string(),
                hub_url: "https://localhost:7001/auditHub".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
                max_retries: default_max_retries(),
                push_max_retry_secs: default_push_max_retry_secs(),
            },
            dashboard: DashboardConfig::default(),
        }
    }

    /// 설정값 검증
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.server.base_url.trim().is_empty() {
            return Err(CoreError::Config("server.base_url 이 비어 있습니다".to_string()));
        }
        if self.dashboard.push_enabled && self.server.hub_url.trim().is_empty() {
            return Err(CoreError::Config(
                "푸시가 활성화되었지만 server.hub_url 이 비어 있습니다".to_string(),
            ));
        }
        if self.dashboard.refresh_interval_ms == 0 {
            return Err(CoreError::Config(
                "dashboard.refresh_interval_ms 는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.dashboard.alerts_refresh_interval_ms == Some(0) {
            return Err(CoreError::Config(
                "dashboard.alerts_refresh_interval_ms 는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.dashboard.max_chart_points == 0 {
            return Err(CoreError::Config(
                "dashboard.max_chart_points 는 0보다 커야 합니다".to_string(),
            ));
        }
        if self.dashboard.security_page_size == 0 {
            return Err(CoreError::Config(
                "dashboard.security_page_size 는 0보다 커야 합니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 환경 변수 오버라이드 적용
    ///
    /// `lookup` 은 보통 `|k| std::env::var(k).ok()` 이다.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            self.server.base_url = url;
        }
        if let Some(url) = lookup(ENV_HUB_URL).filter(|v| !v.trim().is_empty()) {
            self.server.hub_url = url;
        }
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 전체 풀 주기를 Duration으로 반환
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.dashboard.refresh_interval_ms)
    }

    /// 경고 전용 풀 주기를 Duration으로 반환
    pub fn alerts_refresh_interval(&self) -> Option<Duration> {
        self.dashboard
            .alerts_refresh_interval_ms
            .map(Duration::from_millis)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_push_max_retry_secs() -> u64 {
    30
}

fn default_refresh_interval_ms() -> u64 {
    30_000
}

fn default_alerts_refresh_interval_ms() -> Option<u64> {
    Some(15_000)
}

fn default_true() -> bool {
    true
}

fn default_chart_hours() -> u32 {
    24
}

fn default_max_chart_points() -> usize {
    100
}

fn default_security_page_size() -> u32 {
    25
}
