//! 보안 이벤트 모델과 페이지 응답.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Severity;

/// 보안 이벤트 (읽기 전용)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub event_id: i64,
    pub server_name: String,
    /// 이벤트 유형 (FailedLogin, PermissionChange 등)
    pub event_type: String,
    pub severity: Severity,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub source_ip: Option<String>,
    pub user_name: Option<String>,
    pub database_name: Option<String>,
}

/// 페이지 단위 응답
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: u64,
    /// 1부터 시작
    pub page_number: u32,
    pub page_size: u32,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// 다음 페이지 존재 여부
    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }
}

/// 보안 이벤트 조회 조건
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityEventQuery {
    /// 서버 범위 (None이면 전체)
    pub server_id: Option<i64>,
    /// 조회 기간 (시간)
    pub hours: u32,
    /// 페이지 번호 (1부터)
    pub page: u32,
    pub page_size: u32,
}

impl SecurityEventQuery {
    /// 첫 페이지 조회 조건
    pub fn first_page(server_id: Option<i64>, hours: u32, page_size: u32) -> Self {
        Self {
            server_id,
            hours,
            page: 1,
            page_size,
        }
    }

    /// 다음 페이지 조회 조건
    pub fn next_page(&self) -> Self {
        Self {
            page: self.page + 1,
            ..self.clone()
        }
    }
}
