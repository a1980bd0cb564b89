//! 데이터베이스 및 느린 쿼리 요약 (읽기 전용 투영).
//!
//! 스냅샷 병합 시 컬렉션 단위로 통째로 교체된다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 데이터베이스 요약
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSummary {
    pub database_id: i64,
    pub database_name: String,
    pub server_name: String,
    /// 크기 (GB)
    pub size_gb: f64,
    pub status: String,
    pub last_backup: Option<DateTime<Utc>>,
    /// 증가율 (%)
    pub growth_rate: f64,
}

/// 느린 쿼리
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlowQuery {
    pub query_id: i64,
    pub server_name: String,
    pub database_name: String,
    pub query_text: String,
    /// 실행 시간 (ms)
    pub execution_time_ms: f64,
    pub timestamp: Option<DateTime<Utc>>,
    /// 실행 빈도
    pub frequency: u32,
    pub avg_cpu: f64,
    pub avg_io: f64,
}
