//! 서버 JSON 와이어 포맷 (DTO) 과 도메인 변환.
//!
//! 서버 응답은 필드 누락이 잦으므로 모든 필드를 `Option`으로 받고,
//! 도메인 엔티티로 변환할 때 필수 필드를 검증한다.
//! 하나라도 잘못된 항목이 있으면 페이로드 전체가 거부된다.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::{AckState, Alert, Severity};
use super::inventory::{DatabaseSummary, SlowQuery};
use super::metric::MetricSample;
use super::security::{Page, SecurityEvent};
use super::server::{Server, ServerStatus, ServerStatusSummary};
use crate::error::CoreError;

// ============================================================
// 공통 파싱 헬퍼
// ============================================================

fn require<T>(value: Option<T>, field: &str) -> Result<T, CoreError> {
    value.ok_or_else(|| CoreError::missing_field(field))
}

fn require_text(value: Option<String>, field: &str) -> Result<String, CoreError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(CoreError::missing_field(field)),
    }
}

/// 서버 타임스탬프 파싱
///
/// RFC 3339 를 우선 시도하고, 오프셋 없는 값은 UTC로 간주한다.
pub fn parse_timestamp(field: &str, raw: &str) -> Result<DateTime<Utc>, CoreError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| CoreError::Validation {
            field: field.to_string(),
            message: format!("잘못된 타임스탬프: {raw}"),
        })
}

fn require_timestamp(raw: Option<String>, field: &str) -> Result<DateTime<Utc>, CoreError> {
    let raw = require_text(raw, field)?;
    parse_timestamp(field, &raw)
}

fn optional_timestamp(raw: Option<String>, field: &str) -> Result<Option<DateTime<Utc>>, CoreError> {
    match raw {
        Some(text) if !text.trim().is_empty() => parse_timestamp(field, &text).map(Some),
        _ => Ok(None),
    }
}

fn parse_severity(raw: &str, field: &str) -> Result<Severity, CoreError> {
    match raw.to_ascii_lowercase().as_str() {
        "critical" => Ok(Severity::Critical),
        "high" => Ok(Severity::High),
        "medium" => Ok(Severity::Medium),
        "low" => Ok(Severity::Low),
        "info" => Ok(Severity::Info),
        _ => Err(CoreError::Validation {
            field: field.to_string(),
            message: format!("알 수 없는 심각도: {raw}"),
        }),
    }
}

fn parse_server_status(raw: &str) -> Result<ServerStatus, CoreError> {
    match raw.to_ascii_lowercase().as_str() {
        "online" => Ok(ServerStatus::Online),
        "warning" => Ok(ServerStatus::Warning),
        "offline" => Ok(ServerStatus::Offline),
        _ => Err(CoreError::Validation {
            field: "status".to_string(),
            message: format!("알 수 없는 서버 상태: {raw}"),
        }),
    }
}

fn convert_all<P, T>(
    items: Option<Vec<P>>,
    convert: impl Fn(P) -> Result<T, CoreError>,
) -> Result<Vec<T>, CoreError> {
    items.unwrap_or_default().into_iter().map(convert).collect()
}

// ============================================================
// 서버
// ============================================================

/// 서버 개요 (`ServerStatusUpdate` 푸시와 `/dashboard/servers` 응답)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPayload {
    #[serde(rename = "serverID")]
    pub server_id: Option<i64>,
    pub server_name: Option<String>,
    pub status: Option<String>,
    pub last_seen: Option<String>,
    pub alert_count: Option<u32>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

impl ServerPayload {
    /// 도메인 엔티티로 변환 (serverID, serverName, status 필수)
    pub fn into_server(self, received_at: DateTime<Utc>) -> Result<Server, CoreError> {
        let server_id = require(self.server_id, "serverID")?;
        let server_name = require_text(self.server_name, "serverName")?;
        let status = parse_server_status(&require_text(self.status, "status")?)?;
        let last_seen = optional_timestamp(self.last_seen, "lastSeen")?.unwrap_or(received_at);
        Ok(Server {
            server_id,
            server_name,
            status,
            last_seen,
            alert_count: self.alert_count.unwrap_or(0),
            is_active: self.is_active.unwrap_or(true),
            description: self.description,
        })
    }
}

/// 서버 상태 집계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusSummaryPayload {
    pub total_servers: Option<u32>,
    pub online_servers: Option<u32>,
    pub warning_servers: Option<u32>,
    pub offline_servers: Option<u32>,
}

impl From<ServerStatusSummaryPayload> for ServerStatusSummary {
    fn from(p: ServerStatusSummaryPayload) -> Self {
        ServerStatusSummary {
            total_servers: p.total_servers.unwrap_or(0),
            online_servers: p.online_servers.unwrap_or(0),
            warning_servers: p.warning_servers.unwrap_or(0),
            offline_servers: p.offline_servers.unwrap_or(0),
        }
    }
}

// ============================================================
// 경고
// ============================================================

/// 경고 (`AlertUpdate` 푸시, `/alerts` 응답, 개요의 `activeAlerts`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertPayload {
    #[serde(rename = "alertID")]
    pub alert_id: Option<i64>,
    pub alert_name: Option<String>,
    pub alert_type: Option<String>,
    #[serde(rename = "serverID")]
    pub server_id: Option<i64>,
    pub server_name: Option<String>,
    pub severity: Option<String>,
    pub message: Option<String>,
    /// 마지막 발생 시각
    pub timestamp: Option<String>,
    pub first_occurrence: Option<String>,
    pub occurrence_count: Option<u32>,
    pub is_acknowledged: Option<bool>,
    pub acknowledged_by: Option<String>,
    pub acknowledged_date: Option<String>,
    pub notes: Option<String>,
}

impl AlertPayload {
    /// 도메인 엔티티로 변환 (alertID, severity, message, timestamp 필수)
    ///
    /// 서버가 확인됨으로 보고한 경고는 Confirmed, 나머지는 Unacknowledged 상태로 만든다.
    pub fn into_alert(self) -> Result<Alert, CoreError> {
        let alert_id = require(self.alert_id, "alertID")?;
        let severity = parse_severity(&require_text(self.severity, "severity")?, "severity")?;
        let message = require_text(self.message, "message")?;
        let last_occurrence = require_timestamp(self.timestamp, "timestamp")?;
        let first_occurrence =
            optional_timestamp(self.first_occurrence, "firstOccurrence")?.unwrap_or(last_occurrence);

        let ack = if self.is_acknowledged.unwrap_or(false) {
            let acknowledged_at = optional_timestamp(self.acknowledged_date, "acknowledgedDate")?
                .unwrap_or(last_occurrence);
            AckState::Confirmed {
                acknowledged_by: self.acknowledged_by,
                acknowledged_at,
                notes: self.notes,
            }
        } else {
            AckState::Unacknowledged
        };

        Ok(Alert {
            alert_id,
            alert_name: self.alert_name.unwrap_or_default(),
            alert_type: self.alert_type,
            server_id: self.server_id,
            server_name: self.server_name.unwrap_or_default(),
            severity,
            message,
            first_occurrence,
            last_occurrence,
            occurrence_count: self.occurrence_count.unwrap_or(1),
            ack,
        })
    }
}

// ============================================================
// 메트릭
// ============================================================

/// 메트릭 샘플
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricPayload {
    #[serde(rename = "metricID")]
    pub metric_id: Option<i64>,
    #[serde(rename = "serverID")]
    pub server_id: Option<i64>,
    pub server_name: Option<String>,
    pub metric_name: Option<String>,
    pub metric_type: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub timestamp: Option<String>,
}

impl MetricPayload {
    /// 도메인 엔티티로 변환 (metricType, value, timestamp 필수)
    pub fn into_sample(self) -> Result<MetricSample, CoreError> {
        let metric_type = require_text(self.metric_type, "metricType")?;
        let value = require(self.value, "value")?;
        let timestamp = require_timestamp(self.timestamp, "timestamp")?;
        Ok(MetricSample {
            metric_id: self.metric_id,
            server_id: self.server_id,
            server_name: self.server_name,
            metric_name: self.metric_name.unwrap_or_else(|| metric_type.clone()),
            metric_type,
            value,
            unit: self.unit.unwrap_or_default(),
            timestamp,
        })
    }
}

/// 메트릭 목록 일괄 변환
pub fn into_samples(payloads: Vec<MetricPayload>) -> Result<Vec<MetricSample>, CoreError> {
    convert_all(Some(payloads), MetricPayload::into_sample)
}

// ============================================================
// 보안 이벤트
// ============================================================

/// 보안 이벤트
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventPayload {
    #[serde(rename = "eventID")]
    pub event_id: Option<i64>,
    pub server_name: Option<String>,
    pub event_type: Option<String>,
    pub severity: Option<String>,
    pub description: Option<String>,
    pub timestamp: Option<String>,
    #[serde(rename = "sourceIP")]
    pub source_ip: Option<String>,
    pub user_name: Option<String>,
    pub database_name: Option<String>,
}

impl SecurityEventPayload {
    /// 도메인 엔티티로 변환 (eventID, timestamp 필수, 심각도 누락 시 Info)
    pub fn into_event(self) -> Result<SecurityEvent, CoreError> {
        let event_id = require(self.event_id, "eventID")?;
        let timestamp = require_timestamp(self.timestamp, "timestamp")?;
        let severity = match self.severity {
            Some(raw) => parse_severity(&raw, "severity")?,
            None => Severity::Info,
        };
        Ok(SecurityEvent {
            event_id,
            server_name: self.server_name.unwrap_or_default(),
            event_type: self.event_type.unwrap_or_default(),
            severity,
            description: self.description.unwrap_or_default(),
            timestamp,
            source_ip: self.source_ip,
            user_name: self.user_name,
            database_name: self.database_name,
        })
    }
}

/// 보안 이벤트 목록 응답
///
/// 페이지 응답과 배열 응답을 모두 받는다.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SecurityEventsResponse {
    Paged(SecurityEventPagePayload),
    List(Vec<SecurityEventPayload>),
}

/// 페이지 응답 본문
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventPagePayload {
    pub data: Vec<SecurityEventPayload>,
    pub total_count: Option<u64>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
    pub total_pages: Option<u32>,
}

impl SecurityEventsResponse {
    /// 도메인 페이지로 변환
    ///
    /// 배열 응답은 전체 목록이므로 요청한 페이지와 무관하게 1/1 페이지로 본다.
    pub fn into_page(self, page: u32, page_size: u32) -> Result<Page<SecurityEvent>, CoreError> {
        match self {
            SecurityEventsResponse::Paged(p) => {
                let items = convert_all(Some(p.data), SecurityEventPayload::into_event)?;
                let page_size = p.page_size.unwrap_or(page_size);
                let total_count = p.total_count.unwrap_or(items.len() as u64);
                let total_pages = p.total_pages.unwrap_or_else(|| {
                    if page_size == 0 {
                        1
                    } else {
                        total_count.div_ceil(page_size as u64) as u32
                    }
                });
                Ok(Page {
                    items,
                    total_count,
                    page_number: p.page_number.unwrap_or(page),
                    page_size,
                    total_pages,
                })
            }
            SecurityEventsResponse::List(list) => {
                let items = convert_all(Some(list), SecurityEventPayload::into_event)?;
                Ok(Page {
                    total_count: items.len() as u64,
                    page_size: page_size.max(items.len() as u32),
                    items,
                    page_number: 1,
                    total_pages: 1,
                })
            }
        }
    }
}

// ============================================================
// 데이터베이스 / 느린 쿼리
// ============================================================

/// 데이터베이스 요약
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePayload {
    #[serde(rename = "databaseID")]
    pub database_id: Option<i64>,
    pub database_name: Option<String>,
    pub server_name: Option<String>,
    #[serde(rename = "sizeGB")]
    pub size_gb: Option<f64>,
    pub status: Option<String>,
    pub last_backup: Option<String>,
    pub growth_rate: Option<f64>,
}

impl DatabasePayload {
    /// 도메인 엔티티로 변환 (databaseID, databaseName 필수)
    pub fn into_summary(self) -> Result<DatabaseSummary, CoreError> {
        Ok(DatabaseSummary {
            database_id: require(self.database_id, "databaseID")?,
            database_name: require_text(self.database_name, "databaseName")?,
            server_name: self.server_name.unwrap_or_default(),
            size_gb: self.size_gb.unwrap_or(0.0),
            status: self.status.unwrap_or_default(),
            last_backup: optional_timestamp(self.last_backup, "lastBackup")?,
            growth_rate: self.growth_rate.unwrap_or(0.0),
        })
    }
}

/// 느린 쿼리
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowQueryPayload {
    #[serde(rename = "queryID")]
    pub query_id: Option<i64>,
    pub server_name: Option<String>,
    pub database_name: Option<String>,
    pub query_text: Option<String>,
    pub execution_time: Option<f64>,
    pub timestamp: Option<String>,
    pub frequency: Option<u32>,
    #[serde(rename = "avgCPU")]
    pub avg_cpu: Option<f64>,
    #[serde(rename = "avgIO")]
    pub avg_io: Option<f64>,
}

impl SlowQueryPayload {
    /// 도메인 엔티티로 변환 (queryID 필수)
    pub fn into_query(self) -> Result<SlowQuery, CoreError> {
        Ok(SlowQuery {
            query_id: require(self.query_id, "queryID")?,
            server_name: self.server_name.unwrap_or_default(),
            database_name: self.database_name.unwrap_or_default(),
            query_text: self.query_text.unwrap_or_default(),
            execution_time_ms: self.execution_time.unwrap_or(0.0),
            timestamp: optional_timestamp(self.timestamp, "timestamp")?,
            frequency: self.frequency.unwrap_or(0),
            avg_cpu: self.avg_cpu.unwrap_or(0.0),
            avg_io: self.avg_io.unwrap_or(0.0),
        })
    }
}

// ============================================================
// 개요 (스냅샷 형태 페이로드)
// ============================================================

/// `/dashboard/overview` 응답 및 `DashboardUpdate` 푸시
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewPayload {
    pub server_status: Option<ServerStatusSummaryPayload>,
    pub active_alerts: Option<Vec<AlertPayload>>,
    pub latest_metrics: Option<Vec<MetricPayload>>,
    pub top_databases: Option<Vec<DatabasePayload>>,
    pub slow_queries: Option<Vec<SlowQueryPayload>>,
    pub recent_security_events: Option<Vec<SecurityEventPayload>>,
    pub last_updated: Option<String>,
}

/// 검증된 개요
#[derive(Debug, Clone, PartialEq)]
pub struct Overview {
    pub server_status: ServerStatusSummary,
    pub alerts: Vec<Alert>,
    pub metrics: Vec<MetricSample>,
    pub databases: Vec<DatabaseSummary>,
    pub slow_queries: Vec<SlowQuery>,
    pub security_events: Vec<SecurityEvent>,
    pub last_updated: DateTime<Utc>,
}

impl OverviewPayload {
    /// 검증 후 도메인 개요로 변환
    ///
    /// 누락된 컬렉션은 빈 컬렉션, 누락된 `lastUpdated` 는 수신 시각으로 채운다.
    pub fn into_overview(self, received_at: DateTime<Utc>) -> Result<Overview, CoreError> {
        Ok(Overview {
            server_status: self.server_status.unwrap_or_default().into(),
            alerts: convert_all(self.active_alerts, AlertPayload::into_alert)?,
            metrics: convert_all(self.latest_metrics, MetricPayload::into_sample)?,
            databases: convert_all(self.top_databases, DatabasePayload::into_summary)?,
            slow_queries: convert_all(self.slow_queries, SlowQueryPayload::into_query)?,
            security_events: convert_all(
                self.recent_security_events,
                SecurityEventPayload::into_event,
            )?,
            last_updated: optional_timestamp(self.last_updated, "lastUpdated")?
                .unwrap_or(received_at),
        })
    }
}

/// 서버 목록 일괄 변환
pub fn into_servers(
    payloads: Vec<ServerPayload>,
    received_at: DateTime<Utc>,
) -> Result<Vec<Server>, CoreError> {
    convert_all(Some(payloads), |p| p.into_server(received_at))
}

/// 경고 목록 일괄 변환
pub fn into_alerts(payloads: Vec<AlertPayload>) -> Result<Vec<Alert>, CoreError> {
    convert_all(Some(payloads), AlertPayload::into_alert)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn overview_from_server_json() {
        let json = r#"{
            "serverStatus": {"totalServers": 2, "onlineServers": 1, "warningServers": 1, "offlineServers": 0},
            "activeAlerts": [{
                "alertID": 5, "alertName": "High CPU", "serverName": "SQL01", "alertType": "Performance",
                "severity": "High", "message": "CPU > 90%", "timestamp": "2025-03-01T10:00:00Z",
                "isAcknowledged": false
            }],
            "latestMetrics": [{
                "metricID": 1, "metricName": "CPU Usage", "metricType": "CPU", "value": 91.5,
                "unit": "%", "timestamp": "2025-03-01T10:00:00", "serverName": "SQL01", "serverID": 1
            }],
            "topDatabases": [{"databaseID": 3, "databaseName": "Sales", "serverName": "SQL01",
                "sizeGB": 12.5, "status": "Online", "lastBackup": "2025-02-28T23:00:00Z", "growthRate": 1.2}],
            "slowQueries": [{"queryID": 9, "serverName": "SQL01", "databaseName": "Sales",
                "queryText": "SELECT 1", "executionTime": 1530.0, "timestamp": "2025-03-01T09:59:00Z",
                "frequency": 4, "avgCPU": 20.0, "avgIO": 3.0}],
            "recentSecurityEvents": [{"eventID": 11, "serverName": "SQL01", "eventType": "FailedLogin",
                "severity": "Medium", "description": "3 failed logins", "timestamp": "2025-03-01T09:00:00Z",
                "sourceIP": "10.0.0.4"}],
            "lastUpdated": "2025-03-01T10:00:05Z"
        }"#;

        let payload: OverviewPayload = serde_json::from_str(json).unwrap();
        let overview = payload.into_overview(Utc::now()).unwrap();

        assert_eq!(overview.server_status.total_servers, 2);
        assert_eq!(overview.alerts[0].alert_id, 5);
        assert_eq!(overview.alerts[0].severity, Severity::High);
        assert!(overview.alerts[0].ack.is_unacknowledged());
        assert_eq!(overview.alerts[0].occurrence_count, 1);
        assert_eq!(overview.metrics[0].server_id, Some(1));
        assert_eq!(
            overview.metrics[0].timestamp,
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap()
        );
        assert_eq!(overview.databases[0].database_name, "Sales");
        assert_eq!(overview.slow_queries[0].execution_time_ms, 1530.0);
        assert_eq!(overview.security_events[0].source_ip.as_deref(), Some("10.0.0.4"));
        assert_eq!(
            overview.last_updated,
            Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 5).unwrap()
        );
    }

    #[test]
    fn missing_collections_become_empty() {
        let received_at = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let overview = OverviewPayload::default().into_overview(received_at).unwrap();
        assert!(overview.alerts.is_empty());
        assert!(overview.metrics.is_empty());
        assert_eq!(overview.last_updated, received_at);
        assert_eq!(overview.server_status, ServerStatusSummary::default());
    }

    #[test]
    fn one_invalid_alert_rejects_whole_overview() {
        let payload = OverviewPayload {
            active_alerts: Some(vec![
                AlertPayload {
                    alert_id: Some(1),
                    severity: Some("Low".into()),
                    message: Some("ok".into()),
                    timestamp: Some("2025-03-01T10:00:00Z".into()),
                    ..Default::default()
                },
                AlertPayload {
                    alert_id: None,
                    severity: Some("Low".into()),
                    message: Some("broken".into()),
                    timestamp: Some("2025-03-01T10:00:00Z".into()),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        };
        let err = payload.into_overview(Utc::now()).unwrap_err();
        assert!(err.to_string().contains("alertID"));
    }

    #[test]
    fn server_requires_identity_name_and_status() {
        let now = Utc::now();
        let missing_name = ServerPayload {
            server_id: Some(1),
            status: Some("Online".into()),
            ..Default::default()
        };
        assert!(missing_name.into_server(now).is_err());

        let bad_status = ServerPayload {
            server_id: Some(1),
            server_name: Some("SQL01".into()),
            status: Some("Sleeping".into()),
            ..Default::default()
        };
        assert!(bad_status.into_server(now).is_err());

        let ok = ServerPayload {
            server_id: Some(1),
            server_name: Some("SQL01".into()),
            status: Some("warning".into()),
            ..Default::default()
        }
        .into_server(now)
        .unwrap();
        assert_eq!(ok.status, ServerStatus::Warning);
        assert_eq!(ok.last_seen, now);
        assert!(ok.is_active);
    }

    #[test]
    fn acknowledged_alert_becomes_confirmed() {
        let json = r#"{"alertID": 8, "severity": "critical", "message": "disk full",
            "timestamp": "2025-03-01T10:00:00Z", "isAcknowledged": true,
            "acknowledgedBy": "dba", "acknowledgedDate": "2025-03-01T10:05:00Z"}"#;
        let alert = serde_json::from_str::<AlertPayload>(json)
            .unwrap()
            .into_alert()
            .unwrap();
        match alert.ack {
            AckState::Confirmed {
                acknowledged_by,
                acknowledged_at,
                ..
            } => {
                assert_eq!(acknowledged_by.as_deref(), Some("dba"));
                assert_eq!(
                    acknowledged_at,
                    Utc.with_ymd_and_hms(2025, 3, 1, 10, 5, 0).unwrap()
                );
            }
            other => panic!("expected Confirmed, got {other:?}"),
        }
    }

    #[test]
    fn metric_requires_type_value_timestamp() {
        let no_value = MetricPayload {
            metric_type: Some("CPU".into()),
            timestamp: Some("2025-03-01T10:00:00Z".into()),
            ..Default::default()
        };
        assert!(no_value.into_sample().is_err());

        let bad_time = MetricPayload {
            metric_type: Some("CPU".into()),
            value: Some(1.0),
            timestamp: Some("yesterday".into()),
            ..Default::default()
        };
        assert!(bad_time.into_sample().is_err());
    }

    #[test]
    fn security_events_accept_page_or_list() {
        let paged = r#"{"data": [{"eventID": 1, "timestamp": "2025-03-01T10:00:00Z"}],
            "totalCount": 51, "pageNumber": 2, "pageSize": 25, "totalPages": 3}"#;
        let page = serde_json::from_str::<SecurityEventsResponse>(paged)
            .unwrap()
            .into_page(2, 25)
            .unwrap();
        assert_eq!(page.total_count, 51);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].severity, Severity::Info);

        let list = r#"[{"eventID": 1, "timestamp": "2025-03-01T10:00:00Z"},
                       {"eventID": 2, "timestamp": "2025-03-01T10:01:00Z"}]"#;
        let page = serde_json::from_str::<SecurityEventsResponse>(list)
            .unwrap()
            .into_page(1, 25)
            .unwrap();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.page_number, 1);
        assert!(!page.has_next());
    }

    #[test]
    fn list_response_is_one_complete_page_whatever_was_requested() {
        let list = r#"[{"eventID": 1, "timestamp": "2025-03-01T10:00:00Z"},
                       {"eventID": 2, "timestamp": "2025-03-01T10:01:00Z"},
                       {"eventID": 3, "timestamp": "2025-03-01T10:02:00Z"}]"#;
        let page = serde_json::from_str::<SecurityEventsResponse>(list)
            .unwrap()
            .into_page(4, 2)
            .unwrap();
        assert_eq!(page.items.len(), 3);
        assert_eq!(page.total_count, 3);
        assert_eq!(page.page_number, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.page_size, 3);
        assert!(!page.has_next());
    }
}
