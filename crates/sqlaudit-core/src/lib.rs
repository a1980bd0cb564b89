//! # sqlaudit-core
//!
//! SQLAUDIT 대시보드 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 모든 크레이트가 공유하는 핵심 타입과 인터페이스를 제공한다.
//!
//! ## 구조
//!
//! - [`models`]: 도메인 데이터 구조체와 와이어 DTO
//! - [`ports`]: Hexagonal Architecture 포트 인터페이스 (async_trait)
//! - [`error`]: 핵심 에러 타입 (thiserror)
//! - [`config`]: 애플리케이션 설정 구조체
//! - [`config_manager`]: 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;

#[cfg(test)]
mod tests {
    use crate::models::alert::{AckState, Severity};
    use crate::models::payload::AlertPayload;
    use crate::ports::api_client::{AcknowledgeRequest, AcknowledgeResponse};

    #[test]
    fn acknowledge_request_omits_missing_notes() {
        let body = serde_json::to_string(&AcknowledgeRequest::default()).unwrap();
        assert_eq!(body, "{}");

        let body = serde_json::to_string(&AcknowledgeRequest {
            notes: Some("재시작 예정".into()),
        })
        .unwrap();
        assert_eq!(body, r#"{"notes":"재시작 예정"}"#);
    }

    #[test]
    fn acknowledge_response_tolerates_empty_object() {
        let resp: AcknowledgeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(resp, AcknowledgeResponse::default());

        let resp: AcknowledgeResponse = serde_json::from_str(
            r#"{"acknowledgedBy": "dba", "acknowledgedDate": "2025-03-01T10:05:00Z"}"#,
        )
        .unwrap();
        assert_eq!(resp.acknowledged_by.as_deref(), Some("dba"));
    }

    #[test]
    fn alert_update_push_payload_converts() {
        let json = r#"{"alertID": 5, "alertName": "Blocking", "serverID": 2, "serverName": "SQL02",
            "severity": "Medium", "message": "blocked sessions", "timestamp": "2025-03-01T10:00:00Z",
            "isAcknowledged": false}"#;
        let alert = serde_json::from_str::<AlertPayload>(json)
            .unwrap()
            .into_alert()
            .unwrap();
        assert_eq!(alert.server_id, Some(2));
        assert_eq!(alert.severity, Severity::Medium);
        assert_eq!(alert.ack, AckState::Unacknowledged);
    }
}
