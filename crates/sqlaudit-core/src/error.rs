//! SQLAUDIT 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 에러 타입을 그대로 반환하거나 `#[from] CoreError`로 래핑한다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 전송 계층 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패 (필수 필드 누락 등)
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 인증 실패 (토큰 만료, 토큰 없음 등). 코어는 재시도하지 않는다.
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Alert", "Server")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 내부 에러 (예상치 못한 상황, 5xx 응답)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 네트워크 에러 (연결 실패, 타임아웃, 푸시 채널 끊김)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 서버가 요청을 거부함 (400, 409, 422 등)
    #[error("요청 거부됨 ({status}): {message}")]
    Rejected {
        /// HTTP 상태 코드
        status: u16,
        /// 서버 응답 본문
        message: String,
    },

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 필수 필드 누락 에러 생성 헬퍼
    pub fn missing_field(field: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: "필수 필드 누락".to_string(),
        }
    }

    /// 전송 계층 에러 여부. 마지막 정상 스냅샷을 유지하고 배너로만 알린다
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            CoreError::Network(_)
                | CoreError::ServiceUnavailable(_)
                | CoreError::RateLimit { .. }
                | CoreError::Internal(_)
        )
    }

    /// 인증 에러 여부. 호출자에게 전파하여 재인증을 유도한다
    pub fn is_auth(&self) -> bool {
        matches!(self, CoreError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(CoreError::Network("down".into()).is_transport());
        assert!(CoreError::ServiceUnavailable("busy".into()).is_transport());
        assert!(CoreError::RateLimit {
            retry_after_secs: 5
        }
        .is_transport());
        assert!(!CoreError::Auth("expired".into()).is_transport());
        assert!(!CoreError::missing_field("alertID").is_transport());
    }

    #[test]
    fn missing_field_message() {
        let err = CoreError::missing_field("serverName");
        let msg = err.to_string();
        assert!(msg.contains("serverName"));
        assert!(msg.contains("필수 필드 누락"));
    }

    #[test]
    fn auth_classification() {
        assert!(CoreError::Auth("토큰 없음".into()).is_auth());
        assert!(!CoreError::Rejected {
            status: 409,
            message: "conflict".into()
        }
        .is_auth());
    }
}
