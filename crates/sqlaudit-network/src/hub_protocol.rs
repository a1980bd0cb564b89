//! 허브 JSON 프로토콜 프레이밍.
//!
//! 푸시 허브는 WebSocket 위에서 JSON 메시지를 주고받으며,
//! 각 메시지는 레코드 구분자 `0x1E` 로 끝난다.
//!
//! | type | 의미                    |
//! |------|-------------------------|
//! | 1    | 호출 (Invocation)        |
//! | 3    | 호출 완료 (Completion)   |
//! | 6    | 핑                      |
//! | 7    | 연결 종료                |

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlaudit_core::error::CoreError;
use sqlaudit_core::ports::push::PushEvent;

/// 메시지 종료 구분자
pub const RECORD_SEPARATOR: char = '\u{1e}';

const TYPE_INVOCATION: u8 = 1;
const TYPE_COMPLETION: u8 = 3;
const TYPE_PING: u8 = 6;
const TYPE_CLOSE: u8 = 7;

/// 서버 → 클라이언트 메서드 이름
pub const TARGET_DASHBOARD_UPDATE: &str = "DashboardUpdate";
pub const TARGET_ALERT_UPDATE: &str = "AlertUpdate";
pub const TARGET_SERVER_STATUS_UPDATE: &str = "ServerStatusUpdate";

/// 클라이언트 → 서버 메서드 이름
pub const METHOD_JOIN_GROUP: &str = "JoinGroup";
pub const METHOD_LEAVE_GROUP: &str = "LeaveGroup";

/// 디코딩된 허브 메시지
#[derive(Debug, Clone, PartialEq)]
pub enum HubMessage {
    Invocation {
        target: String,
        arguments: Vec<Value>,
    },
    Completion {
        invocation_id: Option<String>,
        error: Option<String>,
    },
    Ping,
    Close {
        error: Option<String>,
    },
    /// 처리하지 않는 메시지 유형
    Other(u8),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMessage {
    #[serde(rename = "type")]
    kind: u8,
    target: Option<String>,
    #[serde(default)]
    arguments: Vec<Value>,
    invocation_id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OutboundInvocation<'a> {
    #[serde(rename = "type")]
    kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    invocation_id: Option<&'a str>,
    target: &'a str,
    arguments: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct HandshakeResponse {
    error: Option<String>,
}

/// 핸드셰이크 요청 프레임
pub fn handshake_request() -> String {
    format!(r#"{{"protocol":"json","version":1}}{RECORD_SEPARATOR}"#)
}

/// 핸드셰이크 응답 확인 (`{}` 이면 성공)
pub fn parse_handshake_response(frame: &str) -> Result<(), CoreError> {
    let resp: HandshakeResponse = serde_json::from_str(frame)?;
    match resp.error {
        Some(error) => Err(CoreError::Network(format!("허브 핸드셰이크 거부: {error}"))),
        None => Ok(()),
    }
}

/// 텍스트 메시지를 개별 프레임으로 분리 (빈 프레임 제외)
pub fn split_frames(text: &str) -> impl Iterator<Item = &str> {
    text.split(RECORD_SEPARATOR)
        .map(str::trim)
        .filter(|frame| !frame.is_empty())
}

/// 단일 프레임 디코딩
pub fn parse_message(frame: &str) -> Result<HubMessage, CoreError> {
    let raw: RawMessage = serde_json::from_str(frame)?;
    Ok(match raw.kind {
        TYPE_INVOCATION => HubMessage::Invocation {
            target: raw.target.ok_or_else(|| CoreError::missing_field("target"))?,
            arguments: raw.arguments,
        },
        TYPE_COMPLETION => HubMessage::Completion {
            invocation_id: raw.invocation_id,
            error: raw.error,
        },
        TYPE_PING => HubMessage::Ping,
        TYPE_CLOSE => HubMessage::Close { error: raw.error },
        other => HubMessage::Other(other),
    })
}

/// 호출 프레임 인코딩
pub fn encode_invocation(
    target: &str,
    arguments: Vec<Value>,
    invocation_id: Option<&str>,
) -> Result<String, CoreError> {
    let message = OutboundInvocation {
        kind: TYPE_INVOCATION,
        invocation_id,
        target,
        arguments,
    };
    Ok(format!(
        "{}{RECORD_SEPARATOR}",
        serde_json::to_string(&message)?
    ))
}

/// 그룹 가입/탈퇴 호출 프레임
pub fn encode_group_call(method: &str, group: &str, invocation_id: &str) -> Result<String, CoreError> {
    encode_invocation(method, vec![Value::String(group.to_string())], Some(invocation_id))
}

/// 핑 프레임
pub fn encode_ping() -> String {
    format!(r#"{{"type":{TYPE_PING}}}{RECORD_SEPARATOR}"#)
}

/// 서버 호출을 푸시 이벤트로 변환
///
/// 알 수 없는 대상이면 `Ok(None)`, 인자 형식이 맞지 않으면 에러.
pub fn invocation_to_event(target: &str, arguments: Vec<Value>) -> Result<Option<PushEvent>, CoreError> {
    let Some(first) = arguments.into_iter().next() else {
        return Err(CoreError::Validation {
            field: "arguments".to_string(),
            message: format!("{target} 호출에 인자 없음"),
        });
    };

    let event = if target.eq_ignore_ascii_case(TARGET_DASHBOARD_UPDATE) {
        PushEvent::DashboardUpdate(serde_json::from_value(first)?)
    } else if target.eq_ignore_ascii_case(TARGET_ALERT_UPDATE) {
        PushEvent::AlertUpdate(serde_json::from_value(first)?)
    } else if target.eq_ignore_ascii_case(TARGET_SERVER_STATUS_UPDATE) {
        PushEvent::ServerStatusUpdate(serde_json::from_value(first)?)
    } else {
        return Ok(None);
    };
    Ok(Some(event))
}
