//! 콘솔 요약 출력.
//!
//! 스냅샷과 동기화 상태를 한 줄 요약, 경고 목록, 이벤트 설명 문자열로 변환한다.

use chrono::{DateTime, Utc};
use sqlaudit_core::models::alert::{AckState, Alert};
use sqlaudit_core::models::snapshot::DashboardSnapshot;
use sqlaudit_sync::connectivity::{PushStatus, SyncHealth};
use sqlaudit_sync::events::SyncEvent;

/// 스냅샷 한 줄 요약
pub fn summary_line(snapshot: &DashboardSnapshot, health: SyncHealth, push: PushStatus) -> String {
    let counts = snapshot.server_counts();
    let severities = snapshot
        .alerts_by_severity()
        .iter()
        .map(|(severity, count)| format!("{severity} {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    let pending = snapshot.pending_alert_ids().len();
    let updated = snapshot
        .last_updated
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "rev={} 범위={} 갱신={} | 서버 {} (온라인 {} / 경고 {} / 오프라인 {}) | 경고 {} [{}] 확인 중 {} | 풀={} 푸시={}",
        snapshot.revision,
        snapshot.scope,
        updated,
        counts.total_servers,
        counts.online_servers,
        counts.warning_servers,
        counts.offline_servers,
        snapshot.alerts.len(),
        severities,
        pending,
        health,
        push,
    )
}

/// 경고 한 줄 (`--once` 출력용)
pub fn alert_line(alert: &Alert, now: DateTime<Utc>) -> String {
    let age_minutes = (now - alert.last_occurrence).num_minutes().max(0);
    let ack = match &alert.ack {
        AckState::Unacknowledged => "미확인".to_string(),
        AckState::Pending { .. } => "확인 중".to_string(),
        AckState::Confirmed {
            acknowledged_by, ..
        } => match acknowledged_by {
            Some(by) => format!("확인됨({by})"),
            None => "확인됨".to_string(),
        },
    };
    format!(
        "#{:<6} {:<8} {:<12} {} ({}분 전, {}회) [{}]",
        alert.alert_id,
        alert.severity.to_string(),
        alert.server_name,
        alert.message,
        age_minutes,
        alert.occurrence_count,
        ack,
    )
}

/// 미확인 경고를 심각도 높은 순으로 최대 `limit` 개
pub fn open_alert_lines(snapshot: &DashboardSnapshot, now: DateTime<Utc>, limit: usize) -> Vec<String> {
    let mut open: Vec<&Alert> = snapshot.unacknowledged_alerts().collect();
    open.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then(b.last_occurrence.cmp(&a.last_occurrence))
    });
    open.into_iter().take(limit).map(|a| alert_line(a, now)).collect()
}

/// 동기화 이벤트 설명
pub fn describe_event(event: &SyncEvent) -> String {
    match event {
        SyncEvent::PullFailed { message } => format!("풀 실패 (마지막 스냅샷 표시 중): {message}"),
        SyncEvent::PayloadRejected { source, reason } => format!("{source} 페이로드 거부: {reason}"),
        SyncEvent::StalePullDiscarded { generation, current } => {
            format!("지난 풀 결과 폐기 (gen {generation} < {current})")
        }
        SyncEvent::PushStatusChanged(status) => format!("푸시 상태: {status}"),
        SyncEvent::AuthenticationRequired { message } => format!("재인증 필요: {message}"),
    }
}
