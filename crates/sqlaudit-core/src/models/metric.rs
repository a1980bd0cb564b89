//! 성능 메트릭 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 단일 메트릭 샘플 (수신 후 불변)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// 메트릭 ID (서버 할당, 선택)
    pub metric_id: Option<i64>,
    /// 서버 ID
    pub server_id: Option<i64>,
    /// 서버 이름
    pub server_name: Option<String>,
    /// 메트릭 유형 (CPU, Memory 등)
    pub metric_type: String,
    /// 메트릭 표시 이름
    pub metric_name: String,
    /// 측정값
    pub value: f64,
    /// 단위
    pub unit: String,
    /// 측정 시각
    pub timestamp: DateTime<Utc>,
}

impl MetricSample {
    /// 메트릭 유형 일치 여부 (대소문자 무시)
    pub fn is_type(&self, metric_type: &str) -> bool {
        self.metric_type.eq_ignore_ascii_case(metric_type)
    }
}

/// 차트용 파생 시계열
///
/// 입력 컬렉션이나 선택된 유형이 바뀌면 새로 만들어지며 제자리 수정하지 않는다.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricSeries {
    /// 요청된 메트릭 유형
    pub metric_type: String,
    /// 표시 레이블 (첫 샘플의 metric_name)
    pub label: String,
    /// 단위 (첫 샘플 기준)
    pub unit: String,
    /// 시간순 샘플
    pub points: Vec<MetricSample>,
}

impl MetricSeries {
    /// 명시적 빈 시계열 ("데이터 없음" 표시용)
    pub fn empty(metric_type: impl Into<String>) -> Self {
        Self {
            metric_type: metric_type.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 마지막 샘플
    pub fn last(&self) -> Option<&MetricSample> {
        self.points.last()
    }

    /// 차트 렌더러용 점 목록
    pub fn chart_points(&self) -> Vec<ChartPoint> {
        self.points
            .iter()
            .map(|p| ChartPoint {
                timestamp: p.timestamp,
                value: p.value,
                label: self.label.clone(),
            })
            .collect()
    }
}

/// 차트 점
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub label: String,
}

/// 대시보드가 기본 제공하는 메트릭 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownMetric {
    Cpu,
    Memory,
    Disk,
    Network,
    Connections,
}

impl KnownMetric {
    /// 선택 목록 순서
    pub const ALL: [KnownMetric; 5] = [
        KnownMetric::Cpu,
        KnownMetric::Memory,
        KnownMetric::Disk,
        KnownMetric::Network,
        KnownMetric::Connections,
    ];

    /// 서버가 보내는 metricType 값
    pub fn type_name(self) -> &'static str {
        match self {
            KnownMetric::Cpu => "CPU",
            KnownMetric::Memory => "Memory",
            KnownMetric::Disk => "Disk",
            KnownMetric::Network => "Network",
            KnownMetric::Connections => "Connections",
        }
    }

    /// 표시 레이블
    pub fn label(self) -> &'static str {
        match self {
            KnownMetric::Cpu => "CPU Usage",
            KnownMetric::Memory => "Memory Usage",
            KnownMetric::Disk => "Disk I/O",
            KnownMetric::Network => "Network I/O",
            KnownMetric::Connections => "Active Connections",
        }
    }

    /// metricType 문자열에서 조회 (대소문자 무시)
    pub fn from_type_name(name: &str) -> Option<KnownMetric> {
        Self::ALL
            .into_iter()
            .find(|m| m.type_name().eq_ignore_ascii_case(name))
    }
}

/// 원시 샘플에 존재하는 메트릭 유형 목록 (처음 등장한 순서, 대소문자 무시 중복 제거)
pub fn available_metric_types(raw: &[MetricSample]) -> Vec<String> {
    let mut types: Vec<String> = Vec::new();
    for sample in raw {
        if !types
            .iter()
            .any(|t| t.eq_ignore_ascii_case(&sample.metric_type))
        {
            types.push(sample.metric_type.clone());
        }
    }
    types
}
