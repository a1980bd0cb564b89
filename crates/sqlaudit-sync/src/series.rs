//! 메트릭 시계열 축소기.
//!
//! 원시 메트릭 샘플을 특정 유형의 시간순 시계열로 만들고,
//! 점 개수가 상한을 넘으면 일정 간격으로 샘플링한다.
//! 순수 함수이므로 선택이 바뀔 때마다 다시 호출해도 같은 결과를 낸다.

use sqlaudit_core::models::metric::{KnownMetric, MetricSample, MetricSeries};

/// 차트용 시계열 생성
///
/// 1. `metric_type` 과 대소문자 무시로 일치하는 샘플만 남긴다.
/// 2. 타임스탬프 오름차순으로 안정 정렬한다 (동률은 입력 순서 유지).
/// 3. 개수가 `max_points` 를 넘으면 k = ceil(n / max_points) 간격으로 고르고,
///    원본의 마지막 점은 항상 포함한다.
///
/// 일치하는 샘플이 없거나 `max_points` 가 0이면 빈 시계열을 반환한다.
pub fn build_series(raw: &[MetricSample], metric_type: &str, max_points: usize) -> MetricSeries {
    let mut matching: Vec<&MetricSample> =
        raw.iter().filter(|s| s.is_type(metric_type)).collect();
    if matching.is_empty() || max_points == 0 {
        return MetricSeries::empty(metric_type);
    }

    matching.sort_by_key(|s| s.timestamp);
    let retained = downsample(&matching, max_points);

    let first = retained[0];
    let label = if first.metric_name.trim().is_empty() {
        KnownMetric::from_type_name(metric_type)
            .map(|m| m.label().to_string())
            .unwrap_or_else(|| metric_type.to_string())
    } else {
        first.metric_name.clone()
    };

    MetricSeries {
        metric_type: metric_type.to_string(),
        label,
        unit: first.unit.clone(),
        points: retained.into_iter().cloned().collect(),
    }
}

/// 간격 샘플링 (마지막 원소 보존, 결과 길이 ≤ `max_points`)
fn downsample<T: Copy>(items: &[T], max_points: usize) -> Vec<T> {
    let n = items.len();
    if n <= max_points {
        return items.to_vec();
    }

    let stride = n.div_ceil(max_points);
    let mut picked: Vec<T> = items.iter().step_by(stride).copied().collect();

    let last_index = n - 1;
    if last_index % stride != 0 {
        if picked.len() < max_points {
            picked.push(items[last_index]);
        } else if let Some(tail) = picked.last_mut() {
            *tail = items[last_index];
        }
    }
    picked
}
