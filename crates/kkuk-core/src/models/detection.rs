//! 탐지 결과 — 틱 단위로 생성되는 일시적 값.

use serde::{Deserialize, Serialize};

use crate::models::condition::Condition;
use crate::models::event::Event;
use crate::models::geometry::Point;

/// 한 번의 매칭 시도 결과
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    /// 매칭 여부
    pub detected: bool,
    /// 매칭 중심 좌표 (비매칭 시 (0,0) 스텁)
    pub position: Point,
    /// 최고 유사도 점수 (0~100)
    pub confidence: f64,
}

impl DetectionResult {
    /// 비매칭 결과 (스텁 좌표)
    pub fn not_detected() -> Self {
        Self {
            detected: false,
            position: Point::default(),
            confidence: 0.0,
        }
    }

    /// 매칭 결과
    pub fn detected_at(position: Point, confidence: f64) -> Self {
        Self {
            detected: true,
            position,
            confidence,
        }
    }
}

/// 한 틱의 처리 결과 요약.
///
/// 발동한 이벤트(있다면), 결정적이었던 조건과 그 탐지 결과를 담는다.
/// DebugEngine과 호출자가 소비하며 저장되지 않는다.
#[derive(Debug, Clone, Default)]
pub struct ProcessorResult {
    /// 발동한 이벤트
    pub event: Option<Event>,
    /// 발동을 결정지은 조건
    pub condition: Option<Condition>,
    /// 결정 조건의 탐지 결과
    pub detection_result: Option<DetectionResult>,
    /// 이벤트 조건 집합 전체 충족 여부
    pub event_matched: bool,
}

impl ProcessorResult {
    /// 아무 이벤트도 발동하지 않은 틱
    pub fn no_match() -> Self {
        Self::default()
    }

    /// 이벤트가 발동한 틱
    pub fn matched(event: Event, condition: Condition, detection_result: DetectionResult) -> Self {
        Self {
            event: Some(event),
            condition: Some(condition),
            detection_result: Some(detection_result),
            event_matched: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_detected_has_stub_position() {
        let result = DetectionResult::not_detected();
        assert!(!result.detected);
        assert_eq!(result.position, Point::new(0, 0));
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn no_match_is_empty() {
        let result = ProcessorResult::no_match();
        assert!(!result.event_matched);
        assert!(result.event.is_none());
        assert!(result.condition.is_none());
        assert!(result.detection_result.is_none());
    }
}
