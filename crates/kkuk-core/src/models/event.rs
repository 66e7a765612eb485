//! 이벤트(Event) 모델.

use serde::{Deserialize, Serialize};

use crate::models::action::Action;
use crate::models::condition::Condition;

/// 조건/종료조건 결합 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    /// 전부 충족해야 함
    And,
    /// 하나라도 충족하면 됨
    Or,
}

/// 이벤트 — 조건 집합(AND/OR)과 발동 시 실행할 액션 목록
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// 이벤트 식별자 (시나리오 내 유일)
    pub id: i64,
    /// 이벤트 이름
    pub name: String,
    /// 조건 결합 연산자
    pub operator: Operator,
    /// 조건 목록 (선언 순서대로 평가)
    pub conditions: Vec<Condition>,
    /// 액션 목록 (선언 순서대로 실행)
    pub actions: Vec<Action>,
    /// 비활성 이벤트는 평가에서 제외
    pub enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::condition::DetectionType;
    use crate::models::geometry::Point;

    #[test]
    fn event_serde_roundtrip() {
        let event = Event {
            id: 7,
            name: "로그인 버튼".to_string(),
            operator: Operator::And,
            conditions: vec![Condition {
                id: 70,
                name: "버튼 이미지".to_string(),
                area: None,
                threshold: 85,
                detection_type: DetectionType::Anywhere,
                path: None,
                bitmap: None,
            }],
            actions: vec![Action::Click {
                position: Point::new(10, 20),
                press_duration_ms: 30,
                randomize_px: Some(3),
            }],
            enabled: true,
        };

        let json = serde_json::to_string(&event).unwrap();
        let deser: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(deser.id, 7);
        assert_eq!(deser.operator, Operator::And);
        assert_eq!(deser.conditions.len(), 1);
        assert_eq!(deser.actions.len(), 1);
    }
}
