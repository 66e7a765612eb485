//! 액션(Action) 모델.
//!
//! 이벤트가 발동할 때 선언 순서대로 실행되는 입력 동작.

use serde::{Deserialize, Serialize};

use crate::models::geometry::Point;

/// 입력 액션 — 탭, 스와이프, 일시정지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    /// 지정 좌표 탭 (jitter 적용 가능)
    Click {
        /// 탭 좌표
        position: Point,
        /// 누르고 있는 시간 (밀리초)
        press_duration_ms: u64,
        /// 좌표 무작위 오프셋 반경 (픽셀, 탐지 회피용)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        randomize_px: Option<u32>,
    },
    /// 두 좌표 간 스와이프
    Swipe {
        /// 시작 좌표
        from: Point,
        /// 끝 좌표
        to: Point,
        /// 스와이프 시간 (밀리초)
        duration_ms: u64,
    },
    /// 대기
    Pause {
        /// 대기 시간 (밀리초)
        duration_ms: u64,
    },
}

impl Action {
    /// 액션 종류 이름 (로깅/에러 태그용)
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Swipe { .. } => "swipe",
            Action::Pause { .. } => "pause",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serde_tagged() {
        let action = Action::Click {
            position: Point::new(120, 120),
            press_duration_ms: 50,
            randomize_px: None,
        };
        let json = serde_json::to_string(&action).unwrap();
        assert!(json.contains("\"type\":\"Click\""));
        assert!(!json.contains("randomize_px"));

        let deser: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(deser, action);
    }

    #[test]
    fn action_kind_names() {
        let swipe = Action::Swipe {
            from: Point::new(0, 0),
            to: Point::new(100, 0),
            duration_ms: 250,
        };
        assert_eq!(swipe.kind(), "swipe");
        assert_eq!(Action::Pause { duration_ms: 10 }.kind(), "pause");
    }
}
