//! KKUK 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 이 타입을 직접 반환한다.
//! 에러 분류별 처리 방침은 처리 엔진(kkuk-engine)이 결정한다:
//! `Match`는 조건 경계에서 비매칭으로 복구, `Action`은 세션 종료,
//! `InvalidState`는 계약 위반(프로그래밍 버그)으로 전파된다.

use thiserror::Error;

/// 코어 레이어 에러.
#[derive(Debug, Error)]
pub enum CoreError {
    /// 호출 순서 계약 위반 (start/end 짝 불일치, 프레임 바인딩 전 매칭 등)
    #[error("상태 에러: {0}")]
    InvalidState(String),

    /// 조건 이미지 매칭 불가 (크기 0, 프레임보다 큰 조건 등)
    #[error("매칭 에러: {0}")]
    Match(String),

    /// 입력 주입 실패 — 세션을 종료시키는 치명 에러
    #[error("액션 실행 실패 — {action}: {message}")]
    Action {
        /// 실패한 액션 종류 (예: "click", "swipe")
        action: String,
        /// 실패 사유
        message: String,
    },

    /// 시나리오/설정 구성 오류 — 세션 시작 전에 거부
    #[error("설정 에러: {0}")]
    Config(String),

    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),
}

impl CoreError {
    /// 액션 에러 생성 헬퍼
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Action {
            action: action.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_error_display() {
        let err = CoreError::action("click", "권한 없음");
        assert_eq!(err.to_string(), "액션 실행 실패 — click: 권한 없음");
    }

    #[test]
    fn serde_error_wrapped() {
        let parse_err = serde_json::from_str::<i64>("not-a-number").unwrap_err();
        let err: CoreError = parse_err.into();
        assert!(matches!(err, CoreError::Serialization(_)));
    }
}
