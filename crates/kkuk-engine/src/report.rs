//! 디버그 리포트 모델.
//!
//! 세션 종료 시 한 번 조립되는 불변 요약과, 세션 중 실시간으로
//! 흐르는 매칭 하이라이트 레코드.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kkuk_core::models::detection::DetectionResult;
use kkuk_core::models::geometry::Rect;

use crate::recorder::ProcessingDebugInfo;

/// 세션 중지 사유
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason")]
pub enum StopReason {
    /// 종료 조건 충족
    EndConditionsFulfilled,
    /// 외부 중지 요청
    Requested,
    /// 액션 실행 실패 (실패한 액션 종류 보존)
    ActionFailure {
        /// 실패 원인 설명
        message: String,
    },
}

/// 실시간 매칭 하이라이트 — 이벤트 발동 시 구독자에게 발행
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// 발동 이벤트 id
    pub event_id: i64,
    /// 발동 이벤트 이름
    pub event_name: String,
    /// 결정 조건 id
    pub condition_id: i64,
    /// 결정 조건 이름
    pub condition_name: String,
    /// 결정 조건의 탐지 결과
    pub detection_result: DetectionResult,
    /// 매칭 중심에 조건 크기로 그린 하이라이트 영역
    pub condition_area: Rect,
}

/// 이벤트별 리포트 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventReport {
    /// 이벤트 id
    pub id: i64,
    /// 이벤트 이름
    pub name: String,
    /// 발동 횟수
    pub trigger_count: u32,
    /// 평가 통계 (한 번도 평가되지 않았으면 0 초기값)
    pub processing: ProcessingDebugInfo,
}

/// 조건별 리포트 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionReport {
    /// 조건 id
    pub id: i64,
    /// 조건 이름
    pub name: String,
    /// 매칭 성공 횟수
    pub match_count: u64,
    /// 매칭 통계 (한 번도 평가되지 않았으면 0 초기값)
    pub processing: ProcessingDebugInfo,
}

/// 세션 종료 시점의 불변 디버그 리포트
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebugReport {
    /// 세션 식별자
    pub session_id: Uuid,
    /// 시나리오 id
    pub scenario_id: i64,
    /// 시나리오 이름
    pub scenario_name: String,
    /// 세션 시작 시각
    pub started_at: DateTime<Utc>,
    /// 세션 종료 시각
    pub ended_at: DateTime<Utc>,
    /// 중지 사유
    pub stop_reason: StopReason,
    /// 세션 전체 통계
    pub session: ProcessingDebugInfo,
    /// 프레임 처리 통계 (count = 처리한 틱 수)
    pub image: ProcessingDebugInfo,
    /// 전체 이벤트 발동 횟수
    pub events_triggered: u64,
    /// 전체 조건 매칭 횟수
    pub conditions_matched: u64,
    /// 이벤트별 항목 (시나리오 선언 순서)
    pub events: Vec<EventReport>,
    /// 조건별 항목 (시나리오 선언 순서)
    pub conditions: Vec<ConditionReport>,
}
