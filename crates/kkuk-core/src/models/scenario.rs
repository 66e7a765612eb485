//! 시나리오(Scenario) 모델.
//!
//! 자동화 정의의 루트 집합체. 세션 시작 시 한 번 로드되며
//! 처리 중에는 불변이다.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::condition::DetectionType;
use crate::models::event::{Event, Operator};

/// 탐지 품질 하한/상한 — 탐색 프레임의 최대 변 길이(픽셀)
pub const DETECTION_QUALITY_MIN: u32 = 200;
pub const DETECTION_QUALITY_MAX: u32 = 3000;

/// 종료 조건 — 대상 이벤트가 지정 횟수만큼 발동하면 충족
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndCondition {
    /// 대상 이벤트 식별자
    pub event_id: i64,
    /// 필요 발동 횟수 (1 이상)
    pub executions: u32,
}

/// 시나리오 — 순서 있는 이벤트 목록 + 종료 조건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// 시나리오 식별자
    pub id: i64,
    /// 시나리오 이름
    pub name: String,
    /// 탐지 품질 — 탐색에 사용하는 축소 프레임의 최대 변 길이(픽셀).
    /// 클수록 정밀하지만 느리다.
    pub detection_quality: u32,
    /// 이벤트 목록 (우선순위 = 선언 순서)
    pub events: Vec<Event>,
    /// 종료 조건 결합 연산자
    pub end_condition_operator: Operator,
    /// 종료 조건 목록 (비어 있으면 중지 요청 전까지 무한 실행)
    pub end_conditions: Vec<EndCondition>,
}

impl Scenario {
    /// 세션 시작 전 구성 검증.
    ///
    /// 위반 시 `Config` 에러 — 엔진이 Running 상태 진입을 거부한다.
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(DETECTION_QUALITY_MIN..=DETECTION_QUALITY_MAX).contains(&self.detection_quality) {
            return Err(CoreError::Config(format!(
                "탐지 품질 {} 범위 초과 ({DETECTION_QUALITY_MIN}~{DETECTION_QUALITY_MAX})",
                self.detection_quality
            )));
        }

        let mut event_ids = HashSet::new();
        let mut condition_ids = HashSet::new();
        for event in &self.events {
            if !event_ids.insert(event.id) {
                return Err(CoreError::Config(format!("이벤트 id {} 중복", event.id)));
            }
            for condition in &event.conditions {
                if !condition_ids.insert(condition.id) {
                    return Err(CoreError::Config(format!(
                        "조건 id {} 중복 (이벤트 {})",
                        condition.id, event.id
                    )));
                }
                if condition.threshold > 100 {
                    return Err(CoreError::Config(format!(
                        "조건 {} 임계값 {} 초과 (0~100)",
                        condition.id, condition.threshold
                    )));
                }
                if condition.detection_type == DetectionType::Exact && condition.area.is_none() {
                    return Err(CoreError::Config(format!(
                        "조건 {} — Exact 탐지에는 area가 필요함",
                        condition.id
                    )));
                }
                if let Some(area) = condition.area {
                    if area.is_empty() {
                        return Err(CoreError::Config(format!(
                            "조건 {} — 탐색 영역 크기 0",
                            condition.id
                        )));
                    }
                }
            }
        }

        for end_condition in &self.end_conditions {
            if end_condition.executions == 0 {
                return Err(CoreError::Config(format!(
                    "종료 조건 (이벤트 {}) — 발동 횟수 0",
                    end_condition.event_id
                )));
            }
            if !event_ids.contains(&end_condition.event_id) {
                return Err(CoreError::Config(format!(
                    "종료 조건이 존재하지 않는 이벤트 {} 참조",
                    end_condition.event_id
                )));
            }
        }

        Ok(())
    }

    /// 모든 조건의 참조 이미지를 로드한다 (`base` 기준 상대 경로 해석).
    ///
    /// 로드할 수 없는 조건은 경고 후 건너뛴다 — 처리 중 비매칭으로
    /// 취급되며, 조건 하나가 깨져도 세션 시작을 막지 않는다.
    pub fn load_bitmaps(&mut self, base: Option<&Path>) {
        for event in &mut self.events {
            for condition in &mut event.conditions {
                if condition.bitmap.is_some() {
                    continue;
                }
                if let Err(err) = condition.load_bitmap(base) {
                    tracing::warn!(condition_id = condition.id, "참조 이미지 로드 실패 — 비매칭 취급: {err}");
                }
            }
        }
    }

    /// id로 이벤트 조회
    pub fn event(&self, event_id: i64) -> Option<&Event> {
        self.events.iter().find(|e| e.id == event_id)
    }
}
