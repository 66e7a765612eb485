//! 디버그 엔진.
//!
//! 프로세서 생명주기의 순수 관찰자. 비활성화 시 모든 훅이 no-op으로
//! 즉시 반환한다. 스코프별 기록기는 id 기준으로 지연 생성되어 틱을
//! 넘어 유지되고, 세션 종료 시 시나리오 선언 순서대로 리포트에 묶인다.
//!
//! start/end 짝이 어긋나면 재진입 또는 파이프라인 버그이므로
//! `InvalidState`를 낸다.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, watch};
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;
use uuid::Uuid;

use kkuk_core::error::CoreError;
use kkuk_core::models::condition::Condition;
use kkuk_core::models::detection::ProcessorResult;
use kkuk_core::models::event::Event;
use kkuk_core::models::geometry::Rect;
use kkuk_core::models::scenario::Scenario;

use crate::recorder::ProcessingRecorder;
use crate::report::{ConditionReport, DebugInfo, DebugReport, EventReport, StopReason};

/// 실시간 스트림 기본 버퍼 크기
pub const DEFAULT_STREAM_CAPACITY: usize = 64;

/// 세션 계측 엔진
pub struct DebugEngine {
    enabled: bool,
    session_id: Uuid,
    scenario_id: i64,
    scenario_name: String,
    /// 리포트 순서 고정용 (id, 이름) 스냅샷
    event_index: Vec<(i64, String)>,
    condition_index: Vec<(i64, String)>,
    started_at: Option<DateTime<Utc>>,
    session_recorder: ProcessingRecorder,
    image_recorder: ProcessingRecorder,
    event_recorders: HashMap<i64, ProcessingRecorder>,
    condition_recorders: HashMap<i64, ProcessingRecorder>,
    trigger_counts: HashMap<i64, u32>,
    match_counts: HashMap<i64, u64>,
    current_event: Option<i64>,
    current_condition: Option<i64>,
    /// 전체 값 스트림 — 느린 구독자는 오래된 값을 잃는다
    all_tx: broadcast::Sender<DebugInfo>,
    /// 최신 양성 매칭 1건 — UI 하이라이트용
    last_positive_tx: watch::Sender<Option<DebugInfo>>,
}

impl DebugEngine {
    /// 활성 엔진 생성
    pub fn new(scenario: &Scenario, stream_capacity: usize) -> Self {
        let (all_tx, _) = broadcast::channel(stream_capacity.max(1));
        let (last_positive_tx, _) = watch::channel(None);

        let event_index = scenario
            .events
            .iter()
            .map(|e| (e.id, e.name.clone()))
            .collect();
        let condition_index = scenario
            .events
            .iter()
            .flat_map(|e| e.conditions.iter().map(|c| (c.id, c.name.clone())))
            .collect();

        Self {
            enabled: true,
            session_id: Uuid::new_v4(),
            scenario_id: scenario.id,
            scenario_name: scenario.name.clone(),
            event_index,
            condition_index,
            started_at: None,
            session_recorder: ProcessingRecorder::new(),
            image_recorder: ProcessingRecorder::new(),
            event_recorders: HashMap::new(),
            condition_recorders: HashMap::new(),
            trigger_counts: HashMap::new(),
            match_counts: HashMap::new(),
            current_event: None,
            current_condition: None,
            all_tx,
            last_positive_tx,
        }
    }

    /// 비활성 엔진 생성 — 모든 훅이 no-op
    pub fn disabled() -> Self {
        let (all_tx, _) = broadcast::channel(1);
        let (last_positive_tx, _) = watch::channel(None);
        Self {
            enabled: false,
            session_id: Uuid::new_v4(),
            scenario_id: 0,
            scenario_name: String::new(),
            event_index: Vec::new(),
            condition_index: Vec::new(),
            started_at: None,
            session_recorder: ProcessingRecorder::new(),
            image_recorder: ProcessingRecorder::new(),
            event_recorders: HashMap::new(),
            condition_recorders: HashMap::new(),
            trigger_counts: HashMap::new(),
            match_counts: HashMap::new(),
            current_event: None,
            current_condition: None,
            all_tx,
            last_positive_tx,
        }
    }

    /// 계측 활성 여부
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 세션 식별자
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    // ============================================================
    // 생명주기 훅
    // ============================================================

    /// 세션 시작
    pub fn on_session_start(&mut self) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        self.started_at = Some(Utc::now());
        self.session_recorder.on_start()
    }

    /// 틱 처리 시작 (프레임 바인딩 직후)
    pub fn on_image_start(&mut self) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        self.image_recorder.on_start()
    }

    /// 틱 처리 종료 — 틱 결과로 성공 여부를 기록한다
    pub fn on_image_end(&mut self, result: &ProcessorResult) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        self.image_recorder.on_end(result.event_matched)
    }

    /// 이벤트 평가 시작
    pub fn on_event_start(&mut self, event: &Event) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(open) = self.current_event {
            return Err(CoreError::InvalidState(format!(
                "이벤트 {} 평가 중에 이벤트 {} 시작",
                open, event.id
            )));
        }
        self.current_event = Some(event.id);
        self.event_recorders
            .entry(event.id)
            .or_default()
            .on_start()
    }

    /// 이벤트 평가 종료.
    ///
    /// 틱 결과가 결정 조건의 탐지 결과를 담고 있으면 실시간
    /// `DebugInfo`를 발행한다 (fire-and-forget).
    pub fn on_event_end(&mut self, event: &Event, result: &ProcessorResult) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        let open = self.current_event.take().ok_or_else(|| {
            CoreError::InvalidState(format!("이벤트 {} 종료 — 시작 누락", event.id))
        })?;
        if open != event.id {
            return Err(CoreError::InvalidState(format!(
                "이벤트 종료 불일치 — 시작 {}, 종료 {}",
                open, event.id
            )));
        }

        self.event_recorders
            .entry(event.id)
            .or_default()
            .on_end(result.event_matched)?;

        if result.event_matched {
            *self.trigger_counts.entry(event.id).or_insert(0) += 1;

            if let (Some(condition), Some(detection_result)) =
                (result.condition.as_ref(), result.detection_result)
            {
                let (width, height) = condition.dimensions().unwrap_or_default();
                let info = DebugInfo {
                    event_id: event.id,
                    event_name: event.name.clone(),
                    condition_id: condition.id,
                    condition_name: condition.name.clone(),
                    detection_result,
                    condition_area: Rect::centered_at(detection_result.position, width, height),
                };
                // 구독자가 없거나 느려도 처리 스레드를 막지 않는다
                let _ = self.all_tx.send(info.clone());
                self.last_positive_tx.send_replace(Some(info));
            }
        }
        Ok(())
    }

    /// 조건 매칭 시작
    pub fn on_condition_start(&mut self, condition: &Condition) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        if let Some(open) = self.current_condition {
            return Err(CoreError::InvalidState(format!(
                "조건 {} 매칭 중에 조건 {} 시작",
                open, condition.id
            )));
        }
        self.current_condition = Some(condition.id);
        self.condition_recorders
            .entry(condition.id)
            .or_default()
            .on_start()
    }

    /// 조건 매칭 종료
    pub fn on_condition_end(&mut self, condition: &Condition, matched: bool) -> Result<(), CoreError> {
        if !self.enabled {
            return Ok(());
        }
        let open = self.current_condition.take().ok_or_else(|| {
            CoreError::InvalidState(format!("조건 {} 종료 — 시작 누락", condition.id))
        })?;
        if open != condition.id {
            return Err(CoreError::InvalidState(format!(
                "조건 종료 불일치 — 시작 {}, 종료 {}",
                open, condition.id
            )));
        }

        if matched {
            *self.match_counts.entry(condition.id).or_insert(0) += 1;
        }
        self.condition_recorders
            .entry(condition.id)
            .or_default()
            .on_end(matched)
    }

    /// 세션 종료 — 리포트 조립.
    ///
    /// 평가된 적 없는 이벤트/조건도 0 초기값 요약으로 포함된다
    /// (앞선 형제가 연산자를 단락시킨 경우).
    pub fn on_session_end(&mut self, stop_reason: StopReason) -> Result<Option<DebugReport>, CoreError> {
        if !self.enabled {
            return Ok(None);
        }
        let started_at = self.started_at.ok_or_else(|| {
            CoreError::InvalidState("세션 종료 — 세션 시작 누락".to_string())
        })?;
        self.session_recorder.on_end(true)?;

        let events: Vec<EventReport> = self
            .event_index
            .iter()
            .map(|(id, name)| EventReport {
                id: *id,
                name: name.clone(),
                trigger_count: self.trigger_counts.get(id).copied().unwrap_or(0),
                processing: self
                    .event_recorders
                    .get(id)
                    .map(ProcessingRecorder::to_summary)
                    .unwrap_or_default(),
            })
            .collect();

        let conditions: Vec<ConditionReport> = self
            .condition_index
            .iter()
            .map(|(id, name)| ConditionReport {
                id: *id,
                name: name.clone(),
                match_count: self.match_counts.get(id).copied().unwrap_or(0),
                processing: self
                    .condition_recorders
                    .get(id)
                    .map(ProcessingRecorder::to_summary)
                    .unwrap_or_default(),
            })
            .collect();

        let report = DebugReport {
            session_id: self.session_id,
            scenario_id: self.scenario_id,
            scenario_name: self.scenario_name.clone(),
            started_at,
            ended_at: Utc::now(),
            stop_reason,
            session: self.session_recorder.to_summary(),
            image: self.image_recorder.to_summary(),
            events_triggered: self.trigger_counts.values().map(|&c| c as u64).sum(),
            conditions_matched: self.match_counts.values().sum(),
            events,
            conditions,
        };

        debug!(
            session_id = %report.session_id,
            ticks = report.image.count,
            events_triggered = report.events_triggered,
            "디버그 리포트 조립 완료"
        );
        Ok(Some(report))
    }

    // ============================================================
    // 구독
    // ============================================================

    /// 전체 값 실시간 스트림 구독
    pub fn subscribe(&self) -> broadcast::Receiver<DebugInfo> {
        self.all_tx.subscribe()
    }

    /// 전체 값 실시간 스트림 (Stream 어댑터)
    pub fn debug_info_stream(&self) -> BroadcastStream<DebugInfo> {
        BroadcastStream::new(self.all_tx.subscribe())
    }

    /// 최신 양성 매칭 구독 (most-recent-value)
    pub fn last_positive(&self) -> watch::Receiver<Option<DebugInfo>> {
        self.last_positive_tx.subscribe()
    }

    /// 실시간 스트림 캐시만 초기화 — 리포트 상태는 유지 (UI 재연결용)
    pub fn clear(&self) {
        self.last_positive_tx.send_replace(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use kkuk_core::models::action::Action;
    use kkuk_core::models::condition::DetectionType;
    use kkuk_core::models::detection::DetectionResult;
    use kkuk_core::models::event::Operator;
    use kkuk_core::models::geometry::Point;
    use kkuk_core::models::scenario::EndCondition;

    fn make_condition(id: i64) -> Condition {
        Condition {
            id,
            name: format!("조건 {id}"),
            area: Some(Rect::new(0, 0, 40, 40)),
            threshold: 90,
            detection_type: DetectionType::Anywhere,
            path: None,
            bitmap: None,
        }
    }

    fn make_scenario() -> Scenario {
        Scenario {
            id: 1,
            name: "테스트".to_string(),
            detection_quality: 600,
            events: vec![
                Event {
                    id: 1,
                    name: "이벤트 1".to_string(),
                    operator: Operator::Or,
                    conditions: vec![make_condition(10), make_condition(11)],
                    actions: vec![Action::Pause { duration_ms: 1 }],
                    enabled: true,
                },
                Event {
                    id: 2,
                    name: "이벤트 2".to_string(),
                    operator: Operator::And,
                    conditions: vec![make_condition(20)],
                    actions: vec![],
                    enabled: true,
                },
            ],
            end_condition_operator: Operator::Or,
            end_conditions: vec![EndCondition {
                event_id: 1,
                executions: 1,
            }],
        }
    }

    #[test]
    fn image_end_without_start_is_state_error() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        engine.on_session_start().unwrap();
        assert_matches!(
            engine.on_image_end(&ProcessorResult::no_match()),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn nested_event_start_is_state_error() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        engine.on_session_start().unwrap();
        engine.on_event_start(&scenario.events[0]).unwrap();
        assert_matches!(
            engine.on_event_start(&scenario.events[1]),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn mismatched_condition_end_is_state_error() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        engine.on_session_start().unwrap();
        engine
            .on_condition_start(&scenario.events[0].conditions[0])
            .unwrap();
        assert_matches!(
            engine.on_condition_end(&scenario.events[0].conditions[1], true),
            Err(CoreError::InvalidState(_))
        );
    }

    #[test]
    fn report_zips_unexercised_scopes_with_zero_summaries() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        engine.on_session_start().unwrap();

        // 이벤트 1의 첫 조건만 평가되고 OR가 단락됨
        engine.on_image_start().unwrap();
        engine.on_event_start(&scenario.events[0]).unwrap();
        engine
            .on_condition_start(&scenario.events[0].conditions[0])
            .unwrap();
        engine
            .on_condition_end(&scenario.events[0].conditions[0], true)
            .unwrap();
        let result = ProcessorResult::matched(
            scenario.events[0].clone(),
            scenario.events[0].conditions[0].clone(),
            DetectionResult::detected_at(Point::new(120, 120), 95.0),
        );
        engine.on_event_end(&scenario.events[0], &result).unwrap();
        engine.on_image_end(&result).unwrap();

        let report = engine
            .on_session_end(StopReason::EndConditionsFulfilled)
            .unwrap()
            .unwrap();

        assert_eq!(report.events.len(), 2);
        assert_eq!(report.conditions.len(), 3);
        assert_eq!(report.events_triggered, 1);
        assert_eq!(report.conditions_matched, 1);

        let event1 = &report.events[0];
        assert_eq!(event1.trigger_count, 1);
        assert_eq!(event1.processing.count, 1);

        // 평가된 적 없는 스코프는 0 초기값
        let event2 = &report.events[1];
        assert_eq!(event2.trigger_count, 0);
        assert_eq!(event2.processing, Default::default());
        let condition11 = &report.conditions[1];
        assert_eq!(condition11.match_count, 0);
        assert_eq!(condition11.processing, Default::default());
    }

    #[test]
    fn matched_event_publishes_debug_info() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        let mut rx = engine.subscribe();
        let watch_rx = engine.last_positive();

        engine.on_session_start().unwrap();
        engine.on_event_start(&scenario.events[0]).unwrap();
        let result = ProcessorResult::matched(
            scenario.events[0].clone(),
            scenario.events[0].conditions[0].clone(),
            DetectionResult::detected_at(Point::new(120, 120), 95.0),
        );
        engine.on_event_end(&scenario.events[0], &result).unwrap();

        let info = rx.try_recv().unwrap();
        assert_eq!(info.event_id, 1);
        assert_eq!(info.condition_id, 10);
        // 40x40 조건이 (120,120) 중심에 정렬됨
        assert_eq!(info.condition_area, Rect::new(100, 100, 40, 40));
        assert!(watch_rx.borrow().is_some());

        // clear는 최신값 캐시만 초기화
        engine.clear();
        assert!(watch_rx.borrow().is_none());
    }

    #[test]
    fn non_matching_event_publishes_nothing() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        let mut rx = engine.subscribe();

        engine.on_session_start().unwrap();
        engine.on_event_start(&scenario.events[0]).unwrap();
        engine
            .on_event_end(&scenario.events[0], &ProcessorResult::no_match())
            .unwrap();

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn disabled_engine_is_noop() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::disabled();

        engine.on_session_start().unwrap();
        // 짝이 맞지 않아도 no-op이므로 에러 없음
        let result = ProcessorResult::matched(
            scenario.events[0].clone(),
            scenario.events[0].conditions[0].clone(),
            DetectionResult::detected_at(Point::new(120, 120), 95.0),
        );
        engine.on_image_end(&result).unwrap();
        engine.on_event_end(&scenario.events[0], &result).unwrap();

        let report = engine.on_session_end(StopReason::Requested).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn session_end_without_start_is_state_error() {
        let scenario = make_scenario();
        let mut engine = DebugEngine::new(&scenario, 8);
        assert_matches!(
            engine.on_session_end(StopReason::Requested),
            Err(CoreError::InvalidState(_))
        );
    }
}
