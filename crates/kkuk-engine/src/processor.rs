//! 시나리오 프로세서.
//!
//! 단일 논리 처리 스트림: 틱은 순차 실행된다 — 액션이 화면 상태를
//! 바꾸므로 다음 프레임은 액션 이후 상태를 반영해야 한다.
//!
//! 틱 하나의 흐름:
//! 1. 프레임 획득 (없으면 재시도 대기)
//! 2. 매처에 프레임 바인딩
//! 3. 이벤트를 선언 순서대로 평가 — 틱당 첫 매칭 이벤트만 발동
//! 4. 발동 이벤트의 액션 디스패치, 발동 횟수 증가
//! 5. 종료 조건 평가
//!
//! 중지 요청은 틱 경계와 액션 대기 경계에서 협조적으로 수용된다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use image::DynamicImage;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use kkuk_core::error::CoreError;
use kkuk_core::models::condition::{Condition, DetectionType};
use kkuk_core::models::detection::{DetectionResult, ProcessorResult};
use kkuk_core::models::event::{Event, Operator};
use kkuk_core::models::scenario::Scenario;
use kkuk_core::ports::action_executor::ActionExecutor;
use kkuk_core::ports::frame_source::FrameSource;
use kkuk_core::ports::image_matcher::ImageMatcher;

use crate::debug_engine::DebugEngine;
use crate::dispatcher::{cancellable_sleep, ActionDispatcher, DispatchOutcome};
use crate::report::{DebugReport, StopReason};

/// 프로세서 상태 기계
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    /// 세션 시작 전
    Idle,
    /// 틱 루프 실행 중
    Running,
    /// 종료 처리 중 (리포트 조립)
    Stopping,
    /// 종료 완료
    Stopped,
}

/// 틱 페이싱 옵션
#[derive(Debug, Clone)]
pub struct ProcessorOptions {
    /// 틱 간 최소 간격 (0 = 페이싱 없음)
    pub tick_interval: Duration,
    /// 프레임 없음 시 재시도 대기
    pub no_frame_retry: Duration,
}

impl Default for ProcessorOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::ZERO,
            no_frame_retry: Duration::from_millis(100),
        }
    }
}

/// 세션 종료 요약
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// 세션 식별자
    pub session_id: Uuid,
    /// 중지 사유
    pub stop_reason: StopReason,
    /// 처리한 틱 수
    pub ticks: u64,
    /// 디버그 리포트 (계측 활성 시)
    pub report: Option<DebugReport>,
}

/// 시나리오 처리 엔진 — 세션당 한 인스턴스
pub struct ScenarioProcessor {
    scenario: Scenario,
    matcher: Box<dyn ImageMatcher>,
    dispatcher: ActionDispatcher,
    debug: DebugEngine,
    options: ProcessorOptions,
    stop_rx: watch::Receiver<bool>,
    state: ProcessorState,
    /// 종료 조건 추적용 이벤트 발동 횟수
    fire_counts: HashMap<i64, u32>,
    ticks: u64,
}

impl ScenarioProcessor {
    /// 새 프로세서 생성
    pub fn new(
        scenario: Scenario,
        matcher: Box<dyn ImageMatcher>,
        executor: Arc<dyn ActionExecutor>,
        debug: DebugEngine,
        options: ProcessorOptions,
        stop_rx: watch::Receiver<bool>,
    ) -> Self {
        let dispatcher = ActionDispatcher::new(executor, stop_rx.clone());
        Self {
            scenario,
            matcher,
            dispatcher,
            debug,
            options,
            stop_rx,
            state: ProcessorState::Idle,
            fire_counts: HashMap::new(),
            ticks: 0,
        }
    }

    /// 현재 상태
    pub fn state(&self) -> ProcessorState {
        self.state
    }

    /// 디버그 엔진 접근 (스트림 구독용)
    pub fn debug_engine(&self) -> &DebugEngine {
        &self.debug
    }

    /// 세션 실행 — 종료 조건 충족, 중지 요청, 액션 실패까지 틱 루프.
    ///
    /// 시나리오 구성 오류는 `Running` 진입을 거부한다 (`Config` 에러).
    /// 액션 실패는 `StopReason::ActionFailure`로 기록된 정상 종료다.
    /// 계약 위반(`InvalidState`)과 프레임 소스 오류만 `Err`로 반환된다.
    pub async fn run(
        &mut self,
        frames: &mut dyn FrameSource,
    ) -> Result<SessionSummary, CoreError> {
        if self.state != ProcessorState::Idle {
            return Err(CoreError::InvalidState(format!(
                "세션 재실행 불가 — 현재 상태 {:?}",
                self.state
            )));
        }
        self.scenario.validate()?;

        self.state = ProcessorState::Running;
        self.debug.on_session_start()?;
        info!(
            scenario_id = self.scenario.id,
            scenario = %self.scenario.name,
            events = self.scenario.events.len(),
            "세션 시작"
        );

        let stop_reason = loop {
            if *self.stop_rx.borrow() {
                break StopReason::Requested;
            }

            let frame = match frames.next_frame().await {
                Ok(Some(frame)) => frame,
                Err(err) => {
                    self.state = ProcessorState::Stopped;
                    return Err(err);
                }
                Ok(None) => {
                    // 일시적 프레임 부재 — 잠시 대기 후 재시도
                    let outcome =
                        cancellable_sleep(self.options.no_frame_retry, &mut self.stop_rx).await;
                    if outcome == DispatchOutcome::Interrupted {
                        break StopReason::Requested;
                    }
                    continue;
                }
            };

            self.ticks += 1;
            match self.process_frame(&frame).await {
                // 중단된 디스패치는 발동으로 세지 않음
                Ok((_, DispatchOutcome::Interrupted)) => break StopReason::Requested,
                Ok((result, DispatchOutcome::Completed)) => {
                    if let Some(event) = result.event.as_ref().filter(|_| result.event_matched) {
                        *self.fire_counts.entry(event.id).or_insert(0) += 1;
                        debug!(event_id = event.id, event = %event.name, "이벤트 발동");
                    }
                }
                Err(err @ CoreError::Action { .. }) => {
                    warn!("액션 실패로 세션 종료: {err}");
                    break StopReason::ActionFailure {
                        message: err.to_string(),
                    };
                }
                Err(err) => {
                    self.state = ProcessorState::Stopped;
                    return Err(err);
                }
            }

            if self.end_conditions_fulfilled() {
                break StopReason::EndConditionsFulfilled;
            }

            if self.options.tick_interval > Duration::ZERO {
                let outcome =
                    cancellable_sleep(self.options.tick_interval, &mut self.stop_rx).await;
                if outcome == DispatchOutcome::Interrupted {
                    break StopReason::Requested;
                }
            }
        };

        self.state = ProcessorState::Stopping;
        let report = self.debug.on_session_end(stop_reason.clone())?;
        self.state = ProcessorState::Stopped;
        info!(ticks = self.ticks, ?stop_reason, "세션 종료");

        Ok(SessionSummary {
            session_id: self.debug.session_id(),
            stop_reason,
            ticks: self.ticks,
            report,
        })
    }

    /// 한 틱 처리 — 프레임 바인딩, 이벤트 평가, 액션 디스패치.
    ///
    /// 발동 이벤트와 결정 조건을 담은 `ProcessorResult`, 그리고
    /// 디스패치 완주 여부를 반환한다. 발동 횟수 집계는 호출자 몫이다.
    pub async fn process_frame(
        &mut self,
        frame: &DynamicImage,
    ) -> Result<(ProcessorResult, DispatchOutcome), CoreError> {
        self.matcher.prepare_frame(frame)?;
        self.debug.on_image_start()?;

        let mut tick_result = ProcessorResult::no_match();
        let mut outcome = DispatchOutcome::Completed;

        let matcher = self.matcher.as_mut();
        let debug = &mut self.debug;
        let dispatcher = &mut self.dispatcher;

        for event in self.scenario.events.iter().filter(|e| e.enabled) {
            debug.on_event_start(event)?;
            let decisive = evaluate_event(matcher, debug, event)?;
            let result = match decisive {
                Some((idx, detection)) => ProcessorResult::matched(
                    event.clone(),
                    event.conditions[idx].clone(),
                    detection,
                ),
                None => ProcessorResult::no_match(),
            };
            debug.on_event_end(event, &result)?;

            if !result.event_matched {
                continue;
            }

            match dispatcher.dispatch(&event.actions).await {
                Ok(dispatch) => outcome = dispatch,
                Err(err) => {
                    debug.on_image_end(&result)?;
                    return Err(err);
                }
            }
            tick_result = result;
            // 틱당 첫 매칭 이벤트만 — 프레임당 이중 액션 방지
            break;
        }

        self.debug.on_image_end(&tick_result)?;
        Ok((tick_result, outcome))
    }

    /// 종료 조건 평가 — 목록이 비어 있으면 영원히 거짓
    fn end_conditions_fulfilled(&self) -> bool {
        if self.scenario.end_conditions.is_empty() {
            return false;
        }
        let satisfied = |ec: &kkuk_core::models::scenario::EndCondition| {
            self.fire_counts.get(&ec.event_id).copied().unwrap_or(0) >= ec.executions
        };
        match self.scenario.end_condition_operator {
            Operator::And => self.scenario.end_conditions.iter().all(satisfied),
            Operator::Or => self.scenario.end_conditions.iter().any(satisfied),
        }
    }
}

/// 이벤트의 조건 집합 평가 (연산자 단락).
///
/// 매칭 시 결정 조건의 인덱스와 탐지 결과 반환. 조건 없는 이벤트는
/// 공허하게 비매칭 — 구성 실수로 인한 액션 폭주 방지.
fn evaluate_event(
    matcher: &mut dyn ImageMatcher,
    debug: &mut DebugEngine,
    event: &Event,
) -> Result<Option<(usize, DetectionResult)>, CoreError> {
    if event.conditions.is_empty() {
        return Ok(None);
    }

    match event.operator {
        Operator::And => {
            let mut last = None;
            for (idx, condition) in event.conditions.iter().enumerate() {
                debug.on_condition_start(condition)?;
                let result = match_condition(matcher, condition)?;
                debug.on_condition_end(condition, result.detected)?;
                if !result.detected {
                    return Ok(None);
                }
                last = Some((idx, result));
            }
            Ok(last)
        }
        Operator::Or => {
            for (idx, condition) in event.conditions.iter().enumerate() {
                debug.on_condition_start(condition)?;
                let result = match_condition(matcher, condition)?;
                debug.on_condition_end(condition, result.detected)?;
                if result.detected {
                    return Ok(Some((idx, result)));
                }
            }
            Ok(None)
        }
    }
}

/// 조건 하나 매칭. `area`가 지정된 조건은 탐지 유형과 무관하게
/// 그 영역 안에서만 탐색한다.
///
/// 참조 이미지 부재와 매칭 에러는 조건 경계에서 비매칭으로 흡수된다
/// — 조건 하나가 깨져도 세션은 계속된다. 계약 위반만 전파.
fn match_condition(
    matcher: &mut dyn ImageMatcher,
    condition: &Condition,
) -> Result<DetectionResult, CoreError> {
    let Some(bitmap) = condition.bitmap.as_ref() else {
        warn!(condition_id = condition.id, "조건 참조 이미지 없음 — 비매칭 처리");
        return Ok(DetectionResult::not_detected());
    };

    let attempt = match (condition.detection_type, condition.area) {
        (_, Some(area)) => matcher.detect_in_area(bitmap, area, condition.threshold),
        (DetectionType::Anywhere, None) => matcher.detect(bitmap, condition.threshold),
        // 고정 위치 비교인데 영역이 없으면 비교할 곳이 없다
        (DetectionType::Exact, None) => return Ok(DetectionResult::not_detected()),
    };

    match attempt {
        Ok(result) => Ok(result),
        Err(CoreError::Match(message)) => {
            warn!(condition_id = condition.id, %message, "매칭 에러 — 비매칭 처리");
            Ok(DetectionResult::not_detected())
        }
        Err(err) => Err(err),
    }
}
