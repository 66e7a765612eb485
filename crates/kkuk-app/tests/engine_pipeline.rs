//! 전체 파이프라인 통합 테스트.
//!
//! 실제 NCC 매처를 엔진에 물려 프레임 → 매칭 → 액션 경로를 검증한다.
//! 프레임은 합성 이미지, 입력은 기록용 실행기.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use assert_matches::assert_matches;
use async_trait::async_trait;
use image::{DynamicImage, Rgba, RgbaImage};
use tokio::sync::watch;

use kkuk_core::error::CoreError;
use kkuk_core::models::action::Action;
use kkuk_core::models::condition::{Condition, DetectionType};
use kkuk_core::models::event::{Event, Operator};
use kkuk_core::models::geometry::Point;
use kkuk_core::models::scenario::{EndCondition, Scenario};
use kkuk_core::ports::action_executor::ActionExecutor;
use kkuk_core::ports::frame_source::FrameSource;
use kkuk_engine::{DebugEngine, ProcessorOptions, ScenarioProcessor, StopReason};
use kkuk_vision::TemplateMatcher;

/// 창마다 고유한 질감의 합성 화면
fn synthetic_screen(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        let v = ((x.wrapping_mul(2654435761) ^ y.wrapping_mul(40503) ^ (x * y)) >> 8) as u8;
        Rgba([v, v, v, 255])
    })
}

/// 준비된 프레임을 순서대로 내주고 소진 시 중지를 요청하는 소스
struct ScriptedFrames {
    frames: VecDeque<DynamicImage>,
    stop_tx: Option<watch::Sender<bool>>,
}

impl ScriptedFrames {
    fn new(frames: Vec<DynamicImage>, stop_tx: watch::Sender<bool>) -> Self {
        Self {
            frames: frames.into(),
            stop_tx: Some(stop_tx),
        }
    }
}

#[async_trait]
impl FrameSource for ScriptedFrames {
    async fn next_frame(&mut self) -> Result<Option<DynamicImage>, CoreError> {
        match self.frames.pop_front() {
            Some(frame) => Ok(Some(frame)),
            None => {
                if let Some(tx) = self.stop_tx.take() {
                    let _ = tx.send(true);
                }
                Ok(None)
            }
        }
    }
}

/// 탭 좌표 기록용 실행기
struct RecordingExecutor {
    taps: Mutex<Vec<Point>>,
}

impl RecordingExecutor {
    fn new() -> Self {
        Self {
            taps: Mutex::new(vec![]),
        }
    }
}

#[async_trait]
impl ActionExecutor for RecordingExecutor {
    async fn tap(&self, position: Point, _press_duration_ms: u64) -> Result<(), CoreError> {
        self.taps.lock().unwrap().push(position);
        Ok(())
    }

    async fn swipe(&self, _from: Point, _to: Point, _duration_ms: u64) -> Result<(), CoreError> {
        Ok(())
    }

    fn platform(&self) -> &str {
        "recording"
    }
}

fn button_scenario(button: DynamicImage) -> Scenario {
    Scenario {
        id: 1,
        name: "버튼 탭".to_string(),
        detection_quality: 2000,
        events: vec![Event {
            id: 1,
            name: "버튼 발견".to_string(),
            operator: Operator::And,
            conditions: vec![Condition {
                id: 10,
                name: "버튼 이미지".to_string(),
                area: None,
                threshold: 90,
                detection_type: DetectionType::Anywhere,
                path: None,
                bitmap: Some(button),
            }],
            actions: vec![Action::Click {
                position: Point::new(120, 120),
                press_duration_ms: 0,
                randomize_px: None,
            }],
            enabled: true,
        }],
        end_condition_operator: Operator::Or,
        end_conditions: vec![EndCondition {
            event_id: 1,
            executions: 1,
        }],
    }
}

fn run_options() -> ProcessorOptions {
    ProcessorOptions {
        no_frame_retry: std::time::Duration::from_millis(1),
        ..Default::default()
    }
}

/// 프레임의 (100,100)~(140,140)에 있는 버튼 이미지를 조건으로 쓰면
/// 중심 (120,120)에서 매칭되고 그 좌표로 탭이 나간다.
#[tokio::test]
async fn button_in_frame_is_detected_and_tapped() {
    let screen = synthetic_screen(400, 300);
    let button = DynamicImage::ImageRgba8(
        image::imageops::crop_imm(&screen, 100, 100, 40, 40).to_image(),
    );
    let frame = DynamicImage::ImageRgba8(screen);

    let scenario = button_scenario(button);
    let (stop_tx, stop_rx) = watch::channel(false);
    let executor = Arc::new(RecordingExecutor::new());
    let debug = DebugEngine::new(&scenario, 16);
    let mut processor = ScenarioProcessor::new(
        scenario.clone(),
        Box::new(TemplateMatcher::new(scenario.detection_quality)),
        executor.clone(),
        debug,
        run_options(),
        stop_rx,
    );
    let mut frames = ScriptedFrames::new(vec![frame], stop_tx);

    let summary = processor.run(&mut frames).await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::EndConditionsFulfilled);
    assert_eq!(summary.ticks, 1);
    assert_eq!(*executor.taps.lock().unwrap(), vec![Point::new(120, 120)]);

    let report = summary.report.unwrap();
    assert_eq!(report.events_triggered, 1);
    assert_eq!(report.events[0].trigger_count, 1);
    assert_eq!(report.conditions[0].match_count, 1);
    assert_eq!(report.image.count, 1);
}

/// 버튼이 없는 프레임에서는 발동 없이 세션이 중지 요청으로 끝난다.
#[tokio::test]
async fn absent_button_never_fires() {
    let screen = synthetic_screen(400, 300);
    // 체커보드 — 화면 어디에도 없는 패턴
    let button = DynamicImage::ImageRgba8(RgbaImage::from_fn(40, 40, |x, y| {
        let v = if (x / 4 + y / 4) % 2 == 0 { 0 } else { 255 };
        Rgba([v, v, v, 255])
    }));
    let frame = DynamicImage::ImageRgba8(screen);

    let mut scenario = button_scenario(button);
    scenario.events[0].conditions[0].threshold = 95;
    let (stop_tx, stop_rx) = watch::channel(false);
    let executor = Arc::new(RecordingExecutor::new());
    let debug = DebugEngine::new(&scenario, 16);
    let mut processor = ScenarioProcessor::new(
        scenario.clone(),
        Box::new(TemplateMatcher::new(scenario.detection_quality)),
        executor.clone(),
        debug,
        run_options(),
        stop_rx,
    );
    let mut frames = ScriptedFrames::new(vec![frame.clone(), frame], stop_tx);

    let summary = processor.run(&mut frames).await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::Requested);
    assert!(executor.taps.lock().unwrap().is_empty());

    let report = summary.report.unwrap();
    assert_eq!(report.events_triggered, 0);
    assert_eq!(report.image.count, 2);
    // 조건은 틱마다 평가됐지만 한 번도 매칭되지 않음
    assert_eq!(report.conditions[0].processing.count, 2);
    assert_eq!(report.conditions[0].match_count, 0);
}

/// 종료 조건이 요구하는 발동 횟수만큼 틱이 반복된 뒤 멈춘다.
#[tokio::test]
async fn session_stops_after_required_executions() {
    let screen = synthetic_screen(400, 300);
    let button = DynamicImage::ImageRgba8(
        image::imageops::crop_imm(&screen, 100, 100, 40, 40).to_image(),
    );
    let frame = DynamicImage::ImageRgba8(screen);

    let mut scenario = button_scenario(button);
    scenario.end_conditions[0].executions = 3;
    let (stop_tx, stop_rx) = watch::channel(false);
    let executor = Arc::new(RecordingExecutor::new());
    let debug = DebugEngine::new(&scenario, 16);
    let mut processor = ScenarioProcessor::new(
        scenario.clone(),
        Box::new(TemplateMatcher::new(scenario.detection_quality)),
        executor.clone(),
        debug,
        run_options(),
        stop_rx,
    );
    // 넉넉히 다섯 프레임 — 세 번째 발동에서 멈춰야 함
    let mut frames = ScriptedFrames::new(vec![frame.clone(); 5], stop_tx);

    let summary = processor.run(&mut frames).await.unwrap();

    assert_eq!(summary.stop_reason, StopReason::EndConditionsFulfilled);
    assert_eq!(summary.ticks, 3);
    assert_eq!(executor.taps.lock().unwrap().len(), 3);
}

/// 구성 오류 시나리오는 실행을 거부한다.
#[tokio::test]
async fn invalid_quality_refuses_to_run() {
    let button = DynamicImage::new_rgba8(40, 40);
    let mut scenario = button_scenario(button);
    scenario.detection_quality = 10;

    let (stop_tx, stop_rx) = watch::channel(false);
    let executor = Arc::new(RecordingExecutor::new());
    let debug = DebugEngine::new(&scenario, 16);
    let mut processor = ScenarioProcessor::new(
        scenario,
        Box::new(TemplateMatcher::new(600)),
        executor,
        debug,
        run_options(),
        stop_rx,
    );
    let mut frames = ScriptedFrames::new(vec![], stop_tx);

    assert_matches!(
        processor.run(&mut frames).await,
        Err(CoreError::Config(_))
    );
}
