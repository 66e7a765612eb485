//! # kkuk-app
//!
//! KKUK(꾹) 바이너리 진입점.
//! 시나리오 로드, 어댑터 와이어링, 세션 실행, 리포트 출력.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use kkuk_core::config_manager::ConfigManager;
use kkuk_core::models::scenario::Scenario;
use kkuk_core::ports::action_executor::ActionExecutor;
use kkuk_engine::{DebugEngine, LogActionExecutor, ProcessorOptions, ScenarioProcessor};
use kkuk_vision::{ScreenFrameSource, TemplateMatcher};

/// KKUK — 화면 자동화 엔진
///
/// 시나리오 정의에 따라 화면을 감시하고 조건 매칭 시 입력을 실행한다
#[derive(Parser, Debug)]
#[command(name = "kkuk")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// 시나리오 정의 파일 (JSON)
    #[arg(long, short = 's')]
    scenario: PathBuf,

    /// 탐지 품질 오버라이드 (축소 프레임 최대 변, 200~3000)
    #[arg(long, short = 'q')]
    quality: Option<u32>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// 디버그 계측 활성화 (세션 종료 시 리포트 출력)
    #[arg(long, short = 'd')]
    debug: bool,

    /// 실제 입력 주입 (기본은 드라이런 — 로깅만)
    #[arg(long)]
    live: bool,

    /// 틱 간 최소 간격 오버라이드 (밀리초)
    #[arg(long)]
    tick_interval: Option<u64>,

    /// 캡처 모니터 인덱스 (기본: 주 모니터)
    #[arg(long)]
    monitor: Option<usize>,

    /// 설정 파일 경로 (기본: 플랫폼 설정 디렉터리)
    #[arg(long)]
    config: Option<PathBuf>,
}

/// 배너 출력
fn print_banner(dry_run: bool) {
    println!();
    println!("┌──────────────────────────────────────┐");
    println!("│  KKUK (꾹) — 화면 자동화 엔진        │");
    if dry_run {
        println!("│  드라이런 모드 (입력 주입 없음)      │");
    } else {
        println!("│  라이브 모드 (실제 입력 주입)        │");
    }
    println!("└──────────────────────────────────────┘");
    println!();
}

/// 시나리오 파일 로드 + 참조 이미지 해석 (시나리오 파일 위치 기준)
fn load_scenario(path: &PathBuf) -> Result<Scenario> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("시나리오 파일 열기 실패: {}", path.display()))?;
    let mut scenario: Scenario =
        serde_json::from_reader(file).context("시나리오 JSON 파싱 실패")?;
    scenario.load_bitmaps(path.parent());
    Ok(scenario)
}

/// 실행기 선택 — 드라이런이면 로깅 전용, 라이브면 enigo
fn build_executor(dry_run: bool) -> Result<Arc<dyn ActionExecutor>> {
    if dry_run {
        return Ok(Arc::new(LogActionExecutor));
    }
    #[cfg(feature = "enigo")]
    {
        Ok(Arc::new(kkuk_engine::EnigoActionExecutor::new()?))
    }
    #[cfg(not(feature = "enigo"))]
    {
        tracing::warn!("enigo 피처 없이 빌드됨 — 드라이런으로 대체");
        Ok(Arc::new(LogActionExecutor))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // tracing 초기화
    let log_filter = format!(
        "kkuk={},kkuk_app={},kkuk_core={},kkuk_vision={},kkuk_engine={}",
        args.log_level, args.log_level, args.log_level, args.log_level, args.log_level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter)),
        )
        .init();

    // 설정 로드 + CLI 오버라이드
    let manager = match args.config.clone() {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new(),
    }
    .context("설정 로드 실패")?;
    let mut config = manager.config();

    if args.live {
        config.runner.dry_run = false;
    }
    if let Some(tick_interval) = args.tick_interval {
        config.detection.tick_interval_ms = tick_interval;
    }
    if let Some(monitor) = args.monitor {
        config.runner.monitor_index = Some(monitor);
    }
    let debug_enabled = args.debug || config.debug.enabled;

    print_banner(config.runner.dry_run);
    info!("설정 파일: {}", manager.path().display());

    // 시나리오 로드
    let mut scenario = load_scenario(&args.scenario)?;
    if let Some(quality) = args.quality {
        scenario.detection_quality = quality;
    }
    info!(
        scenario = %scenario.name,
        events = scenario.events.len(),
        quality = scenario.detection_quality,
        "시나리오 로드 완료"
    );

    // ── 어댑터 와이어링 ──
    let matcher = Box::new(TemplateMatcher::new(scenario.detection_quality));
    let executor = build_executor(config.runner.dry_run)?;
    let mut frames = match config.runner.monitor_index {
        Some(index) => ScreenFrameSource::with_monitor(index),
        None => ScreenFrameSource::new(),
    };

    let debug = if debug_enabled {
        DebugEngine::new(&scenario, config.debug.stream_capacity)
    } else {
        DebugEngine::disabled()
    };

    let options = ProcessorOptions {
        tick_interval: Duration::from_millis(config.detection.tick_interval_ms),
        no_frame_retry: Duration::from_millis(config.detection.no_frame_retry_ms),
    };

    // Ctrl-C → 협조적 중지 요청
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("중지 요청 수신 — 다음 틱 경계에서 종료");
            let _ = stop_tx.send(true);
        }
    });

    let mut processor =
        ScenarioProcessor::new(scenario, matcher, executor, debug, options, stop_rx);

    // 실시간 매칭 하이라이트 로그
    if debug_enabled {
        let mut debug_rx = processor.debug_engine().subscribe();
        tokio::spawn(async move {
            while let Ok(info) = debug_rx.recv().await {
                info!(
                    event = %info.event_name,
                    condition = %info.condition_name,
                    x = info.detection_result.position.x,
                    y = info.detection_result.position.y,
                    confidence = info.detection_result.confidence,
                    "매칭"
                );
            }
        });
    }

    // 세션 실행
    let summary = processor.run(&mut frames).await.context("세션 실행 실패")?;

    println!();
    println!("세션 {} 종료 — {:?}, {} 틱 처리", summary.session_id, summary.stop_reason, summary.ticks);
    if let Some(report) = summary.report {
        let json = serde_json::to_string_pretty(&report).context("리포트 직렬화 실패")?;
        println!("{json}");
    }

    if let kkuk_engine::StopReason::ActionFailure { message } = summary.stop_reason {
        anyhow::bail!("액션 실패로 세션 중단: {message}");
    }

    Ok(())
}
