//! 애플리케이션 설정 구조체.
//!
//! 탐지 파이프라인 페이싱, 디버그 리포트, 러너 동작 등
//! 런타임 설정을 정의한다. `ConfigManager`가 JSON 파일에서 로드한다.

use serde::{Deserialize, Serialize};

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 탐지 설정
    #[serde(default)]
    pub detection: DetectionConfig,
    /// 디버그 설정
    #[serde(default)]
    pub debug: DebugConfig,
    /// 러너 설정
    #[serde(default)]
    pub runner: RunnerConfig,
}

impl AppConfig {
    /// 기본 설정 생성
    pub fn default_config() -> Self {
        Self::default()
    }
}

// ============================================================
// 탐지 설정
// ============================================================

/// 탐지 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// 시나리오가 품질을 지정하지 않을 때의 기본 탐지 품질
    #[serde(default = "default_quality")]
    pub default_quality: u32,
    /// 틱 간 간격 (밀리초, 0 = 쉼 없이 처리)
    #[serde(default)]
    pub tick_interval_ms: u64,
    /// 프레임 미가용 시 재시도 간격 (밀리초)
    #[serde(default = "default_no_frame_retry")]
    pub no_frame_retry_ms: u64,
}

fn default_quality() -> u32 {
    720
}

fn default_no_frame_retry() -> u64 {
    100
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            default_quality: default_quality(),
            tick_interval_ms: 0,
            no_frame_retry_ms: default_no_frame_retry(),
        }
    }
}

// ============================================================
// 디버그 설정
// ============================================================

/// 디버그 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebugConfig {
    /// 디버그 리포트/라이브 스트림 활성화 여부
    #[serde(default)]
    pub enabled: bool,
    /// 라이브 DebugInfo 브로드캐스트 채널 용량
    #[serde(default = "default_stream_capacity")]
    pub stream_capacity: usize,
}

fn default_stream_capacity() -> usize {
    64
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stream_capacity: default_stream_capacity(),
        }
    }
}

// ============================================================
// 러너 설정
// ============================================================

/// 러너(kkuk-app) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// 입력을 주입하지 않고 로깅만 수행
    #[serde(default = "default_true")]
    pub dry_run: bool,
    /// 캡처할 모니터 인덱스 (None = 주 모니터)
    #[serde(default)]
    pub monitor_index: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            dry_run: default_true(),
            monitor_index: None,
        }
    }
}
