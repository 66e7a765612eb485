//! 처리 시간 기록기.
//!
//! 세션/이미지/이벤트/조건 — 모든 계측 스코프가 공유하는 단일 측정 단위.
//! start/end 짝맞춤을 강제하며, 위반은 파이프라인 버그이므로 상태 에러다.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use kkuk_core::error::CoreError;

/// 한 스코프의 처리 통계 스냅샷
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingDebugInfo {
    /// 처리 횟수
    pub count: u64,
    /// 성공(매칭) 횟수
    pub success_count: u64,
    /// 누적 처리 시간
    pub total_duration: Duration,
    /// 최소 처리 시간
    pub min_duration: Duration,
    /// 최대 처리 시간
    pub max_duration: Duration,
    /// 평균 처리 시간
    pub avg_duration: Duration,
}

/// 타이밍/결과 누산기 — 한 스코프당 한 인스턴스
#[derive(Debug, Default)]
pub struct ProcessingRecorder {
    current_start: Option<Instant>,
    count: u64,
    success_count: u64,
    total: Duration,
    min: Option<Duration>,
    max: Duration,
}

impl ProcessingRecorder {
    /// 새 기록기 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 측정 시작. 이미 시작된 상태면 상태 에러.
    pub fn on_start(&mut self) -> Result<(), CoreError> {
        if self.current_start.is_some() {
            return Err(CoreError::InvalidState(
                "기록기 on_start 중복 호출 — on_end 누락".to_string(),
            ));
        }
        self.current_start = Some(Instant::now());
        Ok(())
    }

    /// 측정 종료. 시작 없이 호출되면 상태 에러.
    pub fn on_end(&mut self, success: bool) -> Result<(), CoreError> {
        let start = self.current_start.take().ok_or_else(|| {
            CoreError::InvalidState("기록기 on_end 호출 — on_start 누락".to_string())
        })?;
        self.accumulate(start.elapsed(), success);
        Ok(())
    }

    /// 측정값 누산 (on_end 경로와 정밀 테스트가 공유)
    fn accumulate(&mut self, duration: Duration, success: bool) {
        self.count += 1;
        if success {
            self.success_count += 1;
        }
        self.total += duration;
        self.min = Some(match self.min {
            Some(min) => min.min(duration),
            None => duration,
        });
        self.max = self.max.max(duration);
    }

    /// 진행 중 측정 유무
    pub fn is_started(&self) -> bool {
        self.current_start.is_some()
    }

    /// 현재까지의 통계 스냅샷. 측정 이력이 없으면 0 초기값.
    pub fn to_summary(&self) -> ProcessingDebugInfo {
        if self.count == 0 {
            return ProcessingDebugInfo::default();
        }
        ProcessingDebugInfo {
            count: self.count,
            success_count: self.success_count,
            total_duration: self.total,
            min_duration: self.min.unwrap_or_default(),
            max_duration: self.max,
            avg_duration: self.total / self.count as u32,
        }
    }
}
