//! 스크린 프레임 소스.
//!
//! xcap 기반 멀티모니터 캡처를 `FrameSource` 포트에 맞춘다.
//! 일시적 캡처 실패(잠금 화면, 권한 프롬프트 등)는 `Ok(None)`으로
//! 보고해 세션을 중단시키지 않는다.

use async_trait::async_trait;
use image::DynamicImage;
use tracing::{debug, warn};
use xcap::Monitor;

use kkuk_core::error::CoreError;
use kkuk_core::ports::frame_source::FrameSource;

/// 스크린 프레임 소스 — xcap 기반
pub struct ScreenFrameSource {
    /// 캡처할 모니터 인덱스. None이면 주 모니터
    monitor_index: Option<usize>,
}

impl ScreenFrameSource {
    /// 주 모니터를 캡처하는 소스 생성
    pub fn new() -> Self {
        Self {
            monitor_index: None,
        }
    }

    /// 특정 모니터를 캡처하는 소스 생성
    pub fn with_monitor(index: usize) -> Self {
        Self {
            monitor_index: Some(index),
        }
    }

    /// 사용 가능한 모니터 수
    pub fn monitor_count() -> Result<usize, CoreError> {
        Monitor::all()
            .map(|m| m.len())
            .map_err(|e| CoreError::Internal(format!("모니터 목록 조회 실패: {e}")))
    }

    fn capture(&self) -> Result<DynamicImage, CoreError> {
        let monitors = Monitor::all()
            .map_err(|e| CoreError::Internal(format!("모니터 목록 조회 실패: {e}")))?;

        let monitor = match self.monitor_index {
            Some(index) => monitors
                .into_iter()
                .nth(index)
                .ok_or_else(|| CoreError::Config(format!("모니터 인덱스 {index} 없음")))?,
            None => monitors
                .into_iter()
                .find(|m| m.is_primary().unwrap_or(false))
                .or_else(|| Monitor::all().ok()?.into_iter().next())
                .ok_or_else(|| CoreError::Internal("모니터를 찾을 수 없음".to_string()))?,
        };

        let image = monitor
            .capture_image()
            .map_err(|e| CoreError::Internal(format!("스크린 캡처 실패: {e}")))?;

        debug!("스크린 캡처 완료: {}x{}", image.width(), image.height());

        Ok(DynamicImage::ImageRgba8(image))
    }
}

impl Default for ScreenFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FrameSource for ScreenFrameSource {
    async fn next_frame(&mut self) -> Result<Option<DynamicImage>, CoreError> {
        // 캡처는 블로킹 — 런타임 워커를 막지 않도록 블로킹 풀에서 수행
        let index = self.monitor_index;
        let result = tokio::task::spawn_blocking(move || {
            let source = ScreenFrameSource {
                monitor_index: index,
            };
            source.capture()
        })
        .await
        .map_err(|e| CoreError::Internal(format!("캡처 태스크 합류 실패: {e}")))?;

        match result {
            Ok(frame) => Ok(Some(frame)),
            // 설정 오류(존재하지 않는 모니터)는 복구 불가 — 그대로 전파
            Err(err @ CoreError::Config(_)) => Err(err),
            Err(err) => {
                warn!("스크린 캡처 실패 — 다음 틱에 재시도: {err}");
                Ok(None)
            }
        }
    }
}
