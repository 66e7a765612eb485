//! 프레임 소스 포트.
//!
//! 구현: `kkuk-vision::ScreenFrameSource` (xcap), 테스트용 합성 소스.

use async_trait::async_trait;
use image::DynamicImage;

use crate::error::CoreError;

/// 프레임 소스 — 틱마다 다음 화면 캡처를 공급한다.
///
/// `Ok(None)`은 "아직 프레임 없음"이라는 일시적 상황이며
/// 엔진은 잠시 후 재시도한다. `Err`는 복구 불가능한 소스 장애다.
#[async_trait]
pub trait FrameSource: Send {
    /// 다음 프레임 획득 (틱 시작 전 대기 지점)
    async fn next_frame(&mut self) -> Result<Option<DynamicImage>, CoreError>;
}
