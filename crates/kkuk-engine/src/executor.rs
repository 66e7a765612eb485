//! 액션 실행기 구현.
//!
//! `LogActionExecutor` (드라이런 기본값)와 `EnigoActionExecutor`
//! (실제 마우스 입력, `enigo` 피처)를 제공한다.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use kkuk_core::error::CoreError;
use kkuk_core::models::geometry::Point;
use kkuk_core::ports::action_executor::ActionExecutor;

// ============================================================
// LogActionExecutor — 드라이런/테스트용
// ============================================================

/// 로깅 전용 실행기 — 입력을 기록만 하고 주입하지 않음.
///
/// 시간 흐름(누름/스와이프 시간)은 실제와 같게 유지해 페이싱을
/// 보존한다.
pub struct LogActionExecutor;

#[async_trait]
impl ActionExecutor for LogActionExecutor {
    async fn tap(&self, position: Point, press_duration_ms: u64) -> Result<(), CoreError> {
        info!(x = position.x, y = position.y, press_duration_ms, "[드라이런] 탭");
        tokio::time::sleep(Duration::from_millis(press_duration_ms)).await;
        Ok(())
    }

    async fn swipe(&self, from: Point, to: Point, duration_ms: u64) -> Result<(), CoreError> {
        info!(?from, ?to, duration_ms, "[드라이런] 스와이프");
        tokio::time::sleep(Duration::from_millis(duration_ms)).await;
        Ok(())
    }

    fn platform(&self) -> &str {
        "log"
    }
}

// ============================================================
// EnigoActionExecutor — 실제 마우스 입력
// ============================================================

/// 실제 마우스 입력 실행기 (enigo 기반)
///
/// macOS: Accessibility 권한 필요
/// Windows: UIAccess 또는 관리자 권한 필요
/// Linux: X11 또는 Wayland + uinput 권한 필요
#[cfg(feature = "enigo")]
pub struct EnigoActionExecutor {
    /// enigo 인스턴스 (Send지만 !Sync → tokio::sync::Mutex 사용)
    enigo: tokio::sync::Mutex<enigo::Enigo>,
}

#[cfg(feature = "enigo")]
impl EnigoActionExecutor {
    /// 스와이프 보간 스텝 간격
    const SWIPE_STEP_MS: u64 = 16;

    /// 새 실행기 생성
    pub fn new() -> Result<Self, CoreError> {
        let settings = enigo::Settings::default();
        let enigo = enigo::Enigo::new(&settings)
            .map_err(|e| CoreError::Internal(format!("입력 드라이버 초기화 실패: {e}")))?;
        Ok(Self {
            enigo: tokio::sync::Mutex::new(enigo),
        })
    }
}

#[cfg(feature = "enigo")]
#[async_trait]
impl ActionExecutor for EnigoActionExecutor {
    async fn tap(&self, position: Point, press_duration_ms: u64) -> Result<(), CoreError> {
        use enigo::Mouse;
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(position.x, position.y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Internal(format!("마우스 이동 실패: {e}")))?;
        enigo
            .button(enigo::Button::Left, enigo::Direction::Press)
            .map_err(|e| CoreError::Internal(format!("버튼 누름 실패: {e}")))?;
        tokio::time::sleep(Duration::from_millis(press_duration_ms)).await;
        enigo
            .button(enigo::Button::Left, enigo::Direction::Release)
            .map_err(|e| CoreError::Internal(format!("버튼 놓음 실패: {e}")))?;
        Ok(())
    }

    async fn swipe(&self, from: Point, to: Point, duration_ms: u64) -> Result<(), CoreError> {
        use enigo::Mouse;
        let mut enigo = self.enigo.lock().await;
        enigo
            .move_mouse(from.x, from.y, enigo::Coordinate::Abs)
            .map_err(|e| CoreError::Internal(format!("마우스 이동 실패: {e}")))?;
        enigo
            .button(enigo::Button::Left, enigo::Direction::Press)
            .map_err(|e| CoreError::Internal(format!("버튼 누름 실패: {e}")))?;

        // 일정 간격으로 경로를 보간하며 드래그
        let steps = (duration_ms / Self::SWIPE_STEP_MS).max(1);
        for step in 1..=steps {
            let t = step as f64 / steps as f64;
            let x = from.x + ((to.x - from.x) as f64 * t).round() as i32;
            let y = from.y + ((to.y - from.y) as f64 * t).round() as i32;
            enigo
                .move_mouse(x, y, enigo::Coordinate::Abs)
                .map_err(|e| CoreError::Internal(format!("마우스 이동 실패: {e}")))?;
            tokio::time::sleep(Duration::from_millis(Self::SWIPE_STEP_MS)).await;
        }

        enigo
            .button(enigo::Button::Left, enigo::Direction::Release)
            .map_err(|e| CoreError::Internal(format!("버튼 놓음 실패: {e}")))?;
        Ok(())
    }

    fn platform(&self) -> &str {
        "enigo"
    }
}
