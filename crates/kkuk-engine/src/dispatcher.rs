//! 액션 디스패처.
//!
//! 발동한 이벤트의 액션 목록을 선언 순서대로 실행한다. 액션 사이와
//! Pause 대기 중에 중지 요청을 확인해 틱 하나의 지연 내로 멈춘다.
//! 실행 실패는 재시도 없이 전파된다 — 알 수 없는 디바이스 상태에
//! 같은 입력을 반복하면 피해가 커질 수 있다.

use std::sync::Arc;
use std::time::Duration;

use rand::RngExt;
use tokio::sync::watch;
use tracing::debug;

use kkuk_core::error::CoreError;
use kkuk_core::models::action::Action;
use kkuk_core::models::geometry::Point;
use kkuk_core::ports::action_executor::ActionExecutor;

/// 액션 목록 실행 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// 전체 실행 완료
    Completed,
    /// 중지 요청으로 중간에 끊김
    Interrupted,
}

/// 액션 실행 조율기
pub struct ActionDispatcher {
    executor: Arc<dyn ActionExecutor>,
    stop_rx: watch::Receiver<bool>,
}

impl ActionDispatcher {
    /// 새 디스패처 생성
    pub fn new(executor: Arc<dyn ActionExecutor>, stop_rx: watch::Receiver<bool>) -> Self {
        Self { executor, stop_rx }
    }

    /// 액션 목록을 순서대로 실행.
    ///
    /// 실행 실패는 `CoreError::Action`으로 전파된다 (세션 치명).
    pub async fn dispatch(&mut self, actions: &[Action]) -> Result<DispatchOutcome, CoreError> {
        for action in actions {
            if *self.stop_rx.borrow() {
                debug!(kind = action.kind(), "중지 요청 — 남은 액션 건너뜀");
                return Ok(DispatchOutcome::Interrupted);
            }

            match action {
                Action::Click {
                    position,
                    press_duration_ms,
                    randomize_px,
                } => {
                    let target = jitter(*position, *randomize_px);
                    debug!(x = target.x, y = target.y, "탭 실행");
                    self.executor
                        .tap(target, *press_duration_ms)
                        .await
                        .map_err(|e| CoreError::action("click", e.to_string()))?;
                }
                Action::Swipe { from, to, duration_ms } => {
                    debug!(?from, ?to, duration_ms, "스와이프 실행");
                    self.executor
                        .swipe(*from, *to, *duration_ms)
                        .await
                        .map_err(|e| CoreError::action("swipe", e.to_string()))?;
                }
                Action::Pause { duration_ms } => {
                    let outcome =
                        cancellable_sleep(Duration::from_millis(*duration_ms), &mut self.stop_rx)
                            .await;
                    if outcome == DispatchOutcome::Interrupted {
                        debug!(duration_ms, "일시정지 중 중지 요청");
                        return Ok(DispatchOutcome::Interrupted);
                    }
                }
            }
        }
        Ok(DispatchOutcome::Completed)
    }
}

/// 중지 요청에 즉시 깨어나는 대기
pub async fn cancellable_sleep(
    duration: Duration,
    stop_rx: &mut watch::Receiver<bool>,
) -> DispatchOutcome {
    if *stop_rx.borrow() {
        return DispatchOutcome::Interrupted;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => DispatchOutcome::Completed,
        // 송신자 드롭도 중지로 취급
        _ = stop_rx.wait_for(|&stopped| stopped) => DispatchOutcome::Interrupted,
    }
}

/// 탭 좌표 무작위 오프셋 (반경 픽셀 내 균등)
fn jitter(position: Point, randomize_px: Option<u32>) -> Point {
    match randomize_px {
        Some(radius) if radius > 0 => {
            let radius = radius as i32;
            let mut rng = rand::rng();
            Point::new(
                position.x + rng.random_range(-radius..=radius),
                position.y + rng.random_range(-radius..=radius),
            )
        }
        _ => position,
    }
}
