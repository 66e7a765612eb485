//! 액션 실행기 포트.
//!
//! 좌표가 확정된 입력을 실제로 주입하는 인터페이스.
//! 구현: `kkuk-engine::executor` (`LogActionExecutor`,
//! enigo feature 활성화 시 `EnigoActionExecutor`).

use async_trait::async_trait;

use crate::error::CoreError;
use crate::models::geometry::Point;

/// 액션 실행기 — 물리 입력 주입.
///
/// 각 호출은 제스처가 끝날 때까지(누름 시간/스와이프 시간 포함) 대기한 뒤
/// 반환한다. 실패는 `CoreError::Action`이며 세션을 종료시킨다 —
/// 알 수 없는 기기 상태에 실패한 입력을 재시도하지 않는다.
#[async_trait]
pub trait ActionExecutor: Send + Sync {
    /// 지정 좌표 탭
    async fn tap(&self, position: Point, press_duration_ms: u64) -> Result<(), CoreError>;

    /// 두 좌표 간 스와이프
    async fn swipe(&self, from: Point, to: Point, duration_ms: u64) -> Result<(), CoreError>;

    /// 플랫폼 이름 (예: "log", "enigo")
    fn platform(&self) -> &str;
}
