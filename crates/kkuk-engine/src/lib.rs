//! kkuk-engine — 시나리오 처리 엔진.
//!
//! 틱 루프([`processor::ScenarioProcessor`]), 액션 디스패치
//! ([`dispatcher::ActionDispatcher`]), 세션 계측
//! ([`debug_engine::DebugEngine`])을 제공한다. 이미지 매칭과 입력
//! 주입은 `kkuk-core`의 포트 뒤에 있어 테스트 더블로 대체 가능하다.

pub mod debug_engine;
pub mod dispatcher;
pub mod executor;
pub mod processor;
pub mod recorder;
pub mod report;

pub use debug_engine::DebugEngine;
pub use dispatcher::{ActionDispatcher, DispatchOutcome};
pub use executor::LogActionExecutor;
#[cfg(feature = "enigo")]
pub use executor::EnigoActionExecutor;
pub use processor::{ProcessorOptions, ProcessorState, ScenarioProcessor, SessionSummary};
pub use recorder::{ProcessingDebugInfo, ProcessingRecorder};
pub use report::{DebugInfo, DebugReport, StopReason};
