//! KKUK 도메인 모델.
//!
//! 시나리오 그래프(Scenario → Event → Condition/Action)와
//! 틱 처리 중 생성되는 일시적 값들을 정의한다.
//! 비트맵 필드를 제외한 모든 모델은 `serde` Serialize/Deserialize를 구현한다.

pub mod action;
pub mod condition;
pub mod detection;
pub mod event;
pub mod geometry;
pub mod scenario;
