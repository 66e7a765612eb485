//! # kkuk-core
//!
//! KKUK 도메인 모델, 포트(trait) 정의, 에러 타입.
//! 탐지/평가 엔진과 어댑터 crate가 공유하는 핵심 타입을 제공한다.
//!
//! ## 구조
//!
//! - [`models`] — 시나리오 그래프와 틱 처리 결과 타입 (serde)
//! - [`ports`] — 매처/프레임 소스/액션 실행기 인터페이스
//! - [`error`] — 핵심 에러 타입 (thiserror)
//! - [`config`] — 애플리케이션 설정 구조체
//! - [`config_manager`] — 설정 파일 관리 (로드/저장)

pub mod config;
pub mod config_manager;
pub mod error;
pub mod models;
pub mod ports;
