//! kkuk-vision — 이미지 매칭 어댑터.
//!
//! `kkuk-core`의 비전 포트 구현을 모아둔다:
//! - [`matcher::TemplateMatcher`] — NCC 기반 CPU 템플릿 매처
//! - [`capture::ScreenFrameSource`] — xcap 스크린 캡처 프레임 소스

pub mod capture;
pub mod matcher;

pub use capture::ScreenFrameSource;
pub use matcher::TemplateMatcher;
