//! 이미지 매처 포트.
//!
//! 구현: `kkuk-vision` crate (`TemplateMatcher` — CPU NCC 백엔드).
//! 다른 백엔드(GPU 등)는 이 trait 뒤에 교체 장착한다.

use image::DynamicImage;

use crate::error::CoreError;
use crate::models::detection::DetectionResult;
use crate::models::geometry::Rect;

/// 이미지 매처 — 바인딩된 프레임에서 조건 이미지를 탐색한다.
///
/// 호출 계약: 매 틱 `prepare_frame`으로 현재 캡처를 바인딩한 뒤
/// `detect`/`detect_in_area`를 호출한다. 바인딩 전 호출은
/// `CoreError::InvalidState`. 크기 0이거나 프레임보다 큰 조건 이미지는
/// `CoreError::Match`. 네이티브 프레임 버퍼는 `Drop`에서 해제된다.
pub trait ImageMatcher: Send {
    /// 현재 프레임 바인딩 — 틱당 한 번, 프레임 전처리(축소 등)를 상각한다.
    fn prepare_frame(&mut self, frame: &DynamicImage) -> Result<(), CoreError>;

    /// 프레임 전체에서 조건 이미지의 전역 최적 위치를 탐색한다.
    ///
    /// 최고 점수 위치가 `threshold`(유사도 0~100) 이상이면 매칭.
    /// 위치가 동점이더라도 항상 전역 최고점을 선택해 결정적이다.
    fn detect(
        &mut self,
        condition_image: &DynamicImage,
        threshold: u8,
    ) -> Result<DetectionResult, CoreError>;

    /// `area` 내부로 탐색을 제한한 `detect`.
    ///
    /// 고정 영역 조건에 사용 — 비용이 싸고 반복 UI 요소 오탐을 줄인다.
    /// `area`가 프레임을 벗어나면 에러가 아니라 비매칭 결과를 반환한다.
    fn detect_in_area(
        &mut self,
        condition_image: &DynamicImage,
        area: Rect,
        threshold: u8,
    ) -> Result<DetectionResult, CoreError>;
}
