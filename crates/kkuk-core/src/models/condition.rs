//! 조건(Condition) 모델.
//!
//! 하나의 조건은 참조 이미지 + 탐색 영역 + 유사도 임계값으로
//! 화면에서 찾을 시각 패턴 하나를 정의한다.

use std::path::{Path, PathBuf};

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::geometry::Rect;

/// 탐지 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectionType {
    /// 캡처했던 위치 그대로 비교 (영역 고정, `area` 필수)
    Exact,
    /// 화면 전체(또는 `area` 내부)에서 자유 탐색
    Anywhere,
}

/// 매칭 조건 — 참조 이미지 하나에 대한 탐지 규칙
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    /// 조건 식별자 (이벤트 내 유일)
    pub id: i64,
    /// 조건 이름
    pub name: String,
    /// 탐색 영역 (None이면 프레임 전체 탐색)
    pub area: Option<Rect>,
    /// 유사도 임계값 (0~100, 100 = 픽셀 단위 완전 일치)
    pub threshold: u8,
    /// 탐지 방식
    pub detection_type: DetectionType,
    /// 참조 이미지 파일 경로 (시나리오 파일 기준 상대 경로 허용)
    pub path: Option<PathBuf>,
    /// 로드된 참조 이미지 — 직렬화 대상 아님, `load_bitmap`으로 채운다
    #[serde(skip)]
    pub bitmap: Option<DynamicImage>,
}

impl Condition {
    /// `path`의 이미지를 `bitmap`으로 로드한다.
    ///
    /// `base`가 주어지면 상대 경로를 그 기준으로 해석한다.
    /// 경로 없음/로드 실패는 `Config` 에러 — 세션 시작 전에 드러나야 한다.
    pub fn load_bitmap(&mut self, base: Option<&Path>) -> Result<(), CoreError> {
        let path = self
            .path
            .as_ref()
            .ok_or_else(|| CoreError::Config(format!("조건 {} 이미지 경로 없음", self.id)))?;

        let resolved = match base {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.clone(),
        };

        let bitmap = image::open(&resolved).map_err(|e| {
            CoreError::Config(format!(
                "조건 {} 이미지 로드 실패 ({}): {e}",
                self.id,
                resolved.display()
            ))
        })?;

        self.bitmap = Some(bitmap);
        Ok(())
    }

    /// 참조 이미지 크기 (bitmap 우선, 없으면 area 크기)
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        if let Some(bitmap) = &self.bitmap {
            return Some((bitmap.width(), bitmap.height()));
        }
        self.area.map(|area| (area.width, area.height))
    }
}
