//! 좌표/영역 기본 타입.

use serde::{Deserialize, Serialize};

/// 화면 좌표 (픽셀, 좌상단 원점)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// 새 좌표 생성
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// 직사각형 영역 (조건 탐색 범위, 매칭 하이라이트 영역)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// 새 영역 생성
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 영역의 중심 좌표
    pub fn center(&self) -> Point {
        Point {
            x: self.x + (self.width / 2) as i32,
            y: self.y + (self.height / 2) as i32,
        }
    }

    /// `center`를 중심으로 하는 `width`x`height` 영역
    pub fn centered_at(center: Point, width: u32, height: u32) -> Self {
        Self {
            x: center.x - (width / 2) as i32,
            y: center.y - (height / 2) as i32,
            width,
            height,
        }
    }

    /// `frame_width`x`frame_height` 프레임 안에 완전히 포함되는지 여부
    pub fn fits_in(&self, frame_width: u32, frame_height: u32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x as i64 + self.width as i64 <= frame_width as i64
            && self.y as i64 + self.height as i64 <= frame_height as i64
    }

    /// 넓이 0 여부
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}
