//! CPU 템플릿 매처.
//!
//! 프레임을 탐지 품질에 맞춰 축소한 뒤 zero-mean NCC(정규화 교차상관)로
//! 조건 이미지의 전역 최적 위치를 찾는다. 윈도 합/제곱합은 적분 이미지로
//! 상수 시간에 구하고, 틱마다 반복되는 조건 축소는 LRU 캐시로 상각한다.

use std::num::NonZeroUsize;

use fast_image_resize::{images::Image as FirImage, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GrayImage};
use lru::LruCache;
use tracing::debug;

use kkuk_core::error::CoreError;
use kkuk_core::models::detection::DetectionResult;
use kkuk_core::models::geometry::{Point, Rect};
use kkuk_core::ports::image_matcher::ImageMatcher;

/// 축소 조건 이미지 캐시 크기 (시나리오당 조건 수 대비 여유)
const TEMPLATE_CACHE_CAPACITY: usize = 32;

/// 임계값 비교 시 부동소수 오차 보정.
/// 완전 일치의 NCC 1.0이 반올림으로 임계값 100에 못 미치는 것을 방지.
const SCORE_EPSILON: f64 = 1e-6;

/// 분산 0 판정 기준
const VAR_EPSILON: f64 = 1e-9;

/// 축소 조건 캐시 키: (샘플링 해시, ratio 천분율)
type TemplateKey = (u64, u32);

/// 바인딩된 프레임 — 원본/축소 luma 평면
struct PreparedFrame {
    full: GrayImage,
    scaled: GrayImage,
    ratio: f64,
}

/// CPU 템플릿 매처 — `ImageMatcher` 포트 구현
pub struct TemplateMatcher {
    /// 탐지 품질 — 축소 프레임의 최대 변 길이(픽셀)
    quality: u32,
    frame: Option<PreparedFrame>,
    template_cache: LruCache<TemplateKey, GrayImage>,
}

impl TemplateMatcher {
    /// 새 매처 생성
    pub fn new(quality: u32) -> Self {
        Self {
            quality,
            frame: None,
            template_cache: LruCache::new(
                NonZeroUsize::new(TEMPLATE_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            ),
        }
    }
}

impl ImageMatcher for TemplateMatcher {
    fn prepare_frame(&mut self, frame: &DynamicImage) -> Result<(), CoreError> {
        let (width, height) = (frame.width(), frame.height());
        if width == 0 || height == 0 {
            return Err(CoreError::Internal("빈 프레임 바인딩 시도".to_string()));
        }

        let full = frame.to_luma8();

        // 긴 변이 품질을 넘으면 축소, 확대는 하지 않음
        let longest = width.max(height);
        let ratio = if longest > self.quality {
            self.quality as f64 / longest as f64
        } else {
            1.0
        };

        let scaled = if ratio < 1.0 {
            let dst_w = ((width as f64 * ratio).round() as u32).max(1);
            let dst_h = ((height as f64 * ratio).round() as u32).max(1);
            resize_luma(&full, dst_w, dst_h)?
        } else {
            full.clone()
        };

        debug!(
            width,
            height,
            ratio,
            scaled_width = scaled.width(),
            scaled_height = scaled.height(),
            "프레임 바인딩"
        );

        self.frame = Some(PreparedFrame {
            full,
            scaled,
            ratio,
        });
        Ok(())
    }

    fn detect(
        &mut self,
        condition_image: &DynamicImage,
        threshold: u8,
    ) -> Result<DetectionResult, CoreError> {
        let frame = self
            .frame
            .as_ref()
            .ok_or_else(|| CoreError::InvalidState("prepare_frame 호출 전 detect".to_string()))?;

        if condition_image.width() == 0 || condition_image.height() == 0 {
            return Err(CoreError::Match("조건 이미지 크기 0".to_string()));
        }

        let template = scaled_template(&mut self.template_cache, condition_image, frame.ratio)?;
        if template.width() > frame.scaled.width() || template.height() > frame.scaled.height() {
            return Err(CoreError::Match(format!(
                "조건 이미지({}x{})가 탐색 프레임({}x{})보다 큼",
                template.width(),
                template.height(),
                frame.scaled.width(),
                frame.scaled.height()
            )));
        }

        let (best_x, best_y, best_score) = match_template(&frame.scaled, &template);
        let confidence = (best_score.max(0.0) * 100.0).min(100.0);

        if confidence + SCORE_EPSILON >= threshold as f64 {
            let center = Point::new(
                ((best_x + template.width() / 2) as f64 / frame.ratio).round() as i32,
                ((best_y + template.height() / 2) as f64 / frame.ratio).round() as i32,
            );
            Ok(DetectionResult::detected_at(center, confidence))
        } else {
            Ok(DetectionResult {
                detected: false,
                position: Point::default(),
                confidence,
            })
        }
    }

    fn detect_in_area(
        &mut self,
        condition_image: &DynamicImage,
        area: Rect,
        threshold: u8,
    ) -> Result<DetectionResult, CoreError> {
        let frame = self.frame.as_ref().ok_or_else(|| {
            CoreError::InvalidState("prepare_frame 호출 전 detect_in_area".to_string())
        })?;

        if condition_image.width() == 0 || condition_image.height() == 0 {
            return Err(CoreError::Match("조건 이미지 크기 0".to_string()));
        }

        // 영역이 화면을 벗어나면 매칭 없음 (에러 아님)
        if area.is_empty() || !area.fits_in(frame.full.width(), frame.full.height()) {
            debug!(?area, "탐색 영역이 프레임을 벗어남 — 비매칭");
            return Ok(DetectionResult::not_detected());
        }

        let template = condition_image.to_luma8();
        if template.width() > area.width || template.height() > area.height {
            return Err(CoreError::Match(format!(
                "조건 이미지({}x{})가 탐색 영역({}x{})보다 큼",
                template.width(),
                template.height(),
                area.width,
                area.height
            )));
        }

        // 고정 영역은 원본 해상도에서 비교 — 캡처 당시와 같은 자리의 스크린샷과 대조
        let crop = image::imageops::crop_imm(
            &frame.full,
            area.x as u32,
            area.y as u32,
            area.width,
            area.height,
        )
        .to_image();

        let (best_x, best_y, best_score) = match_template(&crop, &template);
        let confidence = (best_score.max(0.0) * 100.0).min(100.0);

        if confidence + SCORE_EPSILON >= threshold as f64 {
            let center = Point::new(
                area.x + best_x as i32 + (template.width() / 2) as i32,
                area.y + best_y as i32 + (template.height() / 2) as i32,
            );
            Ok(DetectionResult::detected_at(center, confidence))
        } else {
            Ok(DetectionResult {
                detected: false,
                position: Point::default(),
                confidence,
            })
        }
    }
}

// ============================================================
// NCC 탐색
// ============================================================

/// zero-mean NCC 전수 탐색 — 전역 최고점 `(x, y, score)` 반환.
///
/// score ∈ [-1, 1]. 동점이면 행 우선 스캔에서 먼저 만난 위치를 유지해
/// 결과가 결정적이다.
fn match_template(image: &GrayImage, template: &GrayImage) -> (u32, u32, f64) {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    debug_assert!(tw >= 1 && th >= 1 && tw <= iw && th <= ih);

    let n = (tw as u64 * th as u64) as f64;
    let t = template.as_raw();
    let t_sum: u64 = t.iter().map(|&p| p as u64).sum();
    let t_sum2: u64 = t.iter().map(|&p| p as u64 * p as u64).sum();
    let t_mean = t_sum as f64 / n;
    // Σt² - (Σt)²/n — n·분산 형태
    let t_var = t_sum2 as f64 - (t_sum as f64) * (t_sum as f64) / n;

    let (sum, sum2) = integral_images(image);
    let img = image.as_raw();

    let mut best = (0u32, 0u32, f64::NEG_INFINITY);
    for y in 0..=(ih - th) {
        for x in 0..=(iw - tw) {
            let w_sum = window_sum(&sum, iw, x, y, tw, th) as f64;
            let w_sum2 = window_sum(&sum2, iw, x, y, tw, th) as f64;
            let w_var = w_sum2 - w_sum * w_sum / n;

            let score = if t_var <= VAR_EPSILON || w_var <= VAR_EPSILON {
                // 평탄 윈도: 양쪽 다 평탄하고 평균이 같을 때만 일치
                if t_var <= VAR_EPSILON
                    && w_var <= VAR_EPSILON
                    && (w_sum / n - t_mean).abs() < 0.5
                {
                    1.0
                } else {
                    0.0
                }
            } else {
                let mut cross = 0u64;
                for ty in 0..th {
                    let img_row = ((y + ty) * iw + x) as usize;
                    let t_row = (ty * tw) as usize;
                    for tx in 0..tw as usize {
                        cross += img[img_row + tx] as u64 * t[t_row + tx] as u64;
                    }
                }
                let cov = cross as f64 - w_sum * t_sum as f64 / n;
                cov / (w_var.sqrt() * t_var.sqrt())
            };

            if score > best.2 {
                best = (x, y, score);
            }
        }
    }
    best
}

/// 적분 이미지 (합, 제곱합) — `(w+1)x(h+1)` 패딩 레이아웃
fn integral_images(image: &GrayImage) -> (Vec<u64>, Vec<u64>) {
    let (w, h) = image.dimensions();
    let stride = (w + 1) as usize;
    let mut sum = vec![0u64; stride * (h as usize + 1)];
    let mut sum2 = vec![0u64; stride * (h as usize + 1)];
    let raw = image.as_raw();

    for y in 0..h as usize {
        let mut row_sum = 0u64;
        let mut row_sum2 = 0u64;
        for x in 0..w as usize {
            let p = raw[y * w as usize + x] as u64;
            row_sum += p;
            row_sum2 += p * p;
            let idx = (y + 1) * stride + x + 1;
            sum[idx] = sum[y * stride + x + 1] + row_sum;
            sum2[idx] = sum2[y * stride + x + 1] + row_sum2;
        }
    }
    (sum, sum2)
}

/// 적분 이미지에서 `(x,y)` 시작 `w`x`h` 윈도의 합
#[inline]
fn window_sum(integral: &[u64], image_width: u32, x: u32, y: u32, w: u32, h: u32) -> u64 {
    let stride = (image_width + 1) as usize;
    let (x, y, w, h) = (x as usize, y as usize, w as usize, h as usize);
    integral[(y + h) * stride + x + w] + integral[y * stride + x]
        - integral[y * stride + x + w]
        - integral[(y + h) * stride + x]
}

// ============================================================
// 조건 이미지 축소 + 캐시
// ============================================================

/// 조건 이미지를 프레임과 같은 비율로 축소 (LRU 캐시 적용)
fn scaled_template(
    cache: &mut LruCache<TemplateKey, GrayImage>,
    condition_image: &DynamicImage,
    ratio: f64,
) -> Result<GrayImage, CoreError> {
    let gray = condition_image.to_luma8();
    if ratio >= 1.0 {
        return Ok(gray);
    }

    let key = (sample_hash(&gray), (ratio * 1000.0).round() as u32);
    if let Some(cached) = cache.get(&key) {
        return Ok(cached.clone());
    }

    let dst_w = ((gray.width() as f64 * ratio).round() as u32).max(1);
    let dst_h = ((gray.height() as f64 * ratio).round() as u32).max(1);
    let scaled = resize_luma(&gray, dst_w, dst_h)?;
    cache.put(key, scaled.clone());
    Ok(scaled)
}

/// luma 평면 고속 리사이즈 (fast_image_resize, bilinear)
fn resize_luma(src: &GrayImage, dst_w: u32, dst_h: u32) -> Result<GrayImage, CoreError> {
    let src_image = FirImage::from_vec_u8(
        src.width(),
        src.height(),
        src.as_raw().clone(),
        PixelType::U8,
    )
    .map_err(|e| CoreError::Internal(format!("소스 이미지 생성 실패: {e}")))?;

    let mut dst_image = FirImage::new(dst_w, dst_h, PixelType::U8);

    let mut resizer = Resizer::new();
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(
        fast_image_resize::FilterType::Bilinear,
    ));
    resizer
        .resize(&src_image, &mut dst_image, &options)
        .map_err(|e| CoreError::Internal(format!("리사이즈 실패: {e}")))?;

    GrayImage::from_raw(dst_w, dst_h, dst_image.into_vec())
        .ok_or_else(|| CoreError::Internal("결과 이미지 생성 실패".to_string()))
}

/// 샘플링 기반 FNV-1a 이미지 해시 — 캐시 키용
///
/// 크기 + 8x8 그리드 샘플 픽셀만 해싱해 비용을 고정한다.
fn sample_hash(image: &GrayImage) -> u64 {
    const FNV_PRIME: u64 = 0x100000001b3;
    let (w, h) = image.dimensions();
    let raw = image.as_raw();

    let mut hash: u64 = 0xcbf29ce484222325;
    hash ^= w as u64;
    hash = hash.wrapping_mul(FNV_PRIME);
    hash ^= h as u64;
    hash = hash.wrapping_mul(FNV_PRIME);

    let step_x = (w as usize).max(8) / 8;
    let step_y = (h as usize).max(8) / 8;
    for sy in 0..8 {
        let y = (sy * step_y).min((h as usize).saturating_sub(1));
        for sx in 0..8 {
            let x = (sx * step_x).min((w as usize).saturating_sub(1));
            hash ^= raw[y * w as usize + x] as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}
