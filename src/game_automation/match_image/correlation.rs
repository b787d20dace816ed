//! Zero-mean normalized cross-correlation
//!
//! Scores every placement of a template inside a search area:
//!
//! ```text
//!            n·Σ(t·i) − Σt·Σi
//! r = ─────────────────────────────────────
//!     √((n·Σt² − (Σt)²) · (n·Σi² − (Σi)²))
//! ```
//!
//! summed over the template pixels that take part in matching (all of them,
//! or only those with a non-zero mask). The score lies in [-1, 1]. A flat
//! template or a flat window has no defined correlation and scores 0.
//!
//! The search is brute force: every placement visits every active template
//! pixel. Unmasked templates take Σi and Σi² from integral images of the
//! search area, so only the cross term Σ(t·i) is summed per placement.

use super::region::Roi;
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};

type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Best placement found inside a search area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationPeak {
    /// Top-left corner of the placement, relative to the search area
    pub x: u32,
    pub y: u32,
    pub confidence: f32,
}

/// Template pixels that take part in matching, with their sums precomputed
struct ActivePixels {
    offsets: Vec<(u32, u32, i64)>,
    sum: i64,
    sum_sq: i64,
}

impl ActivePixels {
    fn collect(template: &GrayImage, mask: Option<&GrayImage>) -> Self {
        let mut offsets = Vec::with_capacity((template.width() * template.height()) as usize);
        let mut sum = 0i64;
        let mut sum_sq = 0i64;

        for (x, y, pixel) in template.enumerate_pixels() {
            if let Some(mask) = mask
                && mask.get_pixel(x, y)[0] == 0
            {
                continue;
            }
            let value = pixel[0] as i64;
            sum += value;
            sum_sq += value * value;
            offsets.push((x, y, value));
        }

        Self {
            offsets,
            sum,
            sum_sq,
        }
    }

    fn count(&self) -> i64 {
        self.offsets.len() as i64
    }

    /// n·Σt² − (Σt)², zero for a flat template
    fn spread(&self) -> i128 {
        self.count() as i128 * self.sum_sq as i128 - (self.sum as i128) * (self.sum as i128)
    }
}

/// Running sums of the search area, for Σi and Σi² of any window in O(1)
struct WindowSums {
    sum: Integral,
    sum_sq: Integral,
}

impl WindowSums {
    fn new(image: &GrayImage, area: Roi) -> Self {
        let crop = image::imageops::crop_imm(
            image,
            area.x as u32,
            area.y as u32,
            area.width as u32,
            area.height as u32,
        )
        .to_image();
        Self {
            sum: integral_image::<_, u64>(&crop),
            sum_sq: integral_squared_image::<_, u64>(&crop),
        }
    }

    /// (Σi, Σi²) of the `w`×`h` window at (x, y), relative to the area
    fn window(&self, x: u32, y: u32, w: u32, h: u32) -> (i64, i64) {
        (
            Self::total(&self.sum, x, y, w, h),
            Self::total(&self.sum_sq, x, y, w, h),
        )
    }

    fn total(table: &Integral, x: u32, y: u32, w: u32, h: u32) -> i64 {
        let at = |px: u32, py: u32| table.get_pixel(px, py)[0] as i64;
        at(x + w, y + h) - at(x + w, y) - at(x, y + h) + at(x, y)
    }
}

/// Find the highest scoring placement of `template` fully inside `area`.
///
/// `area` must already be clamped to the image. Returns `None` when the
/// template does not fit in the area or when the mask excludes every pixel.
/// Ties keep the first placement in raster order.
pub fn best_match(
    image: &GrayImage,
    area: Roi,
    template: &GrayImage,
    mask: Option<&GrayImage>,
) -> Option<CorrelationPeak> {
    if area.width <= 0 || area.height <= 0 {
        return None;
    }
    let area_w = area.width as u32;
    let area_h = area.height as u32;
    if template.width() > area_w || template.height() > area_h {
        return None;
    }

    let active = ActivePixels::collect(template, mask);
    if active.offsets.is_empty() {
        return None;
    }

    let n = active.count() as i128;
    let template_spread = active.spread();
    let origin_x = area.x as u32;
    let origin_y = area.y as u32;
    let window_sums = mask.is_none().then(|| WindowSums::new(image, area));

    let mut best: Option<CorrelationPeak> = None;

    for y in 0..=(area_h - template.height()) {
        for x in 0..=(area_w - template.width()) {
            let mut sum = 0i64;
            let mut sum_sq = 0i64;
            let mut cross = 0i64;

            if let Some(sums) = &window_sums {
                for &(tx, ty, t) in &active.offsets {
                    cross += t * image.get_pixel(origin_x + x + tx, origin_y + y + ty)[0] as i64;
                }
                (sum, sum_sq) = sums.window(x, y, template.width(), template.height());
            } else {
                for &(tx, ty, t) in &active.offsets {
                    let value = image.get_pixel(origin_x + x + tx, origin_y + y + ty)[0] as i64;
                    sum += value;
                    sum_sq += value * value;
                    cross += t * value;
                }
            }

            let window_spread = n * sum_sq as i128 - (sum as i128) * (sum as i128);
            let confidence = if template_spread <= 0 || window_spread <= 0 {
                0.0
            } else {
                let numerator = n * cross as i128 - (active.sum as i128) * (sum as i128);
                let denominator = (template_spread as f64 * window_spread as f64).sqrt();
                (numerator as f64 / denominator).clamp(-1.0, 1.0) as f32
            };

            if best.is_none_or(|peak| confidence > peak.confidence) {
                best = Some(CorrelationPeak { x, y, confidence });
            }
        }
    }

    best
}
