//! Scalar normalized cross-correlation (`TM_CCOEFF_NORMED`).
//!
//! For a placement with `n` pixels the score is
//!
//! ```text
//! (n·Σti − Σt·Σi) / sqrt((n·Σt² − (Σt)²) · (n·Σi² − (Σi)²))
//! ```
//!
//! All sums are exact integers: template statistics come from the plan,
//! window statistics from the frame's integral images, and only `Σti` is
//! accumulated per placement. A flat window scores `0.0`.

use crate::candidate::Peak;
use crate::image::{ImageView, IntegralImage};
use crate::kernel::Kernel;
use crate::template::TemplatePlan;
use crate::util::{RotMatchError, RotMatchResult};

/// Widest template row whose dot product fits a `u32` accumulator.
const MAX_ROW_WIDTH: usize = (u32::MAX / (255 * 255)) as usize;

/// Largest template for which every term of the score is an integer below
/// 2^53, so `f64` arithmetic is exact and matches the `i128` path bit for bit.
const EXACT_F64_PIXELS: usize = 370_000;

/// Scalar ZNCC kernel over unmasked templates.
pub struct ZnccScalar;

impl ZnccScalar {
    /// Score of the placement at `(x, y)` given its exact `Σti`.
    #[inline]
    pub(crate) fn score_from_dot(
        integral: &IntegralImage,
        plan: &TemplatePlan,
        x: usize,
        y: usize,
        dot: u64,
    ) -> f32 {
        let (sum_i, sum_sq_i) = integral.window(x, y, plan.width(), plan.height());
        let (num, var_i) = if plan.len() <= EXACT_F64_PIXELS {
            let n = plan.len() as f64;
            let sum_i = sum_i as f64;
            (
                n * dot as f64 - plan.sum() as f64 * sum_i,
                n * sum_sq_i as f64 - sum_i * sum_i,
            )
        } else {
            let n = plan.len() as i128;
            let sum_i = sum_i as i128;
            (
                (n * dot as i128 - plan.sum() as i128 * sum_i) as f64,
                (n * sum_sq_i as i128 - sum_i * sum_i) as f64,
            )
        };
        if var_i <= 0.0 {
            return 0.0;
        }

        let score = num / (plan.var_n() as f64 * var_i).sqrt();
        if score.is_finite() {
            score.clamp(-1.0, 1.0) as f32
        } else {
            0.0
        }
    }

    #[inline]
    fn dot_at(image: ImageView<'_, u8>, plan: &TemplatePlan, x: usize, y: usize) -> u64 {
        let tw = plan.width();
        let data = image.as_slice();
        let stride = image.stride();
        let pixels = plan.pixels();
        let mut dot = 0u64;
        for ty in 0..plan.height() {
            let start = (y + ty) * stride + x;
            let img_row = &data[start..start + tw];
            let tpl_row = &pixels[ty * tw..(ty + 1) * tw];
            let row_dot: u32 = img_row
                .iter()
                .zip(tpl_row)
                .map(|(&i, &t)| i as u32 * t as u32)
                .sum();
            dot += row_dot as u64;
        }
        dot
    }

    /// Rejects scans whose inputs do not fit together.
    pub(crate) fn check_scan(
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        plan: &TemplatePlan,
    ) -> RotMatchResult<()> {
        let img_width = image.width();
        let img_height = image.height();
        let tpl_width = plan.width();
        let tpl_height = plan.height();
        if img_width < tpl_width || img_height < tpl_height {
            return Err(RotMatchError::TemplateLargerThanFrame {
                tpl_width,
                tpl_height,
                img_width,
                img_height,
            });
        }
        if tpl_width > MAX_ROW_WIDTH {
            return Err(RotMatchError::InvalidDimensions {
                width: tpl_width,
                height: tpl_height,
            });
        }
        if integral.width() != img_width || integral.height() != img_height {
            return Err(RotMatchError::InvalidInput(
                "integral image does not belong to this frame",
            ));
        }
        Ok(())
    }

    /// Maximum over every placement, `dot` supplying `Σti` for each one.
    ///
    /// Placements are visited in row-major order and only a strictly greater
    /// score replaces the best, so ties keep the first occurrence.
    pub(crate) fn scan_with<F>(
        integral: &IntegralImage,
        plan: &TemplatePlan,
        angle_deg: u32,
        mut dot: F,
    ) -> Peak
    where
        F: FnMut(usize, usize) -> u64,
    {
        let mut best = Peak {
            x: 0,
            y: 0,
            score: f32::NEG_INFINITY,
            angle_deg,
        };
        for y in 0..=integral.height() - plan.height() {
            for x in 0..=integral.width() - plan.width() {
                let score = Self::score_from_dot(integral, plan, x, y, dot(x, y));
                if score > best.score {
                    best = Peak {
                        x,
                        y,
                        score,
                        angle_deg,
                    };
                }
            }
        }
        best
    }
}

impl Kernel for ZnccScalar {
    type Plan = TemplatePlan;

    fn score_at(
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        plan: &Self::Plan,
        x: usize,
        y: usize,
    ) -> f32 {
        if x + plan.width() > image.width() || y + plan.height() > image.height() {
            return f32::NEG_INFINITY;
        }
        let dot = Self::dot_at(image, plan, x, y);
        Self::score_from_dot(integral, plan, x, y, dot)
    }

    fn scan_best(
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        plan: &Self::Plan,
        angle_deg: u32,
    ) -> RotMatchResult<Peak> {
        Self::check_scan(image, integral, plan)?;
        Ok(Self::scan_with(integral, plan, angle_deg, |x, y| {
            Self::dot_at(image, plan, x, y)
        }))
    }
}
