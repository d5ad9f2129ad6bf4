//! Correlation kernel implementations.

use crate::candidate::Peak;
use crate::image::{ImageView, IntegralImage};
use crate::util::RotMatchResult;

pub mod scalar;
pub mod spectral;

pub use scalar::ZnccScalar;
pub use spectral::FrameSpectrum;

/// Kernel trait for scoring and full-frame scans.
pub trait Kernel {
    type Plan;

    /// Computes the score at a single placement (top-left coordinates).
    ///
    /// The placement must fit inside the image.
    fn score_at(
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        plan: &Self::Plan,
        x: usize,
        y: usize,
    ) -> f32;

    /// Scans every valid placement and returns the maximum of the score
    /// surface, first occurrence in row-major order on ties.
    fn scan_best(
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        plan: &Self::Plan,
        angle_deg: u32,
    ) -> RotMatchResult<Peak>;
}
