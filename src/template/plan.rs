//! Template statistics precomputed for normalized correlation.

use crate::image::ImageView;
use crate::util::{RotMatchError, RotMatchResult};

/// Integer statistics of a template used by the ZNCC kernel.
///
/// With `n` pixels, `St = Σt` and `St2 = Σt²`, the scaled variance
/// `n·St2 − St²` is kept exactly so a perfect placement scores exactly `1.0`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplatePlan {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
    sum: u64,
    var_n: u128,
}

impl TemplatePlan {
    /// Builds a plan from a template view.
    pub fn from_view(tpl: ImageView<'_, u8>) -> RotMatchResult<Self> {
        let width = tpl.width();
        let height = tpl.height();
        let mut pixels = Vec::with_capacity(width * height);
        let mut sum = 0u64;
        let mut sum_sq = 0u64;
        for row in tpl.rows() {
            for &value in row {
                let v = value as u64;
                sum += v;
                sum_sq += v * v;
            }
            pixels.extend_from_slice(row);
        }

        let n = pixels.len() as u128;
        let var_n = n * sum_sq as u128 - (sum as u128) * (sum as u128);
        if var_n == 0 {
            return Err(RotMatchError::DegenerateTemplate {
                reason: "zero variance",
            });
        }

        Ok(Self {
            width,
            height,
            pixels,
            sum,
            var_n,
        })
    }

    /// Returns the template width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the template height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Returns the number of template pixels.
    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    /// Returns true if the template has no pixels.
    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Returns the row-major template pixels.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Returns `Σt`.
    pub fn sum(&self) -> u64 {
        self.sum
    }

    /// Returns `n·Σt² − (Σt)²`.
    pub fn var_n(&self) -> u128 {
        self.var_n
    }
}
