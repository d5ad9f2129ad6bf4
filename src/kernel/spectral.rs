//! FFT cross-correlation for the `Σti` term of the score.
//!
//! The frame is transformed once; each pair of templates is packed into one
//! complex buffer (`a + i·b`), so a single forward and a single inverse
//! transform yield both correlation surfaces. `Σti` is an integer, and the
//! transform error stays far below one half at `f64` precision, so rounding
//! recovers it exactly and the score matches [`ZnccScalar`] bit for bit.
//! Should the error bound come near one half the pair is scanned directly.

use crate::candidate::Peak;
use crate::image::{ImageView, IntegralImage};
use crate::kernel::{Kernel, ZnccScalar};
use crate::template::TemplatePlan;
use crate::util::RotMatchResult;
use rayon::prelude::*;
use rustfft::num_complex::Complex;
use rustfft::num_traits::Zero;
use rustfft::{Fft, FftPlanner};
use std::fmt;
use std::sync::Arc;

/// Safety factor on the textbook `eps·log2(N)·‖a‖·‖b‖` transform error.
const ERROR_FACTOR: f64 = 64.0;

/// Largest rounding error accepted before falling back to direct scanning.
const MAX_ROUNDING_ERROR: f64 = 0.25;

/// Smallest length `>= n` whose prime factors are all 2, 3 or 5.
fn smooth_len(n: usize) -> usize {
    let mut len = n.max(1);
    loop {
        let mut rest = len;
        for p in [2, 3, 5] {
            while rest % p == 0 {
                rest /= p;
            }
        }
        if rest == 1 {
            return len;
        }
        len += 1;
    }
}

/// Returns true when correlating a `tpl_width x tpl_height` template through
/// the frame spectrum is expected to beat the direct scan.
pub(crate) fn prefer_spectral(
    img_width: usize,
    img_height: usize,
    tpl_width: usize,
    tpl_height: usize,
) -> bool {
    let placements =
        (img_width + 1).saturating_sub(tpl_width) * (img_height + 1).saturating_sub(tpl_height);
    let direct = (tpl_width * tpl_height * placements) as f64;
    let len = (smooth_len(img_width) * smooth_len(img_height)) as f64;
    // One forward and one inverse transform per two templates.
    direct > 8.0 * len * len.log2()
}

/// Forward spectrum of one frame, zero-padded to FFT-friendly sizes.
///
/// Stored column-major (`width` runs of `height` bins) as left by the
/// second transform pass; templates use the same layout.
#[derive(Clone)]
pub struct FrameSpectrum {
    width: usize,
    height: usize,
    row_fwd: Arc<dyn Fft<f64>>,
    col_fwd: Arc<dyn Fft<f64>>,
    row_inv: Arc<dyn Fft<f64>>,
    col_inv: Arc<dyn Fft<f64>>,
    bins: Vec<Complex<f64>>,
    norm: f64,
}

impl fmt::Debug for FrameSpectrum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameSpectrum")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("norm", &self.norm)
            .finish_non_exhaustive()
    }
}

impl FrameSpectrum {
    /// Transforms `image`, running row and column passes on the current
    /// rayon pool.
    pub fn new(image: ImageView<'_, u8>) -> Self {
        let width = smooth_len(image.width());
        let height = smooth_len(image.height());
        let mut planner = FftPlanner::<f64>::new();
        let row_fwd = planner.plan_fft_forward(width);
        let col_fwd = planner.plan_fft_forward(height);
        let row_inv = planner.plan_fft_inverse(width);
        let col_inv = planner.plan_fft_inverse(height);

        let mut spatial: Vec<Complex<f64>> = vec![Complex::zero(); width * height];
        let mut energy = 0f64;
        for (y, row) in image.rows().enumerate() {
            for (x, &value) in row.iter().enumerate() {
                let v = value as f64;
                spatial[y * width + x].re = v;
                energy += v * v;
            }
        }

        spatial
            .par_chunks_mut(width)
            .for_each(|row| row_fwd.process(row));
        let mut bins = transpose(&spatial, width, height);
        bins.par_chunks_mut(height)
            .for_each(|col| col_fwd.process(col));

        Self {
            width,
            height,
            row_fwd,
            col_fwd,
            row_inv,
            col_inv,
            bins,
            norm: energy.sqrt(),
        }
    }

    /// Padded `(width, height)` of the transform.
    pub fn padded_size(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Scans one or two templates and returns one peak per template, in
    /// input order.
    ///
    /// `image` and `integral` must be the frame this spectrum was built from.
    pub fn scan_pair(
        &self,
        image: ImageView<'_, u8>,
        integral: &IntegralImage,
        first: (&TemplatePlan, u32),
        second: Option<(&TemplatePlan, u32)>,
    ) -> RotMatchResult<Vec<Peak>> {
        ZnccScalar::check_scan(image, integral, first.0)?;
        if let Some((plan, _)) = second {
            ZnccScalar::check_scan(image, integral, plan)?;
        }

        let pair_norm = (energy(first.0) + second.map_or(0.0, |(plan, _)| energy(plan))).sqrt();
        let len = (self.width * self.height) as f64;
        let error = ERROR_FACTOR * f64::EPSILON * len.log2() * self.norm * pair_norm;
        if error >= MAX_ROUNDING_ERROR {
            return [Some(first), second]
                .into_iter()
                .flatten()
                .map(|(plan, angle)| ZnccScalar::scan_best(image, integral, plan, angle))
                .collect();
        }

        let surface = self.correlate(first.0, second.map(|(plan, _)| plan));
        let scale = 1.0 / len;
        let width = self.width;
        let dot = |value: f64| (value * scale).round().max(0.0) as u64;

        let mut peaks = vec![ZnccScalar::scan_with(integral, first.0, first.1, |x, y| {
            dot(surface[y * width + x].re)
        })];
        if let Some((plan, angle)) = second {
            peaks.push(ZnccScalar::scan_with(integral, plan, angle, |x, y| {
                dot(surface[y * width + x].im)
            }));
        }
        Ok(peaks)
    }

    /// Unnormalized circular correlation of the frame with `a + i·b`; the real
    /// part holds `a`'s surface and the imaginary part `b`'s, row-major.
    ///
    /// The padded size is at least the frame size, so valid placements never
    /// wrap around.
    fn correlate(&self, a: &TemplatePlan, b: Option<&TemplatePlan>) -> Vec<Complex<f64>> {
        let (width, height) = (self.width, self.height);
        let mut packed: Vec<Complex<f64>> = vec![Complex::zero(); width * height];
        for (y, row) in a.pixels().chunks_exact(a.width()).enumerate() {
            for (x, &value) in row.iter().enumerate() {
                packed[y * width + x].re = value as f64;
            }
        }
        if let Some(b) = b {
            for (y, row) in b.pixels().chunks_exact(b.width()).enumerate() {
                for (x, &value) in row.iter().enumerate() {
                    packed[y * width + x].im = value as f64;
                }
            }
        }

        self.row_fwd.process(&mut packed);
        let mut spectrum = transpose(&packed, width, height);
        self.col_fwd.process(&mut spectrum);

        // For real a and b, conj(A(k)) + i·conj(B(k)) equals Z(-k).
        let mut product: Vec<Complex<f64>> = vec![Complex::zero(); width * height];
        for kx in 0..width {
            let nx = (width - kx) % width;
            for ky in 0..height {
                let ny = (height - ky) % height;
                product[kx * height + ky] =
                    self.bins[kx * height + ky] * spectrum[nx * height + ny];
            }
        }

        self.col_inv.process(&mut product);
        let mut surface = transpose(&product, height, width);
        self.row_inv.process(&mut surface);
        surface
    }
}

fn energy(plan: &TemplatePlan) -> f64 {
    plan.pixels().iter().map(|&v| (v as f64) * (v as f64)).sum()
}

/// Transposes a row-major `width x height` buffer.
fn transpose(src: &[Complex<f64>], width: usize, height: usize) -> Vec<Complex<f64>> {
    let mut out = vec![Complex::zero(); width * height];
    for (y, row) in src.chunks_exact(width).enumerate() {
        for (x, &value) in row.iter().enumerate() {
            out[x * height + y] = value;
        }
    }
    out
}
