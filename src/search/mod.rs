//! Frame preparation and match search.
//!
//! `MatchEngine` scores a frame against every rotated variant of a library on
//! a bounded worker pool; `FixedTemplate` is the single-orientation matcher
//! used for targets that never rotate. Both consume a prepared [`Frame`] so
//! the integral images are built once per captured frame.

mod engine;
mod fixed;

pub use engine::{MatchEngine, DEFAULT_WORKERS};
pub use fixed::{FixedTemplate, FixedTemplates};

use crate::candidate::Peak;
use crate::image::{io, ImageView, IntegralImage, OwnedImage};
use crate::kernel::spectral::prefer_spectral;
use crate::kernel::{FrameSpectrum, Kernel, ZnccScalar};
use crate::template::TemplatePlan;
use crate::util::math::sin_cos_deg;
use crate::util::RotMatchResult;
use std::sync::OnceLock;

/// Grayscale frame with its integral images.
///
/// The frame spectrum is computed on first use and shared by every template
/// scanned against this frame.
#[derive(Clone, Debug)]
pub struct Frame {
    image: OwnedImage,
    integral: IntegralImage,
    spectrum: OnceLock<FrameSpectrum>,
}

impl Frame {
    /// Prepares an owned grayscale image for matching.
    pub fn new(image: OwnedImage) -> Self {
        let integral = IntegralImage::new(image.view());
        Self {
            image,
            integral,
            spectrum: OnceLock::new(),
        }
    }

    /// Copies and prepares a (possibly strided) grayscale view.
    pub fn from_view(view: ImageView<'_, u8>) -> Self {
        Self::new(OwnedImage::from_view(view))
    }

    /// Converts a decoded capture (any color layout) to grayscale and prepares it.
    pub fn from_dynamic(img: &image::DynamicImage) -> RotMatchResult<Self> {
        io::owned_from_dynamic_image(img).map(Self::new)
    }

    /// Returns the grayscale pixels.
    pub fn view(&self) -> ImageView<'_, u8> {
        self.image.view()
    }

    /// Returns the integral images of the frame.
    pub fn integral(&self) -> &IntegralImage {
        &self.integral
    }

    /// Returns the frame width in pixels.
    pub fn width(&self) -> usize {
        self.image.width()
    }

    /// Returns the frame height in pixels.
    pub fn height(&self) -> usize {
        self.image.height()
    }

    /// Returns the frame spectrum, transforming the frame on first call.
    pub fn spectrum(&self) -> &FrameSpectrum {
        self.spectrum.get_or_init(|| FrameSpectrum::new(self.image.view()))
    }

    /// Returns true when `width x height` templates go through the spectrum.
    pub(crate) fn prefers_spectral(&self, width: usize, height: usize) -> bool {
        prefer_spectral(self.width(), self.height(), width, height)
    }
}

/// Scans one or two same-sized plans and returns one peak per plan, in order.
pub(crate) fn scan_plans(
    frame: &Frame,
    plans: &[(&TemplatePlan, u32)],
) -> RotMatchResult<Vec<Peak>> {
    let Some(&(first, _)) = plans.first() else {
        return Ok(Vec::new());
    };
    if plans.len() <= 2 && frame.prefers_spectral(first.width(), first.height()) {
        return frame.spectrum().scan_pair(
            frame.view(),
            frame.integral(),
            plans[0],
            plans.get(1).copied(),
        );
    }
    plans
        .iter()
        .map(|&(plan, angle_deg)| {
            ZnccScalar::scan_best(frame.view(), frame.integral(), plan, angle_deg)
        })
        .collect()
}

/// Best placement found by one matching call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    /// Left edge of the placement in frame pixels.
    pub x: usize,
    /// Top edge of the placement in frame pixels.
    pub y: usize,
    /// Normalized correlation score in `[-1, 1]`.
    pub score: f32,
    /// Orientation of the matching variant (0 for fixed templates).
    pub angle_deg: u32,
}

impl From<Peak> for Match {
    fn from(peak: Peak) -> Self {
        Self {
            x: peak.x,
            y: peak.y,
            score: peak.score,
            angle_deg: peak.angle_deg,
        }
    }
}

impl Match {
    /// Returns true when the score strictly exceeds `threshold`.
    pub fn is_accepted(&self, threshold: f32) -> bool {
        self.score > threshold
    }

    /// Center of a `width x height` placement (top-left plus half size).
    pub fn center(&self, width: usize, height: usize) -> (usize, usize) {
        (self.x + width / 2, self.y + height / 2)
    }

    /// Corners of the rotated `width x height` box around the placement
    /// center, in frame coordinates, clockwise from the top-left corner of
    /// the unrotated box.
    pub fn corners(&self, width: usize, height: usize) -> [(f32, f32); 4] {
        let cx = self.x as f32 + (width as f32 - 1.0) * 0.5;
        let cy = self.y as f32 + (height as f32 - 1.0) * 0.5;
        let hw = width as f32 * 0.5;
        let hh = height as f32 * 0.5;
        let (sin_a, cos_a) = sin_cos_deg(self.angle_deg as f32);
        [(-hw, -hh), (hw, -hh), (hw, hh), (-hw, hh)].map(|(dx, dy)| {
            (
                cx + cos_a * dx + sin_a * dy,
                cy - sin_a * dx + cos_a * dy,
            )
        })
    }
}
