//! Candidate peaks and their deterministic ordering.

use std::cmp::Ordering;

/// Best placement of one template orientation in a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    /// X coordinate (column) of the top-left placement.
    pub x: usize,
    /// Y coordinate (row) of the top-left placement.
    pub y: usize,
    /// Normalized correlation score in `[-1, 1]`.
    pub score: f32,
    /// Orientation of the template that produced the peak.
    pub angle_deg: u32,
}

/// Orders peaks best first: higher score, then lower angle, then row-major
/// position.
///
/// The angle tie-break is a chosen contract; equal maxima from different
/// orientations are otherwise indistinguishable.
pub(crate) fn peak_cmp_desc(a: &Peak, b: &Peak) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.angle_deg.cmp(&b.angle_deg))
        .then_with(|| a.y.cmp(&b.y))
        .then_with(|| a.x.cmp(&b.x))
}

/// Returns the best peak, or `None` for an empty input.
pub(crate) fn best_peak<I: IntoIterator<Item = Peak>>(peaks: I) -> Option<Peak> {
    peaks
        .into_iter()
        .min_by(|a, b| peak_cmp_desc(a, b))
}
