//! Parallel rotation-invariant matching over a variant library.

use crate::bank::VariantLibrary;
use crate::candidate::{best_peak, Peak};
use crate::search::{scan_plans, Frame, Match};
use crate::template::TemplatePlan;
use crate::trace::{trace_event, trace_span};
use crate::util::{RotMatchError, RotMatchResult};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Default width of the matching worker pool.
pub const DEFAULT_WORKERS: usize = 8;

/// Scores frames against every variant of a library on an owned pool.
///
/// The pool is created once and reused by every `match_all` call. Each call
/// fans out one task per pair of variants and blocks until all of them
/// finish; the reduction happens on the calling thread, so the answer does
/// not depend on the pool width.
pub struct MatchEngine {
    pool: ThreadPool,
}

impl MatchEngine {
    /// Creates an engine with `workers` matching threads.
    pub fn new(workers: usize) -> RotMatchResult<Self> {
        if workers == 0 {
            return Err(RotMatchError::InvalidInput("workers must be at least 1"));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|idx| format!("rotmatch-worker-{idx}"))
            .build()
            .map_err(|err| RotMatchError::WorkerPool {
                reason: err.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Returns the number of worker threads.
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Finds the best `(score, location, angle)` over all variants.
    ///
    /// Ties on score resolve to the lowest angle. Fails with `NoTemplates`
    /// for an empty library and `TemplateLargerThanFrame` when the variants
    /// cannot be placed in the frame.
    pub fn match_all(&self, frame: &Frame, library: &VariantLibrary) -> RotMatchResult<Match> {
        let (tpl_width, tpl_height) = library.template_size().ok_or(RotMatchError::NoTemplates)?;
        if tpl_width > frame.width() || tpl_height > frame.height() {
            return Err(RotMatchError::TemplateLargerThanFrame {
                tpl_width,
                tpl_height,
                img_width: frame.width(),
                img_height: frame.height(),
            });
        }

        let _span = trace_span!("match_all", variants = library.len()).entered();
        let plans: Vec<(&TemplatePlan, u32)> = library
            .variants()
            .iter()
            .filter_map(|variant| variant.plan().map(|plan| (plan, variant.angle_deg())))
            .collect();

        let scanned = self.pool.install(|| {
            if !plans.is_empty() && frame.prefers_spectral(tpl_width, tpl_height) {
                // Transform once on the pool before the variants fan out.
                frame.spectrum();
            }
            plans
                .par_chunks(2)
                .map(|pair| scan_plans(frame, pair))
                .collect::<RotMatchResult<Vec<Vec<Peak>>>>()
        })?;

        // A variant without contrast correlates with nothing; it contributes
        // a zero score at the origin instead of failing the whole call.
        let flat = library
            .variants()
            .iter()
            .filter(|variant| variant.plan().is_none())
            .map(|variant| Peak {
                x: 0,
                y: 0,
                score: 0.0,
                angle_deg: variant.angle_deg(),
            });
        let peaks = scanned.into_iter().flatten().chain(flat);

        let best = best_peak(peaks).ok_or(RotMatchError::NoTemplates)?;
        trace_event!(
            "best_match",
            score = best.score,
            x = best.x,
            y = best.y,
            angle_deg = best.angle_deg
        );
        Ok(best.into())
    }
}

#[cfg(test)]
mod tests {
    use super::MatchEngine;
    use crate::bank::VariantLibrary;
    use crate::image::OwnedImage;
    use crate::search::Frame;
    use crate::util::RotMatchError;

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            MatchEngine::new(0),
            Err(RotMatchError::InvalidInput(_))
        ));
        assert_eq!(MatchEngine::new(3).unwrap().workers(), 3);
    }

    #[test]
    fn empty_library_reports_no_templates() {
        let engine = MatchEngine::new(2).unwrap();
        let frame = Frame::new(OwnedImage::new(vec![0u8; 16], 4, 4).unwrap());
        let err = engine.match_all(&frame, &VariantLibrary::empty()).unwrap_err();
        assert_eq!(err, RotMatchError::NoTemplates);
    }
}
