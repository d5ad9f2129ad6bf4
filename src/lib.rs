//! rotmatch recognizes targets in captured window frames, including targets
//! that appear at arbitrary rotation, and drives a polling detection loop
//! that clicks on accepted hits.
//!
//! The pieces, leaf to root:
//!
//! - [`bank::VariantLibrary`] precomputes rotated copies of a reference image
//!   and persists them so the rotation step runs once.
//! - [`search::MatchEngine`] scores a frame against every variant on a
//!   bounded worker pool and keeps the best `(score, location, angle)`.
//! - [`search::FixedTemplate`] matches targets that never rotate.
//! - [`detect::DetectionLoop`] polls a [`detect::FrameSource`], runs the
//!   enabled detectors and hands accepted hits to a
//!   [`detect::ClickDispatcher`].
//!
//! Scores are normalized cross-correlation (`TM_CCOEFF_NORMED`) in `[-1, 1]`.

pub mod bank;
mod candidate;
pub mod detect;
pub mod image;
pub mod kernel;
pub mod search;
pub mod template;
mod trace;
pub mod util;

pub use bank::{AngleGrid, TemplateVariant, VariantLibrary, DEFAULT_ANGLE_STEP_DEG};
pub use candidate::Peak;
pub use detect::{
    CapturedFrame, Click, ClickDispatcher, Command, DetectionLoop, DetectorKind, DetectorState,
    FrameSource, IterationReport, KeyBindings, LoopConfig, LoopState, LoopSummary,
    TriggerCallback, TriggerRegistry, WindowRect, ACCEPTANCE_THRESHOLD, CAPTURE_BACKOFF,
    FIXED_GEM, POLL_INTERVAL, RESTART_BUTTON,
};
pub use image::{ImageView, IntegralImage, OwnedImage};
pub use search::{FixedTemplate, FixedTemplates, Frame, Match, MatchEngine, DEFAULT_WORKERS};
pub use template::{Template, TemplatePlan};
pub use util::math::angular_distance_deg;
pub use util::{RotMatchError, RotMatchResult};
