//! Polling detection loop and its collaborators.
//!
//! The loop owns a [`DetectorState`] shared with whatever flips the detector
//! flags (keys, signals, RPC), polls a [`FrameSource`] at a fixed cadence,
//! runs the enabled detectors in a fixed order and hands accepted hits to a
//! [`ClickDispatcher`].

mod collab;
mod runner;
mod state;

pub use collab::{CapturedFrame, Click, ClickDispatcher, FrameSource, WindowRect};
pub use runner::{DetectionLoop, IterationReport, LoopConfig, LoopSummary};
pub use state::{Command, DetectorState, KeyBindings, LoopState, TriggerCallback, TriggerRegistry};

use std::fmt;
use std::time::Duration;

/// Minimum score (exclusive) for a detection to trigger a click.
pub const ACCEPTANCE_THRESHOLD: f32 = 0.8;

/// Pause between iterations, regardless of how long matching took.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Pause after the monitored window could not be captured.
pub const CAPTURE_BACKOFF: Duration = Duration::from_secs(1);

/// Fixed template name checked by the fixed-object detector.
pub const FIXED_GEM: &str = "fixed_gem";

/// Fixed template name checked by the restart-button detector.
pub const RESTART_BUTTON: &str = "restart_btn";

/// One independently toggleable check performed every iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetectorKind {
    /// Rotation-invariant match against the variant library.
    Rotating,
    /// Single-orientation match against [`FIXED_GEM`].
    FixedGem,
    /// Single-orientation match against [`RESTART_BUTTON`].
    RestartButton,
}

impl DetectorKind {
    /// All detectors in their per-iteration check order.
    pub const ALL: [DetectorKind; 3] = [
        DetectorKind::Rotating,
        DetectorKind::FixedGem,
        DetectorKind::RestartButton,
    ];

    /// Name of the fixed template this detector matches, if any.
    pub fn template_name(self) -> Option<&'static str> {
        match self {
            DetectorKind::Rotating => None,
            DetectorKind::FixedGem => Some(FIXED_GEM),
            DetectorKind::RestartButton => Some(RESTART_BUTTON),
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DetectorKind::Rotating => "rotating target",
            DetectorKind::FixedGem => "fixed target",
            DetectorKind::RestartButton => "restart button",
        };
        f.write_str(label)
    }
}
