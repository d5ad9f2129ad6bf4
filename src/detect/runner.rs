//! The polling detection loop.

use crate::bank::VariantLibrary;
use crate::detect::{
    Click, ClickDispatcher, DetectorKind, DetectorState, FrameSource, WindowRect,
    ACCEPTANCE_THRESHOLD, CAPTURE_BACKOFF, POLL_INTERVAL,
};
use crate::search::{FixedTemplates, Frame, MatchEngine};
use crate::trace::{status_info, status_warn, trace_span};
use crate::util::{RotMatchError, RotMatchResult};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Construction-time loop parameters.
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Exact title of the monitored window.
    pub window_title: String,
    /// Score a match must exceed to trigger a click.
    pub acceptance_threshold: f32,
    /// Pause after every captured iteration.
    pub poll_interval: Duration,
    /// Pause after a failed capture.
    pub capture_backoff: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: String::new(),
            acceptance_threshold: ACCEPTANCE_THRESHOLD,
            poll_interval: POLL_INTERVAL,
            capture_backoff: CAPTURE_BACKOFF,
        }
    }
}

/// Outcome of a single iteration.
#[derive(Debug, Default)]
pub struct IterationReport {
    /// False when the window could not be captured.
    pub captured: bool,
    /// Clicks dispatched, in dispatch order.
    pub clicks: Vec<Click>,
    /// Detectors that failed this iteration and why.
    pub failures: Vec<(DetectorKind, RotMatchError)>,
}

/// Totals over a whole run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopSummary {
    pub iterations: u64,
    pub missed_captures: u64,
    pub clicks: u64,
    pub failures: u64,
}

impl LoopSummary {
    fn record(&mut self, report: &IterationReport) {
        self.iterations += 1;
        if !report.captured {
            self.missed_captures += 1;
        }
        self.clicks += report.clicks.len() as u64;
        self.failures += report.failures.len() as u64;
    }
}

/// Polls a window and runs the enabled detectors on every frame.
///
/// One thread drives the loop; iterations never overlap and detectors run in
/// [`DetectorKind::ALL`] order. A failing detector only affects its own
/// iteration; only [`DetectorState::stop`] ends [`DetectionLoop::run`].
pub struct DetectionLoop<S, D> {
    cfg: LoopConfig,
    library: VariantLibrary,
    engine: MatchEngine,
    fixed: FixedTemplates,
    state: Arc<DetectorState>,
    source: S,
    dispatcher: D,
}

impl<S: FrameSource, D: ClickDispatcher> DetectionLoop<S, D> {
    /// Creates a loop with default config, no templates and all detectors off.
    pub fn new(source: S, dispatcher: D, engine: MatchEngine) -> Self {
        Self {
            cfg: LoopConfig::default(),
            library: VariantLibrary::empty(),
            engine,
            fixed: FixedTemplates::new(),
            state: Arc::new(DetectorState::new()),
            source,
            dispatcher,
        }
    }

    /// Sets the loop configuration.
    pub fn with_config(mut self, cfg: LoopConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Sets the rotated variants used by the rotating detector.
    pub fn with_library(mut self, library: VariantLibrary) -> Self {
        if library.is_empty() {
            status_warn!("no rotated templates loaded; {} detection is a no-op", DetectorKind::Rotating);
        }
        self.library = library;
        self
    }

    /// Sets the fixed templates used by the fixed detectors.
    pub fn with_fixed_templates(mut self, fixed: FixedTemplates) -> Self {
        self.fixed = fixed;
        self
    }

    /// Shares an externally owned detector state (flags and running flag).
    pub fn with_state(mut self, state: Arc<DetectorState>) -> Self {
        self.state = state;
        self
    }

    /// Returns a handle to the detector state for triggers.
    pub fn state(&self) -> Arc<DetectorState> {
        Arc::clone(&self.state)
    }

    /// Returns the loop configuration.
    pub fn config(&self) -> &LoopConfig {
        &self.cfg
    }

    /// Returns the frame source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Returns the click dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Runs until the state is stopped and returns the totals.
    pub fn run(&mut self) -> LoopSummary {
        let mut summary = LoopSummary::default();
        status_info!("detection loop started for window \"{}\"", self.cfg.window_title);

        while self.state.is_running() {
            let report = self.run_iteration();
            summary.record(&report);
            if !self.state.is_running() {
                break;
            }
            thread::sleep(if report.captured {
                self.cfg.poll_interval
            } else {
                self.cfg.capture_backoff
            });
        }

        status_info!(
            "detection loop stopped after {} iterations ({} clicks)",
            summary.iterations,
            summary.clicks
        );
        summary
    }

    /// Captures one frame and runs every enabled detector against it.
    pub fn run_iteration(&mut self) -> IterationReport {
        let mut report = IterationReport::default();
        let title = self.cfg.window_title.as_str();

        let Some(captured) = self.source.capture(title) else {
            let err = RotMatchError::CaptureUnavailable {
                window: title.to_string(),
            };
            status_warn!("{err}");
            return report;
        };
        let frame = match Frame::from_dynamic(&captured.image) {
            Ok(frame) => frame,
            Err(err) => {
                status_warn!("unusable capture of \"{title}\": {err}");
                return report;
            }
        };
        report.captured = true;

        let _span = trace_span!("iteration", width = frame.width(), height = frame.height()).entered();
        for kind in DetectorKind::ALL {
            if !self.state.is_enabled(kind) {
                continue;
            }
            match self.detect(kind, &frame, captured.rect) {
                Ok(Some(click)) => {
                    self.dispatcher.dispatch_click(title, &click);
                    report.clicks.push(click);
                }
                Ok(None) => {}
                Err(err) => {
                    status_warn!("{kind} detection failed: {err}");
                    report.failures.push((kind, err));
                }
            }
        }
        report
    }

    fn detect(
        &self,
        kind: DetectorKind,
        frame: &Frame,
        rect: WindowRect,
    ) -> RotMatchResult<Option<Click>> {
        let threshold = self.cfg.acceptance_threshold;
        let (m, (x, y)) = match kind.template_name() {
            None => {
                let m = self.engine.match_all(frame, &self.library)?;
                (m, (m.x, m.y))
            }
            Some(name) => {
                let Some(template) = self.fixed.get(name) else {
                    return Ok(None);
                };
                let m = template.best_match(frame)?;
                (m, template.center_of(&m))
            }
        };

        if !m.is_accepted(threshold) {
            return Ok(None);
        }
        status_info!(
            "[+] hit {kind}: score {:.2} at ({x}, {y}), angle {}",
            m.score,
            m.angle_deg
        );
        Ok(Some(Click {
            detector: kind,
            x,
            y,
            score: m.score,
            rect,
        }))
    }
}
