//! Error types for rotmatch.

use thiserror::Error;

/// Result alias for rotmatch operations.
pub type RotMatchResult<T> = std::result::Result<T, RotMatchError>;

/// Errors that can occur while building libraries, matching, or polling.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RotMatchError {
    /// The input data or parameters are invalid.
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    /// Width or height is zero or overflows.
    #[error("invalid dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },
    /// Row stride is smaller than the row width.
    #[error("invalid stride {stride} for width {width}")]
    InvalidStride { width: usize, stride: usize },
    /// Backing buffer is shorter than the view requires.
    #[error("buffer too small: needed {needed}, got {got}")]
    BufferTooSmall { needed: usize, got: usize },
    /// Angular step cannot produce a valid rotation grid.
    #[error("invalid angle step {step_deg} (expected 1..=360)")]
    InvalidAngleStep { step_deg: u32 },
    /// Template statistics make correlation undefined.
    #[error("degenerate template: {reason}")]
    DegenerateTemplate { reason: &'static str },
    /// The template cannot be placed anywhere in the frame.
    #[error("template {tpl_width}x{tpl_height} larger than frame {img_width}x{img_height}")]
    TemplateLargerThanFrame {
        tpl_width: usize,
        tpl_height: usize,
        img_width: usize,
        img_height: usize,
    },
    /// The monitored window could not be captured.
    #[error("window not found: {window}")]
    CaptureUnavailable { window: String },
    /// A reference image failed to decode or has unusable dimensions.
    #[error("invalid reference {source_name}: {reason}")]
    InvalidReference { source_name: String, reason: String },
    /// Rotation-invariant matching was requested with an empty library.
    #[error("no rotated templates available (run precompute first)")]
    NoTemplates,
    /// A persisted variant library exists but cannot be read back.
    #[error("corrupt variant store {path}: {reason}")]
    Serialization { path: String, reason: String },
    /// Filesystem failure while persisting a library.
    #[error("i/o error on {path}: {reason}")]
    Io { path: String, reason: String },
    /// The matching worker pool could not be created.
    #[error("worker pool: {reason}")]
    WorkerPool { reason: String },
}
