//! Interfaces to the platform collaborators: capture and input.

use crate::detect::DetectorKind;

/// Screen-space bounding rectangle of the monitored window.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl WindowRect {
    /// Creates a rectangle from its edges.
    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Returns the width in pixels.
    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    /// Returns the height in pixels.
    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }

    /// Converts window-relative coordinates to absolute screen coordinates.
    pub fn to_screen(&self, x: usize, y: usize) -> (i32, i32) {
        (
            self.left.saturating_add(i32::try_from(x).unwrap_or(i32::MAX)),
            self.top.saturating_add(i32::try_from(y).unwrap_or(i32::MAX)),
        )
    }
}

/// One captured bitmap of the monitored window.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    /// Window contents in any color layout; converted to grayscale by the loop.
    pub image: image::DynamicImage,
    /// Window rectangle at capture time.
    pub rect: WindowRect,
}

/// Supplies frames of a window identified by its exact title.
pub trait FrameSource {
    /// Returns the current frame, or `None` when the window does not exist.
    fn capture(&mut self, window_title: &str) -> Option<CapturedFrame>;
}

/// Click requested by an accepted detection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Click {
    /// Detector that produced the hit.
    pub detector: DetectorKind,
    /// Window-client-relative x coordinate.
    pub x: usize,
    /// Window-client-relative y coordinate.
    pub y: usize,
    /// Score of the accepted match.
    pub score: f32,
    /// Window rectangle of the frame the match came from.
    pub rect: WindowRect,
}

impl Click {
    /// Absolute screen position for dispatchers that move the cursor.
    pub fn screen_position(&self) -> (i32, i32) {
        self.rect.to_screen(self.x, self.y)
    }
}

/// Delivers a left-button press and release to a window.
///
/// Fire-and-forget: delivery is best-effort and failures are the
/// dispatcher's to report.
pub trait ClickDispatcher {
    fn dispatch_click(&mut self, window_title: &str, click: &Click);
}

impl<F> FrameSource for F
where
    F: FnMut(&str) -> Option<CapturedFrame>,
{
    fn capture(&mut self, window_title: &str) -> Option<CapturedFrame> {
        self(window_title)
    }
}

impl ClickDispatcher for Vec<Click> {
    fn dispatch_click(&mut self, _window_title: &str, click: &Click) {
        self.push(*click);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_position_offsets_by_window_origin() {
        let click = Click {
            detector: DetectorKind::FixedGem,
            x: 12,
            y: 40,
            score: 0.95,
            rect: WindowRect::new(100, 50, 740, 530),
        };
        assert_eq!(click.screen_position(), (112, 90));
        assert_eq!((click.rect.width(), click.rect.height()), (640, 480));
    }

    #[test]
    fn huge_offsets_saturate_instead_of_wrapping() {
        let rect = WindowRect::new(-200, 10, 600, 400);
        let huge = i32::MAX as usize + 5;
        assert_eq!(rect.to_screen(huge, 3), (i32::MAX - 200, 13));
        assert_eq!(rect.to_screen(usize::MAX, usize::MAX), (i32::MAX - 200, i32::MAX));
    }
}
