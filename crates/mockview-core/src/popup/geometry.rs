use serde::{Deserialize, Serialize};

/// Screen dimensions reported by the popup host, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenSize {
    pub width: f64,
    pub height: f64,
}

impl ScreenSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Requested popup size and position.
///
/// Offsets are not clamped: a popup larger than the screen gets negative
/// `left`/`top` values and the host decides what to do with them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupGeometry {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

impl PopupGeometry {
    /// Center a `width` x `height` window on `screen`.
    pub fn centered(screen: ScreenSize, width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            left: (screen.width - width) / 2.0,
            top: (screen.height - height) / 2.0,
        }
    }

    /// Offsets rounded to whole pixels, for hosts that only take integers.
    pub fn rounded_position(&self) -> (i64, i64) {
        (self.left.round() as i64, self.top.round() as i64)
    }
}
