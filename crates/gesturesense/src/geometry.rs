//! Pixel-space geometry shared by the gesture classifier and the executors.

use std::fmt;

use nalgebra::Point2;

/// Width and height, in pixels, of a camera frame or a screen.
pub type Dimensions = crate::image::Resolution;

/// Integer pixel coordinates on a frame or screen.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScreenPoint {
    pub x: i32,
    pub y: i32,
}

impl ScreenPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scales normalized `[0, 1]` coordinates to `dims`, truncating towards zero.
    ///
    /// Coordinates outside of `[0, 1]` are not clamped and produce points outside of `dims`.
    pub fn from_normalized(x: f32, y: f32, dims: Dimensions) -> Self {
        Self {
            x: (x * dims.width() as f32) as i32,
            y: (y * dims.height() as f32) as i32,
        }
    }
}

impl fmt::Debug for ScreenPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Euclidean distance between two points, in pixels.
pub fn distance(a: ScreenPoint, b: ScreenPoint) -> f32 {
    let a = Point2::new(a.x as f32, a.y as f32);
    let b = Point2::new(b.x as f32, b.y as f32);
    nalgebra::distance(&a, &b)
}
