//! Axis-aligned and rotated rectangles in image space.

use std::fmt;

use nalgebra::{Point2, Rotation2, Vector2};

use crate::image::AspectRatio;

/// An axis-aligned rectangle with floating-point coordinates.
///
/// The origin of the coordinate system is the top-left corner of the image, with Y pointing down.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
}

impl Rect {
    /// Creates a rectangle centered at `(x_center, y_center)`.
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            x: x_center - width * 0.5,
            y: y_center - height * 0.5,
            w: width,
            h: height,
        }
    }

    /// Creates a rectangle from its top-left corner and size.
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self {
            x: top_left_x,
            y: top_left_y,
            w: width,
            h: height,
        }
    }

    /// Computes the smallest rectangle containing all `points`.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let [x, y] = iter.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
        for [x, y] in iter {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Some(Self::from_top_left(min_x, min_y, max_x - min_x, max_y - min_y))
    }

    /// Scales the width and height of `self` by `scale`, keeping the center in place.
    pub fn scale(&self, scale: f32) -> Self {
        let [xc, yc] = self.center();
        Self::from_center(xc, yc, self.w * scale, self.h * scale)
    }

    /// Adds `amount * width` to the left and right, and `amount * height` to the top and bottom.
    pub fn grow_rel(&self, amount: f32) -> Self {
        let [xc, yc] = self.center();
        Self::from_center(
            xc,
            yc,
            self.w * (1.0 + 2.0 * amount),
            self.h * (1.0 + 2.0 * amount),
        )
    }

    /// Enlarges either the width or the height so that `self` matches `target_aspect`.
    ///
    /// The center stays in place.
    pub fn grow_to_fit_aspect(&self, target_aspect: AspectRatio) -> Self {
        let [xc, yc] = self.center();
        let target_width = self.h * target_aspect.as_f32();
        if target_width >= self.w {
            Self::from_center(xc, yc, target_width, self.h)
        } else {
            Self::from_center(xc, yc, self.w, self.w / target_aspect.as_f32())
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.w
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.h
    }

    #[inline]
    pub fn x_center(&self) -> f32 {
        self.x + self.w * 0.5
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.y + self.h * 0.5
    }

    #[inline]
    pub fn center(&self) -> [f32; 2] {
        [self.x_center(), self.y_center()]
    }

    pub fn area(&self) -> f32 {
        self.w * self.h
    }

    /// Computes the overlapping area of `self` and `other`.
    ///
    /// Returns [`None`] if the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x.max(other.x);
        let y_min = self.y.max(other.y);
        let x_max = (self.x + self.w).min(other.x + other.w);
        let y_max = (self.y + self.h).min(other.y + other.h);
        if x_max <= x_min || y_max <= y_min {
            return None;
        }

        Some(Rect::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min))
    }

    /// Computes the intersection-over-union of `self` and `other`.
    pub fn iou(&self, other: &Rect) -> f32 {
        let intersection = self.intersection(other).map_or(0.0, |rect| rect.area());
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }
        intersection / union
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({:.1},{:.1}) size {:.1}x{:.1}",
            self.x, self.y, self.w, self.h
        )
    }
}

/// A [`Rect`] rotated around its center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotatedRect {
    rect: Rect,
    radians: f32,
}

impl RotatedRect {
    /// Creates a new rotated rectangle.
    ///
    /// `radians` is the clockwise rotation (in image space, where Y points down) around the
    /// rectangle's center.
    pub fn new(rect: Rect, radians: f32) -> Self {
        Self { rect, radians }
    }

    /// Computes the smallest rectangle, rotated by `radians`, that contains all `points`.
    ///
    /// Returns [`None`] if `points` is empty.
    pub fn bounding<I: IntoIterator<Item = [f32; 2]>>(radians: f32, points: I) -> Option<Self> {
        // Rotate every point into the rectangle's frame, bound them there, then rotate the center
        // back out.
        let into_frame = Rotation2::new(-radians);
        let bounds = Rect::bounding(points.into_iter().map(|[x, y]| {
            let p = into_frame * Point2::new(x, y);
            [p.x, p.y]
        }))?;

        let [xc, yc] = bounds.center();
        let center = Rotation2::new(radians) * Point2::new(xc, yc);
        Some(Self::new(
            Rect::from_center(center.x, center.y, bounds.width(), bounds.height()),
            radians,
        ))
    }

    #[inline]
    pub fn rotation_radians(&self) -> f32 {
        self.radians
    }

    #[inline]
    pub fn rect(&self) -> &Rect {
        &self.rect
    }

    #[inline]
    pub fn center(&self) -> [f32; 2] {
        self.rect.center()
    }

    /// Applies a closure to the unrotated rectangle, keeping the rotation.
    pub fn map(self, f: impl FnOnce(Rect) -> Rect) -> Self {
        Self {
            rect: f(self.rect),
            radians: self.radians,
        }
    }

    pub fn grow_rel(&self, amount: f32) -> Self {
        self.map(|rect| rect.grow_rel(amount))
    }

    pub fn grow_to_fit_aspect(&self, target_aspect: AspectRatio) -> Self {
        self.map(|rect| rect.grow_to_fit_aspect(target_aspect))
    }

    /// Returns the corners of the rotated rectangle in clockwise order, starting at the top left
    /// corner of the unrotated rectangle.
    pub fn rotated_corners(&self) -> [[f32; 2]; 4] {
        let (w, h) = (self.rect.width(), self.rect.height());
        [[0.0, 0.0], [w, 0.0], [w, h], [0.0, h]].map(|pt| self.transform_out(pt))
    }

    /// Transforms a point from image coordinates into this rectangle's local coordinates.
    ///
    /// Local coordinates have their origin at the top left corner of the rectangle and axes
    /// aligned with its (rotated) edges.
    pub fn transform_in(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let [xc, yc] = self.center();
        let rel = Rotation2::new(-self.radians) * Vector2::new(x - xc, y - yc);
        [
            rel.x + self.rect.width() * 0.5,
            rel.y + self.rect.height() * 0.5,
        ]
    }

    /// Transforms a point from this rectangle's local coordinates into image coordinates.
    ///
    /// This is the inverse of [`RotatedRect::transform_in`].
    pub fn transform_out(&self, [x, y]: [f32; 2]) -> [f32; 2] {
        let [xc, yc] = self.center();
        let rel = Vector2::new(
            x - self.rect.width() * 0.5,
            y - self.rect.height() * 0.5,
        );
        let rel = Rotation2::new(self.radians) * rel;
        [rel.x + xc, rel.y + yc]
    }
}

impl From<Rect> for RotatedRect {
    fn from(rect: Rect) -> Self {
        Self::new(rect, 0.0)
    }
}
