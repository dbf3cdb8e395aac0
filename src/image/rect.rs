//! Axis-aligned rectangles.

use std::fmt;

use nalgebra::Vector2;

/// An axis-aligned rectangle with `f32` coordinates.
///
/// Rectangles are allowed to have zero height and/or width. Negative dimensions are not allowed.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Vector2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: Vector2::new(x_center, y_center),
            size: Vector2::new(width, height),
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Scales the width and height of this [`Rect`] by the given amount.
    ///
    /// The center position of the [`Rect`] remains the same.
    #[must_use]
    pub fn scale(&self, scale: f32) -> Self {
        Self {
            center: self.center,
            size: self.size * scale,
        }
    }

    /// Symmetrically extends one dimension of `self` so that the resulting rectangle has the
    /// given aspect ratio (`width / height`).
    #[must_use]
    pub fn grow_to_fit_aspect(&self, target_aspect: f32) -> Self {
        let mut res = *self;
        let target_width = self.height() * target_aspect;
        if target_width >= self.width() {
            res.size.x = target_width;
        } else {
            res.size.y = self.width() / target_aspect;
        }
        res
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.center.x - self.size.x * 0.5
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.center.y - self.size.y * 0.5
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn x_center(&self) -> f32 {
        self.center.x
    }

    #[inline]
    pub fn y_center(&self) -> f32 {
        self.center.y
    }

    #[inline]
    pub fn center(&self) -> (f32, f32) {
        (self.center.x, self.center.y)
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] if the rectangles do not overlap.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let x_min = self.x().max(other.x());
        let y_min = self.y().max(other.y());
        let x_max = (self.x() + self.width()).min(other.x() + other.width());
        let y_max = (self.y() + self.height()).min(other.y() + other.height());
        if x_min > x_max || y_min > y_max {
            return None;
        }

        Some(Rect::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min))
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    pub fn iou(&self, other: &Self) -> f32 {
        let intersection = self.intersection(other).map_or(0.0, |rect| rect.area());
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x(),
            self.y(),
            self.width(),
            self.height()
        )
    }
}
