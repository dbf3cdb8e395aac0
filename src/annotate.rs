//! Drawing the classification result onto frames.

use std::fmt;

use embedded_graphics::mono_font::{iso_8859_1, MonoFont};

use crate::image::{draw, Color, Frame, Resolution};
use crate::landmark::HandLandmarks;

/// Offset subtracted from both corners of a [`BoundingBox`] by default.
pub const DEFAULT_BIAS: i32 = 10;

/// A pixel-space box around all detected hands.
///
/// The box is computed from the extreme landmark positions, and then moved up and to the left by
/// a fixed bias. The bias is subtracted from *both* corners, so the box is shifted rather than
/// enlarged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Computes the box around `hands` in a frame of size `res`, using [`DEFAULT_BIAS`].
    ///
    /// Returns [`None`] if `hands` is empty.
    pub fn from_landmarks(hands: &[HandLandmarks], res: Resolution) -> Option<Self> {
        Self::from_landmarks_with_bias(hands, res, DEFAULT_BIAS)
    }

    /// Computes the box around `hands` in a frame of size `res`, shifted by `bias` pixels.
    pub fn from_landmarks_with_bias(
        hands: &[HandLandmarks],
        res: Resolution,
        bias: i32,
    ) -> Option<Self> {
        let mut points = hands.iter().flat_map(|hand| hand.points().iter());
        let &[x, y] = points.next()?;
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (x, y, x, y);
        for &[x, y] in points {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        // Scaled in f64 so that products just below an integer are not rounded up to it before
        // `as` truncates towards zero.
        let (w, h) = (f64::from(res.width()), f64::from(res.height()));
        let scale = |coord: f32, size: f64| (f64::from(coord) * size) as i32 - bias;
        Some(Self {
            x1: scale(min_x, w),
            y1: scale(min_y, h),
            x2: scale(max_x, w),
            y2: scale(max_y, h),
        })
    }
}

/// Colors, sizes, and font used by [`annotate`].
#[derive(Clone, Copy)]
pub struct AnnotationStyle {
    pub box_color: Color,
    pub stroke_width: u32,
    pub text_color: Color,
    /// Distance between the label's baseline and the top of the box.
    pub text_offset: i32,
    pub font: &'static MonoFont<'static>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            box_color: Color::BLUE,
            stroke_width: 4,
            text_color: Color::WHITE,
            text_offset: 10,
            font: &iso_8859_1::FONT_10X20,
        }
    }
}

impl fmt::Debug for AnnotationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnnotationStyle")
            .field("box_color", &self.box_color)
            .field("stroke_width", &self.stroke_width)
            .field("text_color", &self.text_color)
            .field("text_offset", &self.text_offset)
            .finish_non_exhaustive()
    }
}

/// Draws `bbox` and `label` onto `frame`.
///
/// The label is drawn left-aligned above the box's top left corner. Anything outside of the frame
/// is clipped.
pub fn annotate(frame: &mut Frame, bbox: &BoundingBox, label: &str, style: &AnnotationStyle) {
    draw::rect(frame, bbox.x1, bbox.y1, bbox.x2, bbox.y2)
        .color(style.box_color)
        .stroke_width(style.stroke_width);
    draw::text(frame, bbox.x1, bbox.y1 - style.text_offset, label)
        .color(style.text_color)
        .font(style.font)
        .align_left()
        .align_bottom();
}
