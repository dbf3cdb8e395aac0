//! Object detection building blocks.
//!
//! The palm detector in [`crate::hand`] is a Single-Shot MultiBox Detector (SSD). Decoding its
//! raw output needs the anchor grid from [`ssd`], and the many overlapping candidates it produces
//! per hand are merged by [`nms`].

pub mod nms;
pub mod ssd;

use crate::image::Rect;

/// A detected object.
///
/// A [`Detection`] consists of a [`Rect`] enclosing the detected object, a confidence value, and
/// a possibly empty set of located keypoints.
///
/// The confidence value lies between 0.0 and 1.0, which is achieved by passing the raw network
/// output through [`crate::num::sigmoid`]. It is used as the weight when averaging overlapping
/// detections with [`nms::SuppressionMode::Average`].
#[derive(Debug, Clone)]
pub struct Detection {
    confidence: f32,
    rect: Rect,
    keypoints: Vec<Keypoint>,
}

impl Detection {
    pub fn new(confidence: f32, rect: Rect) -> Self {
        Self {
            confidence,
            rect,
            keypoints: Vec::new(),
        }
    }

    pub fn with_keypoints(confidence: f32, rect: Rect, keypoints: Vec<Keypoint>) -> Self {
        Self {
            confidence,
            rect,
            keypoints,
        }
    }

    pub fn confidence(&self) -> f32 {
        self.confidence
    }

    /// Returns the axis-aligned bounding rectangle containing the detected object.
    pub fn bounding_rect(&self) -> Rect {
        self.rect
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Applies `f` to the bounding rectangle's center and to every keypoint, scaling the
    /// rectangle's size by `scale`.
    ///
    /// Used to map a detection from a network's input coordinates back into the image.
    pub fn map_coords(&mut self, scale: f32, mut f: impl FnMut(f32, f32) -> (f32, f32)) {
        let (xc, yc) = f(self.rect.x_center(), self.rect.y_center());
        self.rect = Rect::from_center(
            xc,
            yc,
            self.rect.width() * scale,
            self.rect.height() * scale,
        );
        for kp in &mut self.keypoints {
            (kp.x, kp.y) = f(kp.x, kp.y);
        }
    }
}

/// A 2D keypoint produced as part of a [`Detection`].
///
/// The meaning of a keypoint depends on its index in the keypoint list. The palm detector uses
/// them to place the region the landmark network looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    x: f32,
    y: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_coords_moves_rect_and_keypoints() {
        let mut det = Detection::with_keypoints(
            0.9,
            Rect::from_center(10.0, 20.0, 4.0, 2.0),
            vec![Keypoint::new(1.0, 2.0)],
        );
        det.map_coords(2.0, |x, y| (x * 2.0 - 5.0, y * 2.0));

        let rect = det.bounding_rect();
        assert_eq!(rect.center(), (15.0, 40.0));
        assert_eq!(rect.width(), 8.0);
        assert_eq!(rect.height(), 4.0);
        assert_eq!(det.keypoints()[0], Keypoint::new(-3.0, 4.0));
    }
}
