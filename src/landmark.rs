//! Hand landmarks and the extractor interface.

use std::fmt;

use crate::error::{Error, Result};
use crate::image::Image;
use crate::timer::Timer;

/// One normalized (x, y) position of a hand joint, in `[0, 1]` image coordinates.
pub type Point = [f32; 2];

/// The 21 joint positions of one detected hand.
///
/// Positions are normalized by the image width and height, so `(0, 0)` is the top left corner of
/// the image and `(1, 1)` the bottom right. Values slightly outside of that range can occur when a
/// hand extends past the image border.
#[derive(Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Point; Self::NUM_POINTS],
}

impl HandLandmarks {
    /// Number of landmarks per hand.
    pub const NUM_POINTS: usize = 21;

    pub fn new(points: [Point; Self::NUM_POINTS]) -> Self {
        Self { points }
    }

    /// Creates a landmark set from a slice of points.
    ///
    /// Fails with [`Error::DimensionMismatch`] unless `points` has exactly
    /// [`HandLandmarks::NUM_POINTS`] entries.
    pub fn from_points(points: &[Point]) -> Result<Self> {
        let points = points
            .try_into()
            .map_err(|_| Error::DimensionMismatch {
                expected: Self::NUM_POINTS,
                actual: points.len(),
            })?;
        Ok(Self { points })
    }

    /// Returns the landmark positions, ordered as described by [`crate::hand::LandmarkIdx`].
    #[inline]
    pub fn points(&self) -> &[Point; Self::NUM_POINTS] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Point {
        self.points[index]
    }
}

impl fmt::Debug for HandLandmarks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [x, y] = self.points[0];
        write!(f, "HandLandmarks(wrist @ {x:.3},{y:.3})")
    }
}

/// Finds hands in an image.
///
/// Implementors are shared between frame-processing threads, so `detect` takes `&self`.
pub trait LandmarkExtractor: Send + Sync {
    /// Detects up to a configured number of hands in `image`.
    ///
    /// Returns the hands in detection order, or an empty `Vec` if no hand is visible.
    fn detect(&self, image: &Image) -> Result<Vec<HandLandmarks>>;

    /// Returns profiling timers for the extractor's internal stages.
    fn timers(&self) -> Vec<&Timer> {
        Vec::new()
    }
}

impl<T: LandmarkExtractor + ?Sized> LandmarkExtractor for Box<T> {
    fn detect(&self, image: &Image) -> Result<Vec<HandLandmarks>> {
        (**self).detect(image)
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

impl<T: LandmarkExtractor + ?Sized> LandmarkExtractor for std::sync::Arc<T> {
    fn detect(&self, image: &Image) -> Result<Vec<HandLandmarks>> {
        (**self).detect(image)
    }

    fn timers(&self) -> Vec<&Timer> {
        (**self).timers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_points_checks_count() {
        let points = vec![[0.5, 0.25]; 21];
        let hand = HandLandmarks::from_points(&points).unwrap();
        assert_eq!(hand.get(20), [0.5, 0.25]);

        match HandLandmarks::from_points(&points[..20]) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (21, 20));
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
