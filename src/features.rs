//! Feature vectors for gesture classification.

use std::ops::Deref;

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::landmark::HandLandmarks;

/// Default length of a [`FeatureVector`]: 2 hands, 21 landmarks each, 2 coordinates per landmark.
pub const DEFAULT_FEATURE_DIM: usize = 2 * HandLandmarks::NUM_POINTS * 2;

/// A fixed-length classifier input, zero-padded on the right.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.0
    }
}

impl Deref for FeatureVector {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

/// Turns the landmarks of all detected hands into a translation-invariant feature vector.
///
/// Hands are processed in detection order. Every hand's x and y coordinates are appended to
/// running lists of all coordinates seen in this call, and the hand is then expressed relative to
/// the minimum of those lists. The minimum therefore includes earlier hands: the second hand of a
/// frame is offset by the minimum over both hands. The values are interleaved as
/// `x0, y0, x1, y1, ...` and right-padded with `0.0` up to `target_dim`.
///
/// Fails with [`Error::DimensionMismatch`] if the hands produce more than `target_dim` values.
pub fn normalize(hands: &[HandLandmarks], target_dim: usize) -> Result<FeatureVector> {
    let mut xs = Vec::with_capacity(hands.len() * HandLandmarks::NUM_POINTS);
    let mut ys = Vec::with_capacity(hands.len() * HandLandmarks::NUM_POINTS);
    let mut data = Vec::with_capacity(target_dim);

    for hand in hands {
        xs.extend(hand.points().iter().map(|[x, _]| *x));
        ys.extend(hand.points().iter().map(|[_, y]| *y));

        let min_x = xs.iter().copied().fold(f32::INFINITY, f32::min);
        let min_y = ys.iter().copied().fold(f32::INFINITY, f32::min);
        data.extend(
            hand.points()
                .iter()
                .flat_map(|[x, y]| [x - min_x, y - min_y]),
        );
    }

    if data.len() > target_dim {
        return Err(Error::DimensionMismatch {
            expected: target_dim,
            actual: data.len(),
        });
    }
    data.resize(target_dim, 0.0);
    log::trace!(
        "features: [{:.3}]",
        data.iter().take(2 * HandLandmarks::NUM_POINTS).format(", ")
    );

    Ok(FeatureVector(data))
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn hand(f: impl Fn(usize) -> [f32; 2]) -> HandLandmarks {
        HandLandmarks::new(std::array::from_fn(f))
    }

    #[test]
    fn single_hand_is_padded() {
        let h = hand(|i| [0.1 + i as f32 * 0.01, 0.5]);
        let v = normalize(&[h], DEFAULT_FEATURE_DIM).unwrap();

        assert_eq!(v.len(), 84);
        assert_relative_eq!(v[0], 0.0);
        assert_relative_eq!(v[1], 0.0);
        assert_relative_eq!(v[2], 0.01, epsilon = 1e-6);
        assert_relative_eq!(v[40], 0.2, epsilon = 1e-6);
        assert!(v[42..].iter().all(|&f| f == 0.0));
        // every value is non-negative after the shift
        assert!(v.iter().all(|&f| f >= 0.0));
    }

    #[test]
    fn translation_invariant() {
        let base = hand(|i| [0.2 + (i % 5) as f32 * 0.03, 0.3 + (i / 5) as f32 * 0.04]);
        let reference = normalize(&[base.clone()], DEFAULT_FEATURE_DIM).unwrap();

        let mut rng = fastrand::Rng::with_seed(7);
        for _ in 0..20 {
            let (dx, dy) = (rng.f32() * 0.5 - 0.25, rng.f32() * 0.5 - 0.25);
            let moved = hand(|i| {
                let [x, y] = base.get(i);
                [x + dx, y + dy]
            });
            let v = normalize(&[moved], DEFAULT_FEATURE_DIM).unwrap();
            for (a, b) in v.iter().zip(reference.iter()) {
                assert_relative_eq!(*a, *b, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn second_hand_uses_cumulative_minimum() {
        // hand A spans x in [0.5, 0.7], hand B spans x in [0.1, 0.3]
        let a = hand(|i| [0.5 + i as f32 * 0.01, 0.2]);
        let b = hand(|i| [0.1 + i as f32 * 0.01, 0.4]);
        let v = normalize(&[a.clone(), b.clone()], DEFAULT_FEATURE_DIM).unwrap();

        // A is relative to its own minimum
        assert_relative_eq!(v[0], 0.0);
        assert_relative_eq!(v[1], 0.0);
        // B is relative to the minimum over A and B, which is B's own x but A's y
        assert_relative_eq!(v[42], 0.0);
        assert_relative_eq!(v[43], 0.2, epsilon = 1e-6);

        // with the order swapped, A's x is offset by B's minimum
        let v = normalize(&[b, a], DEFAULT_FEATURE_DIM).unwrap();
        assert_relative_eq!(v[42], 0.4, epsilon = 1e-6);
        assert_relative_eq!(v[43], 0.0);
    }

    #[test]
    fn no_hands_is_all_zeros() {
        let v = normalize(&[], DEFAULT_FEATURE_DIM).unwrap();
        assert_eq!(v.into_vec(), vec![0.0; 84]);
    }

    #[test]
    fn oversized_input_is_rejected() {
        let h = hand(|_| [0.5, 0.5]);
        match normalize(&[h.clone(), h.clone(), h], DEFAULT_FEATURE_DIM) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 84);
                assert_eq!(actual, 126);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
