//! Non-Maximum Suppression and Averaging.
//!
//! Single-Shot MultiBox Detectors (SSD) produce many duplicate detections for each object.
//! Non-Maximum Suppression (NMS) filters these duplicates out, leaving only a single detection with
//! high confidence for each object.
//!
//! Two variants are implemented, selected with [`SuppressionMode`]: the classic algorithm that
//! removes any overlapping detections with lower confidence ([`SuppressionMode::Remove`]), and
//! Non-Maximum Averaging ([`SuppressionMode::Average`]) which instead computes a weighted average
//! of overlapping detections. The latter reduces jitter between frames and is used by default.

use nalgebra::{Vector2, Vector4};

use crate::{image::Rect, iter::zip_exact, num::TotalF32};

use super::{Detection, Keypoint};

/// A non-maximum suppression algorithm.
#[derive(Debug, Clone)]
pub struct NonMaxSuppression {
    iou_thresh: f32,
    mode: SuppressionMode,
}

impl NonMaxSuppression {
    /// The default intersection-over-union threshold used to determine if two detections overlap.
    pub const DEFAULT_IOU_THRESH: f32 = 0.3;

    /// Creates a new non-maximum suppressor.
    ///
    /// The returned suppression algorithm will use [`SuppressionMode::Average`] and a default IOU
    /// threshold.
    pub fn new() -> Self {
        Self {
            iou_thresh: Self::DEFAULT_IOU_THRESH,
            mode: SuppressionMode::Average,
        }
    }

    /// Sets the intersection-over-union threshold to consider two detections as overlapping.
    ///
    /// By default, [`Self::DEFAULT_IOU_THRESH`] is used.
    pub fn set_iou_thresh(&mut self, iou_thresh: f32) {
        self.iou_thresh = iou_thresh;
    }

    /// Sets the suppression mode.
    pub fn set_mode(&mut self, mode: SuppressionMode) {
        self.mode = mode;
    }

    /// Performs non-maximum suppression on `detections`.
    ///
    /// The filtered detections are returned in order of descending confidence.
    pub fn process(&self, mut detections: Vec<Detection>) -> Vec<Detection> {
        let mut out = Vec::new();

        // ascending, so `pop` yields the most confident remaining detection
        detections.sort_unstable_by_key(|det| TotalF32(det.confidence()));

        while let Some(seed) = detections.pop() {
            let seed_rect = seed.bounding_rect();
            let (overlapping, rest): (Vec<_>, Vec<_>) = detections
                .into_iter()
                .partition(|other| seed_rect.iou(&other.bounding_rect()) >= self.iou_thresh);
            detections = rest;

            match self.mode {
                SuppressionMode::Remove => out.push(seed),
                SuppressionMode::Average => out.push(average(seed, &overlapping)),
            }
        }

        out
    }
}

/// Blends `seed` with the detections overlapping it, weighting each by its confidence.
///
/// The blended detection keeps the confidence of `seed`.
fn average(seed: Detection, overlapping: &[Detection]) -> Detection {
    let mut weight_sum = 0.0;
    let mut rect_sum = Vector4::zeros();
    let mut keypoint_sums = vec![Vector2::zeros(); seed.keypoints().len()];

    for det in std::iter::once(&seed).chain(overlapping) {
        assert_eq!(
            keypoint_sums.len(),
            det.keypoints().len(),
            "detections to average have different keypoint counts"
        );

        let w = det.confidence();
        let r = det.bounding_rect();
        weight_sum += w;
        rect_sum += Vector4::new(r.x_center(), r.y_center(), r.width(), r.height()) * w;
        for (sum, kp) in zip_exact(&mut keypoint_sums, det.keypoints()) {
            *sum += Vector2::new(kp.x, kp.y) * w;
        }
    }

    let rect = rect_sum / weight_sum;
    let keypoints = keypoint_sums
        .into_iter()
        .map(|sum| {
            let kp = sum / weight_sum;
            Keypoint::new(kp.x, kp.y)
        })
        .collect();
    Detection::with_keypoints(
        seed.confidence(),
        Rect::from_center(rect.x, rect.y, rect.z, rect.w),
        keypoints,
    )
}

impl Default for NonMaxSuppression {
    fn default() -> Self {
        Self::new()
    }
}

/// Describes how [`NonMaxSuppression`] should deal with overlapping detections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum SuppressionMode {
    /// Remove overlapping detections, only retain the detection with highest confidence score.
    Remove,

    /// Compute a confidence-weighted average of overlapping detections.
    Average,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nms_suppresses_non_maximum() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Remove);

        let rect = Rect::from_center(0.0, 0.0, 1.0, 1.0);
        let a = Detection::new(0.6, rect);
        let b = Detection::new(0.55, rect.scale(1.5));
        let detections = nms.process(vec![b, a]);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        let rect = d.bounding_rect();
        assert_eq!(d.confidence(), 0.6);
        assert_eq!(rect.center(), (0.0, 0.0));
        assert_eq!(rect.width(), 1.0);
        assert_eq!(rect.height(), 1.0);
    }

    #[test]
    fn nms_ignores_nonoverlapping() {
        let nms = NonMaxSuppression::new();

        let a = Detection::new(0.4, Rect::from_center(0.0, 0.0, 1.0, 1.0));
        let b = Detection::new(0.8, Rect::from_center(5.0, 0.0, 1.0, 1.0));

        let detections = nms.process(vec![a, b]);
        assert_eq!(detections.len(), 2);
        // highest confidence first
        assert_eq!(detections[0].confidence(), 0.8);
        assert_eq!(detections[1].confidence(), 0.4);
    }

    #[test]
    fn nma_averages_detections() {
        let mut nms = NonMaxSuppression::new();
        nms.set_mode(SuppressionMode::Average);
        nms.set_iou_thresh(0.0);

        let rect = Rect::from_center(-1.0, 3.0, 1.0, 1.0);
        let a = Detection::with_keypoints(1.0, rect, vec![Keypoint::new(0.0, 0.0)]);
        let b = Detection::with_keypoints(0.5, rect.scale(4.0), vec![Keypoint::new(3.0, 6.0)]);
        let detections = nms.process(vec![a, b]);
        assert_eq!(detections.len(), 1);

        let d = &detections[0];
        let rect = d.bounding_rect();
        assert_eq!(d.confidence(), 1.0);
        assert_eq!(rect.center(), (-1.0, 3.0));
        assert_eq!(rect.width(), 2.0);
        assert_eq!(rect.height(), 2.0);
        assert_eq!(d.keypoints()[0], Keypoint::new(1.0, 2.0));
    }
}
