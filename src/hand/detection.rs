//! Palm detection.

use nalgebra::Vector2;

use crate::detection::{
    nms::NonMaxSuppression,
    ssd::{Anchor, Anchors, LayerInfo},
    Detection, Keypoint,
};
use crate::image::{Image, Rect, Resolution};
use crate::nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs};
use crate::num::sigmoid;

/// A keypoint of a palm [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PalmKeypoint {
    Wrist = 0,
    IndexFingerMcp = 1,
    MiddleFingerMcp = 2,
    RingFingerMcp = 3,
    PinkyMcp = 4,
    ThumbCmc = 5,
    ThumbMcp = 6,
}

const LAYERS: &[LayerInfo] = &[LayerInfo::new(2, 24, 24), LayerInfo::new(6, 12, 12)];

/// Number of values the network regresses per anchor: a box and 7 keypoints.
const BOX_PARAMS: usize = 4 + 7 * 2;

/// Factor by which a palm box is enlarged to cover the whole hand.
const ROI_SCALE: f32 = 2.6;

/// Fraction of the palm size by which the hand region is moved from the wrist towards the fingers.
const ROI_SHIFT: f32 = 0.5;

/// The SSD palm detection network.
///
/// Finds palms in the whole image. The network is much cheaper than running the landmark network
/// on every possible region, and its keypoints tell us where to look for the rest of the hand.
pub struct PalmDetector {
    cnn: Cnn,
    anchors: Anchors,
    nms: NonMaxSuppression,
}

impl PalmDetector {
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self {
            cnn,
            anchors: Anchors::calculate(LAYERS),
            nms: NonMaxSuppression::new(),
        })
    }

    pub fn input_resolution(&self) -> Resolution {
        self.cnn.input_resolution()
    }

    /// Detects palms whose confidence is at least `threshold`.
    ///
    /// Returned detections are in image coordinates, ordered by descending confidence.
    pub fn detect(&self, image: &Image, threshold: f32) -> anyhow::Result<Vec<Detection>> {
        let input_res = self.input_resolution();

        // If the input image's aspect ratio doesn't match the CNN's input, use an oversized
        // region that does. The parts outside of the image are sampled as black bars.
        let aspect = input_res
            .aspect_ratio()
            .ok_or_else(|| anyhow::anyhow!("palm detection network has empty input"))?;
        let rect = image.rect().grow_to_fit_aspect(aspect);
        let outputs = self.cnn.estimate(image, rect)?;
        log::trace!("palm detection result: {:?}", outputs);

        let candidates = extract_outputs(&self.anchors, input_res, &outputs, threshold)?;
        let mut detections = self.nms.process(candidates);

        // Map all coordinates from the network's input coordinate system back into the image.
        let scale = rect.width() / input_res.width() as f32;
        for det in &mut detections {
            det.map_coords(scale, |x, y| (x * scale + rect.x(), y * scale + rect.y()));
        }

        Ok(detections)
    }
}

/// Computes the square region the hand landmark network should look at for a palm detection.
///
/// The palm box is enlarged to cover the fingers and moved from the wrist towards the middle
/// finger. The region is not rotated, so tilted hands get a little more margin than upright ones.
pub fn hand_region(palm: &Detection) -> Rect {
    let rect = palm.bounding_rect();
    let size = rect.width().max(rect.height());

    let kp = |k: PalmKeypoint| {
        let kp = palm.keypoints()[k as usize];
        Vector2::new(kp.x(), kp.y())
    };
    let dir = if palm.keypoints().len() > PalmKeypoint::MiddleFingerMcp as usize {
        (kp(PalmKeypoint::MiddleFingerMcp) - kp(PalmKeypoint::Wrist))
            .try_normalize(f32::EPSILON)
            .unwrap_or_else(|| -Vector2::y())
    } else {
        -Vector2::y()
    };

    let shift = dir * size * ROI_SHIFT;
    let (xc, yc) = rect.center();
    Rect::from_center(xc + shift.x, yc + shift.y, size, size).scale(ROI_SCALE)
}

fn extract_outputs(
    anchors: &Anchors,
    input_res: Resolution,
    outputs: &Outputs,
    thresh: f32,
) -> anyhow::Result<Vec<Detection>> {
    let num_anchors = anchors.anchor_count();
    if outputs.len() < 2 {
        anyhow::bail!("palm detection network has {} outputs, expected 2", outputs.len());
    }
    let boxes = &outputs[0];
    let confidences = &outputs[1];

    if boxes.shape() != [1, num_anchors, BOX_PARAMS] || confidences.shape() != [1, num_anchors, 1]
    {
        anyhow::bail!(
            "unexpected palm detection output shapes {:?} and {:?}",
            boxes.shape(),
            confidences.shape(),
        );
    }

    let mut detections = Vec::new();
    for (index, &raw) in confidences.index(&[0]).iter().enumerate() {
        let conf = sigmoid(raw);
        if conf < thresh {
            continue;
        }

        let box_params = boxes.index(&[0, index]);
        detections.push(extract_detection(
            &anchors[index],
            input_res,
            box_params,
            conf,
        ));
    }

    Ok(detections)
}

fn extract_detection(
    anchor: &Anchor,
    input_res: Resolution,
    box_params: &[f32],
    confidence: f32,
) -> Detection {
    assert_eq!(box_params.len(), BOX_PARAMS);

    let input_w = input_res.width() as f32;
    let input_h = input_res.height() as f32;

    let xc = box_params[0] + anchor.x_center() * input_w;
    let yc = box_params[1] + anchor.y_center() * input_h;
    let w = box_params[2];
    let h = box_params[3];
    let keypoints = box_params[4..]
        .chunks_exact(2)
        .map(|kp| {
            Keypoint::new(
                kp[0] + anchor.x_center() * input_w,
                kp[1] + anchor.y_center() * input_h,
            )
        })
        .collect();

    Detection::with_keypoints(confidence, Rect::from_center(xc, yc, w, h), keypoints)
}
