//! Hand landmark prediction.

use crate::image::{Image, Rect};
use crate::iter::zip_exact;
use crate::nn::{Cnn, CnnInputShape, ColorMapper, NeuralNetwork, Outputs};

/// Names for the hand pose landmarks.
///
/// # Terminology
///
/// - **CMC**: [Carpometacarpal joint], the lowest joint of the thumb, located near the wrist.
/// - **MCP**: [Metacarpophalangeal joint], the lower joint forming the knuckles near the palm of
///   the hand.
/// - **PIP**: Proximal Interphalangeal joint, the joint between the MCP and DIP.
/// - **DIP**: Distal Interphalangeal joint, the highest joint of a finger.
/// - **Tip**: This landmark is just placed on the tip of the finger, above the DIP.
///
/// [Carpometacarpal joint]: https://en.wikipedia.org/wiki/Carpometacarpal_joint
/// [Metacarpophalangeal joint]: https://en.wikipedia.org/wiki/Metacarpophalangeal_joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexFingerMcp,
    IndexFingerPip,
    IndexFingerDip,
    IndexFingerTip,
    MiddleFingerMcp,
    MiddleFingerPip,
    MiddleFingerDip,
    MiddleFingerTip,
    RingFingerMcp,
    RingFingerPip,
    RingFingerDip,
    RingFingerTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handedness {
    Left,
    Right,
}

/// Landmarks estimated for one hand region.
#[derive(Debug, Clone)]
pub struct LandmarkResult {
    /// (x, y, z) in image pixels. `z` is relative depth and is not used for classification.
    positions: [[f32; 3]; 21],
    presence: f32,
    raw_handedness: f32,
}

impl LandmarkResult {
    /// Returns the 3D landmark positions in the input image's coordinate system.
    pub fn positions(&self) -> &[[f32; 3]; 21] {
        &self.positions
    }

    pub fn position(&self, idx: LandmarkIdx) -> [f32; 3] {
        self.positions[idx as usize]
    }

    /// Returns the confidence that the region actually contains a hand.
    pub fn presence(&self) -> f32 {
        self.presence
    }

    /// Returns the estimated handedness of the hand in the image.
    ///
    /// This assumes that the camera image is passed in as-is, and the returned value should only be
    /// relied on when the `presence` is over some threshold.
    pub fn handedness(&self) -> Handedness {
        if self.raw_handedness > 0.5 {
            Handedness::Right
        } else {
            Handedness::Left
        }
    }
}

/// The hand landmark network.
///
/// Runs on a square region around a detected palm and locates the 21 joints of the hand.
pub struct LandmarkNetwork {
    cnn: Cnn,
}

impl LandmarkNetwork {
    pub fn new(nn: NeuralNetwork) -> anyhow::Result<Self> {
        let cnn = Cnn::new(nn, CnnInputShape::NCHW, ColorMapper::linear(0.0..=1.0))?;
        Ok(Self { cnn })
    }

    /// Estimates hand landmarks in region `roi` of `image`.
    pub fn estimate(&self, image: &Image, roi: Rect) -> anyhow::Result<LandmarkResult> {
        let outputs = self.cnn.estimate(image, roi)?;
        let res = self.cnn.input_resolution();
        extract(&outputs, roi, (res.width() as f32, res.height() as f32))
    }
}

/// Decodes the network outputs and maps the landmarks from network input pixels into `roi`.
fn extract(
    outputs: &Outputs,
    roi: Rect,
    (input_w, input_h): (f32, f32),
) -> anyhow::Result<LandmarkResult> {
    if outputs.len() < 3 {
        anyhow::bail!(
            "hand landmark network has {} outputs, expected at least 3",
            outputs.len()
        );
    }
    let screen_landmarks = &outputs[0];
    let presence_flag = &outputs[1];
    let handedness = &outputs[2];

    if screen_landmarks.shape() != [1, 63]
        || presence_flag.shape() != [1, 1]
        || handedness.shape() != [1, 1]
    {
        anyhow::bail!(
            "unexpected hand landmark output shapes {:?}, {:?}, {:?}",
            screen_landmarks.shape(),
            presence_flag.shape(),
            handedness.shape(),
        );
    }

    let mut positions = [[0.0; 3]; 21];
    let (sx, sy) = (roi.width() / input_w, roi.height() / input_h);
    for (raw, out) in zip_exact(
        screen_landmarks.index(&[0]).chunks_exact(3),
        &mut positions,
    ) {
        *out = [roi.x() + raw[0] * sx, roi.y() + raw[1] * sy, raw[2] * sx];
    }

    Ok(LandmarkResult {
        positions,
        presence: presence_flag.as_slice()[0],
        raw_handedness: handedness.as_slice()[0],
    })
}
