//! Hand detection and landmark estimation.
//!
//! [`HandExtractor`] chains two networks: the [`detection::PalmDetector`] finds palms in the whole
//! image, then the [`landmark::LandmarkNetwork`] runs on a region around each palm and locates
//! the 21 hand joints.

pub mod detection;
pub mod landmark;

use std::path::Path;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::landmark::{HandLandmarks, LandmarkExtractor};
use crate::nn::NeuralNetwork;
use crate::timer::Timer;

use self::detection::{hand_region, PalmDetector};
use self::landmark::LandmarkNetwork;

pub use self::landmark::{Handedness, LandmarkIdx};

/// File name of the palm detection network in the asset directory.
pub const PALM_DETECTION_FILE: &str = "palm_detection.onnx";
/// File name of the hand landmark network in the asset directory.
pub const HAND_LANDMARK_FILE: &str = "hand_landmark.onnx";

/// The built-in [`LandmarkExtractor`], backed by the MediaPipe hand networks.
pub struct HandExtractor {
    palm: PalmDetector,
    landmarks: LandmarkNetwork,
    threshold: f32,
    max_hands: usize,
    t_palm: Timer,
    t_landmarks: Timer,
}

impl HandExtractor {
    /// Loads both hand networks from [`Config::asset_dir`].
    ///
    /// A missing or unloadable network is reported as [`Error::Config`].
    pub fn load(config: &Config) -> Result<Self> {
        let dir = config.asset_dir();
        let palm = PalmDetector::new(load_network(&dir.join(PALM_DETECTION_FILE))?)
            .map_err(|e| Error::config(dir.join(PALM_DETECTION_FILE), format!("{e:#}")))?;
        let landmarks = LandmarkNetwork::new(load_network(&dir.join(HAND_LANDMARK_FILE))?)
            .map_err(|e| Error::config(dir.join(HAND_LANDMARK_FILE), format!("{e:#}")))?;
        log::info!(
            "loaded hand networks from '{}' (palm input {})",
            dir.display(),
            palm.input_resolution(),
        );

        Ok(Self {
            palm,
            landmarks,
            threshold: config.min_detection_confidence(),
            max_hands: config.max_hands(),
            t_palm: Timer::new("palm"),
            t_landmarks: Timer::new("landmarks"),
        })
    }
}

fn load_network(path: &Path) -> Result<NeuralNetwork> {
    if !path.is_file() {
        return Err(Error::config(path, "network file not found"));
    }
    NeuralNetwork::from_path(path)
        .and_then(|loader| loader.load())
        .map_err(|e| Error::config(path, format!("{e:#}")))
}

impl LandmarkExtractor for HandExtractor {
    fn detect(&self, image: &Image) -> Result<Vec<HandLandmarks>> {
        let palms = self
            .t_palm
            .time(|| self.palm.detect(image, self.threshold))
            .map_err(Error::Inference)?;
        log::trace!("{} palm candidates", palms.len());

        let (w, h) = (image.width() as f32, image.height() as f32);
        let mut hands = Vec::new();
        for palm in &palms {
            if hands.len() >= self.max_hands {
                break;
            }

            let roi = hand_region(palm);
            let result = self
                .t_landmarks
                .time(|| self.landmarks.estimate(image, roi))
                .map_err(Error::Inference)?;
            if result.presence() < self.threshold {
                log::trace!("dropping hand with presence {:.2}", result.presence());
                continue;
            }

            let [x, y, _] = result.position(LandmarkIdx::Wrist);
            log::trace!(
                "{:?} hand (presence {:.2}) with wrist at {x:.0},{y:.0}",
                result.handedness(),
                result.presence(),
            );

            let mut points = [[0.0; 2]; HandLandmarks::NUM_POINTS];
            for (out, [x, y, _]) in points.iter_mut().zip(result.positions()) {
                *out = [x / w, y / h];
            }
            hands.push(HandLandmarks::new(points));
        }

        Ok(hands)
    }

    fn timers(&self) -> Vec<&Timer> {
        vec![&self.t_palm, &self.t_landmarks]
    }
}
