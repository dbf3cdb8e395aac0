//! Sign language gesture classification from camera frames.
//!
//! Every frame passes through the same four steps:
//!
//! 1. A [`LandmarkExtractor`] finds hands and their 21 joint positions.
//! 2. [`features::normalize`] turns the joints into a translation-invariant feature vector.
//! 3. A [`Classifier`] from the [`ModelRegistry`] predicts a class index, which the
//!    [`LabelTable`] maps to a gesture name.
//! 4. [`annotate::annotate`] draws a bounding box and the gesture name onto the frame.
//!
//! [`Pipeline`] wires these together. It keeps no state between frames.
//!
//! # Environment Variables
//!
//! * `HANDSIGN_ASSET_DIR`: Directory containing `labels.txt`, the model artifacts, and the hand
//!   detection networks. Defaults to `assets`.
//! * `HANDSIGN_MIN_DETECTION_CONFIDENCE`: Minimum palm detection and hand presence confidence.
//!   Defaults to `0.3`.
//! * `RUST_LOG`: Overrides the log filter, see [`env_logger`].
//!
//! [`LandmarkExtractor`]: landmark::LandmarkExtractor
//! [`Classifier`]: classifier::Classifier
//! [`ModelRegistry`]: classifier::ModelRegistry
//! [`LabelTable`]: labels::LabelTable
//! [`Pipeline`]: pipeline::Pipeline

use log::LevelFilter;

pub mod annotate;
pub mod classifier;
pub mod config;
pub mod detection;
pub mod error;
pub mod features;
pub mod hand;
pub mod image;
pub mod iter;
pub mod labels;
pub mod landmark;
pub mod nn;
pub mod num;
pub mod pipeline;
pub mod source;
pub mod timer;

pub use error::{Error, Result};

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = if cfg!(debug_assertions) {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_CRATE_NAME")), log_level)
        .filter(Some("tract_onnx"), LevelFilter::Warn)
        .filter(Some("tract_core"), LevelFilter::Warn)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// If `cfg!(debug_assertions)` is enabled, the calling crate and `handsign` will log at *trace*
/// level. Otherwise, they will log at *debug* level.
///
/// `tract` will always log at *warn* level. `RUST_LOG` overrides all of these.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
