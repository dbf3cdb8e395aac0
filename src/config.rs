//! Runtime configuration.

use std::{
    env,
    path::{Path, PathBuf},
};

use crate::annotate::{AnnotationStyle, DEFAULT_BIAS};
use crate::error::{Error, Result};
use crate::features::DEFAULT_FEATURE_DIM;

/// Environment variable overriding [`Config::asset_dir`].
pub const ASSET_DIR_VAR: &str = "HANDSIGN_ASSET_DIR";
/// Environment variable overriding [`Config::min_detection_confidence`].
pub const MIN_DETECTION_CONFIDENCE_VAR: &str = "HANDSIGN_MIN_DETECTION_CONFIDENCE";

/// Paths and constants shared by all pipeline stages.
///
/// Use [`Config::default`] or [`Config::from_env`] and adjust with the builder-style setters:
///
/// ```
/// # use handsign::config::Config;
/// let config = Config::default()
///     .with_asset_dir("models")
///     .with_max_hands(1);
/// assert_eq!(config.labels_path(), std::path::Path::new("models/labels.txt"));
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    asset_dir: PathBuf,
    labels_file: PathBuf,
    min_detection_confidence: f32,
    max_hands: usize,
    feature_dim: usize,
    bbox_bias: i32,
    style: AnnotationStyle,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            labels_file: PathBuf::from("labels.txt"),
            min_detection_confidence: 0.3,
            max_hands: 2,
            feature_dim: DEFAULT_FEATURE_DIM,
            bbox_bias: DEFAULT_BIAS,
            style: AnnotationStyle::default(),
        }
    }
}

impl Config {
    /// Creates the default configuration and applies overrides from the environment.
    ///
    /// Fails with [`Error::Config`] if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self> {
        Self::default().apply_env(|name| env::var(name).ok())
    }

    fn apply_env(mut self, var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(dir) = var(ASSET_DIR_VAR) {
            self.asset_dir = dir.into();
        }
        if let Some(value) = var(MIN_DETECTION_CONFIDENCE_VAR) {
            let conf = value
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|c| (0.0..=1.0).contains(c))
                .ok_or_else(|| {
                    Error::config(
                        format!("${MIN_DETECTION_CONFIDENCE_VAR}"),
                        format!("expected a number between 0 and 1, got {value:?}"),
                    )
                })?;
            self.min_detection_confidence = conf;
        }
        Ok(self)
    }

    pub fn with_asset_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.asset_dir = dir.into();
        self
    }

    /// Sets the label file name. Relative paths are resolved against the asset directory.
    pub fn with_labels_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.labels_file = file.into();
        self
    }

    pub fn with_min_detection_confidence(mut self, conf: f32) -> Self {
        self.min_detection_confidence = conf;
        self
    }

    pub fn with_max_hands(mut self, max_hands: usize) -> Self {
        self.max_hands = max_hands;
        self
    }

    pub fn with_feature_dim(mut self, dim: usize) -> Self {
        self.feature_dim = dim;
        self
    }

    pub fn with_bbox_bias(mut self, bias: i32) -> Self {
        self.bbox_bias = bias;
        self
    }

    pub fn with_style(mut self, style: AnnotationStyle) -> Self {
        self.style = style;
        self
    }

    /// Directory containing the label file, model artifacts, and hand networks.
    pub fn asset_dir(&self) -> &Path {
        &self.asset_dir
    }

    /// Returns the path of the label file.
    pub fn labels_path(&self) -> PathBuf {
        self.asset_dir.join(&self.labels_file)
    }

    /// Minimum palm detection and hand presence confidence.
    pub fn min_detection_confidence(&self) -> f32 {
        self.min_detection_confidence
    }

    /// Maximum number of hands reported per frame.
    pub fn max_hands(&self) -> usize {
        self.max_hands
    }

    /// Length of every feature vector, and the input size every model must accept.
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    pub fn bbox_bias(&self) -> i32 {
        self.bbox_bias
    }

    pub fn style(&self) -> &AnnotationStyle {
        &self.style
    }
}
