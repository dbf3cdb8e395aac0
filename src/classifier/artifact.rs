//! JSON model artifacts.
//!
//! An artifact wraps the fitted parameters in an envelope with a single `model` field, tagged by
//! the predictor family:
//!
//! ```json
//! {"model": {"kind": "linear_svm", "classes": [0, 1], "weights": [[0.5, -1.0]], "intercepts": [0.1]}}
//! ```
//!
//! `kind` is one of `knn`, `linear_svm`, or `random_forest`. The remaining fields are those of
//! [`Knn`], [`LinearSvm`], and [`RandomForest`]. Random forest leaves are either `{"class": c}`
//! or `{"value": [..]}`, a class distribution indexed by the forest's `classes`.

use std::{fs, path::Path};

use serde::Deserialize;

use super::{forest::RandomForest, knn::Knn, linear::LinearSvm, Classifier};
use crate::error::{Error, Result};

#[derive(Deserialize)]
struct Envelope {
    model: Model,
}

/// The fitted parameters of one of the built-in predictor families.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Model {
    Knn(Knn),
    LinearSvm(LinearSvm),
    RandomForest(RandomForest),
}

impl Model {
    /// Parses an artifact. Inconsistent parameters are rejected while deserializing.
    pub fn from_json(json: &str) -> std::result::Result<Self, String> {
        let envelope: Envelope = serde_json::from_str(json).map_err(|e| e.to_string())?;
        Ok(envelope.model)
    }

    pub fn into_classifier(self) -> Box<dyn Classifier> {
        match self {
            Model::Knn(m) => Box::new(m),
            Model::LinearSvm(m) => Box::new(m),
            Model::RandomForest(m) => Box::new(m),
        }
    }
}

/// Loads the artifact at `path`.
///
/// Any problem with the file is reported as [`Error::Config`] naming `path`.
pub fn load(path: &Path) -> Result<Box<dyn Classifier>> {
    let json = fs::read_to_string(path).map_err(|e| Error::config(path, e.to_string()))?;
    let model = Model::from_json(&json).map_err(|reason| Error::config(path, reason))?;
    Ok(model.into_classifier())
}
