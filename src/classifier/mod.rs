//! Gesture classifiers and the registry of loaded models.
//!
//! Every model maps a [`FeatureVector`] to a class index. Models are loaded once at startup from
//! the asset directory and never change afterwards, so the [`ModelRegistry`] can be shared
//! between threads without locking.
//!
//! A model artifact is either a `<name>.json` file holding a [`knn::Knn`], [`linear::LinearSvm`],
//! or [`forest::RandomForest`] (see [`artifact`]), or a `<name>.onnx` export run by
//! [`onnx::OnnxClassifier`].

pub mod artifact;
pub mod forest;
pub mod knn;
pub mod linear;
pub mod onnx;

use std::{collections::BTreeMap, fmt, path::Path, str::FromStr};

use itertools::Itertools;

use crate::error::{Error, Result};
use crate::features::{FeatureVector, DEFAULT_FEATURE_DIM};

use self::onnx::OnnxClassifier;

/// A pretrained model that predicts a class index from a feature vector.
pub trait Classifier: Send + Sync {
    /// Returns the number of features this model expects.
    fn input_dim(&self) -> usize;

    /// Classifies a single feature vector.
    ///
    /// Fails with [`Error::DimensionMismatch`] if `features.len()` differs from
    /// [`Classifier::input_dim`].
    fn predict(&self, features: &[f32]) -> Result<u32>;

    /// Returns every class index this model can predict, if the model knows them.
    fn classes(&self) -> Option<Vec<u32>> {
        None
    }
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn input_dim(&self) -> usize {
        (**self).input_dim()
    }

    fn predict(&self, features: &[f32]) -> Result<u32> {
        (**self).predict(features)
    }

    fn classes(&self) -> Option<Vec<u32>> {
        (**self).classes()
    }
}

/// Fails with [`Error::DimensionMismatch`] unless `features` has `expected` elements.
pub fn check_input(expected: usize, features: &[f32]) -> Result<()> {
    if features.len() != expected {
        return Err(Error::DimensionMismatch {
            expected,
            actual: features.len(),
        });
    }
    Ok(())
}

/// Identifies one of the supported models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ModelName {
    RandomForest,
    Svm,
    Knn,
}

impl ModelName {
    pub const ALL: [ModelName; 3] = [ModelName::RandomForest, ModelName::Svm, ModelName::Knn];

    /// Returns the identifier used in file names and on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            ModelName::RandomForest => "random_forest",
            ModelName::Svm => "svm",
            ModelName::Knn => "knn",
        }
    }

    /// Returns the name for display in a model picker, eg. `Random Forest`.
    pub fn display_label(self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .join(" ")
    }
}

impl fmt::Display for ModelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`ModelName`].
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown model '{0}', expected one of: random_forest, svm, knn")]
pub struct UnknownModel(String);

impl FromStr for ModelName {
    type Err = UnknownModel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ModelName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownModel(s.to_string()))
    }
}

/// The fixed set of loaded classifiers, keyed by [`ModelName`].
#[derive(Default)]
pub struct ModelRegistry {
    models: BTreeMap<ModelName, Box<dyn Classifier>>,
}

impl ModelRegistry {
    /// Creates an empty registry. Models can be added with [`ModelRegistry::insert`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the artifact of every model in `names` from `dir`.
    ///
    /// ONNX artifacts are fixed to take [`DEFAULT_FEATURE_DIM`] inputs; use
    /// [`ModelRegistry::load_with_input_dim`] for other feature sizes.
    pub fn load<P: AsRef<Path>>(names: &[ModelName], dir: P) -> Result<Self> {
        Self::load_with_input_dim(names, dir, DEFAULT_FEATURE_DIM)
    }

    /// Loads the artifact of every model in `names` from `dir`.
    ///
    /// `<name>.json` takes precedence over `<name>.onnx`. ONNX models are prepared for feature
    /// vectors of length `onnx_input_dim`.
    pub fn load_with_input_dim<P: AsRef<Path>>(
        names: &[ModelName],
        dir: P,
        onnx_input_dim: usize,
    ) -> Result<Self> {
        let dir = dir.as_ref();
        let mut registry = Self::new();
        for &name in names {
            let json = dir.join(format!("{name}.json"));
            let onnx = dir.join(format!("{name}.onnx"));
            let model: Box<dyn Classifier> = if json.is_file() {
                artifact::load(&json)?
            } else if onnx.is_file() {
                Box::new(OnnxClassifier::load(&onnx, onnx_input_dim)?)
            } else {
                return Err(Error::config(
                    json,
                    format!("no artifact for model '{name}' (expected .json or .onnx)"),
                ));
            };

            log::info!("loaded model '{name}' ({} inputs)", model.input_dim());
            registry.insert(name, model);
        }

        Ok(registry)
    }

    /// Adds a classifier, replacing any previous model with the same name.
    pub fn insert(&mut self, name: ModelName, model: Box<dyn Classifier>) {
        self.models.insert(name, model);
    }

    pub fn get(&self, name: ModelName) -> Option<&dyn Classifier> {
        self.models.get(&name).map(|m| &**m)
    }

    /// Returns the names of all loaded models.
    pub fn names(&self) -> impl Iterator<Item = ModelName> + '_ {
        self.models.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ModelName, &dyn Classifier)> + '_ {
        self.models.iter().map(|(&name, m)| (name, &**m))
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    /// Classifies `features` with the model called `name`.
    pub fn predict(&self, name: ModelName, features: &FeatureVector) -> Result<u32> {
        self.get(name)
            .ok_or(Error::ModelNotLoaded(name))?
            .predict(features)
    }

    /// Verifies that every loaded model takes feature vectors of length `dim`.
    pub fn check_dim(&self, dim: usize) -> Result<()> {
        for (name, model) in self.iter() {
            if model.input_dim() != dim {
                log::error!(
                    "model '{name}' expects {} features, but feature vectors have {dim}",
                    model.input_dim()
                );
                return Err(Error::DimensionMismatch {
                    expected: dim,
                    actual: model.input_dim(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ModelRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
