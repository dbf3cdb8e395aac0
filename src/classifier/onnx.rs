//! Classifiers exported to ONNX.

use std::path::Path;

use super::{check_input, Classifier};
use crate::error::{Error, Result};
use crate::nn::{tensor::Tensor, Inputs, NeuralNetwork};

/// A classifier exported to ONNX, eg. with `skl2onnx`.
///
/// The network takes a `[1, dim]` `f32` input and its first output is the predicted label. Any
/// further outputs (class probabilities) are not computed.
pub struct OnnxClassifier {
    nn: NeuralNetwork,
    dim: usize,
}

impl OnnxClassifier {
    /// Loads the network at `path`, fixing its input shape to `[1, dim]`.
    pub fn load(path: &Path, dim: usize) -> Result<Self> {
        let nn = NeuralNetwork::from_path(path)
            .and_then(|loader| {
                loader
                    .with_input_shape(&[1, dim])
                    .with_output_selection([0])
                    .load()
            })
            .map_err(|e| Error::config(path, format!("{e:#}")))?;
        Ok(Self { nn, dim })
    }
}

impl Classifier for OnnxClassifier {
    fn input_dim(&self) -> usize {
        self.dim
    }

    fn predict(&self, features: &[f32]) -> Result<u32> {
        check_input(self.dim, features)?;

        let input = Tensor::from_vec(&[1, self.dim], features.to_vec())?;
        let outputs = self
            .nn
            .estimate(&Inputs::from(input))
            .map_err(Error::Inference)?;
        let label = outputs
            .iter()
            .next()
            .and_then(|t| t.as_slice().first().copied())
            .ok_or_else(|| Error::Inference(anyhow::anyhow!("classifier produced no label")))?;
        to_class_index(label)
    }
}

/// Converts a label output (cast to `f32`) back to a class index.
fn to_class_index(label: f32) -> Result<u32> {
    if label.is_finite() && label >= 0.0 && label.fract() == 0.0 && label <= u32::MAX as f32 {
        Ok(label as u32)
    } else {
        Err(Error::Inference(anyhow::anyhow!(
            "classifier produced invalid label {label}"
        )))
    }
}
