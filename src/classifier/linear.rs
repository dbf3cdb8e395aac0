//! Linear support vector machines.

use serde::Deserialize;

use super::{check_input, Classifier};
use crate::error::Result;
use crate::num::TotalF32;

/// A fitted linear SVM.
///
/// With more than two classes the model is one-vs-rest: it stores one weight vector and intercept
/// per class and predicts the class with the largest decision value `w·x + b`. A binary model
/// stores a single weight vector; a positive decision value selects the second class.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "SvmParams")]
pub struct LinearSvm {
    classes: Vec<u32>,
    weights: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
}

#[derive(Deserialize)]
struct SvmParams {
    classes: Vec<u32>,
    weights: Vec<Vec<f32>>,
    intercepts: Vec<f32>,
}

impl TryFrom<SvmParams> for LinearSvm {
    type Error = String;

    fn try_from(p: SvmParams) -> std::result::Result<Self, String> {
        Self::new(p.classes, p.weights, p.intercepts)
    }
}

impl LinearSvm {
    pub fn new(
        classes: Vec<u32>,
        weights: Vec<Vec<f32>>,
        intercepts: Vec<f32>,
    ) -> std::result::Result<Self, String> {
        let svm = Self {
            classes,
            weights,
            intercepts,
        };
        svm.validate()?;
        Ok(svm)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        let binary = self.classes.len() == 2 && self.weights.len() == 1;
        if self.weights.is_empty() || !(binary || self.weights.len() == self.classes.len()) {
            return Err(format!(
                "linear svm has {} classes but {} weight vectors",
                self.classes.len(),
                self.weights.len()
            ));
        }
        if self.intercepts.len() != self.weights.len() {
            return Err(format!(
                "linear svm has {} weight vectors but {} intercepts",
                self.weights.len(),
                self.intercepts.len()
            ));
        }
        let dim = self.weights[0].len();
        if dim == 0 || self.weights.iter().any(|w| w.len() != dim) {
            return Err("linear svm weight vectors must be non-empty and of equal length".into());
        }
        Ok(())
    }

    fn decision(&self, row: usize, features: &[f32]) -> f32 {
        let dot: f32 = self.weights[row]
            .iter()
            .zip(features)
            .map(|(w, x)| w * x)
            .sum();
        dot + self.intercepts[row]
    }
}

impl Classifier for LinearSvm {
    fn input_dim(&self) -> usize {
        self.weights[0].len()
    }

    fn predict(&self, features: &[f32]) -> Result<u32> {
        check_input(self.input_dim(), features)?;

        if self.weights.len() == 1 {
            let positive = self.decision(0, features) > 0.0;
            return Ok(self.classes[usize::from(positive)]);
        }

        // On equal decision values the first class wins.
        let best = (0..self.weights.len())
            .rev()
            .max_by_key(|&row| TotalF32(self.decision(row, features)))
            .expect("validated to have weights");
        Ok(self.classes[best])
    }

    fn classes(&self) -> Option<Vec<u32>> {
        Some(self.classes.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn one_vs_rest_argmax() {
        let svm = LinearSvm::new(
            vec![3, 5, 9],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![-1.0, -1.0]],
            vec![0.0, 0.0, 0.5],
        )
        .unwrap();
        assert_eq!(svm.predict(&[2.0, 1.0]).unwrap(), 3);
        assert_eq!(svm.predict(&[1.0, 2.0]).unwrap(), 5);
        assert_eq!(svm.predict(&[-1.0, -1.0]).unwrap(), 9);
        // tie between the first two classes
        assert_eq!(svm.predict(&[1.0, 1.0]).unwrap(), 3);
    }

    #[test]
    fn binary_sign() {
        let svm = LinearSvm::new(vec![0, 1], vec![vec![1.0]], vec![-0.5]).unwrap();
        assert_eq!(svm.predict(&[0.0]).unwrap(), 0);
        assert_eq!(svm.predict(&[1.0]).unwrap(), 1);
    }

    #[test]
    fn rejects_wrong_length() {
        let svm = LinearSvm::new(vec![0, 1], vec![vec![1.0]], vec![0.0]).unwrap();
        assert!(matches!(
            svm.predict(&[0.0, 0.0]),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn validation() {
        assert!(LinearSvm::new(vec![0, 1, 2], vec![vec![1.0]], vec![0.0]).is_err());
        assert!(LinearSvm::new(vec![0, 1], vec![vec![1.0]], vec![]).is_err());
        assert!(LinearSvm::new(vec![0, 1], vec![vec![1.0], vec![]], vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn deserializing_validates() {
        let no_weights = r#"{"classes": [0, 1], "weights": [], "intercepts": []}"#;
        assert!(serde_json::from_str::<LinearSvm>(no_weights).is_err());
    }
}
