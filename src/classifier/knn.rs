//! k-nearest neighbours classification.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Deserialize;

use super::{check_input, Classifier};
use crate::error::Result;
use crate::num::TotalF32;

/// A fitted k-nearest-neighbours classifier.
///
/// Stores the training samples and predicts by majority vote among the `k` samples closest to the
/// input (Euclidean distance). If several classes get the same number of votes, the smallest
/// class index wins, matching scikit-learn's uniformly weighted `KNeighborsClassifier`.
///
/// Deserializing validates the parameters like [`Knn::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "KnnParams")]
pub struct Knn {
    k: usize,
    samples: Vec<Vec<f32>>,
    labels: Vec<u32>,
}

#[derive(Deserialize)]
struct KnnParams {
    k: usize,
    samples: Vec<Vec<f32>>,
    labels: Vec<u32>,
}

impl TryFrom<KnnParams> for Knn {
    type Error = String;

    fn try_from(p: KnnParams) -> std::result::Result<Self, String> {
        Self::new(p.k, p.samples, p.labels)
    }
}

impl Knn {
    pub fn new(
        k: usize,
        samples: Vec<Vec<f32>>,
        labels: Vec<u32>,
    ) -> std::result::Result<Self, String> {
        let knn = Self { k, samples, labels };
        knn.validate()?;
        Ok(knn)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.samples.is_empty() {
            return Err("knn model has no training samples".into());
        }
        if self.samples.len() != self.labels.len() {
            return Err(format!(
                "knn model has {} samples but {} labels",
                self.samples.len(),
                self.labels.len()
            ));
        }
        let dim = self.samples[0].len();
        if let Some(i) = self.samples.iter().position(|s| s.len() != dim) {
            return Err(format!(
                "knn sample {i} has {} features, expected {dim}",
                self.samples[i].len()
            ));
        }
        if self.k == 0 || self.k > self.samples.len() {
            return Err(format!(
                "knn `k` must be between 1 and {}, got {}",
                self.samples.len(),
                self.k
            ));
        }
        Ok(())
    }
}

impl Classifier for Knn {
    fn input_dim(&self) -> usize {
        self.samples[0].len()
    }

    fn predict(&self, features: &[f32]) -> Result<u32> {
        check_input(self.input_dim(), features)?;

        let nearest = self
            .samples
            .iter()
            .map(|sample| {
                sample
                    .iter()
                    .zip(features)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>()
                    .sqrt()
            })
            .zip(&self.labels)
            .sorted_by_key(|(dist, _)| TotalF32(*dist))
            .take(self.k);

        let mut votes = BTreeMap::<u32, usize>::new();
        for (_, &label) in nearest {
            *votes.entry(label).or_default() += 1;
        }

        // `max_by_key` returns the last maximum, so iterate from the largest class down.
        let (class, _) = votes
            .into_iter()
            .rev()
            .max_by_key(|&(_, count)| count)
            .expect("k is at least 1");
        Ok(class)
    }

    fn classes(&self) -> Option<Vec<u32>> {
        Some(self.labels.iter().copied().sorted().dedup().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn model(k: usize) -> Knn {
        Knn::new(
            k,
            vec![
                vec![0.0, 0.0],
                vec![0.1, 0.0],
                vec![1.0, 1.0],
                vec![1.1, 1.0],
                vec![0.9, 1.0],
            ],
            vec![0, 0, 1, 1, 1],
        )
        .unwrap()
    }

    #[test]
    fn majority_vote() {
        let knn = model(3);
        assert_eq!(knn.predict(&[0.05, 0.0]).unwrap(), 0);
        assert_eq!(knn.predict(&[1.0, 0.9]).unwrap(), 1);
        // two of the three nearest neighbours are class 0
        assert_eq!(knn.predict(&[0.3, 0.3]).unwrap(), 0);
    }

    #[test]
    fn ties_go_to_smaller_class() {
        let knn = Knn::new(2, vec![vec![0.0], vec![1.0], vec![3.0]], vec![2, 1, 1]).unwrap();
        // one vote each, regardless of which voter is closer
        assert_eq!(knn.predict(&[0.4]).unwrap(), 1);
        assert_eq!(knn.predict(&[0.6]).unwrap(), 1);
        // both nearest neighbours are class 1
        assert_eq!(knn.predict(&[2.0]).unwrap(), 1);

        let knn = Knn::new(2, vec![vec![0.0], vec![1.0], vec![3.0]], vec![0, 5, 5]).unwrap();
        assert_eq!(knn.predict(&[0.9]).unwrap(), 0);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            model(1).predict(&[0.0; 3]),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn validation() {
        assert!(Knn::new(1, vec![], vec![]).is_err());
        assert!(Knn::new(1, vec![vec![0.0]], vec![0, 1]).is_err());
        assert!(Knn::new(2, vec![vec![0.0]], vec![0]).is_err());
        assert!(Knn::new(1, vec![vec![0.0], vec![0.0, 1.0]], vec![0, 1]).is_err());
        assert_eq!(model(1).classes(), Some(vec![0, 1]));
    }

    #[test]
    fn deserializing_validates() {
        let empty = serde_json::from_str::<Knn>(r#"{"k": 1, "samples": [], "labels": []}"#);
        assert!(empty.unwrap_err().to_string().contains("no training samples"));

        let knn: Knn =
            serde_json::from_str(r#"{"k": 1, "samples": [[0.0], [2.0]], "labels": [3, 4]}"#)
                .unwrap();
        assert_eq!(knn.predict(&[1.5]).unwrap(), 4);
    }
}
