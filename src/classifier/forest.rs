//! Random forest classification.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Deserialize;

use super::{check_input, Classifier};
use crate::error::Result;
use crate::iter::zip_exact;
use crate::num::TotalF32;

/// A node of a [`DecisionTree`].
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Node {
    /// Samples with `x[feature] <= threshold` continue at node `left`, all others at `right`.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    /// A leaf that predicts a single class.
    Leaf { class: u32 },
    /// A leaf holding the class distribution of the training samples that reached it, indexed
    /// like [`RandomForest`]'s `classes`. Counts and fractions both work.
    Distribution { value: Vec<f32> },
}

/// A decision tree stored as a flat node array. Node 0 is the root.
#[derive(Debug, Clone, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("decision tree has no nodes".into());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                &Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {i} splits on feature {feature}, but there are only {n_features}"
                        ));
                    }
                    // Children always come after their parent, so evaluation terminates.
                    for child in [left, right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {i} has invalid child index {child}"));
                        }
                    }
                }
                Node::Leaf { .. } => {}
                Node::Distribution { value } => {
                    if value.len() != n_classes {
                        return Err(format!(
                            "leaf {i} has {} class weights, but the forest has {n_classes} classes",
                            value.len()
                        ));
                    }
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0)
                        || value.iter().sum::<f32>() <= 0.0
                    {
                        return Err(format!("leaf {i} has an invalid class distribution"));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf(&self, features: &[f32]) -> &Node {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if features[feature] <= threshold {
                        left
                    } else {
                        right
                    };
                }
                ref leaf => return leaf,
            }
        }
    }

    fn leaf_classes(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().filter_map(|node| match *node {
            Node::Leaf { class } => Some(class),
            Node::Split { .. } | Node::Distribution { .. } => None,
        })
    }
}

/// A fitted random forest.
///
/// Like scikit-learn's `RandomForestClassifier`, every tree contributes the class probabilities of
/// the leaf the input ends up in, and the class with the highest summed probability wins. A
/// [`Node::Leaf`] counts as probability 1 for its class, so forests built only from those take a
/// majority vote. Ties go to the smaller class index.
///
/// Deserializing validates the parameters like [`RandomForest::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ForestParams")]
pub struct RandomForest {
    n_features: usize,
    classes: Vec<u32>,
    trees: Vec<DecisionTree>,
}

#[derive(Deserialize)]
struct ForestParams {
    n_features: usize,
    #[serde(default)]
    classes: Vec<u32>,
    trees: Vec<DecisionTree>,
}

impl TryFrom<ForestParams> for RandomForest {
    type Error = String;

    fn try_from(p: ForestParams) -> std::result::Result<Self, String> {
        Self::with_classes(p.n_features, p.classes, p.trees)
    }
}

impl RandomForest {
    /// Creates a forest whose leaves are all [`Node::Leaf`]s.
    pub fn new(
        n_features: usize,
        trees: Vec<DecisionTree>,
    ) -> std::result::Result<Self, String> {
        Self::with_classes(n_features, Vec::new(), trees)
    }

    /// Creates a forest whose [`Node::Distribution`] leaves are indexed by `classes`.
    pub fn with_classes(
        n_features: usize,
        classes: Vec<u32>,
        trees: Vec<DecisionTree>,
    ) -> std::result::Result<Self, String> {
        let forest = Self {
            n_features,
            classes,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".into());
        }
        if !self.classes.iter().all_unique() {
            return Err("random forest lists a class more than once".into());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| format!("tree {i}: {e}"))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn input_dim(&self) -> usize {
        self.n_features
    }

    fn predict(&self, features: &[f32]) -> Result<u32> {
        check_input(self.n_features, features)?;

        let mut proba = BTreeMap::<u32, f32>::new();
        for tree in &self.trees {
            match tree.leaf(features) {
                Node::Leaf { class } => *proba.entry(*class).or_default() += 1.0,
                Node::Distribution { value } => {
                    let total = value.iter().sum::<f32>();
                    for (&class, &v) in zip_exact(&self.classes, value) {
                        *proba.entry(class).or_default() += v / total;
                    }
                }
                Node::Split { .. } => unreachable!("`leaf` never returns a split"),
            }
        }

        // `max_by_key` returns the last maximum, so iterate from the largest class down.
        let (class, _) = proba
            .into_iter()
            .rev()
            .max_by_key(|&(_, p)| TotalF32(p))
            .expect("forest has at least one tree");
        Ok(class)
    }

    fn classes(&self) -> Option<Vec<u32>> {
        Some(
            self.trees
                .iter()
                .flat_map(|t| t.leaf_classes())
                .chain(self.classes.iter().copied())
                .sorted()
                .dedup()
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    fn stump(feature: usize, threshold: f32, low: u32, high: u32) -> DecisionTree {
        DecisionTree::new(vec![
            Node::Split {
                feature,
                threshold,
                left: 1,
                right: 2,
            },
            Node::Leaf { class: low },
            Node::Leaf { class: high },
        ])
    }

    #[test]
    fn majority_of_trees() {
        let forest = RandomForest::new(
            2,
            vec![stump(0, 0.5, 0, 1), stump(1, 0.5, 0, 1), stump(0, 0.2, 2, 1)],
        )
        .unwrap();
        assert_eq!(forest.predict(&[0.9, 0.9]).unwrap(), 1);
        assert_eq!(forest.predict(&[0.1, 0.1]).unwrap(), 0);
        // the threshold itself goes left
        assert_eq!(forest.predict(&[0.5, 0.5]).unwrap(), 0);
        assert_eq!(forest.classes(), Some(vec![0, 1, 2]));
    }

    #[test]
    fn tie_goes_to_smaller_class() {
        let forest = RandomForest::new(1, vec![stump(0, 0.5, 4, 4), stump(0, 0.5, 3, 3)]).unwrap();
        assert_eq!(forest.predict(&[0.0]).unwrap(), 3);
    }

    #[test]
    fn averages_leaf_distributions() {
        let leaf = |value: &[f32]| Node::Distribution {
            value: value.to_vec(),
        };
        let split = Node::Split {
            feature: 0,
            threshold: 0.5,
            left: 1,
            right: 2,
        };
        // Two trees lean weakly towards class 3, one is confident about class 7.
        let weak = DecisionTree::new(vec![split.clone(), leaf(&[6.0, 4.0]), leaf(&[0.0, 1.0])]);
        let sure = DecisionTree::new(vec![split, leaf(&[0.0, 1.0]), leaf(&[1.0, 0.0])]);
        let forest =
            RandomForest::with_classes(1, vec![3, 7], vec![weak.clone(), weak, sure]).unwrap();

        // votes would be 2:1 for class 3, probabilities are 1.2 vs 1.8
        assert_eq!(forest.predict(&[0.0]).unwrap(), 7);
        // 1.0 + 1.0 for class 7 against 1.0 for class 3
        assert_eq!(forest.predict(&[1.0]).unwrap(), 7);
        assert_eq!(forest.classes(), Some(vec![3, 7]));
    }

    #[test]
    fn distribution_tie_goes_to_smaller_class() {
        let tree = DecisionTree::new(vec![Node::Distribution {
            value: vec![0.5, 0.5],
        }]);
        let forest = RandomForest::with_classes(1, vec![9, 2], vec![tree]).unwrap();
        assert_eq!(forest.predict(&[0.0]).unwrap(), 2);
    }

    #[test]
    fn rejects_wrong_length() {
        let forest = RandomForest::new(2, vec![stump(0, 0.5, 0, 1)]).unwrap();
        assert!(matches!(
            forest.predict(&[0.0]),
            Err(Error::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn validation() {
        assert!(RandomForest::new(1, vec![]).is_err());
        assert!(RandomForest::new(1, vec![stump(1, 0.5, 0, 1)]).is_err());
        let cyclic = DecisionTree::new(vec![Node::Split {
            feature: 0,
            threshold: 0.0,
            left: 0,
            right: 0,
        }]);
        assert!(RandomForest::new(1, vec![cyclic]).is_err());
        assert!(RandomForest::new(1, vec![DecisionTree::new(vec![])]).is_err());

        let two_weights = DecisionTree::new(vec![Node::Distribution {
            value: vec![1.0, 0.0],
        }]);
        assert!(RandomForest::new(1, vec![two_weights.clone()]).is_err());
        assert!(RandomForest::with_classes(1, vec![0, 0], vec![two_weights.clone()]).is_err());
        assert!(RandomForest::with_classes(1, vec![0, 1], vec![two_weights]).is_ok());
        let empty = DecisionTree::new(vec![Node::Distribution {
            value: vec![0.0, 0.0],
        }]);
        assert!(RandomForest::with_classes(1, vec![0, 1], vec![empty]).is_err());
    }

    #[test]
    fn deserializing_validates() {
        let no_trees = serde_json::from_str::<RandomForest>(r#"{"n_features": 1, "trees": []}"#);
        assert!(no_trees.unwrap_err().to_string().contains("no trees"));

        let forest: RandomForest = serde_json::from_str(
            r#"{"n_features": 1, "classes": [4, 5], "trees": [{"nodes": [{"value": [1, 3]}]}]}"#,
        )
        .unwrap();
        assert_eq!(forest.predict(&[0.0]).unwrap(), 5);
    }
}
