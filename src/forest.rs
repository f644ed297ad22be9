//! Random forest classifier for the binary failure label.
//!
//! Trees are CART with Gini impurity, each grown on a bootstrap sample with a
//! random feature subset tried at every split. Leaves keep the fraction of
//! failure samples they saw; the forest averages those fractions.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    /// Features tried per split; `None` means floor(sqrt(n_features)).
    pub max_features: Option<usize>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 200,
            max_features: None,
            max_depth: None,
            min_samples_split: 2,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Node {
    Leaf {
        failure_probability: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [u8],
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    nodes: Vec<Node>,
    scratch: Vec<(f64, u8)>,
}

impl DecisionTree {
    fn grow(builder: TreeBuilder<'_>, samples: &mut [usize], rng: &mut StdRng) -> Self {
        let mut builder = builder;
        builder.build(samples, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    /// Failure probability for an already validated row.
    fn failure_probability(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf {
                    failure_probability,
                } => return *failure_probability,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Checks that every walk from the root ends at a leaf without indexing
    /// past `n_features`. Children are always stored after their parent.
    fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        for (idx, node) in self.nodes.iter().enumerate() {
            match *node {
                Node::Leaf {
                    failure_probability,
                } => {
                    if !(0.0..=1.0).contains(&failure_probability) {
                        return Err(format!("node {idx} has probability {failure_probability}"));
                    }
                }
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if feature >= n_features {
                        return Err(format!(
                            "node {idx} splits on feature {feature} of {n_features}"
                        ));
                    }
                    for child in [left, right] {
                        if child <= idx || child >= self.nodes.len() {
                            return Err(format!("node {idx} points to child {child}"));
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl TreeBuilder<'_> {
    fn build(&mut self, samples: &mut [usize], depth: usize, rng: &mut StdRng) -> usize {
        let n = samples.len();
        let positives = samples.iter().filter(|&&i| self.y[i] == 1).count();

        let depth_reached = self.max_depth.is_some_and(|max| depth >= max);
        if positives == 0 || positives == n || n < self.min_samples_split || depth_reached {
            return self.push_leaf(positives, n);
        }

        let Some(split) = self.best_split(samples, positives, rng) else {
            return self.push_leaf(positives, n);
        };

        // move samples going left to the front
        let mut mid = 0;
        for i in 0..n {
            if self.x[samples[i]][split.feature] <= split.threshold {
                samples.swap(i, mid);
                mid += 1;
            }
        }

        let node = self.nodes.len();
        self.nodes.push(Node::Leaf {
            failure_probability: positives as f64 / n as f64,
        });

        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let left = self.build(left_samples, depth + 1, rng);
        let right = self.build(right_samples, depth + 1, rng);

        self.nodes[node] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    fn push_leaf(&mut self, positives: usize, n: usize) -> usize {
        self.nodes.push(Node::Leaf {
            failure_probability: positives as f64 / n as f64,
        });
        self.nodes.len() - 1
    }

    fn best_split(
        &mut self,
        samples: &[usize],
        positives: usize,
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let (x, y) = (self.x, self.y);
        let width = x[samples[0]].len();
        let n = samples.len();
        let mut features: Vec<usize> = (0..width).collect();
        features.shuffle(rng);

        let mut best: Option<SplitCandidate> = None;

        for (visited, &feature) in features.iter().enumerate() {
            // keep looking past the subset only while nothing splits
            if visited >= self.max_features && best.is_some() {
                break;
            }

            self.scratch.clear();
            self.scratch
                .extend(samples.iter().map(|&i| (x[i][feature], y[i])));
            self.scratch.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_positives = 0;
            for k in 1..n {
                left_positives += self.scratch[k - 1].1 as usize;
                let (lo, hi) = (self.scratch[k - 1].0, self.scratch[k].0);
                if hi <= lo {
                    continue;
                }

                let impurity = weighted_gini(k, left_positives)
                    + weighted_gini(n - k, positives - left_positives);
                if best.map_or(true, |b| impurity < b.impurity) {
                    let mut threshold = lo + (hi - lo) / 2.0;
                    if threshold >= hi {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }
}

/// Gini impurity of a node scaled by its sample count.
fn weighted_gini(n: usize, positives: usize) -> f64 {
    let n = n as f64;
    let p = positives as f64;
    n - (p * p + (n - p) * (n - p)) / n
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[u8], params: &ForestParams) -> Result<Self> {
        let width = x.first().map(Vec::len).ok_or(Error::EmptyInput)?;
        if width == 0 {
            return Err(Error::EmptyInput);
        }
        if x.len() != y.len() {
            return Err(Error::SchemaMismatch(format!(
                "{} feature rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        if let Some(row) = x.iter().find(|row| row.len() != width) {
            return Err(Error::FeatureCount {
                expected: width,
                actual: row.len(),
            });
        }

        let max_features = params
            .max_features
            .unwrap_or_else(|| (width as f64).sqrt().floor() as usize)
            .clamp(1, width);

        // per-tree seeds drawn up front keep the forest independent of thread scheduling
        let mut rng = StdRng::seed_from_u64(params.seed);
        let tree_seeds: Vec<u64> = (0..params.n_trees.max(1)).map(|_| rng.gen()).collect();

        let trees: Vec<DecisionTree> = tree_seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut samples: Vec<usize> =
                    (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect();
                let builder = TreeBuilder {
                    x,
                    y,
                    max_features,
                    max_depth: params.max_depth,
                    min_samples_split: params.min_samples_split.max(2),
                    nodes: Vec::new(),
                    scratch: Vec::with_capacity(samples.len()),
                };
                DecisionTree::grow(builder, &mut samples, &mut rng)
            })
            .collect();

        debug!(
            trees = trees.len(),
            nodes = trees.iter().map(DecisionTree::node_count).sum::<usize>(),
            "forest grown"
        );

        Ok(Self {
            trees,
            n_features: width,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Structural check for a forest read back from disk.
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(Error::CorruptModel("forest has no trees".to_string()));
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| Error::CorruptModel(format!("tree {idx}: {reason}")))?;
        }
        Ok(())
    }

    /// Mean failure probability across trees.
    pub fn predict_proba(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.n_features {
            return Err(Error::FeatureCount {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        let total: f64 = self
            .trees
            .iter()
            .map(|tree| tree.failure_probability(row))
            .sum();
        Ok(total / self.trees.len() as f64)
    }

    pub fn predict(&self, row: &[f64]) -> Result<u8> {
        Ok(u8::from(self.predict_proba(row)? > 0.5))
    }

    pub fn predict_rows(&self, rows: &[Vec<f64>]) -> Result<Vec<u8>> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Accuracy on the given rows.
    pub fn score(&self, x: &[Vec<f64>], y: &[u8]) -> Result<f64> {
        if x.is_empty() {
            return Err(Error::EmptyInput);
        }
        let predicted = self.predict_rows(x)?;
        let correct = predicted.iter().zip(y).filter(|(p, t)| p == t).count();
        Ok(correct as f64 / x.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // failure when both torque and tool wear are high
    fn wear_dataset() -> (Vec<Vec<f64>>, Vec<u8>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for torque in 0..20 {
            for wear in 0..20 {
                let row = vec![torque as f64, wear as f64, ((torque * 7 + wear) % 5) as f64];
                y.push(u8::from(torque >= 12 && wear >= 10));
                x.push(row);
            }
        }
        (x, y)
    }

    fn small_params() -> ForestParams {
        ForestParams {
            n_trees: 25,
            ..ForestParams::default()
        }
    }

    #[test]
    fn defaults_match_training_setup() {
        let params = ForestParams::default();
        assert_eq!(params.n_trees, 200);
        assert_eq!(params.seed, 42);
        assert_eq!(params.max_features, None);
    }

    #[test]
    fn gini_is_zero_for_pure_nodes() {
        assert_eq!(weighted_gini(10, 0), 0.0);
        assert_eq!(weighted_gini(10, 10), 0.0);
        assert!((weighted_gini(10, 5) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn forest_learns_a_separable_rule() {
        let (x, y) = wear_dataset();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(forest.n_trees(), 25);
        assert!(forest.score(&x, &y).unwrap() > 0.97);
        assert_eq!(forest.predict(&[18.0, 18.0, 0.0]).unwrap(), 1);
        assert_eq!(forest.predict(&[2.0, 3.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn same_seed_grows_the_same_forest() {
        let (x, y) = wear_dataset();
        let a = RandomForest::fit(&x, &y, &small_params()).unwrap();
        let b = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn single_class_gives_constant_prediction() {
        let x = vec![vec![1.0], vec![2.0], vec![3.0]];
        let forest = RandomForest::fit(&x, &[0, 0, 0], &small_params()).unwrap();
        assert_eq!(forest.predict_proba(&[2.5]).unwrap(), 0.0);
    }

    #[test]
    fn depth_limit_produces_stumps() {
        let (x, y) = wear_dataset();
        let params = ForestParams {
            n_trees: 3,
            max_depth: Some(1),
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&x, &y, &params).unwrap();
        assert!(forest.trees.iter().all(|tree| tree.node_count() <= 3));
    }

    fn one_split_forest(feature: usize, left: usize, right: usize) -> RandomForest {
        RandomForest {
            trees: vec![DecisionTree {
                nodes: vec![
                    Node::Split {
                        feature,
                        threshold: 0.0,
                        left,
                        right,
                    },
                    Node::Leaf {
                        failure_probability: 0.0,
                    },
                    Node::Leaf {
                        failure_probability: 1.0,
                    },
                ],
            }],
            n_features: 6,
        }
    }

    #[test]
    fn grown_forest_passes_validation() {
        let (x, y) = wear_dataset();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert!(forest.validate().is_ok());
        assert!(one_split_forest(5, 1, 2).validate().is_ok());
    }

    #[test]
    fn out_of_range_split_feature_is_corrupt() {
        assert!(matches!(
            one_split_forest(9, 1, 2).validate(),
            Err(Error::CorruptModel(_))
        ));
    }

    #[test]
    fn backward_or_dangling_children_are_corrupt() {
        // a self-loop would never reach a leaf
        assert!(one_split_forest(0, 0, 2).validate().is_err());
        assert!(one_split_forest(0, 1, 7).validate().is_err());
    }

    #[test]
    fn empty_forest_and_empty_tree_are_corrupt() {
        let empty = RandomForest {
            trees: Vec::new(),
            n_features: 6,
        };
        assert!(empty.validate().is_err());
        let hollow = RandomForest {
            trees: vec![DecisionTree { nodes: Vec::new() }],
            n_features: 6,
        };
        assert!(hollow.validate().is_err());
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let (x, y) = wear_dataset();
        let forest = RandomForest::fit(&x, &y, &small_params()).unwrap();
        assert!(matches!(
            forest.predict(&[1.0, 2.0]),
            Err(Error::FeatureCount { expected: 3, actual: 2 })
        ));
        assert!(RandomForest::fit(&[], &[], &small_params()).is_err());
        assert!(RandomForest::fit(&x, &y[1..], &small_params()).is_err());
    }
}
