//! Gradient-boosted regression trees (squared error).
//!
//! Each round fits a depth-limited tree to the current residuals with exact
//! greedy splits and adds it, scaled by the learning rate, to the ensemble.
//! Training is fully deterministic: no row or column subsampling, and ties
//! between equally good splits go to the lowest feature index and threshold.

use super::regressor::{check_training_shape, check_width, ModelError, Regressor};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Boosting hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostedParams {
    /// Number of boosting rounds (trees)
    pub n_estimators: usize,
    /// Shrinkage applied to every tree's output
    pub learning_rate: f64,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum rows in a leaf
    pub min_samples_leaf: usize,
}

impl Default for BoostedParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 5,
            min_samples_leaf: 1,
        }
    }
}

impl BoostedParams {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_estimators == 0 {
            return Err(ModelError::InvalidParameter("n_estimators must be >= 1".into()));
        }
        if !(self.learning_rate > 0.0) {
            return Err(ModelError::InvalidParameter(format!(
                "learning_rate must be > 0, got {}",
                self.learning_rate
            )));
        }
        if self.min_samples_leaf == 0 {
            return Err(ModelError::InvalidParameter("min_samples_leaf must be >= 1".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf(v) => return *v,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
struct Ensemble {
    base: f64,
    width: usize,
    trees: Vec<Node>,
}

#[derive(Debug, Clone)]
pub struct GradientBoostedTrees {
    params: BoostedParams,
    ensemble: Option<Ensemble>,
}

impl GradientBoostedTrees {
    pub fn new() -> Self {
        Self::with_params(BoostedParams::default())
    }

    pub fn with_params(params: BoostedParams) -> Self {
        Self {
            params,
            ensemble: None,
        }
    }

    pub fn params(&self) -> &BoostedParams {
        &self.params
    }

    pub fn tree_count(&self) -> usize {
        self.ensemble.as_ref().map_or(0, |e| e.trees.len())
    }

    fn build(&self, x: &[Vec<f64>], residual: &[f64], idx: &mut [usize], depth: usize) -> Node {
        let n = idx.len();
        let sum: f64 = idx.iter().map(|&i| residual[i]).sum();
        let leaf = Node::Leaf(sum / n as f64);

        let min_leaf = self.params.min_samples_leaf;
        if depth >= self.params.max_depth || n < 2 * min_leaf {
            return leaf;
        }

        let parent_score = sum * sum / n as f64;
        let mut best: Option<(f64, usize, f64)> = None; // (gain, feature, threshold)

        for feature in 0..x[0].len() {
            idx.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));
            let mut left_sum = 0.0;
            for k in 1..n {
                left_sum += residual[idx[k - 1]];
                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let lo = x[idx[k - 1]][feature];
                let hi = x[idx[k]][feature];
                if lo == hi {
                    continue;
                }
                let right_sum = sum - left_sum;
                let gain = left_sum * left_sum / k as f64
                    + right_sum * right_sum / (n - k) as f64
                    - parent_score;
                if gain > best.map_or(1e-12, |(g, _, _)| g) {
                    best = Some((gain, feature, lo + (hi - lo) / 2.0));
                }
            }
        }

        let Some((_, feature, threshold)) = best else {
            return leaf;
        };

        idx.sort_by(|&a, &b| {
            (x[a][feature] > threshold)
                .cmp(&(x[b][feature] > threshold))
                .then(a.cmp(&b))
        });
        let split_at = idx.partition_point(|&i| x[i][feature] <= threshold);
        let (left_idx, right_idx) = idx.split_at_mut(split_at);

        Node::Split {
            feature,
            threshold,
            left: Box::new(self.build(x, residual, left_idx, depth + 1)),
            right: Box::new(self.build(x, residual, right_idx, depth + 1)),
        }
    }
}

impl Default for GradientBoostedTrees {
    fn default() -> Self {
        Self::new()
    }
}

impl Regressor for GradientBoostedTrees {
    fn name(&self) -> &str {
        "boosted"
    }

    fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<(), ModelError> {
        self.params.validate()?;
        let width = check_training_shape(x, y)?;

        let base = y.iter().sum::<f64>() / y.len() as f64;
        let mut prediction = vec![base; y.len()];
        let mut residual = vec![0.0; y.len()];
        let mut trees = Vec::with_capacity(self.params.n_estimators);

        for _ in 0..self.params.n_estimators {
            for i in 0..y.len() {
                residual[i] = y[i] - prediction[i];
            }
            let mut idx: Vec<usize> = (0..y.len()).collect();
            let tree = self.build(x, &residual, &mut idx, 0);
            for (p, row) in prediction.iter_mut().zip(x) {
                *p += self.params.learning_rate * tree.predict(row);
            }
            trees.push(tree);
        }

        debug!(
            rows = y.len(),
            features = width,
            trees = trees.len(),
            "boosted trees trained"
        );
        self.ensemble = Some(Ensemble { base, width, trees });
        Ok(())
    }

    fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        let ensemble = self.ensemble.as_ref().ok_or(ModelError::NotTrained)?;
        check_width(x, ensemble.width)?;
        let lr = self.params.learning_rate;
        Ok(x.iter()
            .map(|row| ensemble.base + lr * ensemble.trees.iter().map(|t| t.predict(row)).sum::<f64>())
            .collect())
    }
}
