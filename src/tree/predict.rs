use super::tree::Tree;
use crate::errors::DecisionTreeError;
use crate::node::Node;
use crate::utils::is_missing;
use crate::Matrix;
use rayon::prelude::*;

/// Category code of a raw value. Missing values, and values that are not a
/// non-negative integer, have no code and can never match a child.
#[inline]
fn category_of(v: &f64, missing: &f64) -> Option<usize> {
    if is_missing(v, missing) || *v < 0.0 || v.fract() != 0.0 {
        None
    } else {
        Some(*v as usize)
    }
}

/// Predict the class of a single instance, failing if the instance does not
/// have as many features as the tree was trained on.
///
/// * `tree` - A fitted tree.
/// * `row` - Feature values of the instance, `NaN` being missing.
pub fn predict(tree: &Tree, row: &[f64]) -> Result<f64, DecisionTreeError> {
    if row.len() != tree.n_features {
        return Err(DecisionTreeError::FeatureCount(tree.n_features, row.len()));
    }
    Ok(tree.predict_row(row, &f64::NAN) as f64)
}

impl Tree {
    /// Node a row stops at: a leaf, or the internal node whose split value
    /// for the row has no child.
    pub fn predict_node(&self, row: &[f64], missing: &f64) -> &Node {
        let mut node = &self.root;
        while let Some(feature) = node.split_feature {
            let value = row.get(feature).and_then(|v| category_of(v, missing));
            match node.get_child(value) {
                Some(child) => node = child,
                None => break,
            }
        }
        node
    }

    /// Predict the class of a row. A value with no matching child (never seen
    /// for that split during training, or missing) resolves to the majority
    /// class of the internal node where the lookup failed.
    pub fn predict_row(&self, row: &[f64], missing: &f64) -> usize {
        let node = self.predict_node(row, missing);
        node.label.unwrap_or_else(|| node.majority_label())
    }

    /// Share of each class among the training rows of the node a row stops at.
    pub fn predict_proba_row(&self, row: &[f64], missing: &f64) -> Vec<f64> {
        let node = self.predict_node(row, missing);
        let total = node.n_instances() as f64;
        let mut proba: Vec<f64> = node.class_counts.iter().map(|c| *c as f64 / total).collect();
        proba.resize(self.n_classes, 0.0);
        proba
    }

    fn predict_single_threaded(&self, data: &Matrix<f64>, missing: &f64) -> Vec<f64> {
        data.index
            .iter()
            .map(|i| self.predict_row(&data.get_row(*i), missing) as f64)
            .collect()
    }

    fn predict_parallel(&self, data: &Matrix<f64>, missing: &f64) -> Vec<f64> {
        data.index
            .par_iter()
            .map(|i| self.predict_row(&data.get_row(*i), missing) as f64)
            .collect()
    }

    /// Predict the class of every row of `data`.
    ///
    /// * `data` - Rows to predict, with the columns the tree was trained on.
    /// * `parallel` - Predict rows on the rayon thread pool.
    /// * `missing` - Value to consider missing.
    pub fn predict(&self, data: &Matrix<f64>, parallel: bool, missing: &f64) -> Vec<f64> {
        if parallel {
            self.predict_parallel(data, missing)
        } else {
            self.predict_single_threaded(data, missing)
        }
    }

    /// Class probabilities of every row of `data`, one vector of `n_classes` values per row.
    pub fn predict_proba(&self, data: &Matrix<f64>, parallel: bool, missing: &f64) -> Vec<Vec<f64>> {
        if parallel {
            data.index
                .par_iter()
                .map(|i| self.predict_proba_row(&data.get_row(*i), missing))
                .collect()
        } else {
            data.index
                .iter()
                .map(|i| self.predict_proba_row(&data.get_row(*i), missing))
                .collect()
        }
    }
}
