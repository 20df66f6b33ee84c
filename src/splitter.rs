//! Splitter
//!
//! Information theoretic scoring of candidate features. A node is split on
//! the unused categorical feature with the greatest gain ratio, that is the
//! information gain of the partition normalised by the split information of
//! the feature itself.
//!
//! Rows whose value for a feature is missing are left out of that feature's
//! counts. The information gain is computed on the rows where the feature is
//! known and scaled by the fraction of such rows, and the split information
//! uses the known rows as its denominator.
use crate::constants::GAIN_EPSILON;
use crate::data::Dataset;
use crate::node::Node;
use crate::utils::entropy_from_counts;
use hashbrown::HashMap;

/// Score of a candidate split.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitInfo {
    pub split_feature: usize,
    pub information_gain: f64,
    pub split_information: f64,
    pub gain_ratio: f64,
}

/// Class counts of a node's rows broken down by the value of one feature.
/// Only values taken by at least one row are kept, so the size does not
/// depend on how large the codes are.
struct FeatureCounts {
    /// Class counts of the rows taking each value, in ascending value order.
    by_value: Vec<(usize, Vec<usize>)>,
    missing: usize,
}

impl FeatureCounts {
    fn new<D: Dataset>(node: &Node, data: &D, feature: usize) -> Self {
        let n_classes = data.n_classes();
        let mut counts: HashMap<usize, Vec<usize>> = HashMap::new();
        let mut missing = 0;
        for row in node.instances.iter() {
            match data.value(*row, feature) {
                Some(v) => counts.entry(v).or_insert_with(|| vec![0; n_classes])[data.label(*row)] += 1,
                None => missing += 1,
            }
        }
        // sorted, so sums are taken in the same order on every run
        let mut by_value: Vec<(usize, Vec<usize>)> = counts.into_iter().collect();
        by_value.sort_unstable_by_key(|(v, _)| *v);
        FeatureCounts { by_value, missing }
    }

    fn value_totals(&self) -> Vec<usize> {
        self.by_value.iter().map(|(_, c)| c.iter().sum()).collect()
    }

    fn known(&self) -> usize {
        self.by_value.iter().flat_map(|(_, c)| c.iter()).sum()
    }
}

/// Entropy in bits of the class distribution of a node.
/// Zero for a pure node, `log2(C)` when all `C` classes are equally common.
pub fn entropy(node: &Node) -> f64 {
    entropy_from_counts(&node.class_counts)
}

/// Entropy of the distribution of a feature's values across the node's rows.
pub fn split_information<D: Dataset>(node: &Node, data: &D, feature: usize) -> f64 {
    if !data.is_categorical(feature) {
        return 0.0;
    }
    entropy_from_counts(&FeatureCounts::new(node, data, feature).value_totals())
}

/// Reduction in class entropy obtained by partitioning the node on `feature`.
pub fn information_gain<D: Dataset>(node: &Node, data: &D, feature: usize) -> f64 {
    if !data.is_categorical(feature) {
        return 0.0;
    }
    gain_from_counts(&FeatureCounts::new(node, data, feature), data.n_classes())
}

fn gain_from_counts(counts: &FeatureCounts, n_classes: usize) -> f64 {
    let known = counts.known();
    if known == 0 {
        return 0.0;
    }
    let mut known_classes = vec![0; n_classes];
    for (_, value_counts) in counts.by_value.iter() {
        for (c, n) in value_counts.iter().enumerate() {
            known_classes[c] += n;
        }
    }
    let remainder: f64 = counts
        .by_value
        .iter()
        .map(|(_, value_counts)| {
            let n_value: usize = value_counts.iter().sum();
            (n_value as f64 / known as f64) * entropy_from_counts(value_counts)
        })
        .sum();
    let known_fraction = known as f64 / (known + counts.missing) as f64;
    (known_fraction * (entropy_from_counts(&known_classes) - remainder)).max(0.0)
}

/// Gain ratio of a feature, `None` when the feature is constant within the
/// node (zero split information) or not categorical.
pub fn gain_ratio<D: Dataset>(node: &Node, data: &D, feature: usize) -> Option<f64> {
    GainRatioSplitter::new()
        .evaluate_feature(node, data, feature)
        .map(|s| s.gain_ratio)
}

/// Trait for choosing and applying the split of a node.
pub trait Splitter {
    /// Score a single feature, returning `None` if it can not be used to split the node.
    fn evaluate_feature<D: Dataset>(&self, node: &Node, data: &D, feature: usize) -> Option<SplitInfo>;

    /// Find the best feature to split on among the features not already
    /// used on the path to the node. Features are scanned in ascending column
    /// order and only a strictly greater score replaces the current best, so
    /// ties go to the lowest feature index. Candidates without a positive
    /// information gain are skipped.
    fn best_split<D: Dataset>(&self, node: &Node, data: &D) -> Option<SplitInfo> {
        let mut best: Option<SplitInfo> = None;
        for feature in 0..data.cols() {
            if node.is_feature_used(feature) || !data.is_categorical(feature) {
                continue;
            }
            let Some(info) = self.evaluate_feature(node, data, feature) else {
                continue;
            };
            if info.information_gain <= GAIN_EPSILON {
                continue;
            }
            if best.map_or(true, |b| info.gain_ratio > b.gain_ratio) {
                best = Some(info);
            }
        }
        best
    }

    /// Partition a node's rows on a feature, creating one open child per
    /// value that at least one row takes. Every child inherits its own copy
    /// of the parent's used features with `feature` appended.
    fn split_node<D: Dataset>(&self, node: &Node, data: &D, feature: usize) -> HashMap<usize, Node> {
        let mut subsets: HashMap<usize, Vec<usize>> = HashMap::new();
        for row in node.instances.iter() {
            if let Some(v) = data.value(*row, feature) {
                subsets.entry(v).or_default().push(*row);
            }
        }
        let mut used_features = node.used_features.clone();
        used_features.push(feature);
        subsets
            .into_iter()
            .map(|(v, rows)| {
                let class_counts = data.class_counts(&rows);
                (v, Node::new(rows, used_features.clone(), node.depth + 1, class_counts))
            })
            .collect()
    }
}

/// Splitter scoring features by their gain ratio.
#[derive(Debug, Default, Clone, Copy)]
pub struct GainRatioSplitter {}

impl GainRatioSplitter {
    pub fn new() -> Self {
        GainRatioSplitter {}
    }
}

impl Splitter for GainRatioSplitter {
    fn evaluate_feature<D: Dataset>(&self, node: &Node, data: &D, feature: usize) -> Option<SplitInfo> {
        if !data.is_categorical(feature) {
            return None;
        }
        let counts = FeatureCounts::new(node, data, feature);
        let split_information = entropy_from_counts(&counts.value_totals());
        if split_information <= 0.0 {
            return None;
        }
        let information_gain = gain_from_counts(&counts, data.n_classes());
        Some(SplitInfo {
            split_feature: feature,
            information_gain,
            split_information,
            gain_ratio: information_gain / split_information,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{CategoricalDataset, Matrix};
    use crate::utils::precision_round;

    fn root<D: Dataset>(data: &D) -> Node {
        let rows: Vec<usize> = (0..data.rows()).collect();
        let counts = data.class_counts(&rows);
        Node::new(rows, Vec::new(), 0, counts)
    }

    #[test]
    fn test_entropy_and_gain_three_rows() {
        // f = [0, 0, 1], y = [A, A, B]
        let v = vec![0.0, 0.0, 1.0];
        let m = Matrix::new(&v, 3, 1);
        let ds = CategoricalDataset::new(&m, &[0.0, 0.0, 1.0], f64::NAN).unwrap();
        let node = root(&ds);
        assert_eq!(precision_round(entropy(&node), 3), 0.918);
        assert_eq!(precision_round(information_gain(&node, &ds, 0), 10), precision_round(entropy(&node), 10));
        assert_eq!(precision_round(split_information(&node, &ds, 0), 3), 0.918);
        assert_eq!(precision_round(gain_ratio(&node, &ds, 0).unwrap(), 10), 1.0);
    }

    #[test]
    fn test_entropy_zero_iff_pure() {
        let v = vec![0.0, 1.0, 0.0, 1.0];
        let m = Matrix::new(&v, 4, 1);
        let ds = CategoricalDataset::new(&m, &[1.0, 1.0, 1.0, 1.0], f64::NAN).unwrap();
        assert_eq!(entropy(&root(&ds)), 0.0);

        let ds = CategoricalDataset::new(&m, &[0.0, 1.0, 2.0, 3.0], f64::NAN).unwrap();
        assert_eq!(precision_round(entropy(&root(&ds)), 10), 2.0);
        assert!(entropy(&root(&ds)) > 0.0);
    }

    #[test]
    fn test_gain_bounded_by_entropy() {
        // columns: informative, noisy, constant, high cardinality
        let f0 = [0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0];
        let f1 = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let f2 = [1.0; 8];
        let f3 = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let v: Vec<f64> = [f0, f1, f2, f3].concat();
        let m = Matrix::new(&v, 8, 4);
        let y = [0.0, 0.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let ds = CategoricalDataset::new(&m, &y, f64::NAN).unwrap();
        let node = root(&ds);
        let h = entropy(&node);
        for feature in 0..4 {
            let g = information_gain(&node, &ds, feature);
            assert!(g >= 0.0);
            assert!(g <= h + 1e-12);
        }
        // constant column is never eligible
        assert!(gain_ratio(&node, &ds, 2).is_none());
        // the id-like column has maximal gain but is penalised by its split information
        let g3 = information_gain(&node, &ds, 3);
        assert_eq!(precision_round(g3, 10), precision_round(h, 10));
        assert_eq!(precision_round(split_information(&node, &ds, 3), 10), 3.0);
    }

    #[test]
    fn test_best_split_prefers_gain_ratio() {
        // f0 is an id column (gain 1, split info 2), f1 separates the classes (gain 1, split info 1)
        let v = vec![0.0, 1.0, 2.0, 3.0, 0.0, 0.0, 1.0, 1.0];
        let m = Matrix::new(&v, 4, 2);
        let ds = CategoricalDataset::new(&m, &[0.0, 0.0, 1.0, 1.0], f64::NAN).unwrap();
        let best = GainRatioSplitter::new().best_split(&root(&ds), &ds).unwrap();
        assert_eq!(best.split_feature, 1);
        assert_eq!(precision_round(best.gain_ratio, 10), 1.0);
    }

    #[test]
    fn test_best_split_ties_lowest_index() {
        // f0 and f1 are identical
        let v = vec![0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let m = Matrix::new(&v, 4, 2);
        let ds = CategoricalDataset::new(&m, &[0.0, 1.0, 0.0, 1.0], f64::NAN).unwrap();
        let splitter = GainRatioSplitter::new();
        let node = root(&ds);
        assert_eq!(splitter.best_split(&node, &ds).unwrap().split_feature, 0);

        let mut used = node.clone();
        used.used_features = vec![0];
        assert_eq!(splitter.best_split(&used, &ds).unwrap().split_feature, 1);
        used.used_features = vec![0, 1];
        assert!(splitter.best_split(&used, &ds).is_none());
    }

    #[test]
    fn test_best_split_none_without_gain() {
        // the feature varies but carries no information about the class
        let v = vec![0.0, 1.0, 0.0, 1.0];
        let m = Matrix::new(&v, 4, 1);
        let ds = CategoricalDataset::new(&m, &[0.0, 0.0, 1.0, 1.0], f64::NAN).unwrap();
        assert!(GainRatioSplitter::new().best_split(&root(&ds), &ds).is_none());
    }

    #[test]
    fn test_missing_values_are_excluded() {
        // f = [0, 0, 1, 1, NaN, NaN], y = [0, 0, 1, 1, 0, 1]
        let v = vec![0.0, 0.0, 1.0, 1.0, f64::NAN, f64::NAN];
        let m = Matrix::new(&v, 6, 1);
        let ds = CategoricalDataset::new(&m, &[0.0, 0.0, 1.0, 1.0, 0.0, 1.0], f64::NAN).unwrap();
        let node = root(&ds);
        // split information over the four known rows only
        assert_eq!(precision_round(split_information(&node, &ds, 0), 10), 1.0);
        // perfect split on the known rows, scaled by the known fraction 4/6
        assert_eq!(precision_round(information_gain(&node, &ds, 0), 10), precision_round(4.0 / 6.0, 10));
        assert!(information_gain(&node, &ds, 0) <= entropy(&node));
    }

    #[test]
    fn test_large_codes_are_counted_sparsely() {
        let v = vec![0.0, 1.0, 1e15, 0.0];
        let m = Matrix::new(&v, 4, 1);
        let ds = CategoricalDataset::new(&m, &[0.0, 1.0, 1.0, 0.0], f64::NAN).unwrap();
        let node = root(&ds);
        assert_eq!(precision_round(information_gain(&node, &ds, 0), 10), 1.0);
        assert_eq!(precision_round(split_information(&node, &ds, 0), 10), 1.5);
        let best = GainRatioSplitter::new().best_split(&node, &ds).unwrap();
        assert_eq!(best.split_feature, 0);
        let children = GainRatioSplitter::new().split_node(&node, &ds, 0);
        assert_eq!(children.len(), 3);
        assert_eq!(children[&1_000_000_000_000_000].instances, vec![2]);
    }

    #[test]
    fn test_split_node_children() {
        let v = vec![0.0, 2.0, 0.0, 2.0, f64::NAN];
        let m = Matrix::new(&v, 5, 1);
        let ds = CategoricalDataset::new(&m, &[0.0, 1.0, 0.0, 1.0, 1.0], f64::NAN).unwrap();
        let mut node = root(&ds);
        node.used_features = vec![7];
        let children = GainRatioSplitter::new().split_node(&node, &ds, 0);
        // value 1 is never observed and gets no child, the missing row is not routed
        assert_eq!(children.len(), 2);
        assert_eq!(children[&0].instances, vec![0, 2]);
        assert_eq!(children[&2].instances, vec![1, 3]);
        assert_eq!(children[&2].class_counts, vec![0, 2]);
        assert_eq!(children[&0].used_features, vec![7, 0]);
        assert_eq!(children[&0].depth, 1);
        assert_eq!(node.used_features, vec![7]);
    }
}
