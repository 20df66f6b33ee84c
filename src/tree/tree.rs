use crate::constants::MISSING;
use crate::data::{CategoricalDataset, Dataset, Matrix};
use crate::errors::DecisionTreeError;
use crate::node::Node;
use crate::splitter::{GainRatioSplitter, Splitter};
use hashbrown::HashMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// A categorical decision tree.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Tree {
    pub root: Node,
    /// Number of feature columns the tree was trained on.
    pub n_features: usize,
    pub n_classes: usize,
}

/// Train a tree with the gain ratio splitter, treating every column as
/// categorical and `NaN` as missing.
///
/// * `data` - Feature codes, one column per feature.
/// * `y` - Class of every row.
pub fn train(data: &Matrix<f64>, y: &[f64]) -> Result<Tree, DecisionTreeError> {
    let dataset = CategoricalDataset::new(data, y, MISSING)?;
    Tree::fit(&dataset, &GainRatioSplitter::new(), None)
}

impl Tree {
    /// Grow a tree top down over all rows of `data`.
    ///
    /// * `data` - The training rows.
    /// * `splitter` - Chooses the feature every node is split on.
    /// * `max_depth` - Optional depth at which nodes are turned into leaves.
    pub fn fit<D: Dataset, S: Splitter>(
        data: &D,
        splitter: &S,
        max_depth: Option<usize>,
    ) -> Result<Self, DecisionTreeError> {
        if data.rows() == 0 {
            return Err(DecisionTreeError::EmptyData);
        }
        let index: Vec<usize> = (0..data.rows()).collect();
        let class_counts = data.class_counts(&index);
        let mut root = Node::new(index, Vec::new(), 0, class_counts);

        let builder = Builder {
            data,
            splitter,
            n_splittable: (0..data.cols()).filter(|c| data.is_categorical(*c)).count(),
            max_depth,
        };
        if max_depth == Some(0) {
            root.make_leaf(root.majority_label());
        } else {
            builder.build_node(&mut root)?;
        }

        let tree = Tree {
            root,
            n_features: data.cols(),
            n_classes: data.n_classes(),
        };
        info!(
            "Fitted tree: {} nodes, {} leaves, depth {}.",
            tree.n_nodes(),
            tree.n_leaves(),
            tree.depth()
        );
        Ok(tree)
    }

    pub fn n_nodes(&self) -> usize {
        self.root.n_nodes()
    }

    pub fn n_leaves(&self) -> usize {
        self.root.n_leaves()
    }

    pub fn depth(&self) -> usize {
        self.root.max_depth()
    }

    fn calc_feature_node_stats<F>(&self, calc_stat: &F, node: &Node, stats: &mut HashMap<usize, (f64, usize)>)
    where
        F: Fn(&Node) -> f64,
    {
        let Some(feature) = node.split_feature else {
            return;
        };
        stats
            .entry(feature)
            .and_modify(|(v, c)| {
                *v += calc_stat(node);
                *c += 1;
            })
            .or_insert((calc_stat(node), 1));
        for child in node.children.values() {
            self.calc_feature_node_stats(calc_stat, child, stats);
        }
    }

    /// Count the splits made on every feature.
    pub fn calculate_importance_weight(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.calc_feature_node_stats(&|_: &Node| 1., &self.root, stats);
    }

    /// Sum the gain ratio of the splits made on every feature.
    pub fn calculate_importance_gain(&self, stats: &mut HashMap<usize, (f64, usize)>) {
        self.calc_feature_node_stats(&|n: &Node| n.split_gain, &self.root, stats);
    }
}

/// Recursive partitioning of nodes. A node is open when created and is
/// decided as either a leaf or an internal node, the children of an internal
/// node being built in turn.
struct Builder<'a, D, S> {
    data: &'a D,
    splitter: &'a S,
    /// Number of categorical features, the most any path can split on.
    n_splittable: usize,
    max_depth: Option<usize>,
}

impl<D: Dataset, S: Splitter> Builder<'_, D, S> {
    fn build_node(&self, node: &mut Node) -> Result<(), DecisionTreeError> {
        let Some(split) = self.splitter.best_split(node, self.data) else {
            node.make_leaf(node.majority_label());
            return Ok(());
        };
        let feature = split.split_feature;
        if node.is_feature_used(feature) || !self.data.is_categorical(feature) {
            return Err(DecisionTreeError::NoSplittableFeature(node.depth));
        }

        let mut children = self.splitter.split_node(node, self.data, feature);
        if children.is_empty() {
            return Err(DecisionTreeError::NoSplittableFeature(node.depth));
        }
        debug!(
            "Splitting {} rows at depth {} on feature {}, gain ratio {:.4}, {} children.",
            node.n_instances(),
            node.depth,
            feature,
            split.gain_ratio,
            children.len()
        );

        for child in children.values_mut() {
            if let Some(label) = child.pure_label() {
                child.make_leaf(label);
            } else if child.used_features.len() >= self.n_splittable
                || self.max_depth.is_some_and(|d| child.depth >= d)
            {
                child.make_leaf(child.majority_label());
            } else {
                self.build_node(child)?;
            }
        }
        node.make_parent_node(feature, split.gain_ratio, children);
        Ok(())
    }
}

impl Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut print_buffer: Vec<(Option<(usize, usize)>, &Node)> = vec![(None, &self.root)];
        let mut r = String::new();
        while let Some((branch, node)) = print_buffer.pop() {
            let indent = "      ".repeat(node.depth);
            match branch {
                Some((feature, value)) => r += format!("{}f{}={} -> {}\n", indent, feature, value, node).as_str(),
                None => r += format!("{}{}\n", indent, node).as_str(),
            }
            if let Some(feature) = node.split_feature {
                for (value, child) in node.sorted_children().into_iter().rev() {
                    print_buffer.push((Some((feature, value)), child));
                }
            }
        }
        write!(f, "{}", r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Every node is exactly one of leaf or internal with children, and
    /// no path splits twice on the same feature.
    fn assert_well_formed(node: &Node, n_features: usize) {
        assert!(node.used_features.len() <= n_features);
        match (node.label, node.split_feature) {
            (Some(_), None) => assert!(node.children.is_empty()),
            (None, Some(feature)) => {
                assert!(!node.children.is_empty());
                assert!(!node.is_feature_used(feature));
                for child in node.children.values() {
                    assert_eq!(child.used_features.last(), Some(&feature));
                    assert_eq!(child.depth, node.depth + 1);
                    assert_well_formed(child, n_features);
                }
            }
            _ => panic!("node is neither a leaf nor internal: {:?}", node),
        }
    }

    fn pure_split_data() -> (Vec<f64>, Vec<f64>) {
        let f0 = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let f1 = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let f2 = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let f3 = [1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0];
        let y = vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        ([f0, f1, f2, f3].concat(), y)
    }

    #[test]
    fn test_pure_split_on_first_feature() {
        let (v, y) = pure_split_data();
        let m = Matrix::new(&v, 8, 4);
        let tree = train(&m, &y).unwrap();
        assert_eq!(tree.root.split_feature, Some(0));
        assert_eq!(tree.root.children.len(), 2);
        assert_eq!(tree.root.children[&0].label, Some(0));
        assert_eq!(tree.root.children[&1].label, Some(1));
        assert!(tree.root.children.values().all(|c| c.is_leaf()));
        assert_eq!(tree.n_nodes(), 3);
        assert_eq!(tree.depth(), 1);
        assert_well_formed(&tree.root, 4);
    }

    #[test]
    fn test_no_discriminating_feature_makes_majority_leaf() {
        // every row shares the same feature values
        let v = vec![1.0, 1.0, 1.0, 0.0, 0.0, 0.0];
        let m = Matrix::new(&v, 3, 2);
        let tree = train(&m, &[1.0, 0.0, 1.0]).unwrap();
        assert!(tree.root.is_leaf());
        assert_eq!(tree.root.label, Some(1));
    }

    #[test]
    fn test_xor_uses_both_features() {
        let f0 = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let f1 = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let f2 = [0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0];
        let v: Vec<f64> = [f0, f1, f2].concat();
        let y = [0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0];
        let m = Matrix::new(&v, 8, 3);
        let tree = train(&m, &y).unwrap();
        assert_well_formed(&tree.root, 3);
        for row in 0..8 {
            assert_eq!(tree.predict_row(&m.get_row(row), &f64::NAN), y[row] as usize);
        }
    }

    #[test]
    fn test_siblings_reuse_features() {
        // f1 is useful under both values of f0, each sibling must be able to split on it
        let f0 = [0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0];
        let f1 = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let f2 = [0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let v: Vec<f64> = [f0, f1, f2].concat();
        let y = [0.0, 0.0, 1.0, 1.0, 2.0, 2.0, 3.0, 3.0];
        let m = Matrix::new(&v, 8, 3);
        let tree = train(&m, &y).unwrap();
        assert_eq!(tree.root.split_feature, Some(0));
        for child in tree.root.children.values() {
            assert_eq!(child.split_feature, Some(1));
            assert_eq!(child.used_features, vec![0]);
        }
        assert_well_formed(&tree.root, 3);
    }

    #[test]
    fn test_max_depth() {
        let f0 = [0.0, 0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 1.0];
        let f1 = [0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0];
        let v: Vec<f64> = [f0, f1].concat();
        let y = [0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0, 1.0];
        let m = Matrix::new(&v, 8, 2);
        let ds = CategoricalDataset::new(&m, &y, f64::NAN).unwrap();
        let tree = Tree::fit(&ds, &GainRatioSplitter::new(), Some(1)).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_well_formed(&tree.root, 2);
        let tree = Tree::fit(&ds, &GainRatioSplitter::new(), Some(0)).unwrap();
        assert!(tree.root.is_leaf());
        assert_eq!(tree.root.label, Some(1));
    }

    #[test]
    fn test_empty_and_mismatched_input() {
        let v: Vec<f64> = Vec::new();
        let m = Matrix::new(&v, 0, 2);
        assert!(matches!(train(&m, &[]), Err(DecisionTreeError::EmptyData)));
        let v = vec![0.0, 1.0];
        let m = Matrix::new(&v, 2, 1);
        assert!(matches!(train(&m, &[0.0]), Err(DecisionTreeError::InputShape(2, 1))));
    }

    #[test]
    fn test_large_codes_and_invalid_values() {
        let v = vec![0.0, 1.0, 1e15, 0.0];
        let m = Matrix::new(&v, 4, 1);
        let tree = train(&m, &[0.0, 1.0, 1.0, 0.0]).unwrap();
        assert_eq!(tree.root.split_feature, Some(0));
        assert_eq!(tree.root.children.len(), 3);
        assert_eq!(tree.predict_row(&[1e15], &f64::NAN), 1);
        assert_eq!(tree.predict_row(&[0.0], &f64::NAN), 0);

        let v = vec![0.0, 1.0, f64::INFINITY, 0.0];
        let m = Matrix::new(&v, 4, 1);
        assert!(matches!(
            train(&m, &[0.0, 1.0, 1.0, 0.0]),
            Err(DecisionTreeError::InvalidCategory(2, 0, _))
        ));
        let v = vec![-2.0, -3.0, -2.0, -3.0, 0.0, 1.0, 0.0, 1.0];
        let m = Matrix::new(&v, 4, 2);
        assert!(matches!(
            train(&m, &[0.0, 1.0, 0.0, 1.0]),
            Err(DecisionTreeError::InvalidCategory(0, 0, _))
        ));
    }

    #[test]
    fn test_importance() {
        let (v, y) = pure_split_data();
        let m = Matrix::new(&v, 8, 4);
        let tree = train(&m, &y).unwrap();
        let mut stats = HashMap::new();
        tree.calculate_importance_weight(&mut stats);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[&0], (1.0, 1));
        let mut stats = HashMap::new();
        tree.calculate_importance_gain(&mut stats);
        assert_eq!(stats[&0].1, 1);
        assert!((stats[&0].0 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_display() {
        let (v, y) = pure_split_data();
        let m = Matrix::new(&v, 8, 4);
        let tree = train(&m, &y).unwrap();
        let expected = "[f0] children=2,gain_ratio=1.0000,cover=8\n      f0=0 -> leaf=0,cover=4\n      f0=1 -> leaf=1,cover=4\n";
        assert_eq!(format!("{}", tree), expected);
    }
}
