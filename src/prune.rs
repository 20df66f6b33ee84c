//! Prune
//!
//! Reduced error pruning. Internal nodes are visited bottom up, each one is
//! tentatively collapsed into a leaf predicting its majority class, and the
//! collapse is kept when the score on held out rows does not drop.
use crate::data::Matrix;
use crate::metric::Metric;
use crate::node::Node;
use crate::tree::Tree;
use log::{debug, info, warn};

/// Scores a tree against held out rows, in `[0, 1]`.
pub trait AccuracyOracle {
    fn accuracy(&self, tree: &Tree) -> f64;
}

impl<F> AccuracyOracle for F
where
    F: Fn(&Tree) -> f64,
{
    fn accuracy(&self, tree: &Tree) -> f64 {
        self(tree)
    }
}

/// Oracle scoring predictions on a validation matrix.
pub struct HoldoutAccuracy<'a> {
    data: &'a Matrix<'a, f64>,
    y: &'a [f64],
    missing: f64,
    metric: Metric,
}

impl<'a> HoldoutAccuracy<'a> {
    pub fn new(data: &'a Matrix<'a, f64>, y: &'a [f64], missing: f64, metric: Metric) -> Self {
        HoldoutAccuracy {
            data,
            y,
            missing,
            metric,
        }
    }
}

impl AccuracyOracle for HoldoutAccuracy<'_> {
    fn accuracy(&self, tree: &Tree) -> f64 {
        let yhat = tree.predict(self.data, false, &self.missing);
        self.metric.calculate(self.y, &yhat)
    }
}

/// Outcome of a pruning pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PruneReport {
    pub accuracy_before: f64,
    pub accuracy_after: f64,
    pub nodes_before: usize,
    pub nodes_after: usize,
    /// Number of internal nodes turned into leaves.
    pub collapsed: usize,
}

impl Tree {
    /// Paths, as the feature values followed from the root, of all internal
    /// nodes, children before their parent.
    fn internal_paths_post_order(&self) -> Vec<Vec<usize>> {
        fn visit(node: &Node, path: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
            for (value, child) in node.sorted_children() {
                path.push(value);
                visit(child, path, out);
                path.pop();
            }
            if node.is_internal() {
                out.push(path.clone());
            }
        }
        let mut out = Vec::new();
        visit(&self.root, &mut Vec::new(), &mut out);
        out
    }

    /// Prune the tree in place with a single post order pass.
    ///
    /// The best tree seen and its score start as the unpruned tree. Each
    /// internal node in turn is collapsed into a majority leaf and the whole
    /// tree rescored; a score at least as good as the best keeps the collapse
    /// and snapshots the tree, a worse score restores the node. The tree left
    /// behind is the best snapshot, so its score is never below the unpruned one.
    ///
    /// If the oracle can not score the unpruned tree (`NaN`, e.g. no
    /// validation rows) the tree is left untouched.
    pub fn prune<A: AccuracyOracle>(&mut self, oracle: &A) -> PruneReport {
        let nodes_before = self.n_nodes();
        let mut best_accuracy = oracle.accuracy(self);
        let accuracy_before = best_accuracy;
        let mut collapsed = 0;

        if best_accuracy.is_nan() {
            warn!("Unable to score the tree on the validation data, pruning skipped.");
            return PruneReport {
                accuracy_before,
                accuracy_after: accuracy_before,
                nodes_before,
                nodes_after: nodes_before,
                collapsed,
            };
        }

        let mut best_tree = self.clone();
        for path in self.internal_paths_post_order() {
            let Some(removed) = self.root.descendant_mut(&path).and_then(|n| n.collapse()) else {
                continue;
            };
            let accuracy = oracle.accuracy(self);
            if accuracy >= best_accuracy {
                debug!(
                    "Collapsed node at {:?}, accuracy {:.4} -> {:.4}.",
                    path, best_accuracy, accuracy
                );
                best_accuracy = accuracy;
                best_tree = self.clone();
                collapsed += 1;
            } else if let Some(node) = self.root.descendant_mut(&path) {
                node.restore(removed);
            }
        }
        *self = best_tree;

        let nodes_after = self.n_nodes();
        info!(
            "Pruning: n_nodes: {} -> {}, accuracy: {:.4} -> {:.4}",
            nodes_before, nodes_after, accuracy_before, best_accuracy
        );
        PruneReport {
            accuracy_before,
            accuracy_after: best_accuracy,
            nodes_before,
            nodes_after,
            collapsed,
        }
    }
}
