use crate::utils::argmax_count;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A node of a categorical decision tree.
///
/// A node owns its children, so the tree is a strict hierarchy and cloning
/// the root deep copies the whole tree. After building, every node is either
/// a leaf (`label` set) or internal (`split_feature` set, with at least one child).
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct Node {
    /// Training rows routed to this node.
    pub instances: Vec<usize>,
    /// Features split on by the ancestors of this node, root first.
    pub used_features: Vec<usize>,
    pub depth: usize,
    /// Number of training rows of each class in `instances`.
    pub class_counts: Vec<usize>,
    pub split_feature: Option<usize>,
    /// Gain ratio of the split, zero on leaves.
    pub split_gain: f64,
    pub children: HashMap<usize, Node>,
    pub label: Option<usize>,
}

/// The structure removed from a node when it is collapsed into a leaf,
/// kept so the collapse can be undone.
#[derive(Debug)]
pub struct CollapsedSplit {
    split_feature: usize,
    split_gain: f64,
    children: HashMap<usize, Node>,
}

impl Node {
    /// Create an undecided node, neither leaf nor internal yet.
    pub fn new(instances: Vec<usize>, used_features: Vec<usize>, depth: usize, class_counts: Vec<usize>) -> Self {
        Node {
            instances,
            used_features,
            depth,
            class_counts,
            split_feature: None,
            split_gain: 0.0,
            children: HashMap::new(),
            label: None,
        }
    }

    pub fn is_leaf(&self) -> bool {
        self.label.is_some()
    }

    pub fn is_internal(&self) -> bool {
        self.split_feature.is_some()
    }

    pub fn n_instances(&self) -> usize {
        self.instances.len()
    }

    /// Most common class of the rows routed here, ties go to the lowest class.
    pub fn majority_label(&self) -> usize {
        argmax_count(&self.class_counts)
    }

    /// The single class of the node if all of its rows share it.
    pub fn pure_label(&self) -> Option<usize> {
        let mut present = self.class_counts.iter().enumerate().filter(|(_, c)| **c > 0);
        match (present.next(), present.next()) {
            (Some((class, _)), None) => Some(class),
            _ => None,
        }
    }

    pub fn is_feature_used(&self, feature: usize) -> bool {
        self.used_features.contains(&feature)
    }

    /// Turn this node into a leaf predicting `label`.
    pub fn make_leaf(&mut self, label: usize) {
        self.split_feature = None;
        self.split_gain = 0.0;
        self.children.clear();
        self.label = Some(label);
    }

    /// Turn this node into an internal node, this consumes the children.
    pub fn make_parent_node(&mut self, split_feature: usize, split_gain: f64, children: HashMap<usize, Node>) {
        self.label = None;
        self.split_feature = Some(split_feature);
        self.split_gain = split_gain;
        self.children = children;
    }

    /// Collapse an internal node into a leaf predicting its majority class.
    /// Returns what was removed, or `None` if the node was already a leaf.
    pub fn collapse(&mut self) -> Option<CollapsedSplit> {
        let split_feature = self.split_feature.take()?;
        let collapsed = CollapsedSplit {
            split_feature,
            split_gain: self.split_gain,
            children: std::mem::take(&mut self.children),
        };
        self.split_gain = 0.0;
        self.label = Some(self.majority_label());
        Some(collapsed)
    }

    /// Undo a [`Node::collapse`].
    pub fn restore(&mut self, collapsed: CollapsedSplit) {
        self.make_parent_node(collapsed.split_feature, collapsed.split_gain, collapsed.children);
    }

    /// Child to follow for a feature value. Missing values and values never
    /// seen during training have no child.
    pub fn get_child(&self, value: Option<usize>) -> Option<&Node> {
        value.and_then(|v| self.children.get(&v))
    }

    /// Children in ascending order of the feature value they cover.
    pub fn sorted_children(&self) -> Vec<(usize, &Node)> {
        let mut children: Vec<(usize, &Node)> = self.children.iter().map(|(v, n)| (*v, n)).collect();
        children.sort_unstable_by_key(|(v, _)| *v);
        children
    }

    /// Follow a path of feature values down from this node.
    pub fn descendant_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let mut node = self;
        for v in path {
            node = node.children.get_mut(v)?;
        }
        Some(node)
    }

    /// Number of nodes in the subtree rooted here.
    pub fn n_nodes(&self) -> usize {
        1 + self.children.values().map(|c| c.n_nodes()).sum::<usize>()
    }

    pub fn n_leaves(&self) -> usize {
        if self.children.is_empty() {
            1
        } else {
            self.children.values().map(|c| c.n_leaves()).sum()
        }
    }

    /// Depth of the deepest node in the subtree rooted here.
    pub fn max_depth(&self) -> usize {
        self.children
            .values()
            .map(|c| c.max_depth())
            .max()
            .unwrap_or(self.depth)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.label, self.split_feature) {
            (Some(label), _) => write!(f, "leaf={},cover={}", label, self.instances.len()),
            (None, Some(feature)) => write!(
                f,
                "[f{}] children={},gain_ratio={:.4},cover={}",
                feature,
                self.children.len(),
                self.split_gain,
                self.instances.len()
            ),
            (None, None) => write!(f, "open,cover={}", self.instances.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(instances: Vec<usize>, counts: Vec<usize>, label: usize) -> Node {
        let mut n = Node::new(instances, vec![0], 1, counts);
        n.make_leaf(label);
        n
    }

    fn stump() -> Node {
        let mut root = Node::new(vec![0, 1, 2], vec![], 0, vec![2, 1]);
        let children: HashMap<usize, Node> = [(0, leaf(vec![0, 1], vec![2, 0], 0)), (1, leaf(vec![2], vec![0, 1], 1))]
            .into_iter()
            .collect();
        root.make_parent_node(0, 1.0, children);
        root
    }

    #[test]
    fn test_pure_label() {
        let n = Node::new(vec![0, 1], vec![], 0, vec![0, 2, 0]);
        assert_eq!(n.pure_label(), Some(1));
        let n = Node::new(vec![0, 1], vec![], 0, vec![1, 1, 0]);
        assert_eq!(n.pure_label(), None);
        assert_eq!(n.majority_label(), 0);
    }

    #[test]
    fn test_leaf_or_internal() {
        let root = stump();
        assert!(root.is_internal());
        assert!(!root.is_leaf());
        assert!(root.children.values().all(|c| c.is_leaf() && !c.is_internal()));
        assert_eq!(root.n_nodes(), 3);
        assert_eq!(root.n_leaves(), 2);
        assert_eq!(root.max_depth(), 1);
    }

    #[test]
    fn test_collapse_and_restore() {
        let mut root = stump();
        let before = root.clone();
        let collapsed = root.collapse().unwrap();
        assert!(root.is_leaf());
        assert!(!root.is_internal());
        assert!(root.children.is_empty());
        assert_eq!(root.label, Some(0));
        assert!(root.collapse().is_none());
        root.restore(collapsed);
        assert_eq!(root, before);
    }

    #[test]
    fn test_get_child() {
        let root = stump();
        assert_eq!(root.get_child(Some(1)).and_then(|c| c.label), Some(1));
        assert!(root.get_child(Some(2)).is_none());
        assert!(root.get_child(None).is_none());
    }

    #[test]
    fn test_display() {
        let root = stump();
        assert_eq!(format!("{}", root), "[f0] children=2,gain_ratio=1.0000,cover=3");
        assert_eq!(format!("{}", root.children[&1]), "leaf=1,cover=1");
    }
}
