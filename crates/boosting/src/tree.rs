//! Decision Tree Structures

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Node of a depth-wise regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Internal node: rows with `value <= threshold` go left
    Split {
        feature: u32,
        threshold: f64,
        left: u32,
        right: u32,
    },
    /// Terminal node holding an additive margin contribution
    Leaf { value: f64 },
}

/// Regression tree stored as a flat node arena, root at index 0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

impl Tree {
    /// Margin contribution for one row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0usize;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    idx = if row[*feature as usize] <= *threshold {
                        *left as usize
                    } else {
                        *right as usize
                    };
                }
                None => return 0.0,
            }
        }
    }

    /// Number of leaves
    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    /// Depth of the deepest leaf (a single leaf has depth 0)
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left as usize).max(walk(nodes, *right as usize))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

/// One level of an oblivious tree: the same test applied to every node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSplit {
    pub feature: u32,
    pub threshold: f64,
}

/// Symmetric tree: `levels.len() == d` and `leaves.len() == 2^d`
///
/// The leaf index is built bit by bit, level `l` contributing
/// `(value > threshold) << l`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObliviousTree {
    pub levels: Vec<LevelSplit>,
    pub leaves: Vec<f64>,
}

impl ObliviousTree {
    /// Leaf index a row falls into
    pub fn leaf_index(&self, row: ArrayView1<f64>) -> usize {
        self.levels
            .iter()
            .enumerate()
            .fold(0usize, |acc, (level, split)| {
                let bit = usize::from(row[split.feature as usize] > split.threshold);
                acc | (bit << level)
            })
    }

    /// Margin contribution for one row
    pub fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        self.leaves.get(self.leaf_index(row)).copied().unwrap_or(0.0)
    }

    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_tree_routing() {
        let tree = Tree {
            nodes: vec![
                Node::Split {
                    feature: 1,
                    threshold: 0.5,
                    left: 1,
                    right: 2,
                },
                Node::Leaf { value: -1.0 },
                Node::Leaf { value: 2.0 },
            ],
        };
        assert_eq!(tree.predict_row(array![9.0, 0.5].view()), -1.0);
        assert_eq!(tree.predict_row(array![9.0, 0.6].view()), 2.0);
        assert_eq!(tree.leaf_count(), 2);
        assert_eq!(tree.depth(), 1);
    }

    #[test]
    fn test_empty_tree_scores_zero() {
        let tree = Tree::default();
        assert_eq!(tree.predict_row(array![1.0].view()), 0.0);
    }

    #[test]
    fn test_oblivious_leaf_index() {
        let tree = ObliviousTree {
            levels: vec![
                LevelSplit { feature: 0, threshold: 0.0 },
                LevelSplit { feature: 1, threshold: 10.0 },
            ],
            leaves: vec![0.1, 0.2, 0.3, 0.4],
        };
        assert_eq!(tree.leaf_index(array![-1.0, 5.0].view()), 0);
        assert_eq!(tree.leaf_index(array![1.0, 5.0].view()), 1);
        assert_eq!(tree.leaf_index(array![-1.0, 11.0].view()), 2);
        assert_eq!(tree.predict_row(array![1.0, 11.0].view()), 0.4);
    }
}
