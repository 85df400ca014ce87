use serde::{Deserialize, Serialize};

/// A single node in a flat-array decision tree.
///
/// `Split` children are indices into the owning tree's node vector, so a
/// whole tree serializes as one contiguous array with no pointer chasing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A trained CART-style decision tree stored as a flat node array.
///
/// The root is always node `0`. Rows descend left when the split feature is
/// less than or equal to the threshold, right otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub(crate) fn from_nodes(nodes: Vec<Node>) -> Self {
        debug_assert!(!nodes.is_empty(), "a tree needs at least a root leaf");
        Self { nodes }
    }

    /// Walks the tree from the root and returns the leaf value for `row`.
    #[must_use]
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes[index] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::{DecisionTree, Node};

    fn stump() -> DecisionTree {
        DecisionTree::from_nodes(vec![
            Node::Split {
                feature: 0,
                threshold: 1.5,
                left: 1,
                right: 2,
            },
            Node::Leaf { value: -1.0 },
            Node::Leaf { value: 1.0 },
        ])
    }

    #[test]
    fn walk_descends_left_on_equal_threshold() {
        let tree = stump();
        assert!((tree.predict_row(&[1.5]) - -1.0).abs() < f64::EPSILON);
        assert!((tree.predict_row(&[1.6]) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn single_leaf_tree_is_constant() {
        let tree = DecisionTree::from_nodes(vec![Node::Leaf { value: 4.2 }]);
        assert!((tree.predict_row(&[0.0, 0.0]) - 4.2).abs() < f64::EPSILON);
        assert_eq!(tree.node_count(), 1);
    }
}
