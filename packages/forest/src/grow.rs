use rand::rngs::StdRng;

use crate::tree::{DecisionTree, Node};

/// Stopping rules and feature-subsampling settings shared by every node of
/// one tree.
pub(crate) struct GrowParams {
    pub n_features: usize,
    pub feature_count: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

struct RegressionContext<'a> {
    rows: &'a [Vec<f64>],
    targets: &'a [f64],
    params: &'a GrowParams,
}

struct ClassificationContext<'a> {
    rows: &'a [Vec<f64>],
    labels: &'a [usize],
    class_weights: &'a [f64],
    n_classes: usize,
    params: &'a GrowParams,
}

struct CandidateSplit {
    feature: usize,
    threshold: f64,
    score: f64,
}

pub(crate) fn grow_regression_tree(
    rows: &[Vec<f64>],
    targets: &[f64],
    indices: &[usize],
    params: &GrowParams,
    rng: &mut StdRng,
) -> DecisionTree {
    let ctx = RegressionContext {
        rows,
        targets,
        params,
    };
    let mut nodes = Vec::new();
    grow_regression_node(&ctx, rng, &mut nodes, indices, 0);
    DecisionTree::from_nodes(nodes)
}

pub(crate) fn grow_classification_tree(
    rows: &[Vec<f64>],
    labels: &[usize],
    class_weights: &[f64],
    n_classes: usize,
    indices: &[usize],
    params: &GrowParams,
    rng: &mut StdRng,
) -> DecisionTree {
    let ctx = ClassificationContext {
        rows,
        labels,
        class_weights,
        n_classes,
        params,
    };
    let mut nodes = Vec::new();
    grow_classification_node(&ctx, rng, &mut nodes, indices, 0);
    DecisionTree::from_nodes(nodes)
}

fn grow_regression_node(
    ctx: &RegressionContext<'_>,
    rng: &mut StdRng,
    nodes: &mut Vec<Node>,
    indices: &[usize],
    depth: usize,
) -> usize {
    let value = mean_target(ctx.targets, indices);
    let splittable = depth < ctx.params.max_depth
        && indices.len() >= ctx.params.min_samples_split
        && !constant_target(ctx.targets, indices);
    if !splittable {
        return push_leaf(nodes, value);
    }
    let Some(split) = best_regression_split(ctx, rng, indices) else {
        return push_leaf(nodes, value);
    };
    let (left_rows, right_rows) = partition(ctx.rows, indices, split.feature, split.threshold);
    // Midpoint rounding can collapse a split when two feature values are
    // adjacent floats; such a split separates nothing.
    if left_rows.is_empty() || right_rows.is_empty() {
        return push_leaf(nodes, value);
    }
    let slot = nodes.len();
    nodes.push(Node::Leaf { value });
    let left = grow_regression_node(ctx, rng, nodes, &left_rows, depth + 1);
    let right = grow_regression_node(ctx, rng, nodes, &right_rows, depth + 1);
    nodes[slot] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    slot
}

#[allow(clippy::cast_precision_loss)] // class indices are tiny
fn grow_classification_node(
    ctx: &ClassificationContext<'_>,
    rng: &mut StdRng,
    nodes: &mut Vec<Node>,
    indices: &[usize],
    depth: usize,
) -> usize {
    let counts = weighted_counts(ctx, indices);
    let value = majority_class(&counts) as f64;
    let splittable = depth < ctx.params.max_depth
        && indices.len() >= ctx.params.min_samples_split
        && !single_label(ctx.labels, indices);
    if !splittable {
        return push_leaf(nodes, value);
    }
    let Some(split) = best_classification_split(ctx, rng, indices, &counts) else {
        return push_leaf(nodes, value);
    };
    let (left_rows, right_rows) = partition(ctx.rows, indices, split.feature, split.threshold);
    if left_rows.is_empty() || right_rows.is_empty() {
        return push_leaf(nodes, value);
    }
    let slot = nodes.len();
    nodes.push(Node::Leaf { value });
    let left = grow_classification_node(ctx, rng, nodes, &left_rows, depth + 1);
    let right = grow_classification_node(ctx, rng, nodes, &right_rows, depth + 1);
    nodes[slot] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
    };
    slot
}

fn push_leaf(nodes: &mut Vec<Node>, value: f64) -> usize {
    nodes.push(Node::Leaf { value });
    nodes.len() - 1
}

/// Scans the sampled candidate features for the split minimizing the summed
/// squared error of the two children. Thresholds sit at the midpoint between
/// consecutive distinct feature values.
fn best_regression_split(
    ctx: &RegressionContext<'_>,
    rng: &mut StdRng,
    indices: &[usize],
) -> Option<CandidateSplit> {
    let mut best: Option<CandidateSplit> = None;
    for feature in sample_features(rng, ctx.params.n_features, ctx.params.feature_count) {
        let mut ordered: Vec<(f64, f64)> = indices
            .iter()
            .map(|&row| (ctx.rows[row][feature], ctx.targets[row]))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
        let total_sum: f64 = ordered.iter().map(|pair| pair.1).sum();
        let total_sq: f64 = ordered.iter().map(|pair| pair.1 * pair.1).sum();
        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for boundary in 1..ordered.len() {
            let (prev_value, prev_target) = ordered[boundary - 1];
            left_sum += prev_target;
            left_sq += prev_target * prev_target;
            if ordered[boundary].0 <= prev_value {
                continue;
            }
            let n_left = boundary;
            let n_right = ordered.len() - boundary;
            if n_left < ctx.params.min_samples_leaf || n_right < ctx.params.min_samples_leaf {
                continue;
            }
            let score = squared_error(left_sum, left_sq, n_left)
                + squared_error(total_sum - left_sum, total_sq - left_sq, n_right);
            if best.as_ref().is_none_or(|current| score < current.score) {
                best = Some(CandidateSplit {
                    feature,
                    threshold: f64::midpoint(prev_value, ordered[boundary].0),
                    score,
                });
            }
        }
    }
    best
}

/// Same scan as the regression variant, scored by weighted Gini impurity.
fn best_classification_split(
    ctx: &ClassificationContext<'_>,
    rng: &mut StdRng,
    indices: &[usize],
    total_counts: &[f64],
) -> Option<CandidateSplit> {
    let total_weight: f64 = total_counts.iter().sum();
    let mut best: Option<CandidateSplit> = None;
    for feature in sample_features(rng, ctx.params.n_features, ctx.params.feature_count) {
        let mut ordered: Vec<(f64, usize)> = indices
            .iter()
            .map(|&row| (ctx.rows[row][feature], ctx.labels[row]))
            .collect();
        ordered.sort_by(|a, b| a.0.total_cmp(&b.0));
        let mut left_counts = vec![0.0; ctx.n_classes];
        let mut left_weight = 0.0;
        for boundary in 1..ordered.len() {
            let (prev_value, prev_label) = ordered[boundary - 1];
            let weight = ctx.class_weights[prev_label];
            left_counts[prev_label] += weight;
            left_weight += weight;
            if ordered[boundary].0 <= prev_value {
                continue;
            }
            let n_left = boundary;
            let n_right = ordered.len() - boundary;
            if n_left < ctx.params.min_samples_leaf || n_right < ctx.params.min_samples_leaf {
                continue;
            }
            let right_weight = total_weight - left_weight;
            let score = left_weight * gini(&left_counts, left_weight)
                + right_weight * gini_remainder(total_counts, &left_counts, right_weight);
            if best.as_ref().is_none_or(|current| score < current.score) {
                best = Some(CandidateSplit {
                    feature,
                    threshold: f64::midpoint(prev_value, ordered[boundary].0),
                    score,
                });
            }
        }
    }
    best
}

fn partition(
    rows: &[Vec<f64>],
    indices: &[usize],
    feature: usize,
    threshold: f64,
) -> (Vec<usize>, Vec<usize>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    for &row in indices {
        if rows[row][feature] <= threshold {
            left.push(row);
        } else {
            right.push(row);
        }
    }
    (left, right)
}

/// Draws the candidate feature set for one node, sorted ascending so that
/// equal-scoring splits resolve to the lowest feature index.
fn sample_features(rng: &mut StdRng, n_features: usize, count: usize) -> Vec<usize> {
    if count >= n_features {
        return (0..n_features).collect();
    }
    let mut picked = rand::seq::index::sample(rng, n_features, count).into_vec();
    picked.sort_unstable();
    picked
}

#[allow(clippy::cast_precision_loss)]
fn mean_target(targets: &[f64], indices: &[usize]) -> f64 {
    let sum: f64 = indices.iter().map(|&row| targets[row]).sum();
    sum / indices.len() as f64
}

fn constant_target(targets: &[f64], indices: &[usize]) -> bool {
    let first = targets[indices[0]];
    indices.iter().all(|&row| targets[row].total_cmp(&first).is_eq())
}

fn single_label(labels: &[usize], indices: &[usize]) -> bool {
    let first = labels[indices[0]];
    indices.iter().all(|&row| labels[row] == first)
}

fn weighted_counts(ctx: &ClassificationContext<'_>, indices: &[usize]) -> Vec<f64> {
    let mut counts = vec![0.0; ctx.n_classes];
    for &row in indices {
        let label = ctx.labels[row];
        counts[label] += ctx.class_weights[label];
    }
    counts
}

fn majority_class(counts: &[f64]) -> usize {
    let mut best = 0;
    for (class, &count) in counts.iter().enumerate().skip(1) {
        if count > counts[best] {
            best = class;
        }
    }
    best
}

#[allow(clippy::cast_precision_loss)]
fn squared_error(sum: f64, sum_sq: f64, count: usize) -> f64 {
    sum_sq - sum * sum / count as f64
}

fn gini(counts: &[f64], weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let sum: f64 = counts
        .iter()
        .map(|&count| {
            let p = count / weight;
            p * p
        })
        .sum();
    1.0 - sum
}

fn gini_remainder(total: &[f64], left: &[f64], weight: f64) -> f64 {
    if weight <= 0.0 {
        return 0.0;
    }
    let sum: f64 = total
        .iter()
        .zip(left)
        .map(|(&whole, &taken)| {
            let p = (whole - taken) / weight;
            p * p
        })
        .sum();
    1.0 - sum
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::{gini, majority_class, sample_features};

    #[test]
    fn gini_of_a_pure_node_is_zero() {
        assert!(gini(&[4.0, 0.0], 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn gini_of_an_even_binary_node_is_half() {
        assert!((gini(&[2.0, 2.0], 4.0) - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn majority_ties_resolve_to_the_lowest_class() {
        assert_eq!(majority_class(&[3.0, 3.0, 1.0]), 0);
        assert_eq!(majority_class(&[1.0, 4.0, 4.0]), 1);
        assert_eq!(majority_class(&[0.0, 0.0, 2.0]), 2);
    }

    #[test]
    fn feature_sampling_covers_the_full_set_when_unrestricted() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(sample_features(&mut rng, 4, 4), vec![0, 1, 2, 3]);
        assert_eq!(sample_features(&mut rng, 4, 9), vec![0, 1, 2, 3]);
    }

    #[test]
    fn feature_subsets_are_sorted_and_distinct() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let picked = sample_features(&mut rng, 9, 3);
            assert_eq!(picked.len(), 3);
            assert!(picked.windows(2).all(|pair| pair[0] < pair[1]));
            assert!(picked.iter().all(|&feature| feature < 9));
        }
    }
}
