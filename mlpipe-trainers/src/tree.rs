//! Least-squares regression trees grown leaf-wise

/// Limits on the shape of a single tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct GrowParams {
    pub num_leaves: usize,
    pub max_depth: Option<usize>,
    pub min_samples_leaf: usize,
    pub learning_rate: f32,
}

/// Row-major feature matrix
#[derive(Debug, Clone, Copy)]
pub(crate) struct Features<'a> {
    pub values: &'a [f32],
    pub width: usize,
}

impl Features<'_> {
    #[inline]
    fn get(&self, row: usize, feature: usize) -> f32 {
        self.values[row * self.width + feature]
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Split {
    feature: usize,
    threshold: f32,
    gain: f64,
}

struct Candidate {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: Option<Split>,
}

/// A binary tree over feature thresholds; `NaN` features go right
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit residuals by repeatedly splitting the leaf with the largest
    /// reduction in squared error, until `num_leaves` is reached or no leaf
    /// can be split
    pub(crate) fn grow(features: Features<'_>, residuals: &[f32], params: &GrowParams) -> Self {
        let min_leaf = params.min_samples_leaf.max(1);
        let rows: Vec<usize> = (0..residuals.len()).collect();

        let mut nodes = vec![Node::Leaf {
            value: params.learning_rate * mean(residuals, &rows),
        }];
        let root_split = best_split(features, residuals, &rows, min_leaf);
        let mut open = vec![Candidate {
            node: 0,
            rows,
            depth: 0,
            split: root_split,
        }];

        let mut leaves = 1;
        while leaves < params.num_leaves {
            let mut chosen: Option<(usize, f64)> = None;
            for (index, candidate) in open.iter().enumerate() {
                if let Some(split) = candidate.split {
                    if chosen.map_or(true, |(_, gain)| split.gain > gain) {
                        chosen = Some((index, split.gain));
                    }
                }
            }
            let Some((index, _)) = chosen else {
                break;
            };

            let candidate = open.remove(index);
            let Some(split) = candidate.split else {
                break;
            };

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = candidate
                .rows
                .iter()
                .partition(|&&row| features.get(row, split.feature) <= split.threshold);

            let left = nodes.len();
            nodes.push(Node::Leaf {
                value: params.learning_rate * mean(residuals, &left_rows),
            });
            let right = nodes.len();
            nodes.push(Node::Leaf {
                value: params.learning_rate * mean(residuals, &right_rows),
            });
            nodes[candidate.node] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            leaves += 1;

            let depth = candidate.depth + 1;
            let can_split = params.max_depth.map_or(true, |max| depth < max);
            for (node, rows) in [(left, left_rows), (right, right_rows)] {
                let split = if can_split {
                    best_split(features, residuals, &rows, min_leaf)
                } else {
                    None
                };
                open.push(Candidate { node, rows, depth, split });
            }
        }

        Self { nodes }
    }

    pub(crate) fn predict(&self, row: &[f32]) -> f32 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).copied().unwrap_or(f32::NAN);
                    index = if value <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub(crate) fn num_leaves(&self) -> usize {
        self.nodes.iter().filter(|node| matches!(node, Node::Leaf { .. })).count()
    }
}

fn mean(residuals: &[f32], rows: &[usize]) -> f32 {
    if rows.is_empty() {
        return 0.0;
    }
    let sum: f64 = rows.iter().map(|&row| f64::from(residuals[row])).sum();
    (sum / rows.len() as f64) as f32
}

fn best_split(features: Features<'_>, residuals: &[f32], rows: &[usize], min_leaf: usize) -> Option<Split> {
    if rows.len() < 2 * min_leaf || features.width == 0 {
        return None;
    }

    let total: f64 = rows.iter().map(|&row| f64::from(residuals[row])).sum();
    let parent = total * total / rows.len() as f64;

    #[cfg(feature = "parallel")]
    let per_feature: Vec<Option<Split>> = {
        use rayon::prelude::*;
        (0..features.width)
            .into_par_iter()
            .map(|feature| best_split_on(features, feature, residuals, rows, min_leaf, total, parent))
            .collect()
    };
    #[cfg(not(feature = "parallel"))]
    let per_feature: Vec<Option<Split>> = (0..features.width)
        .map(|feature| best_split_on(features, feature, residuals, rows, min_leaf, total, parent))
        .collect();

    // Lowest feature index wins ties, whatever order the candidates were computed in
    per_feature.into_iter().flatten().fold(None, |best: Option<Split>, split| match best {
        Some(best) if best.gain >= split.gain => Some(best),
        _ => Some(split),
    })
}

fn best_split_on(
    features: Features<'_>,
    feature: usize,
    residuals: &[f32],
    rows: &[usize],
    min_leaf: usize,
    total: f64,
    parent: f64,
) -> Option<Split> {
    let mut sorted: Vec<(f32, f32)> = rows
        .iter()
        .map(|&row| (features.get(row, feature), residuals[row]))
        .collect();
    sorted.sort_by(|a, b| match (a.0.is_nan(), b.0.is_nan()) {
        (false, false) => a.0.total_cmp(&b.0),
        (a_nan, b_nan) => a_nan.cmp(&b_nan),
    });

    let n = sorted.len();
    let mut best: Option<Split> = None;
    let mut left_sum = 0.0_f64;
    for i in 0..n - 1 {
        let (value, residual) = sorted[i];
        if value.is_nan() {
            break;
        }
        left_sum += f64::from(residual);

        let left_count = i + 1;
        let right_count = n - left_count;
        if right_count < min_leaf {
            break;
        }
        let next = sorted[i + 1].0;
        if left_count < min_leaf || next == value {
            continue;
        }

        let right_sum = total - left_sum;
        let gain = left_sum * left_sum / left_count as f64 + right_sum * right_sum / right_count as f64 - parent;
        if gain > 1e-12 && best.map_or(true, |b| gain > b.gain) {
            let mut threshold = if next.is_nan() { value } else { value + (next - value) / 2.0 };
            if !next.is_nan() && threshold >= next {
                threshold = value;
            }
            best = Some(Split {
                feature,
                threshold,
                gain,
            });
        }
    }
    best
}
