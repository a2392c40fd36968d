use rayon::iter::{IntoParallelIterator, ParallelIterator};

use crate::node::{FeatureIndex, Impurity};

/// Strategy for scanning features during the split search.
///
/// Both strategies pick the same split: per-feature winners are reduced in
/// feature order, so the parallel scan only changes wall-clock time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum SplitSearch {
    /// Scan features one after another on the calling thread.
    #[default]
    Sequential,
    /// Scan features concurrently on the rayon thread pool.
    Parallel,
}

/// Best threshold found on a single feature column.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Candidate {
    feature: FeatureIndex,
    threshold: f64,
    score: f64,
}

/// Result of finding the best split for a node.
#[derive(Debug, Clone)]
pub(crate) struct SplitResult {
    /// Feature used for the split.
    pub(crate) feature: FeatureIndex,
    /// Threshold value: samples with `value <= threshold` go left.
    pub(crate) threshold: f64,
    /// Size-weighted Gini impurity of the two sides.
    pub(crate) weighted_impurity: Impurity,
    /// Sample indices going to the left child.
    pub(crate) left_indices: Vec<usize>,
    /// Sample indices going to the right child.
    pub(crate) right_indices: Vec<usize>,
}

/// Size-weighted Gini impurity of a two-way partition.
pub(crate) fn weighted_gini(
    n_left: usize,
    left_positive: usize,
    n_right: usize,
    right_positive: usize,
) -> f64 {
    let total = (n_left + n_right) as f64;
    if total == 0.0 {
        return 0.0;
    }
    (n_left as f64 / total) * Impurity::gini(left_positive, n_left).value()
        + (n_right as f64 / total) * Impurity::gini(right_positive, n_right).value()
}

/// Midpoint of two distinct adjacent sorted values.
///
/// Falls back to `lo` when rounding would push the midpoint onto `hi`, so
/// `value <= threshold` always separates the two runs.
fn midpoint(lo: f64, hi: f64) -> f64 {
    let mid = lo / 2.0 + hi / 2.0;
    if mid < hi { mid } else { lo }
}

/// Scan every boundary between distinct sorted values of one feature.
///
/// A boundary closing a run of repeated values `v` uses `v` itself as the
/// threshold, otherwise the midpoint to the next value. Keeps the first
/// strictly-lowest weighted Gini score in ascending threshold order.
/// Returns `None` when the column is constant over the subset.
fn scan_feature(
    feature: FeatureIndex,
    column: &[f64],
    labels: &[u8],
    sample_indices: &[usize],
    n_positive: usize,
) -> Option<Candidate> {
    let n_samples = sample_indices.len();
    if n_samples < 2 {
        return None;
    }

    let mut sorted: Vec<(f64, u8)> = sample_indices
        .iter()
        .map(|&si| (column[si], labels[si]))
        .collect();
    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

    let mut best: Option<Candidate> = None;
    let mut left_positive = 0usize;

    for i in 0..(n_samples - 1) {
        let (value, label) = sorted[i];
        left_positive += usize::from(label);

        let next = sorted[i + 1].0;
        if value == next {
            continue;
        }

        let n_left = i + 1;
        let n_right = n_samples - n_left;
        let score = weighted_gini(n_left, left_positive, n_right, n_positive - left_positive);

        if best.is_none_or(|b| score < b.score) {
            let repeated = i > 0 && sorted[i - 1].0 == value;
            best = Some(Candidate {
                feature,
                threshold: if repeated { value } else { midpoint(value, next) },
                score,
            });
        }
    }

    best
}

/// Find the split with the lowest weighted Gini impurity over all features.
///
/// `features` is column-major: `features[feature_idx][sample_idx]`, and
/// `sample_indices` selects the rows of the current subset. Ties go to the
/// first candidate in feature-major, ascending-threshold order.
///
/// Returns `None` when every feature is constant over the subset.
pub(crate) fn find_best_split(
    features: &[Vec<f64>],
    labels: &[u8],
    sample_indices: &[usize],
    search: SplitSearch,
) -> Option<SplitResult> {
    let n_positive = sample_indices
        .iter()
        .filter(|&&si| labels[si] == 1)
        .count();

    let scan = |feat_idx: usize| {
        scan_feature(
            FeatureIndex::new(feat_idx),
            &features[feat_idx],
            labels,
            sample_indices,
            n_positive,
        )
    };

    let per_feature: Vec<Option<Candidate>> = match search {
        SplitSearch::Sequential => (0..features.len()).map(scan).collect(),
        SplitSearch::Parallel => (0..features.len()).into_par_iter().map(scan).collect(),
    };

    let best = per_feature
        .into_iter()
        .flatten()
        .reduce(|best, c| if c.score < best.score { c } else { best })?;

    let column = &features[best.feature.index()];
    let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = sample_indices
        .iter()
        .partition(|&&si| column[si] <= best.threshold);

    Some(SplitResult {
        feature: best.feature,
        threshold: best.threshold,
        weighted_impurity: Impurity::new(best.score),
        left_indices,
        right_indices,
    })
}
