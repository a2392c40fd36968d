use tracing::{debug, instrument};

use crate::{
    CartError,
    node::{Impurity, Node, NodeIndex},
    split::{SplitSearch, find_best_split},
};

/// A binary CART classifier grown by greedy Gini-minimizing splits.
///
/// Construct via [`DecisionTreeClassifier::new`], optionally chain
/// `with_*` methods, then call [`fit`](Self::fit). Every call to `fit`
/// builds a complete new tree before replacing the old one, so a failed
/// or empty fit never leaves a half-built tree behind.
///
/// # Defaults
///
/// | Parameter      | Default      |
/// |----------------|--------------|
/// | `split_search` | `Sequential` |
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct DecisionTreeClassifier {
    pub(crate) max_depth: usize,
    pub(crate) feature_names: Vec<String>,
    pub(crate) split_search: SplitSearch,
    /// Node arena with the root at index 0; `None` until a successful fit.
    pub(crate) nodes: Option<Vec<Node>>,
}

impl DecisionTreeClassifier {
    /// Create an untrained classifier.
    ///
    /// `feature_names` label the feature columns in rendered trees and must
    /// match the width of the rows passed to [`fit`](Self::fit).
    ///
    /// # Errors
    ///
    /// Returns [`CartError::InvalidMaxDepth`] if `max_depth` is zero.
    pub fn new(max_depth: usize, feature_names: Vec<String>) -> Result<Self, CartError> {
        if max_depth == 0 {
            return Err(CartError::InvalidMaxDepth { max_depth });
        }
        Ok(Self {
            max_depth,
            feature_names,
            split_search: SplitSearch::default(),
            nodes: None,
        })
    }

    /// Set the split-search strategy.
    #[must_use]
    pub fn with_split_search(mut self, split_search: SplitSearch) -> Self {
        self.split_search = split_search;
        self
    }

    // --- Getters ---

    /// Return the configured maximum depth (the root is depth 0).
    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the number of features the model expects.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the split-search strategy.
    #[must_use]
    pub fn split_search(&self) -> SplitSearch {
        self.split_search
    }

    /// Return `true` once a tree has been fitted.
    #[must_use]
    pub fn is_trained(&self) -> bool {
        self.nodes.is_some()
    }

    /// Return the node arena, or `None` when untrained.
    #[must_use]
    pub fn nodes(&self) -> Option<&[Node]> {
        self.nodes.as_deref()
    }

    /// Train on a row-major dataset, discarding any previous tree.
    ///
    /// `features[sample_idx][feature_idx]` with `labels[sample_idx]` in `{0, 1}`.
    /// Empty `features` or `labels` reset the model to untrained and return `Ok`.
    ///
    /// # Errors
    ///
    /// The previous tree is kept when any of these are returned.
    ///
    /// | Variant                              | When                                   |
    /// |--------------------------------------|----------------------------------------|
    /// | [`CartError::LabelCountMismatch`]    | row count differs from label count     |
    /// | [`CartError::ZeroFeatures`]          | rows have zero feature columns         |
    /// | [`CartError::FeatureCountMismatch`]  | rows have inconsistent lengths         |
    /// | [`CartError::FeatureNameMismatch`]   | row width differs from feature names   |
    /// | [`CartError::NonFiniteValue`]        | any value is NaN or infinite           |
    /// | [`CartError::InvalidLabel`]          | a label is not 0 or 1                  |
    #[instrument(skip(self, features, labels), fields(n_samples = features.len(), max_depth = self.max_depth))]
    pub fn fit(&mut self, features: &[Vec<f64>], labels: &[u8]) -> Result<(), CartError> {
        if features.is_empty() || labels.is_empty() {
            debug!("empty dataset, model reset to untrained");
            self.nodes = None;
            return Ok(());
        }

        self.validate(features, labels)?;

        let n_features = features[0].len();

        // Column-major copy for the split scan.
        let col_features: Vec<Vec<f64>> = (0..n_features)
            .map(|feat_idx| features.iter().map(|row| row[feat_idx]).collect())
            .collect();

        let sample_indices: Vec<usize> = (0..features.len()).collect();
        let mut arena: Vec<Node> = Vec::new();

        build_tree(
            &col_features,
            labels,
            &sample_indices,
            self.max_depth,
            self.split_search,
            0,
            &mut arena,
        );

        debug!(
            n_nodes = arena.len(),
            n_leaves = arena.iter().filter(|n| n.is_leaf()).count(),
            "decision tree built"
        );

        self.nodes = Some(arena);
        Ok(())
    }

    /// Predict the class of a single sample.
    ///
    /// At each split, goes left when `sample[feature] <= threshold`,
    /// right otherwise.
    ///
    /// # Errors
    ///
    /// | Variant                                   | When                                 |
    /// |-------------------------------------------|--------------------------------------|
    /// | [`CartError::Untrained`]                  | no tree has been fitted              |
    /// | [`CartError::PredictionFeatureMismatch`]  | `sample.len()` differs from training |
    pub fn predict(&self, sample: &[f64]) -> Result<u8, CartError> {
        let nodes = self.nodes.as_deref().ok_or(CartError::Untrained)?;
        if sample.len() != self.n_features() {
            return Err(CartError::PredictionFeatureMismatch {
                expected: self.n_features(),
                got: sample.len(),
            });
        }
        Ok(classify(nodes, sample))
    }

    /// Fraction of rows whose prediction matches the label.
    ///
    /// Returns `0.0` for an untrained model or an empty dataset.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LabelCountMismatch`] when the lengths differ and
    /// [`CartError::PredictionFeatureMismatch`] when a row has the wrong width.
    pub fn score(&self, features: &[Vec<f64>], labels: &[u8]) -> Result<f64, CartError> {
        if !self.is_trained() || features.is_empty() {
            return Ok(0.0);
        }
        if features.len() != labels.len() {
            return Err(CartError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }
        let mut correct = 0usize;
        for (row, &label) in features.iter().zip(labels) {
            if self.predict(row)? == label {
                correct += 1;
            }
        }
        Ok(correct as f64 / features.len() as f64)
    }

    /// Return the total number of nodes (splits and leaves); 0 when untrained.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.as_ref().map_or(0, Vec::len)
    }

    /// Return the number of leaf nodes; 0 when untrained.
    #[must_use]
    pub fn n_leaves(&self) -> usize {
        self.nodes
            .as_ref()
            .map_or(0, |nodes| nodes.iter().filter(|n| n.is_leaf()).count())
    }

    /// Return the depth actually reached by the fitted tree.
    ///
    /// A single leaf (or an untrained model) has depth 0.
    #[must_use]
    pub fn depth(&self) -> usize {
        let Some(nodes) = self.nodes.as_deref() else {
            return 0;
        };

        let mut max_depth = 0usize;
        let mut stack = vec![(NodeIndex::ROOT, 0usize)];
        while let Some((idx, d)) = stack.pop() {
            match &nodes[idx.index()] {
                Node::Leaf { .. } => max_depth = max_depth.max(d),
                Node::Split { left, right, .. } => {
                    stack.push((*left, d + 1));
                    stack.push((*right, d + 1));
                }
            }
        }
        max_depth
    }

    /// Check that the node arena is safe to walk.
    ///
    /// A tree built by [`fit`](Self::fit) always passes. Trees restored from
    /// bytes should be checked before use: every child must lie after its
    /// parent and inside the arena, every split feature must be a known
    /// column, and every leaf must predict 0 or 1. An untrained tree passes.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::MalformedTree`] naming the first offending node.
    pub fn check_structure(&self) -> Result<(), CartError> {
        let Some(nodes) = self.nodes.as_deref() else {
            return Ok(());
        };
        if nodes.is_empty() {
            return Err(CartError::MalformedTree {
                node: 0,
                reason: "trained tree has no root",
            });
        }

        for (node, n) in nodes.iter().enumerate() {
            let reason = match n {
                Node::Leaf { prediction, .. } if *prediction > 1 => {
                    Some("leaf class is not 0 or 1")
                }
                Node::Leaf { .. } => None,
                Node::Split { feature, .. } if feature.index() >= self.n_features() => {
                    Some("split feature out of range")
                }
                Node::Split { left, right, .. } => [left, right]
                    .iter()
                    .any(|c| c.index() <= node || c.index() >= nodes.len())
                    .then_some("child index out of range"),
            };
            if let Some(reason) = reason {
                return Err(CartError::MalformedTree { node, reason });
            }
        }
        Ok(())
    }

    fn validate(&self, features: &[Vec<f64>], labels: &[u8]) -> Result<(), CartError> {
        if features.len() != labels.len() {
            return Err(CartError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }

        let n_features = features[0].len();
        if n_features == 0 {
            return Err(CartError::ZeroFeatures);
        }
        if n_features != self.feature_names.len() {
            return Err(CartError::FeatureNameMismatch {
                n_features,
                n_names: self.feature_names.len(),
            });
        }

        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != n_features {
                return Err(CartError::FeatureCountMismatch {
                    expected: n_features,
                    got: row.len(),
                    sample_index,
                });
            }
            if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
                return Err(CartError::NonFiniteValue {
                    sample_index,
                    feature_index,
                });
            }
        }

        if let Some((sample_index, &label)) = labels.iter().enumerate().find(|(_, l)| **l > 1) {
            return Err(CartError::InvalidLabel {
                sample_index,
                label,
            });
        }

        Ok(())
    }
}

/// Walk from the root to a leaf and return its class.
pub(crate) fn classify(nodes: &[Node], sample: &[f64]) -> u8 {
    let mut idx = NodeIndex::ROOT;
    loop {
        match &nodes[idx.index()] {
            Node::Leaf { prediction, .. } => return *prediction,
            Node::Split {
                feature,
                threshold,
                left,
                right,
                ..
            } => {
                idx = if sample[feature.index()] <= *threshold {
                    *left
                } else {
                    *right
                };
            }
        }
    }
}

/// Recursively build the arena-based decision tree.
///
/// Returns the [`NodeIndex`] of the node just created in `arena`.
fn build_tree(
    col_features: &[Vec<f64>],
    labels: &[u8],
    sample_indices: &[usize],
    max_depth: usize,
    split_search: SplitSearch,
    depth: usize,
    arena: &mut Vec<Node>,
) -> NodeIndex {
    let n_samples = sample_indices.len();
    let n_positive = sample_indices.iter().filter(|&&si| labels[si] == 1).count();
    let impurity = Impurity::gini(n_positive, n_samples);

    // Ties go to the positive class.
    let majority = u8::from(n_positive * 2 >= n_samples);

    let make_leaf = |arena: &mut Vec<Node>| -> NodeIndex {
        let idx = arena.len();
        arena.push(Node::Leaf {
            prediction: majority,
            impurity,
            n_samples,
        });
        NodeIndex::new(idx)
    };

    let pure = n_positive == 0 || n_positive == n_samples;
    if depth >= max_depth || pure {
        return make_leaf(arena);
    }

    let Some(split) = find_best_split(col_features, labels, sample_indices, split_search) else {
        return make_leaf(arena);
    };

    // Reserve the parent slot so the root stays at index 0, then overwrite it.
    let node_idx = arena.len();
    arena.push(Node::Leaf {
        prediction: majority,
        impurity,
        n_samples,
    });

    let left = build_tree(
        col_features,
        labels,
        &split.left_indices,
        max_depth,
        split_search,
        depth + 1,
        arena,
    );
    let right = build_tree(
        col_features,
        labels,
        &split.right_indices,
        max_depth,
        split_search,
        depth + 1,
        arena,
    );

    arena[node_idx] = Node::Split {
        feature: split.feature,
        threshold: split.threshold,
        left,
        right,
        impurity,
        weighted_impurity: split.weighted_impurity,
        n_samples,
    };

    NodeIndex::new(node_idx)
}
