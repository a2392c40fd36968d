/// Errors from decision tree construction, training, and prediction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CartError {
    /// Returned when max_depth is zero.
    #[error("max_depth must be at least 1, got {max_depth}")]
    InvalidMaxDepth {
        /// The invalid max_depth value provided.
        max_depth: usize,
    },

    /// Returned by `predict` when no tree has been fitted yet.
    #[error("tree not trained: fit must succeed on a non-empty dataset first")]
    Untrained,

    /// Returned when the feature matrix and label vector differ in length.
    #[error("feature matrix has {n_rows} rows but {n_labels} labels were given")]
    LabelCountMismatch {
        /// Number of feature rows.
        n_rows: usize,
        /// Number of labels.
        n_labels: usize,
    },

    /// Returned when the training rows have zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when a sample has a different number of features than the first row.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the row width disagrees with the configured feature names.
    #[error("rows have {n_features} features but {n_names} feature names were configured")]
    FeatureNameMismatch {
        /// Number of features per row.
        n_features: usize,
        /// Number of configured feature names.
        n_names: usize,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a label is neither 0 nor 1.
    #[error("label at sample {sample_index} is {label}, expected 0 or 1")]
    InvalidLabel {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The label value found.
        label: u8,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a node arena cannot be walked safely.
    #[error("malformed tree at node {node}: {reason}")]
    MalformedTree {
        /// Arena index of the offending node.
        node: usize,
        /// What is wrong with it.
        reason: &'static str,
    },
}
