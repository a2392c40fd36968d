//! Classifier persistence via bincode.

use std::path::Path;

use shoptree_cart::DecisionTreeClassifier;
use tracing::{debug, info, instrument};

use crate::IoError;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Versioned envelope for the serialized classifier.
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    /// Format version for compatibility checking.
    format_version: u32,
    /// Number of features the model expects.
    n_features: usize,
    /// Feature column names.
    feature_names: Vec<String>,
    classifier: DecisionTreeClassifier,
}

/// Saves and loads trained classifiers as binary files.
pub struct ModelStore;

impl ModelStore {
    /// Save a classifier to `path`. Untrained classifiers are saved as-is.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::SerializeModel`] | bincode encoding failed |
    /// | [`IoError::WriteFile`] | file write failed |
    #[instrument(skip(classifier), fields(path = %path.as_ref().display()))]
    pub fn save(
        classifier: &DecisionTreeClassifier,
        path: impl AsRef<Path>,
    ) -> Result<(), IoError> {
        let path = path.as_ref();

        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_features: classifier.n_features(),
            feature_names: classifier.feature_names().to_vec(),
            classifier: classifier.clone(),
        };

        let bytes =
            bincode::serialize(&envelope).map_err(|e| IoError::SerializeModel { source: e })?;

        std::fs::write(path, &bytes).map_err(|e| IoError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_nodes = classifier.n_nodes(),
            "model saved"
        );
        Ok(())
    }

    /// Load a classifier from `path`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | file read failed |
    /// | [`IoError::DeserializeModel`] | bincode decoding failed |
    /// | [`IoError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`IoError::ModelFeatureMismatch`] | envelope features disagree with the classifier |
    /// | [`IoError::InvalidModel`] | node arena is empty, cyclic, or out of range |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<DecisionTreeClassifier, IoError> {
        let path = path.as_ref();

        let bytes = std::fs::read(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;

        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|e| IoError::DeserializeModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        if envelope.format_version != FORMAT_VERSION {
            return Err(IoError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: envelope.format_version,
                path: path.to_path_buf(),
            });
        }

        let classifier = &envelope.classifier;
        if envelope.n_features != classifier.n_features()
            || envelope.feature_names != classifier.feature_names()
        {
            return Err(IoError::ModelFeatureMismatch {
                path: path.to_path_buf(),
                declared: envelope.n_features,
                expected: classifier.n_features(),
            });
        }
        classifier
            .check_structure()
            .map_err(|e| IoError::InvalidModel {
                path: path.to_path_buf(),
                source: e,
            })?;

        debug!(
            n_features = envelope.n_features,
            n_nodes = envelope.classifier.n_nodes(),
            max_depth = envelope.classifier.max_depth(),
            "model loaded"
        );
        Ok(envelope.classifier)
    }
}
