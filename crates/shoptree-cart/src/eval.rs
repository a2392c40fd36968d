//! Held-out evaluation of a fitted tree.

use tracing::{debug, instrument, warn};

use crate::confusion::{BinaryConfusion, Evaluation};
use crate::error::CartError;
use crate::tree::DecisionTreeClassifier;

impl DecisionTreeClassifier {
    /// Predict every row and summarize the outcomes against `labels`.
    ///
    /// An untrained model or empty input yields [`Evaluation::skipped`]
    /// and a warning instead of an error.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`CartError::LabelCountMismatch`] | row count differs from label count |
    /// | [`CartError::PredictionFeatureMismatch`] | a row has the wrong width |
    #[instrument(skip_all, fields(n_samples = features.len()))]
    pub fn evaluate(&self, features: &[Vec<f64>], labels: &[u8]) -> Result<Evaluation, CartError> {
        if !self.is_trained() || features.is_empty() || labels.is_empty() {
            warn!(
                trained = self.is_trained(),
                "tree not trained or data empty, evaluation skipped"
            );
            return Ok(Evaluation::skipped());
        }
        if features.len() != labels.len() {
            return Err(CartError::LabelCountMismatch {
                n_rows: features.len(),
                n_labels: labels.len(),
            });
        }

        let mut confusion = BinaryConfusion::default();
        for (row, &label) in features.iter().zip(labels) {
            confusion.record(label, self.predict(row)?);
        }

        let evaluation = Evaluation::from_confusion(confusion);
        debug!(
            accuracy = evaluation.accuracy,
            precision = evaluation.precision,
            recall = evaluation.recall,
            f1 = evaluation.f1,
            "evaluation complete"
        );
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use crate::{BinaryConfusion, CartError, DecisionTreeClassifier, Evaluation};

    fn fitted() -> (DecisionTreeClassifier, Vec<Vec<f64>>, Vec<u8>) {
        let x = vec![vec![1.0], vec![2.0], vec![8.0], vec![9.0]];
        let y = vec![0, 0, 1, 1];
        let mut tree = DecisionTreeClassifier::new(1, vec!["x".to_string()]).unwrap();
        tree.fit(&x, &y).unwrap();
        (tree, x, y)
    }

    #[test]
    fn training_rows_evaluate_perfectly() {
        let (tree, x, y) = fitted();
        let eval = tree.evaluate(&x, &y).unwrap();
        assert_eq!(
            eval.confusion,
            BinaryConfusion {
                true_positive: 2,
                true_negative: 2,
                false_positive: 0,
                false_negative: 0,
            }
        );
        assert!((eval.accuracy - 1.0).abs() < f64::EPSILON);
        assert!((eval.precision - 1.0).abs() < f64::EPSILON);
        assert!((eval.recall - 1.0).abs() < f64::EPSILON);
        assert!((eval.f1 - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn held_out_rows_with_errors() {
        let (tree, _, _) = fitted();
        // Predictions: 0, 1, 1, 0
        let x = vec![vec![0.0], vec![6.0], vec![7.0], vec![4.0]];
        let y = vec![0, 0, 1, 1];
        let eval = tree.evaluate(&x, &y).unwrap();
        assert_eq!(eval.confusion.true_positive, 1);
        assert_eq!(eval.confusion.true_negative, 1);
        assert_eq!(eval.confusion.false_positive, 1);
        assert_eq!(eval.confusion.false_negative, 1);
        assert_eq!(eval.confusion.total(), x.len());
        assert!((eval.accuracy - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn untrained_model_is_skipped() {
        let tree = DecisionTreeClassifier::new(3, vec!["x".to_string()]).unwrap();
        let eval = tree.evaluate(&[vec![1.0]], &[1]).unwrap();
        assert_eq!(eval, Evaluation::skipped());
        assert!(eval.is_skipped());
    }

    #[test]
    fn empty_data_is_skipped() {
        let (tree, _, _) = fitted();
        assert!(tree.evaluate(&[], &[]).unwrap().is_skipped());
    }

    #[test]
    fn wrong_width_is_an_error() {
        let (tree, _, _) = fitted();
        let err = tree.evaluate(&[vec![1.0, 2.0]], &[0]).unwrap_err();
        assert!(matches!(err, CartError::PredictionFeatureMismatch { .. }));
    }
}
