//! Binary confusion matrix and the classification rates derived from it.

use std::fmt;

use crate::format::Significant;

/// Confusion-matrix counts for a binary classifier (class 1 is positive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BinaryConfusion {
    /// Predicted 1, actual 1.
    pub true_positive: usize,
    /// Predicted 0, actual 0.
    pub true_negative: usize,
    /// Predicted 1, actual 0.
    pub false_positive: usize,
    /// Predicted 0, actual 1.
    pub false_negative: usize,
}

impl BinaryConfusion {
    /// Tally actual against predicted labels pairwise.
    ///
    /// Extra elements in the longer slice are ignored.
    #[must_use]
    pub fn from_labels(actual: &[u8], predicted: &[u8]) -> Self {
        let mut counts = Self::default();
        for (&a, &p) in actual.iter().zip(predicted) {
            counts.record(a, p);
        }
        counts
    }

    /// Add one (actual, predicted) outcome.
    pub fn record(&mut self, actual: u8, predicted: u8) {
        match (predicted == 1, actual == 1) {
            (true, true) => self.true_positive += 1,
            (false, false) => self.true_negative += 1,
            (true, false) => self.false_positive += 1,
            (false, true) => self.false_negative += 1,
        }
    }

    /// Total number of tallied outcomes.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positive + self.true_negative + self.false_positive + self.false_negative
    }

    /// TP / (TP + FP), or 0.0 without positive predictions.
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// TP / (TP + FN), or 0.0 without positive labels.
    #[must_use]
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    /// Harmonic mean of precision and recall, or 0.0 when both are zero.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let (p, r) = (self.precision(), self.recall());
        if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
    }

    /// (TP + TN) / total, or 0.0 when nothing was tallied.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Aggregate classification quality of one evaluation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Evaluation {
    /// Raw outcome counts.
    pub confusion: BinaryConfusion,
    /// TP / (TP + FP).
    pub precision: f64,
    /// TP / (TP + FN).
    pub recall: f64,
    /// 2PR / (P + R).
    pub f1: f64,
    /// (TP + TN) / total.
    pub accuracy: f64,
}

impl Evaluation {
    /// Derive all rates from a confusion matrix.
    #[must_use]
    pub fn from_confusion(confusion: BinaryConfusion) -> Self {
        Self {
            confusion,
            precision: confusion.precision(),
            recall: confusion.recall(),
            f1: confusion.f1(),
            accuracy: confusion.accuracy(),
        }
    }

    /// The all-zero result reported when evaluation could not run.
    #[must_use]
    pub fn skipped() -> Self {
        Self::default()
    }

    /// Return `true` when no rows were evaluated.
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        self.confusion.total() == 0
    }
}

impl fmt::Display for Evaluation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Confusion Matrix:")?;
        if self.is_skipped() {
            return writeln!(f, "Tree not trained or data empty - evaluation skipped.");
        }
        let c = &self.confusion;
        writeln!(f, "TP: {}  FP: {}", c.true_positive, c.false_positive)?;
        writeln!(f, "FN: {}  TN: {}", c.false_negative, c.true_negative)?;
        writeln!(f, "Accuracy: {}%", Significant(self.accuracy * 100.0))?;
        writeln!(f, "Precision: {}%", Significant(self.precision * 100.0))?;
        writeln!(f, "Recall: {}%", Significant(self.recall * 100.0))?;
        writeln!(f, "F1 Score: {}%", Significant(self.f1 * 100.0))
    }
}
