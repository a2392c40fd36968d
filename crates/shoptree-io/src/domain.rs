//! Domain types for shoptree-io.

use shoptree_sim::{Session, feature_names};

/// An ordered batch of sessions read from or destined for a CSV file.
///
/// Feature rows and labels are derived on demand so that `features()[i]`
/// and `labels()[i]` always describe `sessions()[i]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    sessions: Vec<Session>,
}

impl Dataset {
    /// Wrap a batch of sessions.
    #[must_use]
    pub fn new(sessions: Vec<Session>) -> Self {
        Self { sessions }
    }

    /// Return the sessions in file order.
    #[must_use]
    pub fn sessions(&self) -> &[Session] {
        &self.sessions
    }

    /// Number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Return `true` when the batch holds no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Append another batch after this one.
    pub fn extend(&mut self, other: &Dataset) {
        self.sessions.extend_from_slice(&other.sessions);
    }

    /// Row-major feature matrix: `features()[sample][feature]`.
    #[must_use]
    pub fn features(&self) -> Vec<Vec<f64>> {
        self.sessions.iter().map(Session::features).collect()
    }

    /// Purchase labels aligned with [`features`](Self::features).
    #[must_use]
    pub fn labels(&self) -> Vec<u8> {
        self.sessions.iter().map(Session::label).collect()
    }

    /// Names of the feature columns.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        feature_names()
    }
}

impl From<Vec<Session>> for Dataset {
    fn from(sessions: Vec<Session>) -> Self {
        Self::new(sessions)
    }
}
