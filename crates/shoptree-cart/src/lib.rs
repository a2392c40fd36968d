//! Binary decision-tree classification: fit, predict, evaluate, render.
//!
//! Provides a CART classifier for 0/1 labels that grows an arena-backed tree
//! by exhaustive Gini-minimizing threshold search, with an optional
//! rayon-parallel feature scan and confusion-matrix evaluation.

mod confusion;
mod error;
mod eval;
mod format;
mod node;
mod render;
mod split;
mod tree;

pub use confusion::{BinaryConfusion, Evaluation};
pub use error::CartError;
pub use node::{FeatureIndex, Impurity, Node, NodeIndex};
pub use split::SplitSearch;
pub use tree::DecisionTreeClassifier;
