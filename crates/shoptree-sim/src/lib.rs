//! Synthetic shopping-session simulation.
//!
//! Produces seeded batches of browsing sessions with a purchase label drawn
//! from a simple behavioral model, plus the numeric feature encoding the
//! classifier consumes.

mod error;
mod generator;
mod session;

pub use error::SimError;
pub use generator::{SessionGenerator, purchase_probability};
pub use session::{FEATURE_NAMES, Session, VisitorType, feature_names};
