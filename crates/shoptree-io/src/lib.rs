//! File I/O, validation, and persistence for the shoptree pipeline.

mod domain;
mod error;
mod model;
mod reader;
mod writer;

pub use domain::Dataset;
pub use error::IoError;
pub use model::ModelStore;
pub use reader::SessionReader;
pub use writer::{ReportWriter, SessionPool, SummaryRow, write_sessions};
