//! CSV session reader with input validation.

use std::path::{Path, PathBuf};

use shoptree_sim::Session;
use tracing::{debug, info, instrument, warn};

use crate::IoError;
use crate::domain::Dataset;

/// Reads shopping sessions from a CSV file.
///
/// Expected CSV format:
/// - Header row required:
///   `Administrative,Product,Information,BounceRate,ExitRate,PageValue,VisitorType,Weekend,Purchase`
/// - Columns are matched by name, so their order may vary
/// - `VisitorType` is free text; unknown labels read as `Other`
/// - `Weekend` and `Purchase` must be 0 or 1
///
/// A file with a header and no rows yields an empty [`Dataset`].
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed record, missing column, or unparseable value |
/// | [`IoError::NonFiniteValue`] | A rate or page value is NaN or infinite |
/// | [`IoError::InvalidFlag`] | `Weekend` or `Purchase` is not 0 or 1 |
pub struct SessionReader {
    path: PathBuf,
}

impl SessionReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`Dataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<Dataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let n_columns = rdr.headers().map_err(|e| self.parse_error(e))?.len();
        debug!(n_columns, "read CSV header");

        let mut sessions = Vec::new();
        for (row_index, result) in rdr.deserialize::<Session>().enumerate() {
            let session = result.map_err(|e| self.parse_error(e))?;
            self.validate(row_index, &session)?;
            sessions.push(session);
        }

        if sessions.is_empty() {
            warn!("CSV file has no data rows");
        } else {
            info!(
                n_sessions = sessions.len(),
                n_purchases = sessions.iter().filter(|s| s.purchase == 1).count(),
                "sessions loaded"
            );
        }
        Ok(Dataset::new(sessions))
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn validate(&self, row_index: usize, session: &Session) -> Result<(), IoError> {
        let reals = [
            ("BounceRate", session.bounce_rate),
            ("ExitRate", session.exit_rate),
            ("PageValue", session.page_value),
        ];
        if let Some(&(column, _)) = reals.iter().find(|(_, v)| !v.is_finite()) {
            return Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                column,
            });
        }

        for (column, value) in [("Weekend", session.weekend), ("Purchase", session.purchase)] {
            if value > 1 {
                return Err(IoError::InvalidFlag {
                    path: self.path.clone(),
                    row_index,
                    column,
                    value,
                });
            }
        }
        Ok(())
    }
}
