//! Session CSV writer, cumulative training pool, and sweep reports.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::Serialize;
use shoptree_cart::{DecisionTreeClassifier, Evaluation};
use shoptree_sim::Session;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::Dataset;
use crate::reader::SessionReader;

/// Write sessions to `path` as CSV with the standard header.
///
/// Parent directories are created as needed. An empty slice still writes the header.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::OutputDirCreate`] | Parent directory cannot be created |
/// | [`IoError::WriteFile`] | File cannot be created |
/// | [`IoError::CsvWrite`] | A record cannot be serialized or flushed |
#[instrument(skip(sessions), fields(path = %path.display(), n_sessions = sessions.len()))]
pub fn write_sessions(path: &Path, sessions: &[Session]) -> Result<(), IoError> {
    create_parent(path)?;
    let file = fs::File::create(path).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(file);
    write_header(&mut wtr, path)?;
    write_records(&mut wtr, path, sessions)?;
    info!(path = %path.display(), "sessions written");
    Ok(())
}

fn create_parent(path: &Path) -> Result<(), IoError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| IoError::OutputDirCreate {
                path: dir.to_path_buf(),
                source: e,
            })
        }
        _ => Ok(()),
    }
}

// Explicit so that an empty batch still gets a header.
fn write_header<W: std::io::Write>(wtr: &mut csv::Writer<W>, path: &Path) -> Result<(), IoError> {
    wtr.write_record(SESSION_HEADER)
        .map_err(|e| IoError::CsvWrite {
            path: path.to_path_buf(),
            source: e,
        })
}

fn write_records<W: std::io::Write>(
    wtr: &mut csv::Writer<W>,
    path: &Path,
    sessions: &[Session],
) -> Result<(), IoError> {
    let csv_err = |e| IoError::CsvWrite {
        path: path.to_path_buf(),
        source: e,
    };
    for session in sessions {
        wtr.serialize(session).map_err(csv_err)?;
    }
    wtr.flush().map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

const SESSION_HEADER: [&str; 9] = [
    "Administrative",
    "Product",
    "Information",
    "BounceRate",
    "ExitRate",
    "PageValue",
    "VisitorType",
    "Weekend",
    "Purchase",
];

const SUMMARY_HEADER: [&str; 6] = ["Depth", "Round", "Accuracy", "Precision", "Recall", "F1"];

/// The growing training pool of one sweep depth, mirrored to a CSV file.
///
/// [`SessionPool::create`] truncates the file to a bare header; every
/// [`append`](SessionPool::append) adds rows to both the in-memory pool and the file.
pub struct SessionPool {
    path: PathBuf,
    dataset: Dataset,
}

impl SessionPool {
    /// Start an empty pool backed by `path`.
    ///
    /// # Errors
    ///
    /// Same as [`write_sessions`].
    pub fn create(path: &Path) -> Result<Self, IoError> {
        write_sessions(path, &[])?;
        Ok(Self {
            path: path.to_path_buf(),
            dataset: Dataset::default(),
        })
    }

    /// Append a batch to the pool and to the backing file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] if the file cannot be opened and
    /// [`IoError::CsvWrite`] if a record cannot be written.
    #[instrument(skip_all, fields(path = %self.path.display(), n_sessions = batch.len()))]
    pub fn append(&mut self, batch: &Dataset) -> Result<(), IoError> {
        let file = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .map_err(|e| IoError::WriteFile {
                path: self.path.clone(),
                source: e,
            })?;
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        write_records(&mut wtr, &self.path, batch.sessions())?;
        self.dataset.extend(batch);
        debug!(pool_size = self.dataset.len(), "batch appended");
        Ok(())
    }

    /// Replace the pool with a single batch, rewriting the backing file.
    ///
    /// # Errors
    ///
    /// Same as [`write_sessions`].
    pub fn replace(&mut self, batch: &Dataset) -> Result<(), IoError> {
        write_sessions(&self.path, batch.sessions())?;
        self.dataset = batch.clone();
        Ok(())
    }

    /// Sessions currently in the pool.
    #[must_use]
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Path of the backing CSV file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the backing file from disk.
    ///
    /// # Errors
    ///
    /// Same as [`SessionReader::read`].
    pub fn reload(&self) -> Result<Dataset, IoError> {
        SessionReader::new(self.path()).read()
    }
}

/// One row of the depth × round summary, with rates as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Maximum tree depth.
    #[serde(rename = "Depth")]
    pub depth: usize,
    /// One-based round number.
    #[serde(rename = "Round")]
    pub round: usize,
    /// Accuracy in percent.
    #[serde(rename = "Accuracy")]
    pub accuracy: f64,
    /// Precision in percent.
    #[serde(rename = "Precision")]
    pub precision: f64,
    /// Recall in percent.
    #[serde(rename = "Recall")]
    pub recall: f64,
    /// F1 score in percent.
    #[serde(rename = "F1")]
    pub f1: f64,
}

impl SummaryRow {
    /// Build a row from an evaluation, scaling rates to percent.
    #[must_use]
    pub fn new(depth: usize, round: usize, evaluation: &Evaluation) -> Self {
        Self {
            depth,
            round,
            accuracy: evaluation.accuracy * 100.0,
            precision: evaluation.precision * 100.0,
            recall: evaluation.recall * 100.0,
            f1: evaluation.f1 * 100.0,
        }
    }
}

/// Writes per-depth tree dumps and metrics plus the top-level summary.
///
/// Layout under the output directory:
///
/// ```text
/// depth_<d>/Tree_Master.txt
/// depth_<d>/Tree_R<k>.txt
/// depth_<d>/Tree_R<k>_Metrics.txt
/// depth_<d>/shopper_all_data.csv
/// depth_summary.csv
/// depth_summary.json
/// ```
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    /// Create a new writer targeting the given directory.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display()))]
    pub fn new(output_dir: &Path) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
        })
    }

    /// Return `{output_dir}/depth_<d>`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    pub fn depth_dir(&self, depth: usize) -> Result<PathBuf, IoError> {
        let dir = self.output_dir.join(format!("depth_{depth}"));
        fs::create_dir_all(&dir).map_err(|e| IoError::OutputDirCreate {
            path: dir.clone(),
            source: e,
        })?;
        Ok(dir)
    }

    /// Path of the training pool file for `depth`. Does not create anything.
    #[must_use]
    pub fn pool_path(&self, depth: usize) -> PathBuf {
        self.output_dir
            .join(format!("depth_{depth}"))
            .join("shopper_all_data.csv")
    }

    /// Dump the tree to `Tree_Master.txt` and snapshot it as `Tree_R<round>.txt`.
    ///
    /// An untrained tree produces empty files.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] or [`IoError::WriteFile`].
    #[instrument(skip(self, tree), fields(n_nodes = tree.n_nodes()))]
    pub fn write_tree(
        &self,
        depth: usize,
        round: usize,
        tree: &DecisionTreeClassifier,
    ) -> Result<(), IoError> {
        let dir = self.depth_dir(depth)?;
        let text = tree.render();
        write_text(&dir.join("Tree_Master.txt"), &text)?;
        let path = dir.join(format!("Tree_R{round}.txt"));
        write_text(&path, &text)?;
        info!(path = %path.display(), "tree snapshot written");
        Ok(())
    }

    /// Write the evaluation report to `Tree_R<round>_Metrics.txt`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] or [`IoError::WriteFile`].
    #[instrument(skip(self, evaluation))]
    pub fn write_metrics(
        &self,
        depth: usize,
        round: usize,
        evaluation: &Evaluation,
    ) -> Result<(), IoError> {
        let path = self
            .depth_dir(depth)?
            .join(format!("Tree_R{round}_Metrics.txt"));
        write_text(&path, &evaluation.to_string())?;
        info!(path = %path.display(), "metrics written");
        Ok(())
    }

    /// Write `depth_summary.csv` and `depth_summary.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::WriteFile`] or [`IoError::CsvWrite`].
    #[instrument(skip_all, fields(n_rows = rows.len()))]
    pub fn write_summary(&self, rows: &[SummaryRow]) -> Result<(), IoError> {
        let csv_path = self.output_dir.join("depth_summary.csv");
        let file = fs::File::create(&csv_path).map_err(|e| IoError::WriteFile {
            path: csv_path.clone(),
            source: e,
        })?;
        let csv_err = |e| IoError::CsvWrite {
            path: csv_path.clone(),
            source: e,
        };
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        wtr.write_record(SUMMARY_HEADER).map_err(csv_err)?;
        for row in rows {
            wtr.serialize(row).map_err(csv_err)?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: csv_path.clone(),
            source: e,
        })?;

        let json_path = self.output_dir.join("depth_summary.json");
        let artifact = SummaryArtifact {
            n_rows: rows.len(),
            rows: rows.iter().map(SummaryEntry::from).collect(),
        };
        let json = serde_json::to_string_pretty(&artifact).expect("serialization cannot fail");
        write_text(&json_path, &json)?;

        info!(path = %csv_path.display(), "summary written");
        Ok(())
    }
}

fn write_text(path: &Path, text: &str) -> Result<(), IoError> {
    fs::write(path, text).map_err(|e| IoError::WriteFile {
        path: path.to_path_buf(),
        source: e,
    })
}

// --- Shadow structs for serialization ---

#[derive(Serialize)]
struct SummaryArtifact {
    n_rows: usize,
    rows: Vec<SummaryEntry>,
}

#[derive(Serialize)]
struct SummaryEntry {
    depth: usize,
    round: usize,
    accuracy: f64,
    precision: f64,
    recall: f64,
    f1: f64,
}

impl From<&SummaryRow> for SummaryEntry {
    fn from(r: &SummaryRow) -> Self {
        Self {
            depth: r.depth,
            round: r.round,
            accuracy: r.accuracy,
            precision: r.precision,
            recall: r.recall,
            f1: r.f1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoptree_cart::BinaryConfusion;
    use shoptree_sim::{SessionGenerator, feature_names};
    use tempfile::TempDir;

    fn sessions(seed: u64, n: usize) -> Vec<Session> {
        SessionGenerator::new(seed).generate(n).unwrap()
    }

    fn trained_tree() -> DecisionTreeClassifier {
        let data = Dataset::from(sessions(11, 200));
        let mut tree = DecisionTreeClassifier::new(3, feature_names()).unwrap();
        tree.fit(&data.features(), &data.labels()).unwrap();
        tree
    }

    #[test]
    fn sessions_survive_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("sessions.csv");
        let original = sessions(3, 25);
        write_sessions(&path, &original).unwrap();

        let back = SessionReader::new(&path).read().unwrap();
        assert_eq!(back.sessions(), original.as_slice());
    }

    #[test]
    fn header_matches_column_names() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("s.csv");
        write_sessions(&path, &sessions(1, 2)).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(
            content.lines().next().unwrap(),
            "Administrative,Product,Information,BounceRate,ExitRate,PageValue,VisitorType,Weekend,Purchase"
        );
        assert!(content.lines().nth(1).unwrap().contains("_Visitor"));
    }

    #[test]
    fn empty_batch_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        write_sessions(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 1);
        assert!(SessionReader::new(&path).read().unwrap().is_empty());
    }

    #[test]
    fn pool_appends_and_mirrors_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.csv");
        let a = Dataset::from(sessions(1, 10));
        let b = Dataset::from(sessions(2, 5));

        let mut pool = SessionPool::create(&path).unwrap();
        assert_eq!(pool.path(), path.as_path());
        assert!(pool.dataset().is_empty());
        pool.append(&a).unwrap();
        pool.append(&b).unwrap();
        assert_eq!(pool.dataset().len(), 15);

        let on_disk = pool.reload().unwrap();
        assert_eq!(&on_disk, pool.dataset());
        // one header only
        let header_lines = fs::read_to_string(&path)
            .unwrap()
            .lines()
            .filter(|l| l.starts_with("Administrative"))
            .count();
        assert_eq!(header_lines, 1);
    }

    #[test]
    fn pool_replace_keeps_only_latest() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.csv");
        let mut pool = SessionPool::create(&path).unwrap();
        pool.append(&Dataset::from(sessions(1, 10))).unwrap();
        let latest = Dataset::from(sessions(2, 4));
        pool.replace(&latest).unwrap();
        assert_eq!(pool.dataset(), &latest);
        assert_eq!(pool.reload().unwrap(), latest);
    }

    #[test]
    fn pool_create_truncates_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pool.csv");
        write_sessions(&path, &sessions(1, 10)).unwrap();
        let pool = SessionPool::create(&path).unwrap();
        assert!(pool.reload().unwrap().is_empty());
    }

    #[test]
    fn tree_snapshots_written() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let tree = trained_tree();
        writer.write_tree(3, 1, &tree).unwrap();

        let master = fs::read_to_string(dir.path().join("depth_3/Tree_Master.txt")).unwrap();
        let snapshot = fs::read_to_string(dir.path().join("depth_3/Tree_R1.txt")).unwrap();
        assert_eq!(master, snapshot);
        assert_eq!(master, tree.render());
        assert!(master.starts_with("root: "));
    }

    #[test]
    fn untrained_tree_writes_empty_dump() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let tree = DecisionTreeClassifier::new(2, feature_names()).unwrap();
        writer.write_tree(2, 1, &tree).unwrap();
        assert!(fs::read_to_string(dir.path().join("depth_2/Tree_R1.txt"))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn metrics_text_matches_display() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let confusion = BinaryConfusion::from_labels(&[1, 0, 1, 0], &[1, 0, 0, 0]);
        let eval = Evaluation::from_confusion(confusion);
        writer.write_metrics(4, 2, &eval).unwrap();
        let text = fs::read_to_string(dir.path().join("depth_4/Tree_R2_Metrics.txt")).unwrap();
        assert_eq!(text, eval.to_string());
        assert!(text.starts_with("Confusion Matrix:"));
    }

    #[test]
    fn summary_csv_and_json() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        let confusion = BinaryConfusion::from_labels(&[1, 1, 0, 0], &[1, 1, 0, 0]);
        let eval = Evaluation::from_confusion(confusion);
        let rows = vec![SummaryRow::new(1, 1, &eval), SummaryRow::new(2, 1, &eval)];
        writer.write_summary(&rows).unwrap();

        let csv_text = fs::read_to_string(dir.path().join("depth_summary.csv")).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(lines.next().unwrap(), "Depth,Round,Accuracy,Precision,Recall,F1");
        assert_eq!(lines.next().unwrap(), "1,1,100.0,100.0,100.0,100.0");
        assert_eq!(lines.count(), 1);

        let json: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(dir.path().join("depth_summary.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(json["n_rows"], 2);
        assert_eq!(json["rows"][1]["depth"], 2);
        assert_eq!(json["rows"][0]["accuracy"], 100.0);
    }

    #[test]
    fn empty_summary_still_has_header() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        writer.write_summary(&[]).unwrap();
        let csv_text = fs::read_to_string(dir.path().join("depth_summary.csv")).unwrap();
        assert_eq!(csv_text, "Depth,Round,Accuracy,Precision,Recall,F1\n");
    }

    #[test]
    fn pool_path_under_depth_dir() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path()).unwrap();
        assert_eq!(
            writer.pool_path(7),
            dir.path().join("depth_7").join("shopper_all_data.csv")
        );
    }
}
