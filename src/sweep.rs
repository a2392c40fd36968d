//! Depth × round retraining sweep.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rayon::prelude::*;
use shoptree_cart::{DecisionTreeClassifier, SplitSearch};
use shoptree_io::{Dataset, ReportWriter, SessionPool, SessionReader, SummaryRow};
use shoptree_sim::feature_names;
use tracing::{debug, info, instrument};

/// How each round's batch joins the training pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum RetrainPolicy {
    /// Train on every batch seen so far.
    #[default]
    Cumulative,
    /// Train on the newest batch only.
    Latest,
}

/// Configuration for [`run`].
///
/// # Defaults
///
/// | Parameter      | Default      |
/// |----------------|--------------|
/// | `min_depth`    | 1            |
/// | `max_depth`    | 15           |
/// | `policy`       | `Cumulative` |
/// | `split_search` | `Sequential` |
#[derive(Debug, Clone)]
pub struct SweepConfig {
    datasets: Vec<PathBuf>,
    output_dir: PathBuf,
    min_depth: usize,
    max_depth: usize,
    policy: RetrainPolicy,
    split_search: SplitSearch,
}

impl SweepConfig {
    /// Create a config for the given round datasets, in round order.
    ///
    /// # Errors
    ///
    /// Fails when `datasets` is empty.
    pub fn new(datasets: Vec<PathBuf>, output_dir: &Path) -> Result<Self> {
        if datasets.is_empty() {
            bail!("sweep needs at least one dataset");
        }
        Ok(Self {
            datasets,
            output_dir: output_dir.to_path_buf(),
            min_depth: 1,
            max_depth: 15,
            policy: RetrainPolicy::default(),
            split_search: SplitSearch::default(),
        })
    }

    /// Set the inclusive depth range.
    ///
    /// # Errors
    ///
    /// Fails unless `1 <= min_depth <= max_depth`.
    pub fn with_depth_range(mut self, min_depth: usize, max_depth: usize) -> Result<Self> {
        if min_depth == 0 || min_depth > max_depth {
            bail!("invalid depth range {min_depth}..={max_depth} (need 1 <= min <= max)");
        }
        self.min_depth = min_depth;
        self.max_depth = max_depth;
        Ok(self)
    }

    /// Set the retraining policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetrainPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the split search used by every tree.
    #[must_use]
    pub fn with_split_search(mut self, split_search: SplitSearch) -> Self {
        self.split_search = split_search;
        self
    }

    /// Inclusive depth range.
    #[must_use]
    pub fn depths(&self) -> std::ops::RangeInclusive<usize> {
        self.min_depth..=self.max_depth
    }

    /// Number of rounds, one per dataset.
    #[must_use]
    pub fn n_rounds(&self) -> usize {
        self.datasets.len()
    }
}

/// Run the sweep and write all reports, returning the summary rows
/// ordered by depth, then round.
#[instrument(skip_all, fields(depths = ?config.depths(), rounds = config.n_rounds(), policy = ?config.policy))]
pub fn run(config: &SweepConfig) -> Result<Vec<SummaryRow>> {
    let batches = config
        .datasets
        .iter()
        .map(|path| {
            SessionReader::new(path)
                .read()
                .with_context(|| format!("failed to read dataset {}", path.display()))
        })
        .collect::<Result<Vec<Dataset>>>()?;

    let reports = ReportWriter::new(&config.output_dir)?;

    let per_depth = config
        .depths()
        .into_par_iter()
        .map(|depth| {
            sweep_depth(config, depth, &batches, &reports)
                .with_context(|| format!("sweep failed at depth {depth}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let rows: Vec<SummaryRow> = per_depth.into_iter().flatten().collect();
    reports.write_summary(&rows)?;
    info!(n_rows = rows.len(), "sweep complete");
    Ok(rows)
}

fn sweep_depth(
    config: &SweepConfig,
    depth: usize,
    batches: &[Dataset],
    reports: &ReportWriter,
) -> Result<Vec<SummaryRow>> {
    let mut tree =
        DecisionTreeClassifier::new(depth, feature_names())?.with_split_search(config.split_search);
    reports.depth_dir(depth)?;
    let mut pool = SessionPool::create(&reports.pool_path(depth))?;
    let mut rows = Vec::with_capacity(batches.len());

    for (i, batch) in batches.iter().enumerate() {
        let round = i + 1;
        let (features, labels) = (batch.features(), batch.labels());

        let evaluation = tree.evaluate(&features, &labels)?;
        reports.write_metrics(depth, round, &evaluation)?;
        if !evaluation.is_skipped() {
            rows.push(SummaryRow::new(depth, round, &evaluation));
        }

        match config.policy {
            RetrainPolicy::Cumulative => pool.append(batch)?,
            RetrainPolicy::Latest => pool.replace(batch)?,
        }
        let data = pool.dataset();
        tree.fit(&data.features(), &data.labels())?;
        reports.write_tree(depth, round, &tree)?;
        debug!(depth, round, pool_size = data.len(), n_nodes = tree.n_nodes(), "round trained");

        if round == 1 {
            let retest = tree.evaluate(&features, &labels)?;
            reports.write_metrics(depth, round, &retest)?;
            if !retest.is_skipped() {
                rows.push(SummaryRow::new(depth, round, &retest));
            }
        }
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoptree_io::write_sessions;
    use shoptree_sim::SessionGenerator;
    use std::fs;
    use tempfile::TempDir;

    fn write_batches(dir: &Path, sizes: &[usize]) -> Vec<PathBuf> {
        sizes
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let path = dir.join(format!("batch_{i}.csv"));
                let sessions = SessionGenerator::new(i as u64).generate(n).unwrap();
                write_sessions(&path, &sessions).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn config_validation() {
        let out = Path::new("out");
        assert!(SweepConfig::new(vec![], out).is_err());
        let cfg = SweepConfig::new(vec!["a.csv".into()], out).unwrap();
        assert_eq!(cfg.depths(), 1..=15);
        assert!(cfg.clone().with_depth_range(0, 3).is_err());
        assert!(cfg.clone().with_depth_range(4, 3).is_err());
        assert_eq!(cfg.with_depth_range(2, 2).unwrap().depths(), 2..=2);
    }

    #[test]
    fn writes_every_report() {
        let dir = TempDir::new().unwrap();
        let datasets = write_batches(dir.path(), &[120, 60, 60]);
        let out = dir.path().join("out");
        let cfg = SweepConfig::new(datasets, &out)
            .unwrap()
            .with_depth_range(1, 3)
            .unwrap();

        let rows = run(&cfg).unwrap();

        // round 1 retest plus rounds 2 and 3, for three depths
        assert_eq!(rows.len(), 9);
        let depths: Vec<usize> = rows.iter().map(|r| r.depth).collect();
        assert_eq!(depths, vec![1, 1, 1, 2, 2, 2, 3, 3, 3]);
        let rounds: Vec<usize> = rows.iter().take(3).map(|r| r.round).collect();
        assert_eq!(rounds, vec![1, 2, 3]);

        for depth in 1..=3 {
            let d = out.join(format!("depth_{depth}"));
            assert!(d.join("Tree_Master.txt").exists());
            for round in 1..=3 {
                assert!(d.join(format!("Tree_R{round}.txt")).exists());
                assert!(d.join(format!("Tree_R{round}_Metrics.txt")).exists());
            }
            let pool = SessionReader::new(&d.join("shopper_all_data.csv")).read().unwrap();
            assert_eq!(pool.len(), 240);
        }

        let summary = fs::read_to_string(out.join("depth_summary.csv")).unwrap();
        assert_eq!(summary.lines().count(), 10);
        assert!(out.join("depth_summary.json").exists());
    }

    #[test]
    fn first_round_metrics_hold_retest() {
        let dir = TempDir::new().unwrap();
        let datasets = write_batches(dir.path(), &[80]);
        let out = dir.path().join("out");
        let cfg = SweepConfig::new(datasets, &out)
            .unwrap()
            .with_depth_range(2, 2)
            .unwrap();
        let rows = run(&cfg).unwrap();
        assert_eq!(rows.len(), 1);
        let text = fs::read_to_string(out.join("depth_2/Tree_R1_Metrics.txt")).unwrap();
        assert!(text.contains("TP: "));
        assert!(!text.contains("skipped"));
    }

    #[test]
    fn latest_policy_keeps_newest_batch() {
        let dir = TempDir::new().unwrap();
        let datasets = write_batches(dir.path(), &[100, 40]);
        let out = dir.path().join("out");
        let cfg = SweepConfig::new(datasets, &out)
            .unwrap()
            .with_depth_range(2, 2)
            .unwrap()
            .with_policy(RetrainPolicy::Latest);
        run(&cfg).unwrap();
        let pool = SessionReader::new(&out.join("depth_2/shopper_all_data.csv"))
            .read()
            .unwrap();
        assert_eq!(pool.len(), 40);
    }

    #[test]
    fn parallel_split_matches_sequential() {
        let dir = TempDir::new().unwrap();
        let datasets = write_batches(dir.path(), &[150, 50]);
        let seq_out = dir.path().join("seq");
        let par_out = dir.path().join("par");
        let seq = SweepConfig::new(datasets.clone(), &seq_out)
            .unwrap()
            .with_depth_range(3, 3)
            .unwrap();
        let par = SweepConfig::new(datasets, &par_out)
            .unwrap()
            .with_depth_range(3, 3)
            .unwrap()
            .with_split_search(SplitSearch::Parallel);
        assert_eq!(run(&seq).unwrap(), run(&par).unwrap());
        assert_eq!(
            fs::read_to_string(seq_out.join("depth_3/Tree_Master.txt")).unwrap(),
            fs::read_to_string(par_out.join("depth_3/Tree_Master.txt")).unwrap()
        );
    }

    #[test]
    fn missing_dataset_reported() {
        let dir = TempDir::new().unwrap();
        let cfg = SweepConfig::new(vec![dir.path().join("nope.csv")], dir.path()).unwrap();
        let err = run(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("nope.csv"));
    }
}
