mod sweep;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use shoptree_cart::{DecisionTreeClassifier, SplitSearch};
use shoptree_io::{ModelStore, SessionReader, write_sessions};
use shoptree_sim::SessionGenerator;

use crate::sweep::{RetrainPolicy, SweepConfig};

#[derive(Parser)]
#[command(name = "shoptree")]
#[command(about = "Decision-tree purchase modelling over shopping sessions")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// RNG seed for reproducibility
    #[arg(long, default_value_t = 42, global = true)]
    seed: u64,

    /// Enable verbose (debug-level) logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    quiet: bool,

    /// Number of threads for parallel computation (defaults to all cores)
    #[arg(long, global = true)]
    threads: Option<usize>,
}

#[derive(Subcommand)]
enum Command {
    /// Simulate session CSV files for training and evaluation
    Generate {
        /// Output directory for the CSV files
        #[arg(long, default_value = "Data_Input")]
        output_dir: PathBuf,

        /// Sessions in shoppers_train.csv
        #[arg(long, default_value_t = 1000)]
        train: usize,

        /// Sessions in shoppers_actual.csv
        #[arg(long, default_value_t = 300)]
        actual: usize,

        /// Sessions in shoppers_multi.csv
        #[arg(long, default_value_t = 300)]
        multi: usize,
    },

    /// Fit a decision tree on a session CSV and save it
    Train {
        /// Path to the training CSV file
        #[arg(long)]
        data: PathBuf,

        /// Maximum tree depth
        #[arg(long, default_value_t = 5)]
        max_depth: usize,

        /// Output path for the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Also write the indented tree dump to this file
        #[arg(long)]
        tree: Option<PathBuf>,

        /// Scan features in parallel when searching for splits
        #[arg(long, default_value_t = false)]
        parallel_split: bool,
    },

    /// Evaluate a saved model against a session CSV
    Evaluate {
        /// Path to the trained model binary
        #[arg(long)]
        model: PathBuf,

        /// Path to the evaluation CSV file
        #[arg(long)]
        data: PathBuf,

        /// Also write the metrics report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Retrain round by round over several datasets for a range of depths
    Sweep {
        /// Round datasets, in order
        #[arg(long, num_args = 1.., required = true)]
        datasets: Vec<PathBuf>,

        /// Smallest maximum depth to try
        #[arg(long, default_value_t = 1)]
        min_depth: usize,

        /// Largest maximum depth to try
        #[arg(long, default_value_t = 15)]
        max_depth: usize,

        /// Output directory for tree dumps, metrics and the summary
        #[arg(long, default_value = ".")]
        output_dir: PathBuf,

        /// How each new batch joins the training pool
        #[arg(long, value_enum, default_value_t = RetrainPolicy::Cumulative)]
        policy: RetrainPolicy,

        /// Scan features in parallel when searching for splits
        #[arg(long, default_value_t = false)]
        parallel_split: bool,
    },
}

// --- JSON stdout output structs ---

#[derive(Serialize)]
struct GenerateOutput {
    seed: u64,
    files: Vec<GeneratedFile>,
}

#[derive(Serialize)]
struct GeneratedFile {
    path: String,
    n_sessions: usize,
    n_purchases: usize,
}

#[derive(Serialize)]
struct TrainOutput {
    n_samples: usize,
    max_depth: usize,
    n_nodes: usize,
    n_leaves: usize,
    depth: usize,
    train_accuracy: f64,
}

#[derive(Serialize)]
struct SweepOutput {
    n_depths: usize,
    n_rounds: usize,
    n_rows: usize,
    best_depth: Option<usize>,
    best_accuracy: Option<f64>,
}

fn split_search(parallel: bool) -> SplitSearch {
    if parallel {
        SplitSearch::Parallel
    } else {
        SplitSearch::Sequential
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match (cli.verbose, cli.quiet) {
        (true, _) => "debug",
        (_, true) => "error",
        _ => "info",
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if let Some(threads) = cli.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("failed to configure thread pool")?;
        info!(threads, "thread pool configured");
    }

    match cli.command {
        Command::Generate {
            output_dir,
            train,
            actual,
            multi,
        } => {
            let plan = [
                ("shoppers_train.csv", train),
                ("shoppers_actual.csv", actual),
                ("shoppers_multi.csv", multi),
            ];
            let mut files = Vec::with_capacity(plan.len());
            for (offset, (name, n)) in (0u64..).zip(plan) {
                let sessions = SessionGenerator::new(cli.seed.wrapping_add(offset))
                    .generate(n)
                    .context("session simulation failed")?;
                let path = output_dir.join(name);
                write_sessions(&path, &sessions)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                files.push(GeneratedFile {
                    path: path.display().to_string(),
                    n_sessions: sessions.len(),
                    n_purchases: sessions.iter().filter(|s| s.purchase == 1).count(),
                });
            }

            let output = GenerateOutput {
                seed: cli.seed,
                files,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Train {
            data,
            max_depth,
            model,
            tree,
            parallel_split,
        } => {
            let dataset = SessionReader::new(&data)
                .read()
                .context("failed to read training CSV")?;
            let (features, labels) = (dataset.features(), dataset.labels());

            let mut classifier = DecisionTreeClassifier::new(max_depth, dataset.feature_names())?
                .with_split_search(split_search(parallel_split));
            classifier.fit(&features, &labels).context("training failed")?;
            let train_accuracy = classifier.score(&features, &labels)?;
            info!(
                n_nodes = classifier.n_nodes(),
                depth = classifier.depth(),
                train_accuracy,
                "tree trained"
            );

            ModelStore::save(&classifier, &model).context("failed to save model")?;
            if let Some(tree_path) = tree {
                fs::write(&tree_path, classifier.render())
                    .with_context(|| format!("failed to write {}", tree_path.display()))?;
                info!(path = %tree_path.display(), "tree dump written");
            }

            let output = TrainOutput {
                n_samples: dataset.len(),
                max_depth,
                n_nodes: classifier.n_nodes(),
                n_leaves: classifier.n_leaves(),
                depth: classifier.depth(),
                train_accuracy,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Command::Evaluate {
            model,
            data,
            report,
        } => {
            let classifier = ModelStore::load(&model).context("failed to load model")?;
            let dataset = SessionReader::new(&data)
                .read()
                .context("failed to read evaluation CSV")?;

            let evaluation = classifier
                .evaluate(&dataset.features(), &dataset.labels())
                .context("evaluation failed")?;

            if let Some(report_path) = report {
                fs::write(&report_path, evaluation.to_string())
                    .with_context(|| format!("failed to write {}", report_path.display()))?;
                info!(path = %report_path.display(), "metrics written");
            }
            print!("{evaluation}");
        }

        Command::Sweep {
            datasets,
            min_depth,
            max_depth,
            output_dir,
            policy,
            parallel_split,
        } => {
            let config = SweepConfig::new(datasets, &output_dir)?
                .with_depth_range(min_depth, max_depth)?
                .with_policy(policy)
                .with_split_search(split_search(parallel_split));

            let rows = sweep::run(&config)?;

            let best = rows
                .iter()
                .max_by(|a, b| a.accuracy.total_cmp(&b.accuracy));
            let output = SweepOutput {
                n_depths: config.depths().count(),
                n_rounds: config.n_rounds(),
                n_rows: rows.len(),
                best_depth: best.map(|r| r.depth),
                best_accuracy: best.map(|r| r.accuracy),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}
