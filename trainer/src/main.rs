use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use jobrec::persist::{load_model, read_jobs_file, save_model, save_similarity};
use jobrec::{JobRecord, TrainedModel, VectorizerConfig};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "trainer")]
#[command(about = "Fit, precompute and inspect job recommendation models", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a model artifact from job JSON/JSONL files or a directory of them
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output model artifact
        #[arg(long)]
        output: PathBuf,
        /// Use ln(N/df) + 1 instead of the smoothed idf
        #[arg(long, default_value_t = false)]
        plain_idf: bool,
        /// Use raw term counts instead of 1 + ln(tf)
        #[arg(long, default_value_t = false)]
        raw_tf: bool,
    },
    /// Precompute the full job-to-job similarity matrix for a model
    Similarity {
        #[arg(long)]
        model: PathBuf,
        #[arg(long)]
        output: PathBuf,
    },
    /// Print shape and sanity statistics of a model artifact
    Inspect {
        #[arg(long)]
        model: PathBuf,
        /// Number of leading rows to print
        #[arg(long, default_value_t = 5)]
        rows: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, plain_idf, raw_tf } => {
            let config = VectorizerConfig { sublinear_tf: !raw_tf, smooth_idf: !plain_idf };
            build_model(&input, &output, config)
        }
        Commands::Similarity { model, output } => precompute_similarity(&model, &output),
        Commands::Inspect { model, rows } => inspect(&model, rows),
    }
}

fn collect_inputs(input: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() && matches!(p.extension().and_then(|s| s.to_str()), Some("json" | "jsonl")) {
                files.push(p.to_path_buf());
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

fn build_model(input: &Path, output: &Path, config: VectorizerConfig) -> Result<()> {
    let files = collect_inputs(input);
    if files.is_empty() {
        bail!("no .json/.jsonl job files found at {}", input.display());
    }

    let mut jobs: Vec<JobRecord> = Vec::new();
    let mut seen = HashSet::new();
    for file in files {
        let batch = read_jobs_file(&file).with_context(|| format!("reading {}", file.display()))?;
        tracing::info!(file = %file.display(), jobs = batch.len(), "read job file");
        for job in batch {
            // later files win, like an update on the live store
            if !seen.insert(job.id()) {
                tracing::warn!(job_id = job.id(), "duplicate job id; keeping the later record");
                jobs.retain(|j| j.id() != job.id());
            }
            jobs.push(job);
        }
    }

    let start = Instant::now();
    let model = TrainedModel::fit(jobs, config)?;
    tracing::info!(
        num_jobs = model.len(),
        vocab_size = model.vectorizer().vocab_size(),
        took_s = start.elapsed().as_secs_f64(),
        "model fitted"
    );
    save_model(output, &model)?;
    tracing::info!(output = %output.display(), "model build complete");
    Ok(())
}

fn precompute_similarity(model_path: &Path, output: &Path) -> Result<()> {
    let model = load_model(model_path)?;
    let start = Instant::now();
    let matrix = model.compute_similarity();
    tracing::info!(
        num_jobs = matrix.len(),
        took_s = start.elapsed().as_secs_f64(),
        "pairwise similarity computed"
    );
    save_similarity(output, &matrix)?;
    tracing::info!(output = %output.display(), "similarity matrix saved");
    Ok(())
}

fn inspect(model_path: &Path, rows: usize) -> Result<()> {
    let model = load_model(model_path)?;
    let features = model.features();
    let non_finite = features
        .rows()
        .iter()
        .flat_map(|r| r.entries())
        .filter(|(_, w)| !w.is_finite())
        .count();
    tracing::info!(
        rows = features.len(),
        cols = features.dim(),
        nnz = features.nnz(),
        density = features.density(),
        non_finite,
        config = ?model.vectorizer().config(),
        "feature matrix"
    );
    for (job, row) in model.jobs().iter().zip(features.rows()).take(rows) {
        tracing::info!(job_id = job.id(), title = job.title(), nnz = row.nnz(), norm = row.norm(), "row");
    }
    Ok(())
}
