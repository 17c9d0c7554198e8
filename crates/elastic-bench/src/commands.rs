//! Command implementations for the benchmark CLI.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use tracing::{debug, info, warn};

use elastic_stream::{
    BenchmarkConfig, BenchmarkDriver, BenchmarkSummary, IndexLifecycleAdapter, MetricsReporter,
};
use elastic_types::Settings;
use elastic_vector::{
    build_on_device, read_fvecs, synthetic, DeviceResources, IvfParams, VectorSet,
};

use crate::chart::{render_comparison, ChartSpec};
use crate::cli::{ChartArgs, RunArgs};

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
/// A subscriber installed earlier in the process is kept.
fn init_logging(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        debug!("Tracing subscriber already installed");
    }
}

fn load_settings(config_path: Option<&str>, log_level: Option<&str>) -> Result<Settings> {
    let mut settings = Settings::load(config_path).context("Failed to load configuration")?;
    if let Some(level) = log_level {
        settings.log_level = level.to_string();
    }
    Ok(settings)
}

/// Base and training sets, from files or generated.
fn load_datasets(
    settings: &Settings,
    synthetic_count: Option<usize>,
) -> Result<(VectorSet, VectorSet)> {
    if let Some(n) = synthetic_count {
        info!(vectors = n, dim = settings.dim, "Generating synthetic dataset");
        let base = synthetic(n, settings.dim, settings.seed)?;
        let n_train = settings
            .nlist
            .saturating_mul(64)
            .min(100_000)
            .max(settings.nlist);
        let learn = synthetic(n_train, settings.dim, settings.seed.wrapping_add(1))?;
        return Ok((base, learn));
    }

    let base_path = settings.base_path();
    let learn_path = settings.learn_path();
    info!(base = ?base_path, learn = ?learn_path, "Loading dataset");

    let base = read_fvecs(&base_path, Some(settings.required_vectors()))
        .with_context(|| format!("Failed to load base vectors from {}", base_path.display()))?;
    let train_limit = (settings.max_train_points > 0).then_some(settings.max_train_points);
    let learn = read_fvecs(&learn_path, train_limit).with_context(|| {
        format!(
            "Failed to load training vectors from {}",
            learn_path.display()
        )
    })?;
    Ok((base, learn))
}

fn check_dimension(settings: &Settings, set: &VectorSet, what: &str) -> Result<()> {
    if set.dimension() != settings.dim {
        bail!(
            "Configuration error: {what} vectors have dimension {}, configured dim is {}",
            set.dimension(),
            settings.dim
        );
    }
    Ok(())
}

/// Run the streaming benchmark end to end.
pub fn run_benchmark(
    config_path: Option<&str>,
    log_level: Option<&str>,
    args: &RunArgs,
) -> Result<MetricsReporter> {
    let mut settings = load_settings(config_path, log_level)?;
    args.apply(&mut settings);
    init_logging(&settings.log_level);
    settings.validate().context("Invalid configuration")?;

    info!("Elastic IVF streaming benchmark");
    info!(
        "  Index: {} (nlist={}, dim={})",
        settings.index_kind, settings.nlist, settings.dim
    );
    info!(
        "  Window: {}, Batch: {}, Steps: {}",
        settings.window_size, settings.batch_size, settings.steps
    );
    info!("  Device: {}", settings.device_id);

    let (base, learn) = load_datasets(&settings, args.synthetic)?;
    check_dimension(&settings, &base, "base")?;
    check_dimension(&settings, &learn, "training")?;
    if base.len() < settings.required_vectors() {
        warn!(
            available = base.len(),
            required = settings.required_vectors(),
            "Dataset shorter than the configured run; stopping early when it runs out"
        );
    }

    let resources = DeviceResources::new(settings.device_id, settings.device_memory_bytes());
    let params = IvfParams::new(settings.index_kind, settings.dim, settings.nlist)
        .with_training(settings.train_iterations, settings.max_train_points)
        .with_seed(settings.seed);
    let index = build_on_device(&resources, &params, &learn)
        .context("Failed to build index")?;

    let mut adapter = IndexLifecycleAdapter::new(index);
    let driver = BenchmarkDriver::new(BenchmarkConfig::from(&settings))?;
    let mut reporter = MetricsReporter::streaming(Box::new(std::io::stdout()));

    let outcome = driver
        .run(&mut adapter, &base, &mut reporter)
        .context("Benchmark failed")?;

    println!("{}", "=".repeat(65));
    match (reporter.mean_add_ms(), reporter.mean_remove_ms()) {
        (Some(add), Some(remove)) => {
            println!("Mean add latency:    {add:.3} ms");
            println!("Mean remove latency: {remove:.3} ms");
            if let Some(slowdown) = reporter.slowdown() {
                println!("Remove is {slowdown:.1}x slower than add");
            }
        }
        _ => println!("No steps completed"),
    }
    info!(
        steps = outcome.steps_completed,
        exhausted = outcome.exhausted,
        strategy_changes = outcome.strategy_changes,
        device_bytes = resources.used_bytes(),
        "Run complete"
    );

    let out_dir = PathBuf::from(&settings.out_dir);
    reporter
        .write_outputs(&out_dir)
        .with_context(|| format!("Failed to write outputs to {}", out_dir.display()))?;
    println!("Results written to {}", out_dir.display());

    Ok(reporter)
}

fn read_summary(path: &Path) -> Result<BenchmarkSummary> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read summary {}", path.display()))?;
    serde_json::from_str(&data)
        .with_context(|| format!("Malformed summary {}", path.display()))
}

/// Render the comparison chart from explicit means or a run summary.
pub fn render_chart(
    config_path: Option<&str>,
    log_level: Option<&str>,
    args: &ChartArgs,
) -> Result<PathBuf> {
    let settings = load_settings(config_path, log_level)?;
    init_logging(&settings.log_level);

    let spec = match (args.add_ms, args.remove_ms) {
        (Some(add), Some(remove)) => ChartSpec::new(add, remove)?,
        _ => {
            let path = args
                .summary
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.out_dir).join("latest.json"));
            let summary = read_summary(&path)?;
            if summary.steps == 0 {
                bail!("Summary {} has no completed steps", path.display());
            }
            ChartSpec::new(summary.add.mean_ms, summary.remove.mean_ms)?
        }
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.figure_path));
    render_comparison(&spec, &output)?;
    println!("Figure saved to: {}", output.display());
    Ok(output)
}
