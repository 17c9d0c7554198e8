//! CLI argument parsing for the benchmark.
//!
//! CLI flags override every other configuration source.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use elastic_types::{IndexKind, Settings};

/// Elastic IVF streaming benchmark
///
/// Sliding-window insert/delete latency on an accelerator-resident index.
#[derive(Parser, Debug)]
#[command(name = "elastic-bench")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/elastic-ivf/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the streaming add/remove benchmark
    Run(RunArgs),

    /// Render the insertion vs. deletion comparison chart
    Chart(ChartArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Directory holding the vector files
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Resident capacity of the window
    #[arg(long)]
    pub window_size: Option<usize>,

    /// Vectors admitted and evicted per step
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Number of steps
    #[arg(long)]
    pub steps: Option<usize>,

    /// Partition count
    #[arg(long)]
    pub nlist: Option<usize>,

    /// Accelerator selector
    #[arg(long)]
    pub device_id: Option<u32>,

    /// Index family (ivf_flat, flat)
    #[arg(long)]
    pub index_kind: Option<IndexKind>,

    /// Generate N synthetic vectors instead of reading files
    #[arg(long)]
    pub synthetic: Option<usize>,

    /// Directory for latest.json / latest.txt
    #[arg(long)]
    pub out_dir: Option<String>,
}

impl RunArgs {
    /// Apply flags on top of loaded settings.
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(data_dir) = &self.data_dir {
            settings.data_dir = data_dir.clone();
        }
        if let Some(window_size) = self.window_size {
            settings.window_size = window_size;
        }
        if let Some(batch_size) = self.batch_size {
            settings.batch_size = batch_size;
        }
        if let Some(steps) = self.steps {
            settings.steps = steps;
        }
        if let Some(nlist) = self.nlist {
            settings.nlist = nlist;
        }
        if let Some(device_id) = self.device_id {
            settings.device_id = device_id;
        }
        if let Some(kind) = self.index_kind {
            settings.index_kind = kind;
        }
        if let Some(out_dir) = &self.out_dir {
            settings.out_dir = out_dir.clone();
        }
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ChartArgs {
    /// Mean add latency in ms
    #[arg(long, requires = "remove_ms", conflicts_with = "summary")]
    pub add_ms: Option<f64>,

    /// Mean remove latency in ms
    #[arg(long, requires = "add_ms", conflicts_with = "summary")]
    pub remove_ms: Option<f64>,

    /// Summary JSON written by `run` (default: <out_dir>/latest.json)
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Output SVG path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
