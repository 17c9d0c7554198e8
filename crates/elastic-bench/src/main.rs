//! Elastic IVF streaming benchmark
//!
//! Measures add vs. remove latency on a fixed-capacity, accelerator-resident
//! IVF index under a sliding-window (FIFO) workload.
//!
//! # Usage
//!
//! ```bash
//! elastic-bench run [--window-size N] [--batch-size N] [--steps N] [--synthetic N]
//! elastic-bench chart [--add-ms X --remove-ms Y | --summary FILE] [--output PATH]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/elastic-ivf/config.toml)
//! 3. Environment variables (ELASTIC_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use elastic_bench::{render_chart, run_benchmark, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            run_benchmark(cli.config.as_deref(), cli.log_level.as_deref(), &args)?;
        }
        Commands::Chart(args) => {
            render_chart(cli.config.as_deref(), cli.log_level.as_deref(), &args)?;
        }
    }

    Ok(())
}
