//! Elastic IVF benchmark binary support.
//!
//! Provides the CLI definition, command handlers, and the chart renderer
//! used by the `elastic-bench` binary.

pub mod chart;
pub mod cli;
pub mod commands;

pub use chart::{render_comparison, ChartSpec};
pub use cli::{ChartArgs, Cli, Commands, RunArgs};
pub use commands::{render_chart, run_benchmark};
