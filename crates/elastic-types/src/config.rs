//! Configuration loading for the streaming benchmark.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at `~/.config/elastic-ivf/config.toml`.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Which index family the benchmark builds.
///
/// The family decides whether removal works on the accelerator-resident copy.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Inverted-file index with `nlist` trained partitions
    #[default]
    IvfFlat,
    /// Single partition, exhaustive scan
    Flat,
}

impl IndexKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::IvfFlat => "ivf_flat",
            IndexKind::Flat => "flat",
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndexKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ivf_flat" | "ivfflat" | "ivf" => Ok(IndexKind::IvfFlat),
            "flat" => Ok(IndexKind::Flat),
            other => Err(format!("unknown index kind: {other}")),
        }
    }
}

/// Benchmark settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory holding the vector files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Base vectors, relative to `data_dir` unless absolute
    #[serde(default = "default_base_file")]
    pub base_file: String,

    /// Training vectors, relative to `data_dir` unless absolute
    #[serde(default = "default_learn_file")]
    pub learn_file: String,

    /// Vector width
    #[serde(default = "default_dim")]
    pub dim: usize,

    /// Partition count for the inverted file
    #[serde(default = "default_nlist")]
    pub nlist: usize,

    /// Resident capacity of the sliding window
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// Vectors admitted and evicted per step
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Accelerator selector
    #[serde(default)]
    pub device_id: u32,

    /// Number of benchmark steps
    #[serde(default = "default_steps")]
    pub steps: usize,

    /// Index family
    #[serde(default)]
    pub index_kind: IndexKind,

    /// Simulated accelerator memory in MiB (0 = unlimited)
    #[serde(default)]
    pub device_memory_mb: u64,

    /// Lloyd iterations when training partitions
    #[serde(default = "default_train_iterations")]
    pub train_iterations: usize,

    /// Cap on training points (0 = use the whole training set)
    #[serde(default)]
    pub max_train_points: usize,

    /// Seed for training and synthetic data
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Where `latest.json` and `latest.txt` are written
    #[serde(default = "default_out_dir")]
    pub out_dir: String,

    /// Where the comparison chart is rendered
    #[serde(default = "default_figure_path")]
    pub figure_path: String,
}

fn default_data_dir() -> String {
    ProjectDirs::from("", "", "elastic-ivf")
        .map(|p| p.data_local_dir().join("sift"))
        .unwrap_or_else(|| PathBuf::from("./data/sift"))
        .to_string_lossy()
        .to_string()
}

fn default_base_file() -> String {
    "sift_base.fvecs".to_string()
}

fn default_learn_file() -> String {
    "sift_learn.fvecs".to_string()
}

fn default_dim() -> usize {
    128
}

fn default_nlist() -> usize {
    1024
}

fn default_window_size() -> usize {
    100_000
}

fn default_batch_size() -> usize {
    10_000
}

fn default_steps() -> usize {
    10
}

fn default_train_iterations() -> usize {
    10
}

fn default_seed() -> u64 {
    1337
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_out_dir() -> String {
    "benchmarks".to_string()
}

fn default_figure_path() -> String {
    "figures/motivation_bar_chart.svg".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            base_file: default_base_file(),
            learn_file: default_learn_file(),
            dim: default_dim(),
            nlist: default_nlist(),
            window_size: default_window_size(),
            batch_size: default_batch_size(),
            device_id: 0,
            steps: default_steps(),
            index_kind: IndexKind::default(),
            device_memory_mb: 0,
            train_iterations: default_train_iterations(),
            max_train_points: 0,
            seed: default_seed(),
            log_level: default_log_level(),
            out_dir: default_out_dir(),
            figure_path: default_figure_path(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/elastic-ivf/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (ELASTIC_*)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let config_dir = ProjectDirs::from("", "", "elastic-ivf")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        let default_config_path = config_dir.join("config");

        let mut builder = Config::builder()
            .set_default("data_dir", default_data_dir())?
            .set_default("base_file", default_base_file())?
            .set_default("learn_file", default_learn_file())?
            .set_default("dim", default_dim() as i64)?
            .set_default("nlist", default_nlist() as i64)?
            .set_default("window_size", default_window_size() as i64)?
            .set_default("batch_size", default_batch_size() as i64)?
            .set_default("device_id", 0_i64)?
            .set_default("steps", default_steps() as i64)?
            .set_default("index_kind", IndexKind::default().as_str())?
            .set_default("device_memory_mb", 0_i64)?
            .set_default("train_iterations", default_train_iterations() as i64)?
            .set_default("max_train_points", 0_i64)?
            .set_default("seed", default_seed() as i64)?
            .set_default("log_level", default_log_level())?
            .set_default("out_dir", default_out_dir())?
            .set_default("figure_path", default_figure_path())?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: ELASTIC_WINDOW_SIZE, ELASTIC_NLIST, ...
        builder = builder.add_source(
            Environment::with_prefix("ELASTIC")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Check that every sizing parameter can drive a run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("dim", self.dim),
            ("nlist", self.nlist),
            ("window_size", self.window_size),
            ("batch_size", self.batch_size),
            ("train_iterations", self.train_iterations),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolve the base vector file against `data_dir`.
    pub fn base_path(&self) -> PathBuf {
        self.resolve(&self.base_file)
    }

    /// Resolve the training vector file against `data_dir`.
    pub fn learn_path(&self) -> PathBuf {
        self.resolve(&self.learn_file)
    }

    /// Simulated accelerator capacity in bytes (0 = unlimited).
    pub fn device_memory_bytes(&self) -> u64 {
        self.device_memory_mb.saturating_mul(1024 * 1024)
    }

    /// Smallest dataset that still completes every configured step.
    /// Saturates at `usize::MAX`.
    pub fn required_vectors(&self) -> usize {
        self.steps
            .saturating_mul(self.batch_size)
            .saturating_add(self.window_size)
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = PathBuf::from(file);
        if path.is_absolute() {
            path
        } else {
            expand_home(&self.data_dir).join(path)
        }
    }
}

/// Expand a leading `~/` using the home directory.
fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = directories::BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
