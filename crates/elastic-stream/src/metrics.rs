//! Step records and latency summaries.
//!
//! The reporter keeps every [`StepRecord`] in order and can stream a table
//! row for each one as it arrives.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::adapter::Strategy;

/// Outcome of one benchmark step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub step: usize,
    pub add_ms: f64,
    pub remove_ms: f64,
    pub strategy: Strategy,
    /// Resident vectors after the step
    pub resident: usize,
}

impl StepRecord {
    pub fn total_ms(&self) -> f64 {
        self.add_ms + self.remove_ms
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyStats {
    pub mean_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    pub p99_ms: f64,
    pub samples: usize,
}

impl LatencyStats {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Self {
            mean_ms: sorted.iter().sum::<f64>() / sorted.len() as f64,
            p50_ms: percentile(&sorted, 50.0),
            p90_ms: percentile(&sorted, 90.0),
            p99_ms: percentile(&sorted, 99.0),
            samples: sorted.len(),
        }
    }
}

/// Summary written to `latest.json` and read back by the chart renderer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkSummary {
    pub generated_at: String,
    pub steps: usize,
    pub add: LatencyStats,
    pub remove: LatencyStats,
    /// Mean remove latency over mean add latency
    pub slowdown: Option<f64>,
    /// Steps served by each strategy, keyed by strategy label
    pub strategies: BTreeMap<String, usize>,
    pub records: Vec<StepRecord>,
}

const RULE_WIDTH: usize = 65;

/// Collects step records; optionally streams each as a table row.
#[derive(Default)]
pub struct MetricsReporter {
    records: Vec<StepRecord>,
    sink: Option<Box<dyn Write + Send>>,
    header_written: bool,
}

impl MetricsReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reporter that writes a header and one row per record to `sink`.
    pub fn streaming(sink: Box<dyn Write + Send>) -> Self {
        Self {
            sink: Some(sink),
            ..Self::default()
        }
    }

    pub fn record(&mut self, record: StepRecord) -> io::Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            if !self.header_written {
                writeln!(sink, "{}", table_header())?;
                self.header_written = true;
            }
            writeln!(sink, "{}", table_row(&record))?;
            sink.flush()?;
        }
        self.records.push(record);
        Ok(())
    }

    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn mean_add_ms(&self) -> Option<f64> {
        mean(self.records.iter().map(|r| r.add_ms))
    }

    pub fn mean_remove_ms(&self) -> Option<f64> {
        mean(self.records.iter().map(|r| r.remove_ms))
    }

    /// Mean remove latency over mean add latency.
    pub fn slowdown(&self) -> Option<f64> {
        match (self.mean_add_ms(), self.mean_remove_ms()) {
            (Some(add), Some(remove)) if add > 0.0 => Some(remove / add),
            _ => None,
        }
    }

    pub fn summary(&self) -> BenchmarkSummary {
        let adds: Vec<f64> = self.records.iter().map(|r| r.add_ms).collect();
        let removes: Vec<f64> = self.records.iter().map(|r| r.remove_ms).collect();
        let mut strategies = BTreeMap::new();
        for record in &self.records {
            *strategies
                .entry(record.strategy.label().to_string())
                .or_insert(0) += 1;
        }
        BenchmarkSummary {
            generated_at: Utc::now().to_rfc3339(),
            steps: self.records.len(),
            add: LatencyStats::from_samples(&adds),
            remove: LatencyStats::from_samples(&removes),
            slowdown: self.slowdown(),
            strategies,
            records: self.records.clone(),
        }
    }

    /// Whole table plus a mean line.
    pub fn render_table(&self) -> String {
        let mut lines = vec![table_header()];
        lines.extend(self.records.iter().map(table_row));
        lines.push("-".repeat(RULE_WIDTH));
        match (self.mean_add_ms(), self.mean_remove_ms()) {
            (Some(add), Some(remove)) => {
                let slowdown = self
                    .slowdown()
                    .map(|s| format!("{s:.1}x"))
                    .unwrap_or_else(|| "-".to_string());
                lines.push(format!(
                    "{:<5} | {:<10.2} | {:<12.2} | {:<15} | {:<10.2}",
                    "mean",
                    add,
                    remove,
                    slowdown,
                    add + remove
                ));
            }
            _ => lines.push("no steps completed".to_string()),
        }
        lines.join("\n")
    }

    /// Write `latest.json` and `latest.txt` into `out_dir`.
    pub fn write_outputs(&self, out_dir: &Path) -> io::Result<()> {
        fs::create_dir_all(out_dir)?;
        let json =
            serde_json::to_string_pretty(&self.summary()).map_err(io::Error::other)?;
        fs::write(out_dir.join("latest.json"), json)?;
        fs::write(out_dir.join("latest.txt"), self.render_table())?;
        info!(dir = ?out_dir, steps = self.records.len(), "Wrote benchmark outputs");
        Ok(())
    }
}

fn table_header() -> String {
    format!(
        "{:<5} | {:<10} | {:<12} | {:<15} | {:<10}\n{}",
        "Step",
        "Add(ms)",
        "Remove(ms)",
        "Method",
        "Total(ms)",
        "=".repeat(RULE_WIDTH)
    )
}

fn table_row(record: &StepRecord) -> String {
    format!(
        "{:<5} | {:<10.2} | {:<12.2} | {:<15} | {:<10.2}",
        record.step,
        record.add_ms,
        record.remove_ms,
        record.strategy,
        record.total_ms()
    )
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    (count > 0).then(|| sum / count as f64)
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (percentile / 100.0) * (values.len() as f64 - 1.0);
    let low = rank.floor() as usize;
    let high = rank.ceil() as usize;
    if low == high {
        values[low]
    } else {
        let weight = rank - low as f64;
        values[low] + (values[high] - values[low]) * weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    fn record(step: usize, add_ms: f64, remove_ms: f64, strategy: Strategy) -> StepRecord {
        StepRecord {
            step,
            add_ms,
            remove_ms,
            strategy,
            resident: 100,
        }
    }

    /// `Write` into a shared buffer so the test can read what was streamed.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_means_and_slowdown() {
        let mut reporter = MetricsReporter::new();
        assert_eq!(reporter.mean_add_ms(), None);
        assert_eq!(reporter.slowdown(), None);

        reporter.record(record(0, 20.0, 300.0, Strategy::Roundtrip)).unwrap();
        reporter.record(record(1, 40.0, 100.0, Strategy::Roundtrip)).unwrap();
        assert_eq!(reporter.mean_add_ms(), Some(30.0));
        assert_eq!(reporter.mean_remove_ms(), Some(200.0));
        let slowdown = reporter.slowdown().unwrap();
        assert!((slowdown - 200.0 / 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_latency_stats() {
        let stats = LatencyStats::from_samples(&[4.0, 1.0, 3.0, 2.0, 5.0]);
        assert_eq!(stats.samples, 5);
        assert_eq!(stats.mean_ms, 3.0);
        assert_eq!(stats.p50_ms, 3.0);
        assert!((stats.p90_ms - 4.6).abs() < 1e-9);
        assert_eq!(LatencyStats::from_samples(&[]), LatencyStats::default());
    }

    #[test]
    fn test_streaming_rows() {
        let buf = SharedBuf::default();
        let mut reporter = MetricsReporter::streaming(Box::new(buf.clone()));
        reporter.record(record(0, 1.5, 20.25, Strategy::Roundtrip)).unwrap();
        reporter.record(record(1, 1.0, 2.0, Strategy::Roundtrip)).unwrap();

        let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Step  | Add(ms)"));
        assert!(lines[2].starts_with(
            "0     | 1.50       | 20.25        | CPU_Roundtrip   | 21.75"
        ));
        assert_eq!(reporter.len(), 2);
    }

    #[test]
    fn test_summary_counts_strategies() {
        let mut reporter = MetricsReporter::new();
        reporter.record(record(0, 1.0, 10.0, Strategy::Direct)).unwrap();
        reporter.record(record(1, 1.0, 10.0, Strategy::Roundtrip)).unwrap();
        reporter.record(record(2, 1.0, 10.0, Strategy::Roundtrip)).unwrap();

        let summary = reporter.summary();
        assert_eq!(summary.steps, 3);
        assert_eq!(summary.strategies.get("Direct"), Some(&1));
        assert_eq!(summary.strategies.get("CPU_Roundtrip"), Some(&2));
        assert_eq!(summary.slowdown, Some(10.0));
    }

    #[test]
    fn test_write_outputs() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("nested").join("out");
        let mut reporter = MetricsReporter::new();
        reporter.record(record(0, 2.0, 8.0, Strategy::Roundtrip)).unwrap();
        reporter.write_outputs(&out).unwrap();

        let json = fs::read_to_string(out.join("latest.json")).unwrap();
        let summary: BenchmarkSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary.add.mean_ms, 2.0);
        assert_eq!(summary.records.len(), 1);

        let table = fs::read_to_string(out.join("latest.txt")).unwrap();
        assert!(table.contains("mean"));
        assert!(table.contains("4.0x"));
    }

    #[test]
    fn test_empty_table() {
        let reporter = MetricsReporter::new();
        assert!(reporter.render_table().ends_with("no steps completed"));
    }
}
