//! End-to-end sliding-window scenarios over the simulated device index.
//!
//! Each test builds a real device-resident index from synthetic data and
//! drives it through the adapter, window tracker and driver together.

use pretty_assertions::assert_eq;

use elastic_stream::{
    BenchmarkConfig, BenchmarkDriver, IndexLifecycleAdapter, MetricsReporter, Strategy,
    StreamError, WindowTracker,
};
use elastic_types::IndexKind;
use elastic_vector::{
    build_on_device, synthetic, AcceleratorIndex, DeviceIvfIndex, DeviceResources, HostIndex,
    IdRange, IvfParams, VectorSet,
};

const DIM: usize = 4;

fn device_adapter(kind: IndexKind) -> IndexLifecycleAdapter<DeviceIvfIndex> {
    let resources = DeviceResources::unlimited(0);
    let train = synthetic(256, DIM, 11).unwrap();
    let params = IvfParams::new(kind, DIM, 4)
        .with_training(4, 0)
        .with_seed(11);
    IndexLifecycleAdapter::new(build_on_device(&resources, &params, &train).unwrap())
}

fn dataset(n: usize) -> VectorSet {
    synthetic(n, DIM, 42).unwrap()
}

/// Window 100000, batch 10000, 200000 vectors: ten steps, each evicting
/// the batch admitted ten steps earlier.
#[test]
fn test_full_run_evicts_oldest_batches_in_order() {
    let (window, batch, steps) = (100_000usize, 10_000usize, 10usize);
    let data = dataset(200_000);
    let mut adapter = device_adapter(IndexKind::IvfFlat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(window, batch, steps)).unwrap();

    let mut tracker = driver.prefill(&mut adapter, &data).unwrap();
    assert_eq!(tracker.min_id(), 0);
    assert_eq!(tracker.max_id(), window as u64);

    for step in 0..steps {
        let offset = window + step * batch;
        let admitted = adapter
            .admit(&data.batch(offset, batch).unwrap())
            .unwrap();
        assert_eq!(admitted.ids, IdRange::with_len(offset as u64, batch));

        let expected = IdRange::with_len((step * batch) as u64, batch);
        assert_eq!(tracker.peek_eviction(batch), expected);

        let evicted = adapter.evict(&expected).unwrap();
        assert_eq!(evicted.removed, batch);
        assert_eq!(tracker.advance(batch), expected);
        assert_eq!(adapter.resident(), window);
    }

    assert_eq!(tracker.min_id(), 100_000);
    assert_eq!(tracker.max_id(), 200_000);
    assert!(!adapter.index().contains(99_999));
    assert!(adapter.index().contains(100_000));
    assert!(adapter.index().contains(199_999));
}

#[test]
fn test_ivf_index_latches_to_roundtrip_on_first_step() {
    let data = dataset(2_000);
    let mut adapter = device_adapter(IndexKind::IvfFlat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(1_000, 100, 5)).unwrap();
    let mut tracker = driver.prefill(&mut adapter, &data).unwrap();

    adapter.admit(&data.batch(1_000, 100).unwrap()).unwrap();
    let first = adapter.evict(&tracker.peek_eviction(100)).unwrap();
    tracker.advance(100);

    assert_eq!(first.strategy, Strategy::Roundtrip);
    let timing = first.roundtrip.expect("roundtrip timing on fallback");
    assert!(first.latency >= timing.total());
    assert_eq!(adapter.strategy_changes(), 1);

    adapter.admit(&data.batch(1_100, 100).unwrap()).unwrap();
    let second = adapter.evict(&tracker.peek_eviction(100)).unwrap();
    assert_eq!(second.strategy, Strategy::Roundtrip);
    assert_eq!(adapter.strategy_changes(), 1);
}

#[test]
fn test_driver_records_every_step_with_constant_residency() {
    let data = dataset(3_000);
    let mut adapter = device_adapter(IndexKind::IvfFlat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(1_000, 200, 10)).unwrap();
    let mut reporter = MetricsReporter::new();

    let outcome = driver.run(&mut adapter, &data, &mut reporter).unwrap();

    assert_eq!(outcome.steps_completed, 10);
    assert!(!outcome.exhausted);
    assert_eq!(outcome.strategy_changes, 1);
    assert_eq!(outcome.window.min_id, 2_000);
    assert_eq!(outcome.window.max_id, 3_000);
    assert_eq!(reporter.len(), 10);
    for (i, record) in reporter.records().iter().enumerate() {
        assert_eq!(record.step, i);
        assert_eq!(record.resident, 1_000);
        assert_eq!(record.strategy, Strategy::Roundtrip);
        assert!(record.add_ms >= 0.0);
        assert!(record.remove_ms >= 0.0);
    }

    let summary = reporter.summary();
    assert_eq!(summary.steps, 10);
    assert_eq!(summary.strategies.get("CPU_Roundtrip"), Some(&10));
}

#[test]
fn test_short_dataset_prefills_then_stops() {
    let data = dataset(1_050);
    let mut adapter = device_adapter(IndexKind::IvfFlat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(1_000, 100, 10)).unwrap();
    let mut reporter = MetricsReporter::new();

    let outcome = driver.run(&mut adapter, &data, &mut reporter).unwrap();

    assert_eq!(outcome.steps_completed, 0);
    assert!(outcome.exhausted);
    assert_eq!(adapter.resident(), 1_000);
    assert!(reporter.is_empty());
    assert_eq!(reporter.mean_remove_ms(), None);
    assert!(reporter.render_table().contains("no steps completed"));
}

#[test]
fn test_dataset_smaller_than_window_fails_prefill() {
    let data = dataset(500);
    let mut adapter = device_adapter(IndexKind::IvfFlat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(1_000, 100, 10)).unwrap();

    let err = driver
        .run(&mut adapter, &data, &mut MetricsReporter::new())
        .unwrap_err();
    assert!(matches!(
        err,
        StreamError::InsufficientData {
            required: 1_000,
            available: 500
        }
    ));
    assert_eq!(adapter.resident(), 0);
}

#[test]
fn test_flat_index_stays_on_direct_removal() {
    let data = dataset(2_000);
    let mut adapter = device_adapter(IndexKind::Flat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(1_000, 250, 4)).unwrap();
    let mut reporter = MetricsReporter::new();

    let outcome = driver.run(&mut adapter, &data, &mut reporter).unwrap();

    assert_eq!(outcome.steps_completed, 4);
    assert_eq!(outcome.strategy_changes, 0);
    assert_eq!(adapter.strategy(), Strategy::Direct);
    assert!(reporter
        .records()
        .iter()
        .all(|r| r.strategy == Strategy::Direct && r.resident == 1_000));
}

#[test]
fn test_export_import_preserves_contents() {
    let data = dataset(1_500);
    let resources = DeviceResources::unlimited(0);
    let train = synthetic(256, DIM, 11).unwrap();
    let params = IvfParams::new(IndexKind::IvfFlat, DIM, 4).with_training(4, 0);
    let mut index = build_on_device(&resources, &params, &train).unwrap();
    index.admit(&data.all()).unwrap();

    let host = index.export_to_host().unwrap();
    assert_eq!(host.len(), 1_500);
    let imported = index.import_from_host(&host).unwrap();

    assert_eq!(imported.len(), index.len());
    assert_eq!(imported.next_id(), index.next_id());
    assert_eq!(imported.id_bounds(), index.id_bounds());

    let query = data.batch(700, 1).unwrap();
    let hits = imported.search(query.vector(0).unwrap(), 1, 4).unwrap();
    assert_eq!(hits.first().map(|hit| hit.0), Some(700));
}

#[test]
fn test_window_tracker_matches_driver_final_state() {
    let data = dataset(1_600);
    let mut adapter = device_adapter(IndexKind::Flat);
    let driver = BenchmarkDriver::new(BenchmarkConfig::new(1_000, 200, 3)).unwrap();
    let outcome = driver
        .run(&mut adapter, &data, &mut MetricsReporter::new())
        .unwrap();

    let mut expected = WindowTracker::new(IdRange::with_len(0, 1_000));
    for _ in 0..3 {
        expected.advance(200);
    }
    assert_eq!(outcome.window, expected.state());
    assert_eq!(adapter.index().id_bounds(), Some(IdRange::new(600, 1_600).unwrap()));
}
