//! Bounded worker-pool execution over batches

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use tabpipe_core::{Batch, Dataset, Schema};

use crate::cancel::CancellationToken;

/// Result type for executor operations
pub type ExecuteResult<T> = std::result::Result<T, ExecuteError>;

/// One batch's transform failure, kept with its origin index
#[derive(Debug)]
pub struct BatchFailure {
    /// Origin index of the failed batch
    pub batch_index: usize,

    /// The error the transform returned
    pub error: tabpipe_core::Error,
}

impl fmt::Display for BatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch {}: {}", self.batch_index, self.error)
    }
}

/// Error type for parallel execution
#[derive(Error, Debug)]
pub enum ExecuteError {
    /// Caller-supplied configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Cancellation was observed before every batch completed
    #[error("Execution cancelled before all batches completed")]
    Cancelled,

    /// One or more batch transforms failed; carries every failure
    #[error("{} of the dispatched batches failed", .failures.len())]
    BatchTransformFailed {
        /// Per-batch failures in ascending origin-index order
        failures: Vec<BatchFailure>,
    },

    /// A worker thread panicked while transforming a batch
    #[error("A worker thread panicked")]
    WorkerPanic,

    /// Error from the core data model (e.g. merging incompatible results)
    #[error(transparent)]
    Core(#[from] tabpipe_core::Error),
}

/// A per-batch transformation runnable from multiple workers
///
/// Implementations are shared by reference across the pool, so they take
/// `&self`; per-batch state belongs in the returned dataset, not in the
/// transform. Any `Fn(&Batch) -> Result<Dataset>` qualifies.
pub trait BatchTransform: Sync {
    /// Transform one batch into its replacement rows
    fn transform(&self, batch: &Batch<'_>) -> tabpipe_core::Result<Dataset>;
}

impl<F> BatchTransform for F
where
    F: Fn(&Batch<'_>) -> tabpipe_core::Result<Dataset> + Sync,
{
    fn transform(&self, batch: &Batch<'_>) -> tabpipe_core::Result<Dataset> {
        self(batch)
    }
}

/// Runs a transform over batches on a bounded worker pool and merges the
/// results in origin order
///
/// Workers claim batch indices from a shared cursor and post results keyed
/// by that index, so each result lands in its own slot and the merge is
/// independent of completion order: for a fixed input and transform, the
/// output row order is identical for any worker count.
#[derive(Debug, Clone)]
pub struct ParallelExecutor {
    worker_count: usize,
    cancel: CancellationToken,
}

impl ParallelExecutor {
    /// Create an executor with a fixed worker count
    pub fn new(worker_count: usize) -> ExecuteResult<Self> {
        if worker_count == 0 {
            return Err(ExecuteError::InvalidConfiguration(
                "worker count must be at least 1".into(),
            ));
        }
        Ok(Self {
            worker_count,
            cancel: CancellationToken::new(),
        })
    }

    /// Create an executor sized to the host's available parallelism
    pub fn with_default_workers() -> Self {
        Self {
            worker_count: num_cpus::get(),
            cancel: CancellationToken::new(),
        }
    }

    /// The configured worker count
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// A handle for cancelling this executor's runs from another thread
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Transform every batch and merge the outputs in origin order
    ///
    /// Blocks until every dispatched batch's outcome is known or
    /// cancellation is observed. A failing batch does not abort its
    /// siblings; all failures are reported together and no partial dataset
    /// escapes. Running over zero batches yields an empty dataset.
    pub fn run<'a, T>(
        &self,
        batches: impl IntoIterator<Item = Batch<'a>>,
        transform: &T,
    ) -> ExecuteResult<Dataset>
    where
        T: BatchTransform,
    {
        let batches: Vec<Batch<'a>> = batches.into_iter().collect();
        let total = batches.len();

        if total == 0 {
            return Ok(Dataset::empty(Arc::new(Schema::new(Vec::new()))));
        }

        let workers = self.worker_count.min(total);
        debug!(workers, batches = total, "dispatching batches");

        let cursor = AtomicUsize::new(0);
        let (tx, rx) = crossbeam::channel::unbounded::<(usize, tabpipe_core::Result<Dataset>)>();

        let scope_outcome = crossbeam::thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let cursor = &cursor;
                let batches = &batches;
                let cancel = &self.cancel;
                scope.spawn(move |_| loop {
                    // Checked between batches only; an in-flight transform
                    // finishes before cancellation takes effect.
                    if cancel.is_cancelled() {
                        break;
                    }
                    let index = cursor.fetch_add(1, Ordering::SeqCst);
                    if index >= total {
                        break;
                    }
                    let result = transform.transform(&batches[index]);
                    if tx.send((index, result)).is_err() {
                        break;
                    }
                });
            }
        });
        drop(tx);

        if scope_outcome.is_err() {
            return Err(ExecuteError::WorkerPanic);
        }

        // Every worker has exited, so the channel drains without blocking.
        let mut slots: Vec<Option<tabpipe_core::Result<Dataset>>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);
        for (index, result) in rx {
            slots[index] = Some(result);
        }

        let mut failures = Vec::new();
        let mut parts = Vec::with_capacity(total);
        let mut complete = true;

        for (index, slot) in slots.into_iter().enumerate() {
            match slot {
                Some(Ok(part)) => parts.push(part),
                Some(Err(error)) => {
                    warn!(batch = index, %error, "batch transform failed");
                    failures.push(BatchFailure {
                        batch_index: index,
                        error,
                    });
                }
                None => complete = false,
            }
        }

        if !complete {
            return Err(ExecuteError::Cancelled);
        }
        if !failures.is_empty() {
            return Err(ExecuteError::BatchTransformFailed { failures });
        }

        Ok(Dataset::concat(parts)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tabpipe_core::{BatchPartitioner, Column, DataType, Error, Field};
    use test_case::test_case;

    fn numbered_dataset(rows: usize) -> Dataset {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
        let values = (0..rows as i64).map(Some).collect();
        Dataset::new(schema, vec![Column::from_i64("n", values)]).unwrap()
    }

    fn double(batch: &Batch<'_>) -> tabpipe_core::Result<Dataset> {
        let values = (0..batch.len())
            .map(|row| match batch.value(row, 0) {
                Some(tabpipe_core::Value::Int(v)) => Some(v * 2),
                _ => None,
            })
            .collect();
        Dataset::new(
            batch.schema().clone(),
            vec![Column::from_i64("n", values)],
        )
    }

    #[test]
    fn test_zero_workers_rejected() {
        assert!(matches!(
            ParallelExecutor::new(0),
            Err(ExecuteError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn test_default_workers_positive() {
        assert!(ParallelExecutor::with_default_workers().worker_count() >= 1);
    }

    #[test_case(1; "single worker")]
    #[test_case(4; "several workers")]
    fn test_transform_preserves_row_order(workers: usize) {
        let dataset = numbered_dataset(103);
        let partitioner = BatchPartitioner::new(10).unwrap();
        let executor = ParallelExecutor::new(workers).unwrap();

        let merged = executor
            .run(partitioner.partition(&dataset), &double)
            .unwrap();

        assert_eq!(merged.row_count(), 103);
        for row in 0..merged.row_count() {
            assert_eq!(
                merged.column(0).unwrap().int_value(row),
                Some(row as i64 * 2)
            );
        }
    }

    #[test]
    fn test_output_independent_of_worker_count() {
        let dataset = numbered_dataset(57);
        let partitioner = BatchPartitioner::new(7).unwrap();

        let one = ParallelExecutor::new(1)
            .unwrap()
            .run(partitioner.partition(&dataset), &double)
            .unwrap();
        let eight = ParallelExecutor::new(8)
            .unwrap()
            .run(partitioner.partition(&dataset), &double)
            .unwrap();

        assert_eq!(one, eight);
    }

    #[test]
    fn test_failures_are_aggregated_and_fail_atomic() {
        let dataset = numbered_dataset(50);
        let partitioner = BatchPartitioner::new(10).unwrap();
        let executor = ParallelExecutor::new(4).unwrap();

        let flaky = |batch: &Batch<'_>| {
            if batch.index() == 2 {
                Err(Error::Transform("bad batch".into()))
            } else {
                double(batch)
            }
        };

        match executor.run(partitioner.partition(&dataset), &flaky) {
            Err(ExecuteError::BatchTransformFailed { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].batch_index, 2);
                assert!(failures[0].error.to_string().contains("bad batch"));
            }
            other => panic!("expected BatchTransformFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_multiple_failures_reported_in_index_order() {
        let dataset = numbered_dataset(40);
        let partitioner = BatchPartitioner::new(10).unwrap();
        let executor = ParallelExecutor::new(2).unwrap();

        let flaky = |batch: &Batch<'_>| {
            if batch.index() % 2 == 1 {
                Err(Error::Transform(format!("batch {}", batch.index())))
            } else {
                double(batch)
            }
        };

        match executor.run(partitioner.partition(&dataset), &flaky) {
            Err(ExecuteError::BatchTransformFailed { failures }) => {
                let indices: Vec<usize> = failures.iter().map(|f| f.batch_index).collect();
                assert_eq!(indices, vec![1, 3]);
            }
            other => panic!("expected BatchTransformFailed, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_cancellation_stops_dispatch() {
        let dataset = numbered_dataset(30);
        let partitioner = BatchPartitioner::new(10).unwrap();
        let executor = ParallelExecutor::new(1).unwrap();
        let token = executor.cancellation_token();

        // Cancel from inside the first transform; the single worker then
        // observes the flag before claiming the next batch.
        let cancelling = move |batch: &Batch<'_>| {
            token.cancel();
            double(batch)
        };

        assert!(matches!(
            executor.run(partitioner.partition(&dataset), &cancelling),
            Err(ExecuteError::Cancelled)
        ));
    }

    #[test]
    fn test_cancelled_before_run() {
        let dataset = numbered_dataset(10);
        let partitioner = BatchPartitioner::new(5).unwrap();
        let executor = ParallelExecutor::new(2).unwrap();
        executor.cancellation_token().cancel();

        assert!(matches!(
            executor.run(partitioner.partition(&dataset), &double),
            Err(ExecuteError::Cancelled)
        ));
    }

    #[test]
    fn test_empty_batch_sequence_yields_empty_dataset() {
        let executor = ParallelExecutor::new(2).unwrap();
        let merged = executor.run(Vec::new(), &double).unwrap();

        assert_eq!(merged.row_count(), 0);
        assert_eq!(merged.column_count(), 0);
    }

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(16))]
        #[test]
        fn prop_output_independent_of_parallelism(
            rows in 1usize..120,
            batch_size in 1usize..40,
            workers in 2usize..6,
        ) {
            let dataset = numbered_dataset(rows);
            let partitioner = BatchPartitioner::new(batch_size).unwrap();

            let serial = ParallelExecutor::new(1)
                .unwrap()
                .run(partitioner.partition(&dataset), &double)
                .unwrap();
            let parallel = ParallelExecutor::new(workers)
                .unwrap()
                .run(partitioner.partition(&dataset), &double)
                .unwrap();

            proptest::prop_assert_eq!(serial, parallel);
        }
    }

    #[test]
    fn test_full_pipeline_flow() {
        // Partition, fan out, merge, narrow through the hook, then validate:
        // the composition the two crates exist for.
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("status", DataType::Utf8, true),
        ]));
        let ids = (0..500i64).map(Some).collect();
        let statuses = (0..500)
            .map(|i| Some(if i % 2 == 0 { "open" } else { "closed" }))
            .collect();
        let dataset = Dataset::new(
            schema.clone(),
            vec![
                Column::from_i64("id", ids),
                Column::from_utf8("status", statuses),
            ],
        )
        .unwrap();

        let partitioner = BatchPartitioner::new(64).unwrap();
        let executor = ParallelExecutor::new(4).unwrap();

        let keep = |batch: &Batch<'_>| batch.to_dataset();
        let mut merged = executor
            .run(partitioner.partition(&dataset), &keep)
            .unwrap();
        assert_eq!(merged, dataset);

        let hook = tabpipe_core::OptimizationHook::with_defaults();
        let (removed, report) = hook
            .around(&mut merged, |ds| tabpipe_core::clean::remove_duplicate_rows(ds))
            .unwrap();
        assert_eq!(removed, 0);
        assert_eq!(report.before.change_for("id").unwrap().optimized, DataType::UInt16);
        assert_eq!(
            report.before.change_for("status").unwrap().optimized,
            DataType::Dictionary
        );

        let engine = tabpipe_core::ValidationEngine::with_default_validators();
        assert!(engine.validate(&merged).is_empty());
    }

    #[test]
    fn test_transform_may_change_schema() {
        let dataset = numbered_dataset(20);
        let partitioner = BatchPartitioner::new(6).unwrap();
        let executor = ParallelExecutor::new(3).unwrap();

        let relabel = |batch: &Batch<'_>| {
            let schema = Arc::new(Schema::new(vec![Field::new("m", DataType::Int64, false)]));
            let values = (0..batch.len())
                .map(|row| match batch.value(row, 0) {
                    Some(tabpipe_core::Value::Int(v)) => Some(v + 1),
                    _ => None,
                })
                .collect();
            Dataset::new(schema, vec![Column::from_i64("m", values)])
        };

        let merged = executor
            .run(partitioner.partition(&dataset), &relabel)
            .unwrap();

        assert_eq!(merged.schema().field(0).name(), "m");
        assert_eq!(merged.column(0).unwrap().int_value(19), Some(20));
    }
}
