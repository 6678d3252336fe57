//! Bounded worker-pool execution for tabular batches
//!
//! This crate fans a caller-supplied per-batch transform out over a fixed
//! number of worker threads and merges the transformed batches back into a
//! single dataset in origin order, so the output row order never depends
//! on scheduling. Failures are collected per batch and reported together;
//! cancellation is cooperative and observed at batch boundaries.

#![warn(missing_docs)]

pub mod cancel;
pub mod executor;

// Re-export key types for convenience
pub use cancel::CancellationToken;
pub use executor::{
    BatchFailure, BatchTransform, ExecuteError, ExecuteResult, ParallelExecutor,
};
