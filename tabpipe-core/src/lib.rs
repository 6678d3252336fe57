//! Columnar dataset model and single-threaded engines for tabular pipelines
//!
//! This crate provides the data model (schema, columns, datasets, batch
//! views) and the engines that operate on it: fixed-size batch
//! partitioning, column type narrowing, pre/post optimization hooks,
//! data-quality validation and basic cleaning. Everything here is
//! synchronous and I/O-free; loading data in and persisting results out
//! are the caller's concern.

#![warn(missing_docs)]

pub mod batch;
pub mod clean;
pub mod column;
pub mod dataset;
pub mod error;
pub mod hook;
pub mod optimize;
pub mod schema;
pub mod validate;

// Re-export key types for convenience
pub use batch::{Batch, BatchPartitioner, Batches};
pub use column::{Column, ColumnData, Value};
pub use dataset::Dataset;
pub use error::{Error, Result};
pub use hook::{HookReport, OptimizationHook};
pub use optimize::{ColumnOptimizer, OptimizationReport, OptimizerConfig};
pub use schema::{DataType, Field, Schema};
pub use validate::{
    CategoricalValidator, IssueKind, NumericValidator, Severity, ValidationEngine,
    ValidationIssue, Validator,
};
