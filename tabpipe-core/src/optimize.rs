//! Column type narrowing for memory reduction

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::column::Column;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::schema::DataType;

/// Configuration for the column optimizer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// A string column is dictionary-encoded when its distinct/total ratio
    /// is strictly below this fraction; must lie in (0, 1]
    pub categorical_threshold: f64,

    /// Maximum allowed round-trip deviation when narrowing Float64 to
    /// Float32; 0.0 demands an exact round trip
    pub float_epsilon: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            categorical_threshold: 0.5,
            float_epsilon: 0.0,
        }
    }
}

/// What happened to one column during an optimization pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    /// Type before the pass
    pub original: DataType,

    /// Type after the pass
    pub optimized: DataType,

    /// Estimated bytes saved by the rewrite
    pub bytes_saved: usize,
}

/// A column the optimizer looked at but deliberately left alone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedColumn {
    /// Name of the column
    pub column: String,

    /// Why narrowing was not applied
    pub reason: String,
}

/// Side artifact of an optimization pass
///
/// Changes are listed in schema order. Skipped columns record narrowing
/// opportunities that were declined because they could lose information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptimizationReport {
    changes: Vec<(String, ColumnChange)>,
    skipped: Vec<SkippedColumn>,
}

impl OptimizationReport {
    /// Columns rewritten by the pass, in schema order
    pub fn changes(&self) -> &[(String, ColumnChange)] {
        &self.changes
    }

    /// Look up the change recorded for a column
    pub fn change_for(&self, column: &str) -> Option<&ColumnChange> {
        self.changes
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, change)| change)
    }

    /// Columns skipped because narrowing would lose information
    pub fn skipped(&self) -> &[SkippedColumn] {
        &self.skipped
    }

    /// Total estimated bytes saved across all rewritten columns
    pub fn total_bytes_saved(&self) -> usize {
        self.changes.iter().map(|(_, c)| c.bytes_saved).sum()
    }

    /// True when the pass rewrote nothing
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Rewrites columns to the smallest representation that holds their values
/// exactly
///
/// Optimization is a stable fixed point: a second pass over an optimized
/// dataset reports zero savings and changes nothing. Rows and columns are
/// never dropped, null positions never move.
#[derive(Debug, Clone)]
pub struct ColumnOptimizer {
    config: OptimizerConfig,
}

impl ColumnOptimizer {
    /// Create an optimizer, validating the configuration
    pub fn new(config: OptimizerConfig) -> Result<Self> {
        if !(config.categorical_threshold > 0.0 && config.categorical_threshold <= 1.0) {
            return Err(Error::InvalidConfiguration(format!(
                "categorical threshold must be in (0, 1], got {}",
                config.categorical_threshold
            )));
        }
        if !config.float_epsilon.is_finite() || config.float_epsilon < 0.0 {
            return Err(Error::InvalidConfiguration(format!(
                "float epsilon must be a non-negative finite number, got {}",
                config.float_epsilon
            )));
        }
        Ok(Self { config })
    }

    /// Create an optimizer with the default configuration
    pub fn with_defaults() -> Self {
        Self {
            config: OptimizerConfig::default(),
        }
    }

    /// The active configuration
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Optimize every column of a dataset in place
    pub fn optimize(&self, dataset: &mut Dataset) -> Result<OptimizationReport> {
        let mut report = OptimizationReport::default();

        for index in 0..dataset.column_count() {
            let column = dataset.column(index)?;
            let physical = column.data_type();

            let outcome = if physical.is_integer() {
                self.narrow_integer(column)
            } else if physical == DataType::Float64 {
                self.narrow_float(column)
            } else if physical == DataType::Utf8 {
                self.encode_categorical(column, dataset.row_count())
            } else {
                // Float32, Dictionary and Timestamp are already minimal.
                Outcome::Unchanged
            };

            match outcome {
                Outcome::Rewritten(rewritten) => {
                    let change = ColumnChange {
                        original: physical,
                        optimized: rewritten.data_type(),
                        bytes_saved: column.memory_usage().saturating_sub(rewritten.memory_usage()),
                    };
                    debug!(
                        column = rewritten.name(),
                        from = %change.original,
                        to = %change.optimized,
                        bytes_saved = change.bytes_saved,
                        "narrowed column"
                    );
                    let name = rewritten.name().to_string();
                    let declared = rewritten.data_type();
                    dataset.replace_column(index, rewritten)?;
                    let schema = dataset.schema().with_field_type(index, declared)?;
                    dataset.set_schema(Arc::new(schema));
                    report.changes.push((name, change));
                }
                Outcome::Skipped(reason) => {
                    warn!(column = column.name(), %reason, "narrowing skipped");
                    report.skipped.push(SkippedColumn {
                        column: column.name().to_string(),
                        reason,
                    });
                }
                Outcome::Unchanged => {}
            }
        }

        Ok(report)
    }

    fn narrow_integer(&self, column: &Column) -> Outcome {
        let mut min = i64::MAX;
        let mut max = i64::MIN;
        let mut present = 0usize;

        for i in 0..column.len() {
            if column.is_null(i) {
                continue;
            }
            match column.int_value(i) {
                Some(v) => {
                    min = min.min(v);
                    max = max.max(v);
                    present += 1;
                }
                None => {
                    return Outcome::Skipped(
                        "value exceeds the signed 64-bit range".to_string(),
                    )
                }
            }
        }

        if present == 0 {
            return Outcome::Unchanged;
        }

        let target = if min >= 0 {
            if max <= i64::from(u8::MAX) {
                DataType::UInt8
            } else if max <= i64::from(u16::MAX) {
                DataType::UInt16
            } else if max <= i64::from(u32::MAX) {
                DataType::UInt32
            } else {
                DataType::UInt64
            }
        } else if min >= i64::from(i8::MIN) && max <= i64::from(i8::MAX) {
            DataType::Int8
        } else if min >= i64::from(i16::MIN) && max <= i64::from(i16::MAX) {
            DataType::Int16
        } else if min >= i64::from(i32::MIN) && max <= i64::from(i32::MAX) {
            DataType::Int32
        } else {
            DataType::Int64
        };

        if target.size_bytes() >= column.data_type().size_bytes() {
            return Outcome::Unchanged;
        }

        match column.with_integer_width(target) {
            Ok(rewritten) => Outcome::Rewritten(rewritten),
            Err(err) => Outcome::Skipped(err.to_string()),
        }
    }

    fn narrow_float(&self, column: &Column) -> Outcome {
        for i in 0..column.len() {
            let Some(v) = column.float_value(i) else {
                continue;
            };
            let round_trip = f64::from(v as f32);
            // NaN and out-of-range values fail this comparison and keep the
            // column at full width.
            if !((round_trip - v).abs() <= self.config.float_epsilon) {
                return Outcome::Skipped(
                    "narrowing to Float32 would lose precision".to_string(),
                );
            }
        }

        match column.to_float32() {
            Ok(rewritten) => Outcome::Rewritten(rewritten),
            Err(err) => Outcome::Skipped(err.to_string()),
        }
    }

    fn encode_categorical(&self, column: &Column, row_count: usize) -> Outcome {
        if row_count == 0 {
            return Outcome::Unchanged;
        }

        let Some(distinct) = column.distinct_text_count() else {
            return Outcome::Unchanged;
        };

        let ratio = distinct as f64 / row_count as f64;
        if ratio >= self.config.categorical_threshold {
            return Outcome::Unchanged;
        }

        match column.to_dictionary() {
            Ok(rewritten) => Outcome::Rewritten(rewritten),
            Err(err) => Outcome::Skipped(err.to_string()),
        }
    }
}

enum Outcome {
    Rewritten(Column),
    Skipped(String),
    Unchanged,
}
