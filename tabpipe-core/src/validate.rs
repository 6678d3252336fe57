//! Data quality validation over datasets

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dataset::Dataset;
use crate::schema::DataType;

/// Kind of data-quality problem found in a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// A declared-numeric column holds values that do not coerce to a
    /// numeric type
    InvalidNumericValues,

    /// A declared-text column holds numeral-looking strings, which points
    /// at an upstream typing defect
    InvalidCategoricalValue,
}

/// How serious an issue is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Worth surfacing, data remains usable
    Warning,

    /// The column cannot be trusted as typed
    Error,
}

/// One data-quality finding for one column
///
/// Issues are data, not failures: validation always completes and returns
/// a (possibly empty) sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    /// Name of the offending column
    pub column: String,

    /// What was found
    pub kind: IssueKind,

    /// How serious the finding is
    pub severity: Severity,

    /// First offending value observed, when one exists
    pub sample: Option<String>,
}

/// Capability interface for pluggable column validators
///
/// A validator inspects only the columns matching its type predicate and
/// never mutates the dataset. Findings from different validators are kept
/// as independent evidence; the engine does not deduplicate.
pub trait Validator: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &str;

    /// Inspect the dataset and report issues for the columns this
    /// validator claims
    fn validate(&self, dataset: &Dataset) -> Vec<ValidationIssue>;
}

/// Flags declared-numeric columns whose values fail numeric coercion
///
/// A loader that could not parse a numeric field keeps the raw text under
/// the numeric declaration; this validator surfaces those columns.
#[derive(Debug, Default)]
pub struct NumericValidator;

impl Validator for NumericValidator {
    fn name(&self) -> &str {
        "numeric"
    }

    fn validate(&self, dataset: &Dataset) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (index, field) in dataset.schema().fields().iter().enumerate() {
            if !field.data_type().is_numeric() {
                continue;
            }
            let Ok(column) = dataset.column(index) else {
                continue;
            };
            // Numeric physical storage coerces trivially; only text storage
            // under a numeric declaration can fail.
            if !column.data_type().is_text() {
                continue;
            }

            let sample = (0..column.len())
                .filter_map(|i| column.str_value(i))
                .find(|s| s.trim().parse::<f64>().is_err());

            if let Some(sample) = sample {
                issues.push(ValidationIssue {
                    column: field.name().to_string(),
                    kind: IssueKind::InvalidNumericValues,
                    severity: Severity::Error,
                    sample: Some(sample.to_string()),
                });
            }
        }

        issues
    }
}

/// Flags declared-text columns that contain numeral-looking strings
#[derive(Debug, Default)]
pub struct CategoricalValidator;

impl Validator for CategoricalValidator {
    fn name(&self) -> &str {
        "categorical"
    }

    fn validate(&self, dataset: &Dataset) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (index, field) in dataset.schema().fields().iter().enumerate() {
            if !field.data_type().is_text() {
                continue;
            }
            let Ok(column) = dataset.column(index) else {
                continue;
            };
            if !column.data_type().is_text() {
                continue;
            }

            let sample = (0..column.len())
                .filter_map(|i| column.str_value(i))
                .find(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()));

            if let Some(sample) = sample {
                issues.push(ValidationIssue {
                    column: field.name().to_string(),
                    kind: IssueKind::InvalidCategoricalValue,
                    severity: Severity::Warning,
                    sample: Some(sample.to_string()),
                });
            }
        }

        issues
    }
}

/// Runs registered validators over a dataset and concatenates their
/// findings
///
/// Output order is deterministic: validators in registration order, and
/// within each validator, columns in schema order. Persistence of the
/// returned issues is the caller's concern.
#[derive(Default)]
pub struct ValidationEngine {
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Create an engine with no validators registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an engine with the numeric and categorical validators
    /// registered, in that order
    pub fn with_default_validators() -> Self {
        let mut engine = Self::new();
        engine.register(Box::new(NumericValidator));
        engine.register(Box::new(CategoricalValidator));
        engine
    }

    /// Register a validator; it runs after those already registered
    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators.push(validator);
    }

    /// Number of registered validators
    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }

    /// Run every validator and collect their issues in order
    pub fn validate(&self, dataset: &Dataset) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for validator in &self.validators {
            let found = validator.validate(dataset);
            debug!(
                validator = validator.name(),
                issues = found.len(),
                "validator finished"
            );
            issues.extend(found);
        }

        info!(total = issues.len(), "validation complete");
        issues
    }
}
