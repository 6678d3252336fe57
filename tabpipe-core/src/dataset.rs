//! In-memory columnar dataset

use std::fmt;
use std::sync::Arc;

use crate::column::{Column, Value};
use crate::error::{Error, Result};
use crate::schema::Schema;

/// An ordered, in-memory table with named, typed columns
///
/// All columns share one length and the schema's field order. Construction
/// checks name agreement and lengths; declared and physical types may
/// diverge (an upstream loader keeping unparseable text under a numeric
/// field) — the validation engine reports that, it is not a construction
/// error. Mutation requires `&mut`, so a dataset has a single writer for
/// the duration of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Schema describing the data
    schema: Arc<Schema>,

    /// Columns in schema order
    columns: Vec<Column>,

    /// Number of rows
    row_count: usize,
}

impl Dataset {
    /// Create a new dataset with the given schema and columns
    pub fn new(schema: Arc<Schema>, columns: Vec<Column>) -> Result<Self> {
        if columns.len() != schema.len() {
            return Err(Error::SchemaMismatch(format!(
                "schema has {} fields but {} columns were provided",
                schema.len(),
                columns.len()
            )));
        }

        for (field, column) in schema.fields().iter().zip(&columns) {
            if field.name() != column.name() {
                return Err(Error::SchemaMismatch(format!(
                    "column name mismatch: expected '{}', got '{}'",
                    field.name(),
                    column.name()
                )));
            }
        }

        let row_count = columns.first().map_or(0, Column::len);
        for column in &columns {
            if column.len() != row_count {
                return Err(Error::LengthMismatch {
                    column: column.name().to_string(),
                    expected: row_count,
                    actual: column.len(),
                });
            }
        }

        Ok(Self {
            schema,
            columns,
            row_count,
        })
    }

    /// Create an empty dataset with the given schema
    pub fn empty(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Get the schema of this dataset
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub(crate) fn set_schema(&mut self, schema: Arc<Schema>) {
        self.schema = schema;
    }

    /// Get the number of rows
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Get the number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Check if this dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    /// Get a column by index
    pub fn column(&self, index: usize) -> Result<&Column> {
        self.columns.get(index).ok_or(Error::IndexOutOfBounds)
    }

    /// Get a column by name
    pub fn column_by_name(&self, name: &str) -> Result<&Column> {
        let index = self.schema.index_of(name)?;
        self.column(index)
    }

    /// Get all columns
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Replace a column with a rewritten representation of the same data
    ///
    /// The replacement must keep the column's name and length.
    pub fn replace_column(&mut self, index: usize, column: Column) -> Result<()> {
        let current = self.columns.get(index).ok_or(Error::IndexOutOfBounds)?;

        if current.name() != column.name() {
            return Err(Error::SchemaMismatch(format!(
                "replacement column '{}' does not match '{}'",
                column.name(),
                current.name()
            )));
        }
        if column.len() != self.row_count {
            return Err(Error::LengthMismatch {
                column: column.name().to_string(),
                expected: self.row_count,
                actual: column.len(),
            });
        }

        self.columns[index] = column;
        Ok(())
    }

    /// Read the logical value at (row, column); `None` means null
    pub fn value(&self, row: usize, column: usize) -> Option<Value<'_>> {
        self.columns.get(column)?.value(row)
    }

    /// Read a whole row as logical values in schema order
    pub fn row(&self, row: usize) -> Vec<Option<Value<'_>>> {
        self.columns.iter().map(|c| c.value(row)).collect()
    }

    /// Copy a contiguous range of rows into a new dataset
    pub fn slice(&self, offset: usize, length: usize) -> Result<Self> {
        if offset + length > self.row_count {
            return Err(Error::IndexOutOfBounds);
        }

        let columns = self
            .columns
            .iter()
            .map(|c| c.slice(offset, length))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            schema: self.schema.clone(),
            columns,
            row_count: length,
        })
    }

    /// Keep only the rows where `mask` is true
    pub(crate) fn retain_rows(&mut self, mask: &[bool]) -> Result<()> {
        if mask.len() != self.row_count {
            return Err(Error::InvalidConfiguration(format!(
                "row mask has {} entries for {} rows",
                mask.len(),
                self.row_count
            )));
        }

        let columns = self
            .columns
            .iter()
            .map(|c| c.filter(mask))
            .collect::<Result<Vec<_>>>()?;

        self.row_count = mask.iter().filter(|&&m| m).count();
        self.columns = columns;
        Ok(())
    }

    /// Concatenate datasets in order into one dataset
    ///
    /// All parts must share one schema; the first part's schema is used.
    pub fn concat(parts: Vec<Dataset>) -> Result<Self> {
        let mut parts = parts.into_iter();
        let mut merged = match parts.next() {
            Some(first) => first,
            None => return Ok(Self::empty(Arc::new(Schema::new(Vec::new())))),
        };

        for part in parts {
            if part.schema.fields() != merged.schema.fields() {
                return Err(Error::SchemaMismatch(
                    "cannot concatenate datasets with different schemas".into(),
                ));
            }
            for (target, source) in merged.columns.iter_mut().zip(&part.columns) {
                target.append(source)?;
            }
            merged.row_count += part.row_count;
        }

        Ok(merged)
    }

    /// Estimated heap memory held by this dataset in bytes
    pub fn memory_usage(&self) -> usize {
        self.columns.iter().map(Column::memory_usage).sum()
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Dataset: {} rows, {} columns",
            self.row_count,
            self.columns.len()
        )?;
        write!(f, "{}", self.schema)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::schema::{DataType, Field};

    /// A small mixed-type dataset shared across module tests
    pub(crate) fn sample_dataset() -> Dataset {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("score", DataType::Float64, true),
            Field::new("label", DataType::Utf8, true),
            Field::new("seen_at", DataType::Timestamp, false),
        ]));

        Dataset::new(
            schema,
            vec![
                Column::from_i64("id", vec![Some(1), Some(2), Some(3), Some(4)]),
                Column::from_f64("score", vec![Some(0.5), None, Some(2.25), Some(0.5)]),
                Column::from_utf8("label", vec![Some("a"), Some("b"), Some("a"), Some("a")]),
                Column::from_timestamp(
                    "seen_at",
                    vec![
                        Some(1_700_000_000_000),
                        Some(1_700_000_060_000),
                        Some(1_700_000_120_000),
                        Some(1_700_000_180_000),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_construction_checks() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("label", DataType::Utf8, true),
        ]));

        let wrong_name = Dataset::new(
            schema.clone(),
            vec![
                Column::from_i64("id", vec![Some(1)]),
                Column::from_utf8("tag", vec![Some("a")]),
            ],
        );
        assert!(matches!(wrong_name, Err(Error::SchemaMismatch(_))));

        let wrong_len = Dataset::new(
            schema,
            vec![
                Column::from_i64("id", vec![Some(1), Some(2)]),
                Column::from_utf8("label", vec![Some("a")]),
            ],
        );
        assert!(matches!(wrong_len, Err(Error::LengthMismatch { .. })));
    }

    #[test]
    fn test_slice_and_concat_round_trip() {
        let dataset = sample_dataset();

        let head = dataset.slice(0, 2).unwrap();
        let tail = dataset.slice(2, 2).unwrap();
        let merged = Dataset::concat(vec![head, tail]).unwrap();

        assert_eq!(merged.row_count(), dataset.row_count());
        for row in 0..dataset.row_count() {
            assert_eq!(merged.row(row), dataset.row(row));
        }
    }

    #[test]
    fn test_concat_schema_mismatch() {
        let dataset = sample_dataset();
        let other = Dataset::new(
            Arc::new(Schema::new(vec![Field::new("id", DataType::Int64, false)])),
            vec![Column::from_i64("id", vec![Some(9)])],
        )
        .unwrap();

        assert!(matches!(
            Dataset::concat(vec![dataset, other]),
            Err(Error::SchemaMismatch(_))
        ));
    }

    #[test]
    fn test_value_access() {
        let dataset = sample_dataset();

        assert_eq!(dataset.value(0, 0), Some(Value::Int(1)));
        assert_eq!(dataset.value(1, 1), None);
        assert_eq!(dataset.value(2, 2), Some(Value::Str("a")));
    }
}
