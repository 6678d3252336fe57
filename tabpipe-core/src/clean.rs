//! Missing-value and duplicate-row handling

use std::collections::HashSet;

use tracing::info;

use crate::column::Column;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::schema::DataType;

/// Count nulls per column, schema order; columns without nulls are omitted
pub fn missing_value_counts(dataset: &Dataset) -> Vec<(String, usize)> {
    dataset
        .columns()
        .iter()
        .filter(|c| c.has_nulls())
        .map(|c| (c.name().to_string(), c.null_count()))
        .collect()
}

/// Count rows identical to an earlier row
pub fn duplicate_row_count(dataset: &Dataset) -> usize {
    let mut seen = HashSet::new();
    let mut duplicates = 0;

    for row in 0..dataset.row_count() {
        if !seen.insert(dataset.row(row)) {
            duplicates += 1;
        }
    }

    duplicates
}

/// Remove rows identical to an earlier row, in place
///
/// First occurrences and their order are preserved. Returns the number of
/// rows removed.
pub fn remove_duplicate_rows(dataset: &mut Dataset) -> Result<usize> {
    let mask = {
        let mut seen = HashSet::new();
        (0..dataset.row_count())
            .map(|row| seen.insert(dataset.row(row)))
            .collect::<Vec<bool>>()
    };

    let removed = mask.iter().filter(|&&keep| !keep).count();
    if removed > 0 {
        dataset.retain_rows(&mask)?;
    }

    info!(removed, "removed duplicate rows");
    Ok(removed)
}

/// Fill nulls in a numeric column with the median of its present values
///
/// The median of an even count is the mean of the two middle values.
/// Integer columns receive the median rounded to the nearest integer so
/// their width is preserved. Returns the median used, or `None` when the
/// column has no nulls or no present values to take a median of.
pub fn impute_median(dataset: &mut Dataset, column: &str) -> Result<Option<f64>> {
    let index = dataset.schema().index_of(column)?;
    let source = dataset.column(index)?;
    let physical = source.data_type();

    if !physical.is_numeric() {
        return Err(Error::TypeMismatch(format!(
            "cannot impute median on non-numeric column '{}'",
            column
        )));
    }

    if !source.has_nulls() {
        return Ok(None);
    }

    let mut present: Vec<f64> = (0..source.len())
        .filter_map(|i| {
            if physical.is_float() {
                source.float_value(i)
            } else {
                source.int_value(i).map(|v| v as f64)
            }
        })
        .collect();

    if present.is_empty() {
        return Ok(None);
    }

    present.sort_by(f64::total_cmp);
    let mid = present.len() / 2;
    let median = if present.len() % 2 == 0 {
        (present[mid - 1] + present[mid]) / 2.0
    } else {
        present[mid]
    };

    let filled = if physical.is_float() {
        let values: Vec<Option<f64>> = (0..source.len())
            .map(|i| Some(source.float_value(i).unwrap_or(median)))
            .collect();
        let rebuilt = Column::from_f64(column, values);
        if physical == DataType::Float32 {
            rebuilt.to_float32()?
        } else {
            rebuilt
        }
    } else {
        let fill = median.round() as i64;
        let values: Vec<Option<i64>> = (0..source.len())
            .map(|i| Some(source.int_value(i).unwrap_or(fill)))
            .collect();
        let rebuilt = Column::from_i64(column, values);
        if physical == DataType::Int64 {
            rebuilt
        } else {
            rebuilt.with_integer_width(physical)?
        }
    };

    dataset.replace_column(index, filled)?;
    info!(column, median, "imputed missing values with median");
    Ok(Some(median))
}
