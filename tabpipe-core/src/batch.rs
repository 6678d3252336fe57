//! Batch views and fixed-size partitioning

use tracing::debug;

use crate::column::Value;
use crate::dataset::Dataset;
use crate::error::{Error, Result};
use crate::schema::Schema;
use std::sync::Arc;

/// A read-only contiguous view over a slice of a dataset's rows
///
/// Tagged with its origin index and the total batch count so results can be
/// merged back in input order regardless of completion order. Batches over
/// one dataset never overlap, so workers own their rows exclusively.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    dataset: &'a Dataset,
    offset: usize,
    length: usize,
    index: usize,
    total: usize,
}

impl<'a> Batch<'a> {
    /// Origin index of this batch within the partitioning
    pub fn index(&self) -> usize {
        self.index
    }

    /// Total number of batches in the partitioning this batch came from
    pub fn total(&self) -> usize {
        self.total
    }

    /// Row offset of this batch within the source dataset
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of rows in this batch
    pub fn len(&self) -> usize {
        self.length
    }

    /// Check if this batch has no rows
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Schema of the underlying dataset
    pub fn schema(&self) -> &Arc<Schema> {
        self.dataset.schema()
    }

    /// Read the logical value at (row, column) within this batch
    pub fn value(&self, row: usize, column: usize) -> Option<Value<'a>> {
        if row >= self.length {
            return None;
        }
        self.dataset.value(self.offset + row, column)
    }

    /// Copy this batch's rows into an owned dataset
    pub fn to_dataset(&self) -> Result<Dataset> {
        self.dataset.slice(self.offset, self.length)
    }
}

/// Splits a dataset into an ordered sequence of fixed-size batches
///
/// The final batch may be shorter when the row count is not an exact
/// multiple of the batch size.
#[derive(Debug, Clone)]
pub struct BatchPartitioner {
    batch_size: usize,
}

impl BatchPartitioner {
    /// Create a partitioner producing batches of at most `batch_size` rows
    pub fn new(batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::InvalidConfiguration(
                "batch size must be at least 1".into(),
            ));
        }
        Ok(Self { batch_size })
    }

    /// The configured batch size
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Partition a dataset into batches in ascending origin order
    ///
    /// Lazy: batches are produced as the iterator is advanced, and the
    /// source dataset is untouched. Calling `partition` again yields an
    /// equivalent sequence.
    pub fn partition<'a>(&self, dataset: &'a Dataset) -> Batches<'a> {
        let total = (dataset.row_count() + self.batch_size - 1) / self.batch_size;
        debug!(
            rows = dataset.row_count(),
            batch_size = self.batch_size,
            batches = total,
            "partitioning dataset"
        );

        Batches {
            dataset,
            batch_size: self.batch_size,
            next: 0,
            total,
        }
    }
}

/// Iterator over the batches of one partitioning
#[derive(Debug)]
pub struct Batches<'a> {
    dataset: &'a Dataset,
    batch_size: usize,
    next: usize,
    total: usize,
}

impl<'a> Iterator for Batches<'a> {
    type Item = Batch<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.total {
            return None;
        }

        let index = self.next;
        let offset = index * self.batch_size;
        let length = self.batch_size.min(self.dataset.row_count() - offset);
        self.next += 1;

        Some(Batch {
            dataset: self.dataset,
            offset,
            length,
            index,
            total: self.total,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Batches<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;
    use crate::dataset::tests::sample_dataset;
    use crate::schema::{DataType, Field};
    use test_case::test_case;

    fn dataset_with_rows(rows: usize) -> Dataset {
        let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
        let values = (0..rows as i64).map(Some).collect();
        Dataset::new(schema, vec![Column::from_i64("n", values)]).unwrap()
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(matches!(
            BatchPartitioner::new(0),
            Err(Error::InvalidConfiguration(_))
        ));
    }

    #[test_case(10, 5, &[5, 5]; "exact multiple")]
    #[test_case(10, 4, &[4, 4, 2]; "short final batch")]
    #[test_case(3, 10, &[3]; "single short batch")]
    #[test_case(0, 4, &[]; "empty dataset")]
    fn test_batch_sizes(rows: usize, batch_size: usize, expected: &[usize]) {
        let dataset = dataset_with_rows(rows);
        let partitioner = BatchPartitioner::new(batch_size).unwrap();

        let sizes: Vec<usize> = partitioner.partition(&dataset).map(|b| b.len()).collect();
        assert_eq!(sizes, expected);
    }

    #[test]
    fn test_partition_2500_rows_by_1000() {
        let dataset = dataset_with_rows(2500);
        let partitioner = BatchPartitioner::new(1000).unwrap();

        let batches: Vec<_> = partitioner.partition(&dataset).collect();
        let sizes: Vec<usize> = batches.iter().map(Batch::len).collect();

        assert_eq!(sizes, vec![1000, 1000, 500]);
        assert!(batches.iter().all(|b| b.total() == 3));
        assert_eq!(
            batches.iter().map(Batch::index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_concat_of_batches_reconstructs_dataset() {
        let dataset = sample_dataset();
        let partitioner = BatchPartitioner::new(3).unwrap();

        let parts = partitioner
            .partition(&dataset)
            .map(|b| b.to_dataset().unwrap())
            .collect::<Vec<_>>();
        let rebuilt = Dataset::concat(parts).unwrap();

        assert_eq!(rebuilt.row_count(), dataset.row_count());
        for row in 0..dataset.row_count() {
            assert_eq!(rebuilt.row(row), dataset.row(row));
        }
    }

    #[test]
    fn test_partition_is_restartable() {
        let dataset = dataset_with_rows(7);
        let partitioner = BatchPartitioner::new(2).unwrap();

        let first: Vec<_> = partitioner
            .partition(&dataset)
            .map(|b| (b.index(), b.offset(), b.len()))
            .collect();
        let second: Vec<_> = partitioner
            .partition(&dataset)
            .map(|b| (b.index(), b.offset(), b.len()))
            .collect();

        assert_eq!(first, second);
    }

    proptest::proptest! {
        #[test]
        fn prop_partition_concat_round_trip(rows in 0usize..200, batch_size in 1usize..50) {
            let dataset = dataset_with_rows(rows);
            let partitioner = BatchPartitioner::new(batch_size).unwrap();

            let parts = partitioner
                .partition(&dataset)
                .map(|b| b.to_dataset().unwrap())
                .collect::<Vec<_>>();
            let rebuilt = Dataset::concat(parts).unwrap();

            proptest::prop_assert_eq!(rebuilt.row_count(), dataset.row_count());
            for row in 0..dataset.row_count() {
                proptest::prop_assert_eq!(rebuilt.row(row), dataset.row(row));
            }
        }
    }

    #[test]
    fn test_batch_value_access_is_offset() {
        let dataset = dataset_with_rows(10);
        let partitioner = BatchPartitioner::new(4).unwrap();
        let batches: Vec<_> = partitioner.partition(&dataset).collect();

        assert_eq!(batches[1].value(0, 0), Some(Value::Int(4)));
        assert_eq!(batches[2].value(1, 0), Some(Value::Int(9)));
        assert_eq!(batches[2].value(2, 0), None);
    }
}
