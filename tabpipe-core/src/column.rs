//! Column implementation for storing typed vectors of data

use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::mem;

use crate::error::{Error, Result};
use crate::schema::DataType;

/// A single cell value read out of a column
///
/// `None` at the accessor level means null; `Value` itself is always present
/// data. Floats compare and hash by bit pattern so rows containing them can
/// be used as lookup keys during duplicate detection.
#[derive(Debug, Clone)]
pub enum Value<'a> {
    /// Signed integer value (any width, widened)
    Int(i64),

    /// Unsigned integer value (any width, widened)
    UInt(u64),

    /// Floating point value (any width, widened)
    Float(f64),

    /// String value
    Str(&'a str),

    /// Timestamp in milliseconds since the UNIX epoch
    Timestamp(i64),
}

impl PartialEq for Value<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::UInt(a), Value::UInt(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Timestamp(a), Value::Timestamp(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value<'_> {}

impl Hash for Value<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Int(v) => {
                0u8.hash(state);
                v.hash(state);
            }
            Value::UInt(v) => {
                1u8.hash(state);
                v.hash(state);
            }
            Value::Float(v) => {
                2u8.hash(state);
                v.to_bits().hash(state);
            }
            Value::Str(v) => {
                3u8.hash(state);
                v.hash(state);
            }
            Value::Timestamp(v) => {
                4u8.hash(state);
                v.hash(state);
            }
        }
    }
}

impl std::fmt::Display for Value<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Timestamp(v) => write!(f, "{}", v),
        }
    }
}

/// Physical storage for a column's values
///
/// Null slots hold a zero/empty placeholder; the null bitmap on [`Column`]
/// is authoritative for presence.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    /// 8-bit signed integers
    Int8(Vec<i8>),
    /// 16-bit signed integers
    Int16(Vec<i16>),
    /// 32-bit signed integers
    Int32(Vec<i32>),
    /// 64-bit signed integers
    Int64(Vec<i64>),
    /// 8-bit unsigned integers
    UInt8(Vec<u8>),
    /// 16-bit unsigned integers
    UInt16(Vec<u16>),
    /// 32-bit unsigned integers
    UInt32(Vec<u32>),
    /// 64-bit unsigned integers
    UInt64(Vec<u64>),
    /// 32-bit floats
    Float32(Vec<f32>),
    /// 64-bit floats
    Float64(Vec<f64>),
    /// Plain strings
    Utf8(Vec<String>),
    /// Dictionary-encoded strings: per-row indices into a table of distinct
    /// values
    Dictionary {
        /// Per-row index into `values`
        keys: Vec<u32>,
        /// Distinct values, first-occurrence order
        values: Vec<String>,
    },
    /// Timestamps in milliseconds since the UNIX epoch
    Timestamp(Vec<i64>),
}

impl ColumnData {
    /// Number of logical values held
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Int8(v) => v.len(),
            ColumnData::Int16(v) => v.len(),
            ColumnData::Int32(v) => v.len(),
            ColumnData::Int64(v) => v.len(),
            ColumnData::UInt8(v) => v.len(),
            ColumnData::UInt16(v) => v.len(),
            ColumnData::UInt32(v) => v.len(),
            ColumnData::UInt64(v) => v.len(),
            ColumnData::Float32(v) => v.len(),
            ColumnData::Float64(v) => v.len(),
            ColumnData::Utf8(v) => v.len(),
            ColumnData::Dictionary { keys, .. } => keys.len(),
            ColumnData::Timestamp(v) => v.len(),
        }
    }

    /// Check if no values are held
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The physical data type of this storage
    pub fn data_type(&self) -> DataType {
        match self {
            ColumnData::Int8(_) => DataType::Int8,
            ColumnData::Int16(_) => DataType::Int16,
            ColumnData::Int32(_) => DataType::Int32,
            ColumnData::Int64(_) => DataType::Int64,
            ColumnData::UInt8(_) => DataType::UInt8,
            ColumnData::UInt16(_) => DataType::UInt16,
            ColumnData::UInt32(_) => DataType::UInt32,
            ColumnData::UInt64(_) => DataType::UInt64,
            ColumnData::Float32(_) => DataType::Float32,
            ColumnData::Float64(_) => DataType::Float64,
            ColumnData::Utf8(_) => DataType::Utf8,
            ColumnData::Dictionary { .. } => DataType::Dictionary,
            ColumnData::Timestamp(_) => DataType::Timestamp,
        }
    }
}

/// A named column of typed data with an optional null bitmap
///
/// Storage follows the dense layout: every row has a slot in the data
/// vector, null rows hold a placeholder, and a bitmap records which slots
/// carry real values (bit set = valid).
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    /// Name of the column
    name: String,

    /// Physical values
    data: ColumnData,

    /// Null bitmap; bit set means the value at that index is valid
    nulls: Option<Vec<u8>>,

    /// Count of null values in this column
    null_count: usize,
}

fn pack_options<T: Default>(values: Vec<Option<T>>) -> (Vec<T>, Option<Vec<u8>>, usize) {
    let mut dense = Vec::with_capacity(values.len());
    let mut bitmap = vec![0u8; (values.len() + 7) / 8];
    let mut null_count = 0;

    for (i, value) in values.into_iter().enumerate() {
        match value {
            Some(v) => {
                dense.push(v);
                bitmap[i / 8] |= 1 << (i % 8);
            }
            None => {
                dense.push(T::default());
                null_count += 1;
            }
        }
    }

    if null_count == 0 {
        (dense, None, 0)
    } else {
        (dense, Some(bitmap), null_count)
    }
}

impl Column {
    /// Create a column from pre-built storage and null bitmap
    pub fn new(
        name: &str,
        data: ColumnData,
        nulls: Option<Vec<u8>>,
        null_count: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            data,
            nulls,
            null_count,
        }
    }

    /// Create a 64-bit integer column from optional values
    pub fn from_i64(name: &str, values: Vec<Option<i64>>) -> Self {
        let (dense, nulls, null_count) = pack_options(values);
        Self::new(name, ColumnData::Int64(dense), nulls, null_count)
    }

    /// Create a 64-bit float column from optional values
    pub fn from_f64(name: &str, values: Vec<Option<f64>>) -> Self {
        let (dense, nulls, null_count) = pack_options(values);
        Self::new(name, ColumnData::Float64(dense), nulls, null_count)
    }

    /// Create a string column from optional values
    pub fn from_utf8(name: &str, values: Vec<Option<&str>>) -> Self {
        let owned = values
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect::<Vec<_>>();
        let (dense, nulls, null_count) = pack_options(owned);
        Self::new(name, ColumnData::Utf8(dense), nulls, null_count)
    }

    /// Create a timestamp column from optional epoch-millisecond values
    pub fn from_timestamp(name: &str, values: Vec<Option<i64>>) -> Self {
        let (dense, nulls, null_count) = pack_options(values);
        Self::new(name, ColumnData::Timestamp(dense), nulls, null_count)
    }

    /// Get the name of this column
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the physical data type of this column
    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    /// Get the physical storage of this column
    pub fn data(&self) -> &ColumnData {
        &self.data
    }

    /// Get the length of this column (number of values)
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if this column is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of null values in this column
    pub fn null_count(&self) -> usize {
        self.null_count
    }

    /// Check if this column has any null values
    pub fn has_nulls(&self) -> bool {
        self.null_count > 0
    }

    /// Check if the value at an index is null
    pub fn is_null(&self, index: usize) -> bool {
        match &self.nulls {
            Some(bitmap) if index < self.len() => {
                (bitmap[index / 8] & (1 << (index % 8))) == 0
            }
            _ => false,
        }
    }

    /// Read the logical value at an index; `None` means null
    pub fn value(&self, index: usize) -> Option<Value<'_>> {
        if index >= self.len() || self.is_null(index) {
            return None;
        }

        Some(match &self.data {
            ColumnData::Int8(v) => Value::Int(i64::from(v[index])),
            ColumnData::Int16(v) => Value::Int(i64::from(v[index])),
            ColumnData::Int32(v) => Value::Int(i64::from(v[index])),
            ColumnData::Int64(v) => Value::Int(v[index]),
            ColumnData::UInt8(v) => Value::UInt(u64::from(v[index])),
            ColumnData::UInt16(v) => Value::UInt(u64::from(v[index])),
            ColumnData::UInt32(v) => Value::UInt(u64::from(v[index])),
            ColumnData::UInt64(v) => Value::UInt(v[index]),
            ColumnData::Float32(v) => Value::Float(f64::from(v[index])),
            ColumnData::Float64(v) => Value::Float(v[index]),
            ColumnData::Utf8(v) => Value::Str(&v[index]),
            ColumnData::Dictionary { keys, values } => {
                Value::Str(&values[keys[index] as usize])
            }
            ColumnData::Timestamp(v) => Value::Timestamp(v[index]),
        })
    }

    /// Read an integer value widened to `i64`; `None` for null or
    /// non-integer storage
    ///
    /// `u64` values above `i64::MAX` do not widen and return `None`.
    pub fn int_value(&self, index: usize) -> Option<i64> {
        match self.value(index)? {
            Value::Int(v) => Some(v),
            Value::UInt(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Read a float value widened to `f64`; `None` for null or non-float
    /// storage
    pub fn float_value(&self, index: usize) -> Option<f64> {
        match self.value(index)? {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Read a string value; `None` for null or non-text storage
    pub fn str_value(&self, index: usize) -> Option<&str> {
        match self.value(index)? {
            Value::Str(v) => Some(v),
            _ => None,
        }
    }

    /// Slice this column to a copy of a range of values
    pub fn slice(&self, offset: usize, length: usize) -> Result<Self> {
        if offset + length > self.len() {
            return Err(Error::IndexOutOfBounds);
        }

        let data = match &self.data {
            ColumnData::Int8(v) => ColumnData::Int8(v[offset..offset + length].to_vec()),
            ColumnData::Int16(v) => ColumnData::Int16(v[offset..offset + length].to_vec()),
            ColumnData::Int32(v) => ColumnData::Int32(v[offset..offset + length].to_vec()),
            ColumnData::Int64(v) => ColumnData::Int64(v[offset..offset + length].to_vec()),
            ColumnData::UInt8(v) => ColumnData::UInt8(v[offset..offset + length].to_vec()),
            ColumnData::UInt16(v) => ColumnData::UInt16(v[offset..offset + length].to_vec()),
            ColumnData::UInt32(v) => ColumnData::UInt32(v[offset..offset + length].to_vec()),
            ColumnData::UInt64(v) => ColumnData::UInt64(v[offset..offset + length].to_vec()),
            ColumnData::Float32(v) => ColumnData::Float32(v[offset..offset + length].to_vec()),
            ColumnData::Float64(v) => ColumnData::Float64(v[offset..offset + length].to_vec()),
            ColumnData::Utf8(v) => ColumnData::Utf8(v[offset..offset + length].to_vec()),
            ColumnData::Dictionary { keys, values } => ColumnData::Dictionary {
                keys: keys[offset..offset + length].to_vec(),
                values: values.clone(),
            },
            ColumnData::Timestamp(v) => {
                ColumnData::Timestamp(v[offset..offset + length].to_vec())
            }
        };

        // Bitmap bits rarely stay byte-aligned across an arbitrary offset,
        // so rebuild it bit by bit.
        let (nulls, null_count) = match &self.nulls {
            Some(_) => {
                let mut bitmap = vec![0u8; (length + 7) / 8];
                let mut null_count = 0;
                for i in 0..length {
                    if self.is_null(offset + i) {
                        null_count += 1;
                    } else {
                        bitmap[i / 8] |= 1 << (i % 8);
                    }
                }
                if null_count == 0 {
                    (None, 0)
                } else {
                    (Some(bitmap), null_count)
                }
            }
            None => (None, 0),
        };

        Ok(Self {
            name: self.name.clone(),
            data,
            nulls,
            null_count,
        })
    }

    /// Keep only the rows where `mask` is true
    pub fn filter(&self, mask: &[bool]) -> Result<Self> {
        if mask.len() != self.len() {
            return Err(Error::LengthMismatch {
                column: self.name.clone(),
                expected: self.len(),
                actual: mask.len(),
            });
        }

        fn keep<T: Clone>(values: &[T], mask: &[bool]) -> Vec<T> {
            values
                .iter()
                .zip(mask)
                .filter(|(_, &m)| m)
                .map(|(v, _)| v.clone())
                .collect()
        }

        let data = match &self.data {
            ColumnData::Int8(v) => ColumnData::Int8(keep(v, mask)),
            ColumnData::Int16(v) => ColumnData::Int16(keep(v, mask)),
            ColumnData::Int32(v) => ColumnData::Int32(keep(v, mask)),
            ColumnData::Int64(v) => ColumnData::Int64(keep(v, mask)),
            ColumnData::UInt8(v) => ColumnData::UInt8(keep(v, mask)),
            ColumnData::UInt16(v) => ColumnData::UInt16(keep(v, mask)),
            ColumnData::UInt32(v) => ColumnData::UInt32(keep(v, mask)),
            ColumnData::UInt64(v) => ColumnData::UInt64(keep(v, mask)),
            ColumnData::Float32(v) => ColumnData::Float32(keep(v, mask)),
            ColumnData::Float64(v) => ColumnData::Float64(keep(v, mask)),
            ColumnData::Utf8(v) => ColumnData::Utf8(keep(v, mask)),
            ColumnData::Dictionary { keys, values } => ColumnData::Dictionary {
                keys: keep(keys, mask),
                values: values.clone(),
            },
            ColumnData::Timestamp(v) => ColumnData::Timestamp(keep(v, mask)),
        };

        let kept = mask.iter().filter(|&&m| m).count();
        let (nulls, null_count) = if self.has_nulls() {
            let mut bitmap = vec![0u8; (kept + 7) / 8];
            let mut null_count = 0;
            let mut out = 0;
            for (i, &m) in mask.iter().enumerate() {
                if !m {
                    continue;
                }
                if self.is_null(i) {
                    null_count += 1;
                } else {
                    bitmap[out / 8] |= 1 << (out % 8);
                }
                out += 1;
            }
            if null_count == 0 {
                (None, 0)
            } else {
                (Some(bitmap), null_count)
            }
        } else {
            (None, 0)
        };

        Ok(Self {
            name: self.name.clone(),
            data,
            nulls,
            null_count,
        })
    }

    /// Append another column's values to this one
    ///
    /// Both columns must share a physical type. Dictionary appends remap the
    /// incoming keys into this column's dictionary.
    pub fn append(&mut self, other: &Column) -> Result<()> {
        let added = other.len();

        match (&mut self.data, &other.data) {
            (ColumnData::Int8(a), ColumnData::Int8(b)) => a.extend_from_slice(b),
            (ColumnData::Int16(a), ColumnData::Int16(b)) => a.extend_from_slice(b),
            (ColumnData::Int32(a), ColumnData::Int32(b)) => a.extend_from_slice(b),
            (ColumnData::Int64(a), ColumnData::Int64(b)) => a.extend_from_slice(b),
            (ColumnData::UInt8(a), ColumnData::UInt8(b)) => a.extend_from_slice(b),
            (ColumnData::UInt16(a), ColumnData::UInt16(b)) => a.extend_from_slice(b),
            (ColumnData::UInt32(a), ColumnData::UInt32(b)) => a.extend_from_slice(b),
            (ColumnData::UInt64(a), ColumnData::UInt64(b)) => a.extend_from_slice(b),
            (ColumnData::Float32(a), ColumnData::Float32(b)) => a.extend_from_slice(b),
            (ColumnData::Float64(a), ColumnData::Float64(b)) => a.extend_from_slice(b),
            (ColumnData::Utf8(a), ColumnData::Utf8(b)) => a.extend_from_slice(b),
            (ColumnData::Timestamp(a), ColumnData::Timestamp(b)) => a.extend_from_slice(b),
            (
                ColumnData::Dictionary { keys, values },
                ColumnData::Dictionary {
                    keys: other_keys,
                    values: other_values,
                },
            ) => {
                let mut index: HashMap<&str, u32> = values
                    .iter()
                    .enumerate()
                    .map(|(i, v)| (v.as_str(), i as u32))
                    .collect();
                let mut remap = Vec::with_capacity(other_values.len());
                let mut fresh = Vec::new();
                for value in other_values {
                    match index.get(value.as_str()) {
                        Some(&k) => remap.push(k),
                        None => {
                            let k = (values.len() + fresh.len()) as u32;
                            remap.push(k);
                            fresh.push(value.clone());
                            index.insert(value.as_str(), k);
                        }
                    }
                }
                drop(index);
                values.extend(fresh);
                keys.extend(other_keys.iter().map(|&k| remap[k as usize]));
            }
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "cannot append {} column to {} column '{}'",
                    other.data_type(),
                    self.data_type(),
                    self.name
                )))
            }
        }

        // Merge null bitmaps; either side may lack one.
        let old_len = self.len() - added;
        if self.nulls.is_some() || other.nulls.is_some() {
            let mut bitmap = vec![0u8; (self.len() + 7) / 8];
            let mut null_count = 0;
            for i in 0..old_len {
                if self.is_null_before_append(i) {
                    null_count += 1;
                } else {
                    bitmap[i / 8] |= 1 << (i % 8);
                }
            }
            for i in 0..added {
                if other.is_null(i) {
                    null_count += 1;
                } else {
                    let j = old_len + i;
                    bitmap[j / 8] |= 1 << (j % 8);
                }
            }
            self.nulls = Some(bitmap);
            self.null_count = null_count;
        }

        Ok(())
    }

    // is_null against the pre-append bitmap; self.data has already grown
    fn is_null_before_append(&self, index: usize) -> bool {
        match &self.nulls {
            Some(bitmap) => (bitmap[index / 8] & (1 << (index % 8))) == 0,
            None => false,
        }
    }

    /// Estimated heap memory held by this column in bytes
    pub fn memory_usage(&self) -> usize {
        let data = match &self.data {
            ColumnData::Utf8(v) => {
                v.len() * mem::size_of::<String>() + v.iter().map(String::len).sum::<usize>()
            }
            ColumnData::Dictionary { keys, values } => {
                keys.len() * mem::size_of::<u32>()
                    + values.len() * mem::size_of::<String>()
                    + values.iter().map(String::len).sum::<usize>()
            }
            other => other.len() * other.data_type().size_bytes(),
        };

        data + self.nulls.as_ref().map_or(0, Vec::len)
    }

    /// Number of distinct present values in a text column
    ///
    /// Returns `None` for non-text storage.
    pub(crate) fn distinct_text_count(&self) -> Option<usize> {
        match &self.data {
            ColumnData::Utf8(_) => {
                let mut seen = std::collections::HashSet::new();
                for i in 0..self.len() {
                    if let Some(s) = self.str_value(i) {
                        seen.insert(s);
                    }
                }
                Some(seen.len())
            }
            ColumnData::Dictionary { values, .. } => Some(values.len()),
            _ => None,
        }
    }

    /// Rewrite integer storage into the given width, preserving nulls
    ///
    /// Fails with `TypeMismatch` if the storage is not integer or a present
    /// value does not fit the target width.
    pub(crate) fn with_integer_width(&self, target: DataType) -> Result<Self> {
        if !self.data_type().is_integer() {
            return Err(Error::TypeMismatch(format!(
                "column '{}' is not integer typed",
                self.name
            )));
        }

        let widened: Vec<Option<i64>> = (0..self.len())
            .map(|i| {
                if self.is_null(i) {
                    Ok(None)
                } else {
                    self.int_value(i).map(Some).ok_or_else(|| {
                        Error::TypeMismatch(format!(
                            "value in column '{}' does not widen to i64",
                            self.name
                        ))
                    })
                }
            })
            .collect::<Result<_>>()?;

        fn narrow<T: TryFrom<i64> + Default>(
            name: &str,
            values: &[Option<i64>],
        ) -> Result<Vec<T>> {
            values
                .iter()
                .map(|v| match v {
                    Some(v) => T::try_from(*v).map_err(|_| {
                        Error::TypeMismatch(format!("value {} does not fit column '{}'", v, name))
                    }),
                    None => Ok(T::default()),
                })
                .collect()
        }

        let data = match target {
            DataType::Int8 => ColumnData::Int8(narrow(&self.name, &widened)?),
            DataType::Int16 => ColumnData::Int16(narrow(&self.name, &widened)?),
            DataType::Int32 => ColumnData::Int32(narrow(&self.name, &widened)?),
            DataType::Int64 => ColumnData::Int64(narrow(&self.name, &widened)?),
            DataType::UInt8 => ColumnData::UInt8(narrow(&self.name, &widened)?),
            DataType::UInt16 => ColumnData::UInt16(narrow(&self.name, &widened)?),
            DataType::UInt32 => ColumnData::UInt32(narrow(&self.name, &widened)?),
            DataType::UInt64 => ColumnData::UInt64(narrow(&self.name, &widened)?),
            other => {
                return Err(Error::TypeMismatch(format!(
                    "{} is not an integer width",
                    other
                )))
            }
        };

        Ok(Self {
            name: self.name.clone(),
            data,
            nulls: self.nulls.clone(),
            null_count: self.null_count,
        })
    }

    /// Rewrite `Float64` storage as `Float32`, preserving nulls
    pub(crate) fn to_float32(&self) -> Result<Self> {
        let values = match &self.data {
            ColumnData::Float64(v) => v.iter().map(|&v| v as f32).collect(),
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "column '{}' is not Float64",
                    self.name
                )))
            }
        };

        Ok(Self {
            name: self.name.clone(),
            data: ColumnData::Float32(values),
            nulls: self.nulls.clone(),
            null_count: self.null_count,
        })
    }

    /// Rewrite plain string storage as dictionary-encoded, preserving nulls
    pub(crate) fn to_dictionary(&self) -> Result<Self> {
        let source = match &self.data {
            ColumnData::Utf8(v) => v,
            _ => {
                return Err(Error::TypeMismatch(format!(
                    "column '{}' is not Utf8",
                    self.name
                )))
            }
        };

        let mut index: HashMap<&str, u32> = HashMap::new();
        let mut values: Vec<String> = Vec::new();
        let mut keys = Vec::with_capacity(source.len());

        for (i, s) in source.iter().enumerate() {
            if self.is_null(i) {
                keys.push(0);
                continue;
            }
            match index.get(s.as_str()) {
                Some(&k) => keys.push(k),
                None => {
                    let k = values.len() as u32;
                    index.insert(s.as_str(), k);
                    keys.push(k);
                    values.push(s.clone());
                }
            }
        }

        // A fully-null column has an empty dictionary; give the null
        // placeholder keys something to point at.
        if values.is_empty() {
            values.push(String::new());
        }

        Ok(Self {
            name: self.name.clone(),
            data: ColumnData::Dictionary { keys, values },
            nulls: self.nulls.clone(),
            null_count: self.null_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nulls_round_trip() {
        let col = Column::from_i64("v", vec![Some(1), None, Some(3)]);

        assert_eq!(col.len(), 3);
        assert_eq!(col.null_count(), 1);
        assert!(col.is_null(1));
        assert_eq!(col.int_value(0), Some(1));
        assert_eq!(col.int_value(1), None);
        assert_eq!(col.int_value(2), Some(3));
    }

    #[test]
    fn test_slice_preserves_nulls() {
        let col = Column::from_i64("v", vec![Some(1), None, Some(3), None, Some(5)]);
        let slice = col.slice(1, 3).unwrap();

        assert_eq!(slice.len(), 3);
        assert_eq!(slice.null_count(), 2);
        assert!(slice.is_null(0));
        assert_eq!(slice.int_value(1), Some(3));
        assert!(slice.is_null(2));
    }

    #[test]
    fn test_slice_out_of_bounds() {
        let col = Column::from_i64("v", vec![Some(1), Some(2)]);
        assert!(matches!(col.slice(1, 2), Err(Error::IndexOutOfBounds)));
    }

    #[test]
    fn test_append_merges_nulls() {
        let mut a = Column::from_i64("v", vec![Some(1), Some(2)]);
        let b = Column::from_i64("v", vec![None, Some(4)]);

        a.append(&b).unwrap();

        assert_eq!(a.len(), 4);
        assert_eq!(a.null_count(), 1);
        assert!(a.is_null(2));
        assert_eq!(a.int_value(3), Some(4));
    }

    #[test]
    fn test_append_type_mismatch() {
        let mut a = Column::from_i64("v", vec![Some(1)]);
        let b = Column::from_f64("v", vec![Some(1.0)]);

        assert!(matches!(a.append(&b), Err(Error::TypeMismatch(_))));
    }

    #[test]
    fn test_dictionary_append_remaps_keys() {
        let mut a = Column::from_utf8("c", vec![Some("x"), Some("y")])
            .to_dictionary()
            .unwrap();
        let b = Column::from_utf8("c", vec![Some("y"), Some("z")])
            .to_dictionary()
            .unwrap();

        a.append(&b).unwrap();

        assert_eq!(a.len(), 4);
        assert_eq!(a.str_value(1), Some("y"));
        assert_eq!(a.str_value(2), Some("y"));
        assert_eq!(a.str_value(3), Some("z"));
        assert_eq!(a.distinct_text_count(), Some(3));
    }

    #[test]
    fn test_narrow_and_widen() {
        let col = Column::from_i64("v", vec![Some(1), None, Some(300)]);
        let narrow = col.with_integer_width(DataType::UInt16).unwrap();

        assert_eq!(narrow.data_type(), DataType::UInt16);
        assert!(narrow.is_null(1));
        assert_eq!(narrow.int_value(2), Some(300));

        // Does not fit i8
        assert!(col.with_integer_width(DataType::Int8).is_err());
    }

    #[test]
    fn test_dictionary_round_trip() {
        let col = Column::from_utf8("c", vec![Some("a"), None, Some("a"), Some("b")]);
        let dict = col.to_dictionary().unwrap();

        assert_eq!(dict.data_type(), DataType::Dictionary);
        assert_eq!(dict.str_value(0), Some("a"));
        assert_eq!(dict.str_value(1), None);
        assert_eq!(dict.str_value(3), Some("b"));
        assert_eq!(dict.distinct_text_count(), Some(2));
        assert!(dict.memory_usage() < col.memory_usage() + dict.len() * 4);
    }

    #[test]
    fn test_filter() {
        let col = Column::from_i64("v", vec![Some(1), None, Some(3), Some(4)]);
        let kept = col.filter(&[true, true, false, true]).unwrap();

        assert_eq!(kept.len(), 3);
        assert!(kept.is_null(1));
        assert_eq!(kept.int_value(2), Some(4));
    }
}
