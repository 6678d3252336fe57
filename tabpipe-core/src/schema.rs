//! Schema definition for tabular data types

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Data type for column values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// 8-bit signed integer
    Int8,

    /// 16-bit signed integer
    Int16,

    /// 32-bit signed integer
    Int32,

    /// 64-bit signed integer
    Int64,

    /// 8-bit unsigned integer
    UInt8,

    /// 16-bit unsigned integer
    UInt16,

    /// 32-bit unsigned integer
    UInt32,

    /// 64-bit unsigned integer
    UInt64,

    /// 32-bit floating point
    Float32,

    /// 64-bit floating point
    Float64,

    /// UTF-8 encoded string
    Utf8,

    /// Dictionary-encoded string (distinct values stored once, rows hold
    /// 32-bit indices into the dictionary)
    Dictionary,

    /// Timestamp in milliseconds since the UNIX epoch
    Timestamp,
}

impl DataType {
    /// Get the per-value size of this type in bytes
    ///
    /// Variable-size types report the per-row fixed cost only (the index
    /// width for dictionaries, zero for plain strings whose payload is
    /// counted separately).
    pub fn size_bytes(&self) -> usize {
        match self {
            DataType::Int8 | DataType::UInt8 => 1,
            DataType::Int16 | DataType::UInt16 => 2,
            DataType::Int32 | DataType::UInt32 | DataType::Float32 | DataType::Dictionary => 4,
            DataType::Int64
            | DataType::UInt64
            | DataType::Float64
            | DataType::Timestamp => 8,
            DataType::Utf8 => 0,
        }
    }

    /// Check if this type is an integer type
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
        )
    }

    /// Check if this type is a floating point type
    pub fn is_float(&self) -> bool {
        matches!(self, DataType::Float32 | DataType::Float64)
    }

    /// Check if this type is a numeric type
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Check if this type holds text (plain or dictionary-encoded)
    pub fn is_text(&self) -> bool {
        matches!(self, DataType::Utf8 | DataType::Dictionary)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Int8 => write!(f, "Int8"),
            DataType::Int16 => write!(f, "Int16"),
            DataType::Int32 => write!(f, "Int32"),
            DataType::Int64 => write!(f, "Int64"),
            DataType::UInt8 => write!(f, "UInt8"),
            DataType::UInt16 => write!(f, "UInt16"),
            DataType::UInt32 => write!(f, "UInt32"),
            DataType::UInt64 => write!(f, "UInt64"),
            DataType::Float32 => write!(f, "Float32"),
            DataType::Float64 => write!(f, "Float64"),
            DataType::Utf8 => write!(f, "Utf8"),
            DataType::Dictionary => write!(f, "Dictionary"),
            DataType::Timestamp => write!(f, "Timestamp"),
        }
    }
}

/// A field in a schema, with a name, declared data type, and nullability
///
/// The declared type records what the upstream loader believes the column
/// holds. Physical storage may lag behind it (see [`crate::column::Column`]);
/// the validation engine surfaces the divergence.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Name of the field
    pub name: String,

    /// Declared data type of the field
    pub data_type: DataType,

    /// Whether the field can be null
    pub nullable: bool,
}

impl Field {
    /// Create a new field
    pub fn new(name: &str, data_type: DataType, nullable: bool) -> Self {
        Self {
            name: name.to_string(),
            data_type,
            nullable,
        }
    }

    /// Get the name of this field
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the declared data type of this field
    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    /// Check if this field is nullable
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.nullable {
            write!(f, "{}: {} (nullable)", self.name, self.data_type)
        } else {
            write!(f, "{}: {} (non-nullable)", self.name, self.data_type)
        }
    }
}

/// A schema describing a dataset's structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    /// Fields in this schema
    fields: Vec<Field>,

    /// Field indices by name for faster lookup
    #[serde(skip)]
    field_indices: HashMap<String, usize>,
}

impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        // The lookup map is derived state; rebuild it instead of trusting
        // the serialized form.
        #[derive(Deserialize)]
        struct RawSchema {
            fields: Vec<Field>,
        }

        let raw = RawSchema::deserialize(deserializer)?;
        Ok(Schema::new(raw.fields))
    }
}

impl Schema {
    /// Create a new schema with the given fields
    pub fn new(fields: Vec<Field>) -> Self {
        let mut field_indices = HashMap::with_capacity(fields.len());
        for (i, field) in fields.iter().enumerate() {
            field_indices.insert(field.name.clone(), i);
        }

        Self {
            fields,
            field_indices,
        }
    }

    /// Get all fields in this schema
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Get a field by index
    pub fn field(&self, index: usize) -> &Field {
        &self.fields[index]
    }

    /// Get a field by name
    pub fn field_by_name(&self, name: &str) -> Result<&Field> {
        let index = self.index_of(name)?;
        Ok(&self.fields[index])
    }

    /// Get the index of a field by name
    pub fn index_of(&self, name: &str) -> Result<usize> {
        self.field_indices
            .get(name)
            .copied()
            .ok_or_else(|| Error::ColumnNotFound(name.to_string()))
    }

    /// Get the number of fields in this schema
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if this schema is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Replace the declared type of a field, returning the updated schema
    ///
    /// Used when a column's physical representation is rewritten so schema
    /// and storage stay in agreement.
    pub fn with_field_type(&self, index: usize, data_type: DataType) -> Result<Self> {
        if index >= self.fields.len() {
            return Err(Error::IndexOutOfBounds);
        }

        let mut fields = self.fields.clone();
        fields[index].data_type = data_type;

        Ok(Self::new(fields))
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schema: {} fields", self.fields.len())?;
        for field in &self.fields {
            writeln!(f, "  {}", field)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_lookup() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]);

        assert_eq!(schema.len(), 2);
        assert_eq!(schema.index_of("name").unwrap(), 1);
        assert_eq!(schema.field_by_name("id").unwrap().data_type(), DataType::Int64);
        assert!(matches!(
            schema.index_of("missing"),
            Err(Error::ColumnNotFound(_))
        ));
    }

    #[test]
    fn test_with_field_type() {
        let schema = Schema::new(vec![Field::new("v", DataType::Int64, true)]);
        let narrowed = schema.with_field_type(0, DataType::Int16).unwrap();

        assert_eq!(narrowed.field(0).data_type(), DataType::Int16);
        assert_eq!(schema.field(0).data_type(), DataType::Int64);
        assert_eq!(narrowed.index_of("v").unwrap(), 0);
    }

    #[test]
    fn test_schema_serde_round_trip() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("name", DataType::Utf8, true),
        ]);

        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();

        assert_eq!(back, schema);
        // The lookup map is rebuilt on deserialization.
        assert_eq!(back.index_of("name").unwrap(), 1);
    }

    #[test]
    fn test_type_predicates() {
        assert!(DataType::UInt16.is_integer());
        assert!(DataType::Float32.is_float());
        assert!(!DataType::Timestamp.is_numeric());
        assert!(DataType::Dictionary.is_text());
        assert_eq!(DataType::Int16.size_bytes(), 2);
        assert_eq!(DataType::Utf8.size_bytes(), 0);
    }
}
