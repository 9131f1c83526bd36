use std::fmt::{Display, Formatter};
use hdf5::H5Type;

pub mod attributes;

/// Kinds of payload a node can carry.
///
/// The integer tag of each kind is what gets stored in the `DATA_TYPE` attribute. It is
/// chosen independently of the HDF5 library's own type identifiers, which change between
/// library versions.
#[derive(Eq, PartialEq, Hash, Debug, Clone, Copy)]
pub enum DataKind {
    /// Booleans, stored as int8 with the `LOGICAL_BOOLEAN_ARRAY` marker.
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    /// Variable-length UTF-8 strings.
    String,
    /// Nested composite values, stored as groups rather than datasets.
    Object,
}

impl DataKind {
    /// Returns the tag written to the `DATA_TYPE` attribute.
    pub const fn type_tag(self) -> i32 {
        match self {
            DataKind::Boolean => 1,
            DataKind::Int8 => 2,
            DataKind::Int16 => 3,
            DataKind::Int32 => 4,
            DataKind::Int64 => 5,
            DataKind::Float32 => 6,
            DataKind::Float64 => 7,
            DataKind::String => 8,
            DataKind::Object => 9,
        }
    }

    /// Decodes a `DATA_TYPE` tag; `None` for tags this crate does not know.
    pub fn from_type_tag(tag: i32) -> Option<DataKind> {
        match tag {
            1 => Some(DataKind::Boolean),
            2 => Some(DataKind::Int8),
            3 => Some(DataKind::Int16),
            4 => Some(DataKind::Int32),
            5 => Some(DataKind::Int64),
            6 => Some(DataKind::Float32),
            7 => Some(DataKind::Float64),
            8 => Some(DataKind::String),
            9 => Some(DataKind::Object),
            _ => None,
        }
    }

    /// Number of bytes one element occupies for the purpose of sizing chunks and
    /// hyperslabs. Strings and objects count as one byte per element.
    pub const fn byte_width(self) -> usize {
        match self {
            DataKind::Boolean | DataKind::Int8 => 1,
            DataKind::Int16 => 2,
            DataKind::Int32 | DataKind::Float32 => 4,
            DataKind::Int64 | DataKind::Float64 => 8,
            DataKind::String | DataKind::Object => 1,
        }
    }
}

impl Display for DataKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DataKind::Boolean => "boolean",
            DataKind::Int8 => "int8",
            DataKind::Int16 => "int16",
            DataKind::Int32 => "int32",
            DataKind::Int64 => "int64",
            DataKind::Float32 => "float32",
            DataKind::Float64 => "float64",
            DataKind::String => "string",
            DataKind::Object => "object",
        };
        write!(f, "{}", name)
    }
}

/// Numeric element types that can be stored directly in a dataset.
pub trait Primitive: H5Type + Copy + Default + Send + Sync {
    const KIND: DataKind;
}

impl Primitive for i8 { const KIND: DataKind = DataKind::Int8; }
impl Primitive for i16 { const KIND: DataKind = DataKind::Int16; }
impl Primitive for i32 { const KIND: DataKind = DataKind::Int32; }
impl Primitive for i64 { const KIND: DataKind = DataKind::Int64; }
impl Primitive for f32 { const KIND: DataKind = DataKind::Float32; }
impl Primitive for f64 { const KIND: DataKind = DataKind::Float64; }

/// Converts booleans to the int8 representation used on disk.
pub fn bool_to_int8(values: &[bool]) -> Vec<i8> {
    values.iter().map(|&value| value as i8).collect()
}

/// Inverse of [`bool_to_int8`]: only an exact `1` reads back as `true`.
pub fn int8_to_bool(values: &[i8]) -> Vec<bool> {
    values.iter().map(|&value| value == 1).collect()
}
