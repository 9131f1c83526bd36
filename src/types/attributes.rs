//! Names of the attributes that make the file format self-describing.

/// Marker: the field is a zero-length array and has no dataset.
pub const EMPTY_FIELD: &str = "EMPTY_FIELD";

/// Scalar int32: the `DataKind` tag of the payload.
pub const DATA_TYPE: &str = "DATA_TYPE";

/// Marker: the group holds one child group per element of a composite array.
pub const STRUCT_OBJECT_ARRAY: &str = "STRUCT_OBJECT_ARRAY";

/// Int64 sequence: logical shape of a composite array.
pub const STRUCT_OBJECT_ARRAY_DIMS: &str = "STRUCT_OBJECT_ARRAY_DIMS";

/// Marker: the dataset holds more than one string.
pub const STRING_ARRAY: &str = "STRING_ARRAY";

/// Marker: the int8 dataset encodes booleans.
pub const LOGICAL_BOOLEAN_ARRAY: &str = "LOGICAL_BOOLEAN_ARRAY";

/// Scalar int32: declared position of the field among its siblings.
pub const FIELD_ORDER: &str = "FIELD_ORDER";

/// Marker: the node is populated by several writers owning disjoint slices. On a primitive
/// node the slices are rows of its dataset; on an object node they are the per-field
/// columns of an array of flat records.
pub const PARALLEL_ARRAY: &str = "PARALLEL_ARRAY";

/// String: name of the concrete variant of a composite value, for element types with
/// more than one variant.
pub const PARAMETER_CLASS_NAME: &str = "PARAMETER_CLASS_NAME";

/// Marker attributes reported by node summaries, in display order.
pub const MARKERS: [&str; 5] = [
    EMPTY_FIELD,
    STRUCT_OBJECT_ARRAY,
    STRING_ARRAY,
    LOGICAL_BOOLEAN_ARRAY,
    PARALLEL_ARRAY,
];
