use thiserror::Error;
use crate::types::DataKind;

/// Failures detected by the container interface itself, as opposed to errors reported
/// by the HDF5 library. They travel inside `anyhow::Error` and can be recovered with
/// `downcast_ref`.
#[derive(Debug, Error)]
pub enum InterfaceError {
    /// A node expected to exist is missing.
    #[error("node '{name}' does not exist under '{parent}'")]
    NodeNotFound { parent: String, name: String },

    /// The node stores a different kind of payload than the one requested.
    #[error("node '{node}' holds {found} data, but {expected} was requested")]
    KindMismatch { node: String, expected: DataKind, found: DataKind },

    /// The `DATA_TYPE` attribute holds a tag this crate does not know.
    #[error("node '{node}' has unrecognized data type tag {tag}")]
    UnknownTypeTag { node: String, tag: i32 },

    /// A payload operation was attempted on a node without a dataset.
    #[error("node '{node}' has no dataset")]
    NoDataset { node: String },

    /// A row index does not address a row of the node's dataset.
    #[error("row {row:?} is out of bounds for node '{node}' with shape {shape:?}")]
    RowOutOfBounds { node: String, row: Vec<usize>, shape: Vec<usize> },

    /// The row content does not span the dataset's last dimension.
    #[error("row of length {actual} written to node '{node}', expected {expected}")]
    RowLengthMismatch { node: String, expected: usize, actual: usize },

    /// Another writer already claimed this row through the same ledger.
    #[error("row {row} of node '{node}' was already claimed by another writer")]
    RowAlreadyClaimed { node: String, row: u64 },

    /// The stored variant name is not one the element type can construct.
    #[error("node '{node}' holds a value of unknown variant '{type_name}'")]
    UnknownTypeName { node: String, type_name: String },

    /// The node lacks the marker attribute its layout requires.
    #[error("node '{node}' is missing the {marker} marker")]
    MissingMarker { node: String, marker: &'static str },

    /// A column of a parallel array does not match the shape of the record array.
    #[error("column '{column}' of node '{node}' has shape {found:?}, expected {expected:?}")]
    ColumnShapeMismatch { node: String, column: String, expected: Vec<usize>, found: Vec<usize> },

    /// A metadata attribute holds a value that cannot describe this node.
    #[error("attribute {attribute} of node '{node}' is corrupt: {reason}")]
    CorruptAttribute { node: String, attribute: &'static str, reason: String },

    /// The string cannot be stored as variable-length UTF-8.
    #[error("string {0:?} cannot be stored in HDF5")]
    InvalidString(String),

    #[error("compression level {0} is outside 0..=9")]
    InvalidCompressionLevel(u8),

    #[error("the hyperslab byte budget must be positive")]
    InvalidHyperslabBudget,
}
