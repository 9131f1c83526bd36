use std::sync::Mutex;
use anyhow::{anyhow, ensure, Result};
use hdf5::types::VarLenUnicode;
use hdf5::H5Type;
use log::debug;
use ndarray::{ArrayView, IxDyn};
use roaring::RoaringTreemap;
use crate::io::chunking::block_selection;
use crate::io::error::InterfaceError;
use crate::io::interface::to_varlen;
use crate::io::node::{is_array_shape, NodeHandle};
use crate::types::attributes::{PARALLEL_ARRAY, STRING_ARRAY};
use crate::types::{DataKind, Primitive};

impl NodeHandle {
    /// Creates the child `name` with a string dataset of the full `shape`, ready to be
    /// filled one row at a time by [`NodeHandle::write_string_vector`].
    pub fn create_string_rows(&self, name: &str, shape: &[usize], field_order: i32) -> Result<NodeHandle> {
        self.create_rows::<VarLenUnicode>(name, DataKind::String, shape, field_order)
    }

    /// Creates the child `name` with a numeric dataset of the full `shape`, ready to be
    /// filled one row at a time by [`NodeHandle::write_array_row`].
    pub fn create_array_rows<T: Primitive>(&self, name: &str, shape: &[usize], field_order: i32) -> Result<NodeHandle> {
        self.create_rows::<T>(name, T::KIND, shape, field_order)
    }

    /// Writes one row of strings. `row` indexes every dimension but the last, and
    /// `content` must span the last dimension exactly.
    ///
    /// Writers holding disjoint rows may call this concurrently on the same handle.
    pub fn write_string_vector(&self, row: &[usize], content: &[String]) -> Result<()> {
        self.expect_kind(DataKind::String)?;
        let values = content.iter()
            .map(|value| to_varlen(value))
            .collect::<Result<Vec<_>>>()?;
        self.write_row(row, &values)
    }

    /// Writes one row of numbers; see [`NodeHandle::write_string_vector`].
    pub fn write_array_row<T: Primitive>(&self, row: &[usize], content: &[T]) -> Result<()> {
        self.expect_kind(T::KIND)?;
        self.write_row(row, content)
    }

    /// Returns an empty ledger for the rows of this node.
    pub fn row_ledger(&self) -> Result<RowLedger> {
        let shape = self.require_dataset()?.shape();
        let rows = shape[..shape.len().saturating_sub(1)].to_vec();
        Ok(RowLedger {
            node: self.name().to_string(),
            rows,
            claimed: Mutex::new(RoaringTreemap::new()),
        })
    }

    /// Claims `row` in `ledger` and writes it; fails without writing if another writer
    /// claimed the row first.
    pub fn write_string_vector_claimed(&self, ledger: &RowLedger, row: &[usize], content: &[String]) -> Result<()> {
        ledger.claim(row)?;
        self.write_string_vector(row, content)
    }

    pub fn write_array_row_claimed<T: Primitive>(&self, ledger: &RowLedger, row: &[usize], content: &[T]) -> Result<()> {
        ledger.claim(row)?;
        self.write_array_row(row, content)
    }

    fn create_rows<T: H5Type>(&self, name: &str, kind: DataKind, shape: &[usize], field_order: i32) -> Result<NodeHandle> {
        ensure!(!shape.is_empty() && !shape.contains(&0),
                "row dataset '{}' needs a non-empty shape, got {:?}", name, shape);

        let mut node = NodeHandle::create(self, name, field_order)?;
        node.set_kind(kind)?;
        node.add_marker(PARALLEL_ARRAY)?;
        if kind == DataKind::String && is_array_shape(shape) {
            node.add_marker(STRING_ARRAY)?;
        }
        node.allocate_dataset::<T>(kind, shape)?;
        debug!("Allocated {:?} rows of {} for node '{}'", shape, kind, name);
        Ok(node)
    }

    fn write_row<T: H5Type>(&self, row: &[usize], content: &[T]) -> Result<()> {
        let dataset = self.require_dataset()?;
        let shape = dataset.shape();
        let (&width, outer) = shape.split_last()
            .ok_or_else(|| InterfaceError::NoDataset { node: self.name().to_string() })?;

        if row.len() != outer.len() || row.iter().zip(outer).any(|(&index, &dim)| index >= dim) {
            return Err(InterfaceError::RowOutOfBounds {
                node: self.name().to_string(),
                row: row.to_vec(),
                shape,
            }.into());
        }
        if content.len() != width {
            return Err(InterfaceError::RowLengthMismatch {
                node: self.name().to_string(),
                expected: width,
                actual: content.len(),
            }.into());
        }

        let mut offset = row.to_vec();
        offset.push(0);
        let mut extent = vec![1; row.len()];
        extent.push(width);

        let block = ArrayView::from_shape(IxDyn(&extent), content)?;
        dataset.write_slice(block, block_selection(&offset, &extent))?;
        Ok(())
    }
}

/// Records which rows of a node have been handed to a writer.
///
/// Sharing one ledger between writers turns an accidental overlap into a
/// `RowAlreadyClaimed` error instead of a silent overwrite.
pub struct RowLedger {
    node: String,
    rows: Vec<usize>,
    claimed: Mutex<RoaringTreemap>,
}

impl RowLedger {
    /// Marks `row` as taken and returns its position in row-major order.
    pub fn claim(&self, row: &[usize]) -> Result<u64> {
        if row.len() != self.rows.len() || row.iter().zip(&self.rows).any(|(&index, &dim)| index >= dim) {
            return Err(InterfaceError::RowOutOfBounds {
                node: self.node.clone(),
                row: row.to_vec(),
                shape: self.rows.clone(),
            }.into());
        }
        let position = row.iter()
            .zip(&self.rows)
            .fold(0_u64, |acc, (&index, &dim)| acc * dim as u64 + index as u64);

        let mut claimed = self.claimed.lock()
            .map_err(|_| anyhow!("row ledger of node '{}' is poisoned", self.node))?;
        if !claimed.insert(position) {
            return Err(InterfaceError::RowAlreadyClaimed { node: self.node.clone(), row: position }.into());
        }
        Ok(position)
    }

    /// Number of rows claimed so far.
    pub fn claimed(&self) -> u64 {
        self.claimed.lock().map(|claimed| claimed.len()).unwrap_or_default()
    }
}
