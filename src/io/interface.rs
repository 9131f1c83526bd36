use anyhow::Result;
use hdf5::types::VarLenUnicode;
use hdf5::H5Type;
use ndarray::{ArrayBase, ArrayD, ArrayView, Data, Dimension, IxDyn};
use crate::io::chunking::HyperslabIterator;
use crate::io::error::InterfaceError;
use crate::io::node::{is_array_shape, is_empty_vector, NodeHandle};
use crate::types::attributes::{LOGICAL_BOOLEAN_ARRAY, STRING_ARRAY};
use crate::types::{bool_to_int8, int8_to_bool, DataKind, Primitive};

impl NodeHandle {
    /// Writes `value` as the child field `name`.
    pub fn write_scalar<T: Primitive>(&self, name: &str, value: T, field_order: i32) -> Result<()> {
        self.write_payload(name, T::KIND, &[value], &[1], field_order)
    }

    /// Reads the scalar field `name`. A field without a dataset reads as zero.
    pub fn read_scalar<T: Primitive>(&self, name: &str) -> Result<T> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(T::KIND)?;
        match node.dataset() {
            None => Ok(T::default()),
            Some(dataset) => Ok(dataset.read_raw::<T>()?.into_iter().next().unwrap_or_default()),
        }
    }

    /// Writes `array` as the child field `name`, flattened in row-major order. A
    /// one-dimensional array without elements is only marked empty; empty arrays of other
    /// ranks keep their shape.
    pub fn write_array<T, S, D>(&self, name: &str, array: &ArrayBase<S, D>, field_order: i32) -> Result<()>
    where
        T: Primitive,
        S: Data<Elem = T>,
        D: Dimension,
    {
        let values = array.iter().copied().collect::<Vec<_>>();
        self.write_payload(name, T::KIND, &values, array.shape(), field_order)
    }

    /// Reads the array field `name` with the shape recorded in the file. Fields marked
    /// empty read as an array of shape `[0]`.
    pub fn read_array<T: Primitive>(&self, name: &str) -> Result<ArrayD<T>> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(T::KIND)?;
        node.read_payload::<T>(T::KIND)
    }

    pub fn write_bool(&self, name: &str, value: bool, field_order: i32) -> Result<()> {
        self.write_payload(name, DataKind::Boolean, &bool_to_int8(&[value]), &[1], field_order)
    }

    pub fn read_bool(&self, name: &str) -> Result<bool> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(DataKind::Boolean)?;
        match node.dataset() {
            None => Ok(false),
            Some(dataset) => {
                let values = int8_to_bool(&dataset.read_raw::<i8>()?);
                Ok(values.into_iter().next().unwrap_or_default())
            }
        }
    }

    /// Writes a boolean array as int8 values tagged with `LOGICAL_BOOLEAN_ARRAY`.
    pub fn write_bool_array<S, D>(&self, name: &str, array: &ArrayBase<S, D>, field_order: i32) -> Result<()>
    where
        S: Data<Elem = bool>,
        D: Dimension,
    {
        let values = array.iter().copied().collect::<Vec<_>>();
        self.write_payload(name, DataKind::Boolean, &bool_to_int8(&values), array.shape(), field_order)
    }

    pub fn read_bool_array(&self, name: &str) -> Result<ArrayD<bool>> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(DataKind::Boolean)?;
        let values = node.read_payload::<i8>(DataKind::Boolean)?;
        let shape = values.shape().to_vec();
        Ok(ArrayD::from_shape_vec(IxDyn(&shape), int8_to_bool(&values.into_raw_vec()))?)
    }

    /// Writes a single variable-length string.
    pub fn write_string(&self, name: &str, value: &str, field_order: i32) -> Result<()> {
        self.write_payload(name, DataKind::String, &[to_varlen(value)?], &[1], field_order)
    }

    /// Reads a single string. A field without a dataset reads as the empty string.
    pub fn read_string(&self, name: &str) -> Result<String> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(DataKind::String)?;
        match node.dataset() {
            None => Ok(String::new()),
            Some(dataset) => Ok(dataset.read_raw::<VarLenUnicode>()?
                .into_iter()
                .next()
                .map(|value| value.as_str().to_string())
                .unwrap_or_default()),
        }
    }

    /// Writes an array of strings; more than one element adds the `STRING_ARRAY` marker.
    pub fn write_string_array<S, D>(&self, name: &str, array: &ArrayBase<S, D>, field_order: i32) -> Result<()>
    where
        S: Data<Elem = String>,
        D: Dimension,
    {
        let values = array.iter()
            .map(|value| to_varlen(value))
            .collect::<Result<Vec<_>>>()?;
        self.write_payload(name, DataKind::String, &values, array.shape(), field_order)
    }

    pub fn read_string_array(&self, name: &str) -> Result<ArrayD<String>> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(DataKind::String)?;
        let values = node.read_payload::<VarLenUnicode>(DataKind::String)?;
        Ok(values.map(|value| value.as_str().to_string()))
    }

    /// Fails with `KindMismatch` when the node records a kind other than `expected`.
    pub(crate) fn expect_kind(&self, expected: DataKind) -> Result<()> {
        match self.kind() {
            Some(found) if found != expected => Err(InterfaceError::KindMismatch {
                node: self.name().to_string(),
                expected,
                found,
            }.into()),
            _ => Ok(()),
        }
    }

    fn write_payload<T: H5Type>(
        &self,
        name: &str,
        kind: DataKind,
        values: &[T],
        dims: &[usize],
        field_order: i32,
    ) -> Result<()> {
        let mut node = NodeHandle::create(self, name, field_order)?;
        if is_empty_vector(dims) {
            return node.mark_empty();
        }

        node.set_kind(kind)?;
        match kind {
            DataKind::Boolean => node.add_marker(LOGICAL_BOOLEAN_ARRAY)?,
            DataKind::String if is_array_shape(dims) => node.add_marker(STRING_ARRAY)?,
            _ => {}
        }
        node.allocate_dataset::<T>(kind, dims)?;
        node.write_values(kind, values, dims)
    }

    /// Writes the whole dataset, one hyperslab at a time when it exceeds the byte budget.
    fn write_values<T: H5Type>(&self, kind: DataKind, values: &[T], dims: &[usize]) -> Result<()> {
        let dataset = self.require_dataset()?;
        let max_bytes = self.config().max_bytes_per_hyperslab;
        let bytes = values.len().saturating_mul(kind.byte_width());
        if values.is_empty() {
            return Ok(());
        }
        if dims.is_empty() || bytes <= max_bytes {
            dataset.write_raw(values)?;
            return Ok(());
        }

        for slab in HyperslabIterator::new(dims, kind.byte_width(), max_bytes) {
            let start = slab.start(dims);
            let block = ArrayView::from_shape(
                IxDyn(&slab.extent), &values[start..start + slab.len()])?;
            dataset.write_slice(block, slab.selection())?;
        }
        Ok(())
    }

    /// Reads the whole dataset, one hyperslab at a time when it exceeds the byte budget.
    fn read_payload<T: H5Type>(&self, kind: DataKind) -> Result<ArrayD<T>> {
        let dataset = match self.dataset() {
            None => return Ok(ArrayD::from_shape_vec(IxDyn(&[0]), Vec::new())?),
            Some(dataset) => dataset,
        };

        let dims = dataset.shape();
        let max_bytes = self.config().max_bytes_per_hyperslab;
        let elements: usize = dims.iter().product();
        let values = if elements == 0 {
            Vec::new()
        } else if dims.is_empty() || elements.saturating_mul(kind.byte_width()) <= max_bytes {
            dataset.read_raw::<T>()?
        } else {
            let mut values = Vec::with_capacity(elements);
            for slab in HyperslabIterator::new(&dims, kind.byte_width(), max_bytes) {
                let block = dataset.read_slice::<T, _, IxDyn>(slab.selection())?;
                values.extend(block.into_raw_vec());
            }
            values
        };
        Ok(ArrayD::from_shape_vec(IxDyn(&dims), values)?)
    }
}

pub(crate) fn to_varlen(value: &str) -> Result<VarLenUnicode> {
    value.parse::<VarLenUnicode>()
        .map_err(|_| InterfaceError::InvalidString(value.to_string()).into())
}
