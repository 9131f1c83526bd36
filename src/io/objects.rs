use anyhow::Result;
use log::debug;
use ndarray::{ArrayBase, ArrayD, Data, Dimension, IntoDimension, IxDyn};
use crate::io::error::InterfaceError;
use crate::io::node::{is_array_shape, is_empty_vector, NodeHandle};
use crate::io::{Hdf5Serialization, ParallelRecord};
use crate::types::attributes::{
    EMPTY_FIELD, PARALLEL_ARRAY, PARAMETER_CLASS_NAME, STRUCT_OBJECT_ARRAY, STRUCT_OBJECT_ARRAY_DIMS,
};
use crate::types::{DataKind, Primitive};

impl NodeHandle {
    /// Writes a nested composite value as the child `name`. `None` leaves an empty node.
    pub fn write_object<P: Hdf5Serialization>(&self, name: &str, value: Option<&P>, field_order: i32) -> Result<()> {
        let mut node = NodeHandle::create(self, name, field_order)?;
        match value {
            None => node.mark_empty(),
            Some(value) => {
                node.set_kind(DataKind::Object)?;
                write_element(&node, value)
            }
        }
    }

    /// Reads the nested composite value `name` into `value`.
    ///
    /// Returns `false`, leaving `value` untouched, if the node is marked empty. When the
    /// node records a variant name, `value` is first replaced by that variant.
    pub fn read_object<P: Hdf5Serialization>(&self, name: &str, value: &mut P) -> Result<bool> {
        let node = NodeHandle::open(self, name)?;
        if node.has_attr(EMPTY_FIELD)? {
            return Ok(false);
        }
        node.expect_kind(DataKind::Object)?;
        read_element(&node, value)?;
        Ok(true)
    }

    /// Writes an array of composite values as the child `name`.
    ///
    /// Each element goes to its own group named after its row-major index, e.g.
    /// `name-0-2`, and the logical shape is recorded in `STRUCT_OBJECT_ARRAY_DIMS`. A
    /// one-element, one-dimensional array is stored like a single value and a
    /// one-dimensional array without elements is only marked empty. Empty arrays of
    /// higher rank keep their dims and have no element groups.
    pub fn write_object_array<P, S, D>(&self, name: &str, values: &ArrayBase<S, D>, field_order: i32) -> Result<()>
    where
        P: Hdf5Serialization,
        S: Data<Elem = P>,
        D: Dimension,
    {
        let mut node = NodeHandle::create(self, name, field_order)?;
        if is_empty_vector(values.shape()) {
            return node.mark_empty();
        }
        node.set_kind(DataKind::Object)?;

        if !is_array_shape(values.shape()) {
            if let Some(value) = values.iter().next() {
                write_element(&node, value)?;
            }
            return Ok(());
        }

        node.add_marker(STRUCT_OBJECT_ARRAY)?;
        node.add_object_dims(values.shape())?;
        debug!("Writing {} elements of object array '{}'", values.len(), name);

        for (position, (index, value)) in values.indexed_iter().enumerate() {
            let element_name = element_name(name, index.into_dimension().slice());
            let element = NodeHandle::create(&node, &element_name, position as i32)?;
            write_element(&element, value)?;
        }
        Ok(())
    }

    /// Reads the array of composite values `name`, in the shape recorded by
    /// [`NodeHandle::write_object_array`].
    pub fn read_object_array<P: Hdf5Serialization + Default>(&self, name: &str) -> Result<ArrayD<P>> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(DataKind::Object)?;
        let dims = node.object_array_dims()?;

        if !node.has_attr(STRUCT_OBJECT_ARRAY)? {
            let values = if node.has_attr(EMPTY_FIELD)? {
                Vec::new()
            } else {
                let mut value = P::default();
                read_element(&node, &mut value)?;
                vec![value]
            };
            return Ok(ArrayD::from_shape_vec(IxDyn(&dims), values)?);
        }

        let values = ndarray::indices(IxDyn(&dims)).into_iter().map(|index| {
            let element = NodeHandle::open(&node, &element_name(name, index.slice()))?;
            let mut value = P::default();
            read_element(&element, &mut value)?;
            anyhow::Ok(value)
        }).collect::<Result<Vec<_>>>()?;
        Ok(ArrayD::from_shape_vec(IxDyn(&dims), values)?)
    }

    /// Writes an array of flat records as the child `name`, transposed into one primitive
    /// array per field. The node is marked `PARALLEL_ARRAY` and records the shape of
    /// `records` in `STRUCT_OBJECT_ARRAY_DIMS`; every column has that same shape.
    pub fn write_parallel_array<P, S, D>(&self, name: &str, records: &ArrayBase<S, D>, field_order: i32) -> Result<()>
    where
        P: ParallelRecord,
        S: Data<Elem = P>,
        D: Dimension,
    {
        let mut node = NodeHandle::create(self, name, field_order)?;
        if is_empty_vector(records.shape()) {
            return node.mark_empty();
        }
        node.set_kind(DataKind::Object)?;
        node.add_marker(PARALLEL_ARRAY)?;
        node.add_object_dims(records.shape())?;
        debug!("Writing {:?} records of parallel array '{}'", records.shape(), name);
        P::write_columns(records, &node)
    }

    /// Reads the parallel array `name`. Records start from `P::default()`, so fields
    /// whose column is absent keep their default value.
    pub fn read_parallel_array<P: ParallelRecord>(&self, name: &str) -> Result<ArrayD<P>> {
        let node = NodeHandle::open(self, name)?;
        node.expect_kind(DataKind::Object)?;
        let dims = node.object_array_dims()?;
        if node.has_attr(EMPTY_FIELD)? {
            return Ok(ArrayD::from_shape_vec(IxDyn(&dims), Vec::new())?);
        }
        if !node.has_attr(PARALLEL_ARRAY)? {
            return Err(InterfaceError::MissingMarker {
                node: node.name().to_string(),
                marker: PARALLEL_ARRAY,
            }.into());
        }

        let mut records = ArrayD::from_shape_simple_fn(IxDyn(&dims), P::default);
        if !records.is_empty() {
            P::read_columns(&mut records, &node)?;
        }
        Ok(records)
    }

    /// Writes the `column` of a parallel array: `field` applied to every record.
    pub fn write_column<P, T, S, D, F>(&self, column: &str, records: &ArrayBase<S, D>, field: F, field_order: i32) -> Result<()>
    where
        T: Primitive,
        S: Data<Elem = P>,
        D: Dimension,
        F: Fn(&P) -> T,
    {
        self.write_array(column, &records.map(field), field_order)
    }

    pub fn write_bool_column<P, S, D, F>(&self, column: &str, records: &ArrayBase<S, D>, field: F, field_order: i32) -> Result<()>
    where
        S: Data<Elem = P>,
        D: Dimension,
        F: Fn(&P) -> bool,
    {
        self.write_bool_array(column, &records.map(field), field_order)
    }

    /// Hands each value of `column` to `assign` with the matching record. An absent
    /// column leaves the records untouched.
    pub fn read_column<P, T, F>(&self, column: &str, records: &mut ArrayD<P>, assign: F) -> Result<()>
    where
        T: Primitive,
        F: FnMut(&mut P, T),
    {
        if !self.has_child(column) {
            debug!("Parallel array '{}' has no column '{}'", self.name(), column);
            return Ok(());
        }
        let values = self.read_array::<T>(column)?;
        self.assign_column(column, records, values, assign)
    }

    pub fn read_bool_column<P, F>(&self, column: &str, records: &mut ArrayD<P>, assign: F) -> Result<()>
    where
        F: FnMut(&mut P, bool),
    {
        if !self.has_child(column) {
            debug!("Parallel array '{}' has no column '{}'", self.name(), column);
            return Ok(());
        }
        let values = self.read_bool_array(column)?;
        self.assign_column(column, records, values, assign)
    }

    /// Logical shape of a composite array: `[0]` when the node is marked empty, the
    /// recorded dims when it has them and `[1]` for a single value.
    pub fn object_array_dims(&self) -> Result<Vec<usize>> {
        if self.has_attr(EMPTY_FIELD)? {
            return Ok(vec![0]);
        }
        if !self.has_attr(STRUCT_OBJECT_ARRAY_DIMS)? {
            return Ok(vec![1]);
        }

        let dims = self.group().attr(STRUCT_OBJECT_ARRAY_DIMS)?.read_raw::<i64>()?;
        dims.into_iter().map(|dim| {
            usize::try_from(dim).map_err(|_| InterfaceError::CorruptAttribute {
                node: self.name().to_string(),
                attribute: STRUCT_OBJECT_ARRAY_DIMS,
                reason: format!("negative dimension {}", dim),
            }.into())
        }).collect()
    }

    fn add_object_dims(&self, shape: &[usize]) -> Result<()> {
        let dims = shape.iter().map(|&dim| dim as i64).collect::<Vec<_>>();
        self.add_i64_seq_attr(STRUCT_OBJECT_ARRAY_DIMS, &dims)
    }

    fn assign_column<P, T, F>(&self, column: &str, records: &mut ArrayD<P>, values: ArrayD<T>, mut assign: F) -> Result<()>
    where
        T: Copy,
        F: FnMut(&mut P, T),
    {
        if values.shape() != records.shape() {
            return Err(InterfaceError::ColumnShapeMismatch {
                node: self.name().to_string(),
                column: column.to_string(),
                expected: records.shape().to_vec(),
                found: values.shape().to_vec(),
            }.into());
        }
        records.iter_mut()
            .zip(values.iter().copied())
            .for_each(|(record, value)| assign(record, value));
        Ok(())
    }
}

/// Name of the group holding the element at `index` of the object array `name`.
pub fn element_name(name: &str, index: &[usize]) -> String {
    let mut element = name.to_string();
    for position in index {
        element.push('-');
        element.push_str(&position.to_string());
    }
    element
}

fn write_element<P: Hdf5Serialization>(node: &NodeHandle, value: &P) -> Result<()> {
    if let Some(type_name) = value.type_name() {
        node.add_string_attr(PARAMETER_CLASS_NAME, type_name)?;
    }
    value.add_to(node)
}

fn read_element<P: Hdf5Serialization>(node: &NodeHandle, value: &mut P) -> Result<()> {
    if let Some(type_name) = node.read_string_attr(PARAMETER_CLASS_NAME)? {
        *value = P::from_type_name(&type_name).ok_or_else(|| InterfaceError::UnknownTypeName {
            node: node.name().to_string(),
            type_name,
        })?;
    }
    value.read_from(node)
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use ndarray::{arr1, Array1, Array2, Ix2};
    use tempdir::TempDir;
    use crate::io::error::InterfaceError;
    use crate::io::node::NodeHandle;
    use crate::io::objects::element_name;
    use crate::io::test_support::{root, scratch_file, Reading, Station};
    use crate::io::Hdf5Serialization;
    use crate::types::attributes::{
        EMPTY_FIELD, PARALLEL_ARRAY, PARAMETER_CLASS_NAME, STRUCT_OBJECT_ARRAY, STRUCT_OBJECT_ARRAY_DIMS,
    };
    use crate::types::DataKind;

    #[derive(PartialEq, Debug, Clone)]
    enum Instrument {
        Thermometer { celsius: f64 },
        Camera { label: String, exposure: f32 },
    }

    impl Default for Instrument {
        fn default() -> Self {
            Instrument::Thermometer { celsius: 0.0 }
        }
    }

    impl Hdf5Serialization for Instrument {
        fn add_to(&self, node: &NodeHandle) -> Result<()> {
            match self {
                Instrument::Thermometer { celsius } => node.write_scalar("celsius", *celsius, 0)?,
                Instrument::Camera { label, exposure } => {
                    node.write_string("label", label, 0)?;
                    node.write_scalar("exposure", *exposure, 1)?;
                }
            }
            Ok(())
        }

        fn read_from(&mut self, node: &NodeHandle) -> Result<()> {
            match self {
                Instrument::Thermometer { celsius } => *celsius = node.read_scalar("celsius")?,
                Instrument::Camera { label, exposure } => {
                    *label = node.read_string("label")?;
                    *exposure = node.read_scalar("exposure")?;
                }
            }
            Ok(())
        }

        fn type_name(&self) -> Option<&str> {
            match self {
                Instrument::Thermometer { .. } => Some("thermometer"),
                Instrument::Camera { .. } => Some("camera"),
            }
        }

        fn from_type_name(type_name: &str) -> Option<Self> {
            match type_name {
                "thermometer" => Some(Instrument::Thermometer { celsius: 0.0 }),
                "camera" => Some(Instrument::Camera { label: String::new(), exposure: 0.0 }),
                _ => None,
            }
        }
    }

    fn camera(label: &str, exposure: f32) -> Instrument {
        Instrument::Camera { label: label.to_string(), exposure }
    }

    #[test]
    fn test_element_name() {
        assert_eq!("readings-3", element_name("readings", &[3]));
        assert_eq!("grid-1-0-2", element_name("grid", &[1, 0, 2]));
        assert_eq!("value", element_name("value", &[]));
    }

    #[test]
    fn test_nested_object() {
        let dir = TempDir::new("test_nested_object").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let station = Station::sample("north", 3);
        root.write_object("station", Some(&station), 0).unwrap();

        let mut copy = Station::default();
        assert!(root.read_object("station", &mut copy).unwrap());
        assert_eq!(station, copy);
    }

    #[test]
    fn test_absent_object() {
        let dir = TempDir::new("test_absent_object").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        root.write_object::<Station>("station", None, 0).unwrap();
        assert!(NodeHandle::open(&root, "station").unwrap().has_attr(EMPTY_FIELD).unwrap());

        let mut copy = Station::sample("untouched", 1);
        assert!(!root.read_object("station", &mut copy).unwrap());
        assert_eq!(Station::sample("untouched", 1), copy);
    }

    #[test]
    fn test_object_array() {
        let dir = TempDir::new("test_object_array").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let readings = (0..3)
            .map(|i| Reading::new(i, i as f64 * 0.5, i % 2 == 0))
            .collect::<Array1<_>>();
        root.write_object_array("readings", &readings, 0).unwrap();

        let node = NodeHandle::open(&root, "readings").unwrap();
        assert!(node.has_attr(STRUCT_OBJECT_ARRAY).unwrap());
        assert_eq!(vec![3], node.object_array_dims().unwrap());
        assert!(node.dataset().is_none());
        assert_eq!(vec!["readings-0", "readings-1", "readings-2"], node.child_names().unwrap());
        let element = NodeHandle::open(&node, "readings-1").unwrap();
        assert!(!element.has_attr(PARAMETER_CLASS_NAME).unwrap());

        assert_eq!(readings.into_dyn(), root.read_object_array::<Reading>("readings").unwrap());
    }

    #[test]
    fn test_object_array_2d() {
        let dir = TempDir::new("test_object_array_2d").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let grid = Array2::from_shape_fn((2, 3), |(i, j)| Reading::new((i * 3 + j) as i32, 1.0, false));
        root.write_object_array("grid", &grid, 0).unwrap();

        let node = NodeHandle::open(&root, "grid").unwrap();
        assert_eq!(vec![2, 3], node.object_array_dims().unwrap());
        assert!(node.has_child("grid-1-2"));
        assert!(!node.has_child("grid-2-0"));

        let copy = root.read_object_array::<Reading>("grid").unwrap();
        assert_eq!(grid, copy.into_dimensionality::<Ix2>().unwrap());
    }

    #[test]
    fn test_object_array_edges() {
        let dir = TempDir::new("test_object_array_edges").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        root.write_object_array("none", &Array1::<Reading>::from(vec![]), 0).unwrap();
        let single = arr1(&[Reading::new(9, 9.5, true)]);
        root.write_object_array("single", &single, 1).unwrap();

        let none = NodeHandle::open(&root, "none").unwrap();
        assert!(none.has_attr(EMPTY_FIELD).unwrap());
        assert!(!none.has_attr(STRUCT_OBJECT_ARRAY).unwrap());
        assert_eq!(vec![0], none.object_array_dims().unwrap());
        assert_eq!(0, root.read_object_array::<Reading>("none").unwrap().len());

        let node = NodeHandle::open(&root, "single").unwrap();
        assert!(!node.has_attr(STRUCT_OBJECT_ARRAY).unwrap());
        assert_eq!(vec![1], node.object_array_dims().unwrap());
        assert_eq!(single.into_dyn(), root.read_object_array::<Reading>("single").unwrap());
    }

    #[test]
    fn test_empty_object_matrix_keeps_shape() {
        let dir = TempDir::new("test_empty_object_matrix_keeps_shape").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let empty = Array2::<Reading>::default((2, 0));
        root.write_object_array("empty", &empty, 0).unwrap();

        let node = NodeHandle::open(&root, "empty").unwrap();
        assert!(!node.has_attr(EMPTY_FIELD).unwrap());
        assert!(node.has_attr(STRUCT_OBJECT_ARRAY).unwrap());
        assert_eq!(vec![2, 0], node.object_array_dims().unwrap());
        assert!(node.child_names().unwrap().is_empty());

        let copy = root.read_object_array::<Reading>("empty").unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap();
        assert_eq!(empty, copy);
    }

    #[test]
    fn test_object_read_as_primitive() {
        let dir = TempDir::new("test_object_read_as_primitive").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        root.write_object("station", Some(&Station::sample("east", 2)), 0).unwrap();
        assert!(root.read_array::<f64>("station").is_err());

        root.write_scalar("count", 1_i32, 1).unwrap();
        let mut station = Station::default();
        assert!(root.read_object("count", &mut station).is_err());
    }

    #[test]
    fn test_heterogeneous_object_array() {
        let dir = TempDir::new("test_heterogeneous_object_array").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let instruments = arr1(&[
            camera("wide", 0.5),
            Instrument::Thermometer { celsius: -12.5 },
            camera("narrow", 2.0),
        ]);
        root.write_object_array("instruments", &instruments, 0).unwrap();

        let node = NodeHandle::open(&root, "instruments").unwrap();
        let element = NodeHandle::open(&node, "instruments-1").unwrap();
        assert_eq!(Some("thermometer".to_string()), element.read_string_attr(PARAMETER_CLASS_NAME).unwrap());
        let element = NodeHandle::open(&node, "instruments-2").unwrap();
        assert_eq!(Some("camera".to_string()), element.read_string_attr(PARAMETER_CLASS_NAME).unwrap());

        let copy = root.read_object_array::<Instrument>("instruments").unwrap();
        assert_eq!(instruments.into_dyn(), copy);
    }

    #[test]
    fn test_heterogeneous_single_object() {
        let dir = TempDir::new("test_heterogeneous_single_object").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        root.write_object("instrument", Some(&camera("zenith", 30.0)), 0).unwrap();
        root.write_object_array("only", &arr1(&[camera("solo", 1.5)]), 1).unwrap();

        let mut copy = Instrument::default();
        assert!(root.read_object("instrument", &mut copy).unwrap());
        assert_eq!(camera("zenith", 30.0), copy);

        let only = root.read_object_array::<Instrument>("only").unwrap();
        assert_eq!(vec![camera("solo", 1.5)], only.into_raw_vec());
    }

    #[test]
    fn test_unknown_type_name() {
        let dir = TempDir::new("test_unknown_type_name").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        root.write_object("instrument", Some(&camera("zenith", 30.0)), 0).unwrap();
        let mut reading = Reading::default();
        let err = root.read_object("instrument", &mut reading).unwrap_err();
        assert!(matches!(err.downcast_ref::<InterfaceError>(),
                         Some(InterfaceError::UnknownTypeName { type_name, .. }) if type_name == "camera"));
    }

    #[test]
    fn test_parallel_array() {
        let dir = TempDir::new("test_parallel_array").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let grid = Array2::from_shape_fn((3, 4), |(i, j)| {
            Reading::new((i * 4 + j) as i32, i as f64 - j as f64 * 0.25, (i + j) % 2 == 0)
        });
        root.write_parallel_array("grid", &grid, 0).unwrap();

        let node = NodeHandle::open(&root, "grid").unwrap();
        assert!(node.has_attr(PARALLEL_ARRAY).unwrap());
        assert!(!node.has_attr(STRUCT_OBJECT_ARRAY).unwrap());
        assert_eq!(vec![3, 4], node.object_array_dims().unwrap());
        assert_eq!(vec!["id", "value", "valid"], node.child_names().unwrap());
        assert_eq!(grid.map(|reading| reading.id).into_dyn(), node.read_array::<i32>("id").unwrap());
        assert_eq!(Some(DataKind::Boolean), NodeHandle::open(&node, "valid").unwrap().kind());

        let copy = root.read_parallel_array::<Reading>("grid").unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap();
        assert_eq!(grid, copy);
    }

    #[test]
    fn test_parallel_array_edges() {
        let dir = TempDir::new("test_parallel_array_edges").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        root.write_parallel_array("none", &Array1::<Reading>::from(vec![]), 0).unwrap();
        assert!(NodeHandle::open(&root, "none").unwrap().has_attr(EMPTY_FIELD).unwrap());
        assert_eq!(&[0], root.read_parallel_array::<Reading>("none").unwrap().shape());

        let empty = Array2::<Reading>::default((2, 0));
        root.write_parallel_array("empty", &empty, 1).unwrap();
        let copy = root.read_parallel_array::<Reading>("empty").unwrap()
            .into_dimensionality::<Ix2>()
            .unwrap();
        assert_eq!(empty, copy);

        {
            let mut partial = NodeHandle::create(&root, "partial", 2).unwrap();
            partial.set_kind(DataKind::Object).unwrap();
            partial.add_marker(PARALLEL_ARRAY).unwrap();
            partial.add_i64_seq_attr(STRUCT_OBJECT_ARRAY_DIMS, &[2]).unwrap();
            partial.write_array("id", &arr1(&[5_i32, 6]), 0).unwrap();
        }
        let partial = root.read_parallel_array::<Reading>("partial").unwrap();
        assert_eq!(vec![Reading::new(5, 0.0, false), Reading::new(6, 0.0, false)], partial.into_raw_vec());
    }

    #[test]
    fn test_parallel_array_errors() {
        let dir = TempDir::new("test_parallel_array_errors").unwrap();
        let file = scratch_file(&dir, "objects.h5");
        let root = root(&file);

        let readings = arr1(&[Reading::new(1, 1.0, true), Reading::new(2, 2.0, false)]);
        root.write_object_array("elements", &readings, 0).unwrap();
        let err = root.read_parallel_array::<Reading>("elements").unwrap_err();
        assert!(matches!(err.downcast_ref::<InterfaceError>(),
                         Some(InterfaceError::MissingMarker { marker: PARALLEL_ARRAY, .. })));

        {
            let mut short = NodeHandle::create(&root, "short", 1).unwrap();
            short.set_kind(DataKind::Object).unwrap();
            short.add_marker(PARALLEL_ARRAY).unwrap();
            short.add_i64_seq_attr(STRUCT_OBJECT_ARRAY_DIMS, &[3]).unwrap();
            short.write_array("value", &arr1(&[0.5_f64, 1.5]), 0).unwrap();
        }
        let err = root.read_parallel_array::<Reading>("short").unwrap_err();
        assert!(matches!(err.downcast_ref::<InterfaceError>(),
                         Some(InterfaceError::ColumnShapeMismatch { expected, found, .. })
                             if expected == &vec![3] && found == &vec![2]));

        root.write_scalar("count", 3_i32, 2).unwrap();
        assert!(root.read_parallel_array::<Reading>("count").is_err());
    }
}
