use std::fmt;
use std::fmt::Formatter;
use anyhow::{Context, Result};
use hdf5::types::VarLenUnicode;
use hdf5::{Dataset, File, Group, H5Type};
use log::{debug, trace};
use crate::config::IoConfig;
use crate::io::chunking::DatasetLayout;
use crate::io::error::InterfaceError;
use crate::io::interface::to_varlen;
use crate::types::attributes::{
    DATA_TYPE, EMPTY_FIELD, FIELD_ORDER, MARKERS, PARAMETER_CLASS_NAME, STRUCT_OBJECT_ARRAY,
    STRUCT_OBJECT_ARRAY_DIMS,
};
use crate::types::DataKind;

const ROOT: &str = "/";

/// A handle on one group of the file, plus the dataset it holds if it carries primitive
/// payload.
///
/// Dropping the handle releases the dataset first and then the group, whichever way the
/// enclosing scope is left.
pub struct NodeHandle {
    // Must stay declared before `group`: fields are dropped in declaration order.
    pub(super) dataset: Option<Dataset>,
    pub(super) group: Group,
    pub(super) name: String,
    pub(super) kind: Option<DataKind>,
    pub(super) config: IoConfig,
}

impl NodeHandle {
    /// Wraps the root group of `file`.
    pub fn root(file: &File, config: IoConfig) -> Result<NodeHandle> {
        config.validate()?;
        let group = file.group(ROOT)?;
        Ok(NodeHandle {
            dataset: None,
            group,
            name: ROOT.to_string(),
            kind: None,
            config,
        })
    }

    /// Opens the existing child `name` of `parent`.
    ///
    /// The dataset is opened as well unless the group is marked empty, is a composite
    /// array, or holds a single composite value; in those cases the handle has no
    /// dataset.
    pub fn open(parent: &NodeHandle, name: &str) -> Result<NodeHandle> {
        if !parent.has_child(name) {
            return Err(InterfaceError::NodeNotFound {
                parent: parent.name.clone(),
                name: name.to_string(),
            }.into());
        }
        let group = parent.group.group(name)
            .with_context(|| format!("unable to open group '{}' under '{}'", name, parent.name))?;

        let mut node = NodeHandle {
            dataset: None,
            group,
            name: name.to_string(),
            kind: None,
            config: parent.config,
        };
        node.kind = node.read_kind()?;

        let has_payload = !node.has_attr(EMPTY_FIELD)?
            && !node.has_attr(STRUCT_OBJECT_ARRAY)?
            && node.kind != Some(DataKind::Object);
        if has_payload && node.has_child(name) {
            let dataset = node.group.dataset(name)
                .with_context(|| format!("unable to open dataset of node '{}'", name))?;
            node.dataset = Some(dataset);
        }
        Ok(node)
    }

    /// Creates the child `name` of `parent` and records its position among its siblings.
    /// No dataset is allocated yet; the typed write does that once the shape is known.
    pub fn create(parent: &NodeHandle, name: &str, field_order: i32) -> Result<NodeHandle> {
        let group = parent.group.create_group(name)
            .with_context(|| format!("unable to create group '{}' under '{}'", name, parent.name))?;
        let node = NodeHandle {
            dataset: None,
            group,
            name: name.to_string(),
            kind: None,
            config: parent.config,
        };
        node.add_i32_attr(FIELD_ORDER, field_order)?;
        debug!("Created node '{}' under '{}'", name, parent.name);
        Ok(node)
    }

    /// Releases the handle.
    pub fn close(self) {
        drop(self)
    }

    pub fn name(&self) -> &str { &self.name }

    pub fn group(&self) -> &Group { &self.group }

    pub fn dataset(&self) -> Option<&Dataset> { self.dataset.as_ref() }

    pub fn kind(&self) -> Option<DataKind> { self.kind }

    pub fn config(&self) -> &IoConfig { &self.config }

    /// Shape of the dataset, if the node has one.
    pub fn shape(&self) -> Option<Vec<usize>> {
        self.dataset.as_ref().map(|dataset| dataset.shape())
    }

    /// Returns true if the node carries an attribute called `name`.
    pub fn has_attr(&self, name: &str) -> Result<bool> {
        attr_exists(&self.group, name)
    }

    /// Returns true if the group has a member (group or dataset) called `name`.
    pub fn has_child(&self, name: &str) -> bool {
        self.group.link_exists(name)
    }

    /// Declared position of this node among its siblings, if recorded.
    pub fn field_order(&self) -> Result<Option<i32>> {
        read_i32_attr(&self.group, FIELD_ORDER)
    }

    /// Names of the child groups, sorted by their `FIELD_ORDER` attribute. Children
    /// without one follow in alphabetical order.
    pub fn child_names(&self) -> Result<Vec<String>> {
        let mut children = self.group.groups()?.iter().map(|group| {
            let order = read_i32_attr(group, FIELD_ORDER)?;
            anyhow::Ok((order, local_name(group)))
        }).collect::<Result<Vec<_>>>()?;
        children.sort_by_key(|(order, name)| (order.is_none(), *order, name.clone()));
        Ok(children.into_iter().map(|(_, name)| name).collect())
    }

    /// Summarizes the metadata of this node.
    pub fn describe(&self) -> Result<NodeSummary> {
        let markers = MARKERS.iter()
            .map(|&marker| Ok((marker, self.has_attr(marker)?)))
            .collect::<Result<Vec<_>>>()?
            .into_iter()
            .filter_map(|(marker, present)| present.then_some(marker))
            .collect::<Vec<_>>();

        let object_dims = if self.has_attr(STRUCT_OBJECT_ARRAY_DIMS)? {
            Some(self.object_array_dims()?)
        } else {
            None
        };

        Ok(NodeSummary {
            name: self.name.clone(),
            type_name: self.read_string_attr(PARAMETER_CLASS_NAME)?,
            field_order: self.field_order()?,
            kind: self.kind,
            shape: self.shape(),
            object_dims,
            markers,
        })
    }

    pub(crate) fn add_marker(&self, name: &str) -> Result<()> {
        self.group.new_attr::<i8>().shape(()).create(name)
            .with_context(|| format!("unable to add {} to node '{}'", name, self.name))?;
        Ok(())
    }

    pub(crate) fn add_i32_attr(&self, name: &str, value: i32) -> Result<()> {
        let attr = self.group.new_attr::<i32>().shape(()).create(name)?;
        attr.write_scalar(&value)?;
        Ok(())
    }

    pub(crate) fn add_i64_seq_attr(&self, name: &str, values: &[i64]) -> Result<()> {
        let attr = self.group.new_attr::<i64>().shape(values.len()).create(name)?;
        attr.write_raw(values)?;
        Ok(())
    }

    pub(crate) fn add_string_attr(&self, name: &str, value: &str) -> Result<()> {
        let value = to_varlen(value)?;
        let attr = self.group.new_attr::<VarLenUnicode>().shape(()).create(name)?;
        attr.write_scalar(&value)?;
        Ok(())
    }

    pub(crate) fn read_string_attr(&self, name: &str) -> Result<Option<String>> {
        if !self.has_attr(name)? {
            return Ok(None);
        }
        let value = self.group.attr(name)?.read_scalar::<VarLenUnicode>()?;
        Ok(Some(value.as_str().to_string()))
    }

    pub(crate) fn mark_empty(&self) -> Result<()> {
        debug!("Marking node '{}' empty", self.name);
        self.add_marker(EMPTY_FIELD)
    }

    /// Records the payload kind in the `DATA_TYPE` attribute.
    pub(crate) fn set_kind(&mut self, kind: DataKind) -> Result<()> {
        self.add_i32_attr(DATA_TYPE, kind.type_tag())?;
        self.kind = Some(kind);
        Ok(())
    }

    /// Creates the dataset of this node with elements of type `T` and shape `dims`, using
    /// the chunked and compressed layout when the array is large enough.
    pub(crate) fn allocate_dataset<T: H5Type>(&mut self, kind: DataKind, dims: &[usize]) -> Result<()> {
        let name = self.name.as_str();
        let dataset = match DatasetLayout::plan(dims, kind, &self.config) {
            DatasetLayout::Contiguous if dims.is_empty() => {
                self.group.new_dataset::<T>().shape(()).create(name)?
            }
            DatasetLayout::Contiguous => {
                self.group.new_dataset::<T>().shape(dims).create(name)?
            }
            DatasetLayout::Compressed { chunk, level } => {
                debug!("Node '{}' uses chunk {:?} with deflate level {}", name, chunk, level);
                self.group.new_dataset::<T>()
                    .shape(dims)
                    .chunk(chunk)
                    .deflate(level)
                    .create(name)?
            }
        };
        self.dataset = Some(dataset);
        Ok(())
    }

    /// Returns the dataset or a `NoDataset` error.
    pub(crate) fn require_dataset(&self) -> Result<&Dataset> {
        self.dataset.as_ref()
            .ok_or_else(|| InterfaceError::NoDataset { node: self.name.clone() }.into())
    }

    fn read_kind(&self) -> Result<Option<DataKind>> {
        match read_i32_attr(&self.group, DATA_TYPE)? {
            None => Ok(None),
            Some(tag) => match DataKind::from_type_tag(tag) {
                Some(kind) => Ok(Some(kind)),
                None => Err(InterfaceError::UnknownTypeTag { node: self.name.clone(), tag }.into()),
            },
        }
    }
}

impl Drop for NodeHandle {
    fn drop(&mut self) {
        drop(self.dataset.take());
        trace!("Released node '{}'", self.name);
    }
}

/// True when `dims` describes more than a single value: any rank above one, or a
/// rank-one array longer than one.
pub(crate) fn is_array_shape(dims: &[usize]) -> bool {
    dims.len() > 1 || dims.first().map_or(false, |&dim| dim > 1)
}

/// True for the shapes stored as an `EMPTY_FIELD` marker alone. Empty arrays of any
/// other rank keep their shape in the file.
pub(crate) fn is_empty_vector(dims: &[usize]) -> bool {
    dims == [0]
}

fn attr_exists(group: &Group, name: &str) -> Result<bool> {
    Ok(group.attr_names()?.iter().any(|attr| attr == name))
}

fn read_i32_attr(group: &Group, name: &str) -> Result<Option<i32>> {
    if !attr_exists(group, name)? {
        return Ok(None);
    }
    Ok(Some(group.attr(name)?.read_scalar::<i32>()?))
}

fn local_name(group: &Group) -> String {
    let name = group.name();
    name.rsplit('/').next().unwrap_or_default().to_string()
}

/// Metadata of one node, as reported by [`NodeHandle::describe`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NodeSummary {
    pub name: String,
    pub type_name: Option<String>,
    pub field_order: Option<i32>,
    pub kind: Option<DataKind>,
    pub shape: Option<Vec<usize>>,
    pub object_dims: Option<Vec<usize>>,
    pub markers: Vec<&'static str>,
}

impl fmt::Display for NodeSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(order) = self.field_order {
            write!(f, " #{}", order)?;
        }
        if let Some(kind) = self.kind {
            write!(f, " ({})", kind)?;
        }
        if let Some(type_name) = self.type_name.as_ref() {
            write!(f, " <{}>", type_name)?;
        }
        if let Some(shape) = self.shape.as_ref() {
            write!(f, " shape {:?}", shape)?;
        }
        if let Some(dims) = self.object_dims.as_ref() {
            write!(f, " objects {:?}", dims)?;
        }
        if !self.markers.is_empty() {
            write!(f, " [{}]", self.markers.join(", "))?;
        }
        Ok(())
    }
}
