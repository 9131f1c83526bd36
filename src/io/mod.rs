use std::path::Path;
use anyhow::{Context, Result};
use hdf5::file::LibraryVersion;
use hdf5::File;
use ndarray::{ArrayBase, ArrayD, Data, Dimension};
use crate::config::IoConfig;
use crate::io::node::NodeHandle;

pub mod chunking;
pub mod error;
pub mod interface;
pub mod node;
pub mod objects;
pub mod rows;

/// A composite value that knows how to store its fields under a node and how to read
/// them back.
///
/// Implementations call the field operations of [`NodeHandle`] (`write_scalar`,
/// `read_string_array`, `write_object_array`, ...) once per field, with a distinct
/// `field_order` for each field.
pub trait Hdf5Serialization {
    /// Persists the fields of `self` under `node`.
    fn add_to(&self, node: &NodeHandle) -> Result<()>;

    /// Populates the fields of `self` from `node`.
    fn read_from(&mut self, node: &NodeHandle) -> Result<()>;

    /// Name of the concrete variant of `self`, recorded in `PARAMETER_CLASS_NAME` so that
    /// arrays can mix variants. Types with a single variant keep the default.
    fn type_name(&self) -> Option<&str> {
        None
    }

    /// Builds an unpopulated value of the variant recorded as `type_name`.
    fn from_type_name(_type_name: &str) -> Option<Self>
    where
        Self: Sized,
    {
        None
    }
}

/// A record whose fields are all primitive scalars.
///
/// An array of such records can be stored transposed: one primitive array per field,
/// each shaped like the record array, under a node marked `PARALLEL_ARRAY`. Implementations
/// use [`NodeHandle::write_column`] and [`NodeHandle::read_column`] once per field.
pub trait ParallelRecord: Default {
    /// Writes one column per field of `records` under `node`.
    fn write_columns<S, D>(records: &ArrayBase<S, D>, node: &NodeHandle) -> Result<()>
    where
        S: Data<Elem = Self>,
        D: Dimension;

    /// Fills `records`, already shaped like the stored array, from the columns under `node`.
    fn read_columns(records: &mut ArrayD<Self>, node: &NodeHandle) -> Result<()>;
}

pub trait Hdf5File {
    /// Stores `self` as an HDF5 file at `path`, replacing any existing file. The file is
    /// restricted to the HDF5 1.8 format so that older readers can open it.
    fn write_file(&self, path: &Path, config: IoConfig) -> Result<()>;

    /// Populates `self` from the HDF5 file at `path`, opened for reading and writing.
    /// Large arrays are read in hyperslabs bounded by `config`.
    fn read_file(&mut self, path: &Path, config: IoConfig) -> Result<()>;
}

impl<T: Hdf5Serialization> Hdf5File for T {
    fn write_file(&self, path: &Path, config: IoConfig) -> Result<()> {
        let file = File::with_options()
            .with_fapl(|fapl| fapl.libver_bounds(LibraryVersion::V18, LibraryVersion::V18))
            .create(path)
            .with_context(|| format!("unable to create HDF5 file {}", path.display()))?;
        {
            let root = NodeHandle::root(&file, config)?;
            self.add_to(&root)?;
        }
        file.close()?;
        Ok(())
    }

    fn read_file(&mut self, path: &Path, config: IoConfig) -> Result<()> {
        let file = File::open_rw(path)
            .with_context(|| format!("unable to open HDF5 file {}", path.display()))?;
        {
            let root = NodeHandle::root(&file, config)?;
            self.read_from(&root)?;
        }
        file.close()?;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use tempdir::TempDir;
    use crate::config::IoConfig;
    use crate::io::error::InterfaceError;
    use crate::io::test_support::Station;
    use crate::io::Hdf5File;

    #[test]
    fn test_write_and_read_file() {
        let dir = TempDir::new("test_write_and_read_file").unwrap();
        let path = dir.path().join("station.h5");

        let station = Station::sample("west", 4);
        station.write_file(&path, IoConfig::default()).unwrap();

        let mut copy = Station::default();
        copy.read_file(&path, IoConfig::default()).unwrap();
        assert_eq!(station, copy);
    }

    #[test]
    fn test_write_file_truncates() {
        let dir = TempDir::new("test_write_file_truncates").unwrap();
        let path = dir.path().join("station.h5");

        Station::sample("first", 2).write_file(&path, IoConfig::default()).unwrap();
        let second = Station::sample("second", 5);
        second.write_file(&path, IoConfig::default()).unwrap();

        let mut copy = Station::default();
        copy.read_file(&path, IoConfig::default()).unwrap();
        assert_eq!(second, copy);
    }

    #[test]
    fn test_read_missing_file() {
        let dir = TempDir::new("test_read_missing_file").unwrap();
        let mut station = Station::default();
        assert!(station.read_file(&dir.path().join("absent.h5"), IoConfig::default()).is_err());
    }

    #[test]
    fn test_read_file_uses_config() {
        let dir = TempDir::new("test_read_file_uses_config").unwrap();
        let path = dir.path().join("station.h5");
        let station = Station::sample("south", 6);
        station.write_file(&path, IoConfig::default()).unwrap();

        let mut copy = Station::default();
        copy.read_file(&path, IoConfig::default().with_max_bytes_per_hyperslab(8)).unwrap();
        assert_eq!(station, copy);

        let err = copy.read_file(&path, IoConfig::default().with_max_bytes_per_hyperslab(0)).unwrap_err();
        assert!(matches!(err.downcast_ref::<InterfaceError>(),
                         Some(InterfaceError::InvalidHyperslabBudget)));
    }

    #[test]
    fn test_invalid_config() {
        let dir = TempDir::new("test_invalid_config").unwrap();
        let path = dir.path().join("station.h5");
        let config = IoConfig::default().with_compression_level(12);
        assert!(Station::sample("north", 1).write_file(&path, config).is_err());
    }
}
