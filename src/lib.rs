//! A self-describing persistence layer on top of HDF5. Typed values (scalars, strings,
//! booleans, n-dimensional numeric arrays, nested records and arrays of records) are
//! stored as groups annotated with a handful of attributes, so that a file can be read
//! back without any external schema.
//!
//! ## Persisting a record
//!
//! ```no_run
//! use std::path::Path;
//! use hdf5_persist::{Hdf5File, Hdf5Serialization, IoConfig, NodeHandle};
//! use ndarray::{Array2, ArrayD};
//!
//! #[derive(Default)]
//! struct Exposure {
//!     cadence: i32,
//!     flux: ArrayD<f32>,
//!     target: String,
//! }
//!
//! impl Hdf5Serialization for Exposure {
//!     fn add_to(&self, node: &NodeHandle) -> anyhow::Result<()> {
//!         node.write_scalar("cadence", self.cadence, 0)?;
//!         node.write_array("flux", &self.flux, 1)?;
//!         node.write_string("target", &self.target, 2)
//!     }
//!
//!     fn read_from(&mut self, node: &NodeHandle) -> anyhow::Result<()> {
//!         self.cadence = node.read_scalar("cadence")?;
//!         self.flux = node.read_array("flux")?;
//!         self.target = node.read_string("target")?;
//!         Ok(())
//!     }
//! }
//!
//! let exposure = Exposure {
//!     cadence: 1200,
//!     flux: Array2::<f32>::ones((64, 64)).into_dyn(),
//!     target: "KIC 8462852".to_string(),
//! };
//! exposure.write_file(Path::new("exposure.h5"), IoConfig::default().with_compression_level(4))
//!     .expect("failed to write exposure");
//!
//! let mut copy = Exposure::default();
//! copy.read_file(Path::new("exposure.h5"), IoConfig::default()).expect("failed to read exposure");
//! ```
//!
//! ## Arrays of records
//!
//! [`NodeHandle::write_object_array`] gives every element its own group. Element types
//! with several variants return a name from [`Hdf5Serialization::type_name`], so that each
//! element is rebuilt as the right variant on read. Records made only of primitive
//! scalars can implement [`ParallelRecord`] instead and go through
//! [`NodeHandle::write_parallel_array`], which stores one array per field.
//!
//! ## Inputs and outputs of an algorithm run
//!
//! [`ModuleIo`] names the inputs and outputs files of a run and moves whole records
//! between them and memory.

pub mod config;
pub mod data;
pub mod io;
pub mod logger;
pub mod types;

pub use crate::config::IoConfig;
pub use crate::data::ModuleIo;
pub use crate::io::error::InterfaceError;
pub use crate::io::node::{NodeHandle, NodeSummary};
pub use crate::io::rows::RowLedger;
pub use crate::io::{Hdf5File, Hdf5Serialization, ParallelRecord};
pub use crate::types::{DataKind, Primitive};
