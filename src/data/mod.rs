use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Instant;
use anyhow::Result;
use log::info;
use crate::config::IoConfig;
use crate::io::{Hdf5File, Hdf5Serialization};

const INPUTS: &str = "inputs";
const OUTPUTS: &str = "outputs";
const EXTENSION: &str = "h5";

/// Moves the inputs and outputs of one algorithm run between memory and the pair of
/// HDF5 files `<name>-inputs-<id>.h5` and `<name>-outputs-<id>.h5` in a working
/// directory.
///
/// ```no_run
/// # use hdf5_persist::{Hdf5Serialization, ModuleIo, NodeHandle};
/// # #[derive(Default)]
/// # struct Inputs;
/// # impl Hdf5Serialization for Inputs {
/// #     fn add_to(&self, _: &NodeHandle) -> anyhow::Result<()> { Ok(()) }
/// #     fn read_from(&mut self, _: &NodeHandle) -> anyhow::Result<()> { Ok(()) }
/// # }
/// let io = ModuleIo::new("/tmp/task-17", 3, "/opt/pipeline/bin/photometry");
/// let mut inputs = Inputs::default();
/// io.load_inputs(&mut inputs).expect("unable to read inputs");
/// ```
#[derive(Debug, Clone)]
pub struct ModuleIo {
    inputs_path: PathBuf,
    outputs_path: PathBuf,
    config: IoConfig,
}

impl ModuleIo {
    /// Derives the file names from `binary_name`, ignoring any directory part of it.
    pub fn new<P: AsRef<Path>>(dir: P, run_id: impl Display, binary_name: &str) -> ModuleIo {
        let name = Path::new(binary_name)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| binary_name.to_string());
        let file_name = |role: &str| format!("{}-{}-{}.{}", name, role, run_id, EXTENSION);

        ModuleIo {
            inputs_path: dir.as_ref().join(file_name(INPUTS)),
            outputs_path: dir.as_ref().join(file_name(OUTPUTS)),
            config: IoConfig::default(),
        }
    }

    /// Replaces the settings used when reading or writing either file.
    pub fn with_config(mut self, config: IoConfig) -> Result<ModuleIo> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn inputs_path(&self) -> &Path { &self.inputs_path }

    pub fn outputs_path(&self) -> &Path { &self.outputs_path }

    pub fn config(&self) -> &IoConfig { &self.config }

    /// Populates `inputs` from the inputs file.
    pub fn load_inputs<T: Hdf5Serialization>(&self, inputs: &mut T) -> Result<()> {
        timed("Reading inputs", &self.inputs_path, || inputs.read_file(&self.inputs_path, self.config))
    }

    /// Writes `outputs` to the outputs file, replacing any earlier one.
    pub fn save_outputs<T: Hdf5Serialization>(&self, outputs: &T) -> Result<()> {
        timed("Writing outputs", &self.outputs_path, || outputs.write_file(&self.outputs_path, self.config))
    }

    /// Writes `inputs` to the inputs file, as the pipeline does before a run.
    pub fn save_inputs<T: Hdf5Serialization>(&self, inputs: &T) -> Result<()> {
        timed("Writing inputs", &self.inputs_path, || inputs.write_file(&self.inputs_path, self.config))
    }

    /// Populates `outputs` from the outputs file, as the pipeline does after a run.
    pub fn load_outputs<T: Hdf5Serialization>(&self, outputs: &mut T) -> Result<()> {
        timed("Reading outputs", &self.outputs_path, || outputs.read_file(&self.outputs_path, self.config))
    }

    pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().is_file()
    }
}

fn timed<F: FnOnce() -> Result<()>>(action: &str, path: &Path, f: F) -> Result<()> {
    let start = Instant::now();
    info!("{} from {}", action, path.display());
    f()?;
    info!("{} took {:?}", action, start.elapsed());
    Ok(())
}
