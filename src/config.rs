use anyhow::Result;
use crate::io::error::InterfaceError;

const DEFAULT_COMPRESSION_LEVEL: u8 = 0;
const DEFAULT_MIN_COMPRESSION_ELEMENTS: usize = 200;

// Keeps every hyperslab below the 2^31 - 8 byte limit of a single HDF5 transfer.
const DEFAULT_MAX_BYTES_PER_HYPERSLAB: usize = 2_000_000_000;

/// Settings that control how arrays are laid out when written.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub struct IoConfig {
    /// Deflate level applied to large arrays; zero disables compression.
    pub compression_level: u8,

    /// Arrays with fewer elements than this are never chunked or compressed.
    pub min_compression_elements: usize,

    /// Upper bound on the bytes in one chunk and in one read or write call.
    pub max_bytes_per_hyperslab: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        IoConfig {
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            min_compression_elements: DEFAULT_MIN_COMPRESSION_ELEMENTS,
            max_bytes_per_hyperslab: DEFAULT_MAX_BYTES_PER_HYPERSLAB,
        }
    }
}

impl IoConfig {
    pub fn with_compression_level(mut self, level: u8) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_min_compression_elements(mut self, elements: usize) -> Self {
        self.min_compression_elements = elements;
        self
    }

    pub fn with_max_bytes_per_hyperslab(mut self, bytes: usize) -> Self {
        self.max_bytes_per_hyperslab = bytes;
        self
    }

    /// Checks that the deflate level is one HDF5 accepts and that the hyperslab budget
    /// is non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.compression_level > 9 {
            return Err(InterfaceError::InvalidCompressionLevel(self.compression_level).into());
        }
        if self.max_bytes_per_hyperslab == 0 {
            return Err(InterfaceError::InvalidHyperslabBudget.into());
        }
        Ok(())
    }
}
