use std::cmp::min;
use hdf5::{Hyperslab, Selection, SliceOrIndex};
use crate::config::IoConfig;
use crate::types::DataKind;

/// Computes the chunk shape for an array of shape `dims` whose elements are `elem_bytes`
/// wide, such that no chunk exceeds `max_bytes`.
///
/// Dimensions are visited from the outermost inwards. At dimension `i` a "row" is the slab
/// spanned by every dimension after `i`; the chunk takes as many whole rows as fit in the
/// budget. When not even one row fits, the chunk size at `i` is 1 and the search moves one
/// dimension in. The first dimension that fits at least one row ends the search, leaving
/// the inner dimensions at full extent.
pub fn chunk_shape(dims: &[usize], elem_bytes: usize, max_bytes: usize) -> Vec<usize> {
    let mut chunk = dims.to_vec();
    for i in 0..dims.len() {
        let row_elements = dims[i + 1..].iter().fold(1_usize, |acc, &d| acc.saturating_mul(d));
        let row_bytes = row_elements.saturating_mul(elem_bytes).max(1);
        let rows = min(max_bytes / row_bytes, dims[i]);
        if rows == 0 {
            chunk[i] = 1;
        } else {
            chunk[i] = rows;
            break;
        }
    }
    chunk
}

/// Storage layout chosen for a new primitive dataset.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum DatasetLayout {
    /// Plain contiguous storage.
    Contiguous,

    /// Chunked storage with the deflate filter.
    Compressed { chunk: Vec<usize>, level: u8 },
}

impl DatasetLayout {
    /// Chooses the layout of an array of shape `dims`. Chunking and compression only pay
    /// off for arrays of at least `min_compression_elements` elements, and only when a
    /// compression level is configured at all.
    pub fn plan(dims: &[usize], kind: DataKind, config: &IoConfig) -> DatasetLayout {
        let elements: usize = dims.iter().product();
        if dims.is_empty()
            || elements == 0
            || elements < config.min_compression_elements
            || config.compression_level == 0 {
            return DatasetLayout::Contiguous;
        }
        DatasetLayout::Compressed {
            chunk: chunk_shape(dims, kind.byte_width(), config.max_bytes_per_hyperslab),
            level: config.compression_level,
        }
    }
}

/// Builds a selection that is `extent[i]` long from `offset[i]` in every dimension.
pub(crate) fn block_selection(offset: &[usize], extent: &[usize]) -> Selection {
    let slices = offset.iter()
        .zip(extent)
        .map(|(&start, &count)| SliceOrIndex::from(start..start + count))
        .collect::<Vec<_>>();
    Selection::Hyperslab(Hyperslab::from(slices))
}

/// One block of an array visited by [`HyperslabIterator`].
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Slab {
    pub offset: Vec<usize>,
    pub extent: Vec<usize>,
}

impl Slab {
    /// Number of elements in the slab.
    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    /// Position of the first element of the slab in the row-major flattening of `dims`.
    pub fn start(&self, dims: &[usize]) -> usize {
        self.offset.iter()
            .zip(dims)
            .fold(0_usize, |acc, (&index, &dim)| acc * dim + index)
    }

    pub(crate) fn selection(&self) -> Selection {
        block_selection(&self.offset, &self.extent)
    }
}

/// Walks an array in blocks no larger than the byte budget, in row-major order.
///
/// Every block is contiguous in the row-major flattening, so a flat buffer can be cut into
/// slabs with [`Slab::start`] and [`Slab::len`]. Arrays of rank zero or with a zero-length
/// dimension yield no slabs.
pub struct HyperslabIterator {
    dims: Vec<usize>,
    chunk: Vec<usize>,
    split: usize,
    next: Option<Vec<usize>>,
}

impl HyperslabIterator {
    pub fn new(dims: &[usize], elem_bytes: usize, max_bytes: usize) -> HyperslabIterator {
        let chunk = chunk_shape(dims, elem_bytes, max_bytes);

        // Dimensions after `split` are covered in full by every slab.
        let split = (0..dims.len())
            .rev()
            .find(|&i| chunk[i] != dims[i])
            .unwrap_or(0);

        let next = if dims.is_empty() || dims.contains(&0) {
            None
        } else {
            Some(vec![0; dims.len()])
        };

        HyperslabIterator { dims: dims.to_vec(), chunk, split, next }
    }

    /// Shape of a full block.
    pub fn chunk(&self) -> &[usize] {
        &self.chunk
    }
}

impl Iterator for HyperslabIterator {
    type Item = Slab;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.next.take()?;
        let k = self.split;

        let extent = (0..self.dims.len()).map(|i| {
            if i < k {
                1
            } else if i == k {
                min(self.chunk[k], self.dims[k] - offset[k])
            } else {
                self.dims[i]
            }
        }).collect::<Vec<_>>();

        let mut following = offset.clone();
        following[k] += self.chunk[k];
        let mut exhausted = false;
        if following[k] >= self.dims[k] {
            following[k] = 0;
            exhausted = true;
            for j in (0..k).rev() {
                following[j] += 1;
                if following[j] < self.dims[j] {
                    exhausted = false;
                    break;
                }
                following[j] = 0;
            }
        }
        if !exhausted {
            self.next = Some(following);
        }

        Some(Slab { offset, extent })
    }
}
