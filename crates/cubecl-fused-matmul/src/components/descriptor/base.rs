use alloc::{vec, vec::Vec};
use core::fmt::Display;

use thiserror::Error;

/// One dimension of the memory a descriptor addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryDim {
    /// Extent including padding.
    pub length: usize,
    /// Extent holding real data. Coordinates at or past it are padding.
    pub valid: usize,
    /// Distance in elements between two consecutive coordinates.
    pub stride: usize,
}

/// One logical dimension of a descriptor.
///
/// Walks a single memory dimension, `step` memory coordinates at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorDim {
    pub name: &'static str,
    pub length: usize,
    pub memory_dim: usize,
    pub step: usize,
}

/// Errors raised by descriptor transforms.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("Dimension {dim} is out of range for a rank {rank} descriptor")]
    DimOutOfRange { dim: usize, rank: usize },

    #[error("Can't split {name}={length} into parts of total length {product}")]
    NotDivisible {
        name: &'static str,
        length: usize,
        product: usize,
    },

    #[error("{order:?} is not a permutation of the {rank} descriptor dimensions")]
    InvalidOrder { order: Vec<usize>, rank: usize },
}

/// Immutable mapping from a logical multi-index to a linear memory offset.
///
/// A descriptor is made of memory dimensions, each with a stride and a padded and valid
/// extent, and logical dimensions that split or reorder them. Problem level descriptors map
/// one logical dimension to each memory dimension; finer levels are derived with
/// [TensorDescriptor::unmerge] and [TensorDescriptor::reorder] and keep the same memory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TensorDescriptor {
    memory: Vec<MemoryDim>,
    dims: Vec<DescriptorDim>,
}

impl TensorDescriptor {
    /// Descriptor over strided memory without padding.
    pub fn naive<const R: usize>(
        names: [&'static str; R],
        lengths: [usize; R],
        strides: [usize; R],
    ) -> Self {
        Self::naive_padded(names, lengths, lengths, strides)
    }

    /// Descriptor over strided memory where each dimension is extended to `padded` elements.
    ///
    /// Padded extents smaller than the valid ones are raised to the valid extent.
    pub fn naive_padded<const R: usize>(
        names: [&'static str; R],
        valid: [usize; R],
        padded: [usize; R],
        strides: [usize; R],
    ) -> Self {
        let mut memory = Vec::with_capacity(R);
        let mut dims = Vec::with_capacity(R);

        for i in 0..R {
            let length = usize::max(padded[i], valid[i]);
            memory.push(MemoryDim {
                length,
                valid: valid[i],
                stride: strides[i],
            });
            dims.push(DescriptorDim {
                name: names[i],
                length,
                memory_dim: i,
                step: 1,
            });
        }

        Self { memory, dims }
    }

    /// Pads logical dimension `dim` and the memory dimension it walks up to a multiple of
    /// `multiple`. The added coordinates are padding.
    ///
    /// Meant for problem level descriptors, where each logical dimension spans a whole memory
    /// dimension one coordinate at a time. Other dimensions are left as they are.
    pub fn right_pad(mut self, dim: usize, multiple: usize) -> Self {
        let target = self.dims[dim];
        let length = self.memory[target.memory_dim].length;

        if multiple == 0 || target.step != 1 || target.length != length {
            return self;
        }

        let padded = length.div_ceil(multiple) * multiple;
        self.memory[target.memory_dim].length = padded;
        self.dims[dim].length = padded;
        self
    }

    /// Splits dimension `dim` into several, the first part being the outermost.
    pub fn unmerge(
        mut self,
        dim: usize,
        parts: &[(&'static str, usize)],
    ) -> Result<Self, DescriptorError> {
        let source = *self.dims.get(dim).ok_or(DescriptorError::DimOutOfRange {
            dim,
            rank: self.rank(),
        })?;
        let product = parts.iter().map(|(_, length)| *length).product::<usize>();

        if product != source.length || parts.is_empty() {
            return Err(DescriptorError::NotDivisible {
                name: source.name,
                length: source.length,
                product,
            });
        }

        let mut inner = 1;
        let mut split = vec![source; parts.len()];
        for (i, (name, length)) in parts.iter().enumerate().rev() {
            split[i] = DescriptorDim {
                name: *name,
                length: *length,
                memory_dim: source.memory_dim,
                step: source.step * inner,
            };
            inner *= length;
        }

        self.dims.splice(dim..dim + 1, split);
        Ok(self)
    }

    /// Permutes the logical dimensions, `order[i]` being the dimension placed at position `i`.
    pub fn reorder(self, order: &[usize]) -> Result<Self, DescriptorError> {
        let rank = self.rank();
        let mut seen = vec![false; rank];
        let is_permutation = order.len() == rank
            && order.iter().all(|&dim| {
                let fresh = dim < rank && !seen[dim];
                if fresh {
                    seen[dim] = true;
                }
                fresh
            });

        if !is_permutation {
            return Err(DescriptorError::InvalidOrder {
                order: order.to_vec(),
                rank,
            });
        }

        let dims = order.iter().map(|&dim| self.dims[dim]).collect();

        Ok(Self {
            memory: self.memory,
            dims,
        })
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn length(&self, dim: usize) -> usize {
        self.dims[dim].length
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.dims.iter().map(|dim| dim.length).collect()
    }

    /// Extent of real data along a logical dimension that spans a whole memory dimension.
    pub fn valid_length(&self, dim: usize) -> usize {
        let dim = &self.dims[dim];
        let memory = &self.memory[dim.memory_dim];
        memory.valid.div_ceil(dim.step).min(dim.length)
    }

    pub fn dims(&self) -> &[DescriptorDim] {
        &self.dims
    }

    pub fn memory_dims(&self) -> &[MemoryDim] {
        &self.memory
    }

    /// Memory coordinates of a logical index, `None` when out of bounds.
    pub fn memory_coordinates(&self, index: &[usize]) -> Option<Vec<usize>> {
        if index.len() != self.rank() {
            return None;
        }

        let mut coordinates = vec![0; self.memory.len()];
        for (dim, &i) in self.dims.iter().zip(index) {
            if i >= dim.length {
                return None;
            }
            coordinates[dim.memory_dim] += i * dim.step;
        }

        Some(coordinates)
    }

    /// Whether an in-bounds logical index lands in padding.
    pub fn is_padding(&self, index: &[usize]) -> bool {
        match self.memory_coordinates(index) {
            Some(coordinates) => coordinates
                .iter()
                .zip(&self.memory)
                .any(|(c, memory)| *c >= memory.valid),
            None => false,
        }
    }

    /// Linear offset of a logical index.
    ///
    /// Returns `None` for out of bounds indices and for padding, which must never be read nor
    /// written.
    pub fn to_linear(&self, index: &[usize]) -> Option<usize> {
        let coordinates = self.memory_coordinates(index)?;

        coordinates
            .iter()
            .zip(&self.memory)
            .try_fold(0usize, |offset, (c, memory)| {
                match *c < memory.valid {
                    true => offset.checked_add(c.checked_mul(memory.stride)?),
                    false => None,
                }
            })
    }

    /// Logical index addressing a linear offset, the inverse of [TensorDescriptor::to_linear].
    ///
    /// Returns `None` when no valid element lives at that offset.
    pub fn from_linear(&self, offset: usize) -> Option<Vec<usize>> {
        let mut order: Vec<usize> = (0..self.memory.len()).collect();
        order.sort_by(|a, b| self.memory[*b].stride.cmp(&self.memory[*a].stride));

        let mut remainder = offset;
        let mut coordinates = vec![0; self.memory.len()];
        for m in order {
            let memory = &self.memory[m];
            if memory.stride == 0 {
                continue;
            }
            let c = remainder / memory.stride;
            if c >= memory.valid {
                return None;
            }
            coordinates[m] = c;
            remainder -= c * memory.stride;
        }

        if remainder != 0 {
            return None;
        }

        let mut by_step: Vec<usize> = (0..self.rank()).collect();
        by_step.sort_by(|a, b| self.dims[*b].step.cmp(&self.dims[*a].step));

        let mut index = vec![0; self.rank()];
        for d in by_step {
            let dim = &self.dims[d];
            let c = &mut coordinates[dim.memory_dim];
            index[d] = *c / dim.step;
            *c %= dim.step;
        }

        if coordinates.iter().any(|c| *c != 0) {
            return None;
        }

        match self.to_linear(&index) {
            Some(linear) if linear == offset => Some(index),
            _ => None,
        }
    }

    /// Number of elements between the first and the last valid element, inclusive.
    ///
    /// `None` when the size does not fit in a `usize`.
    pub fn checked_element_space_size(&self) -> Option<usize> {
        if self.memory.iter().any(|memory| memory.valid == 0) {
            return Some(0);
        }

        self.memory.iter().try_fold(1usize, |size, memory| {
            (memory.valid - 1)
                .checked_mul(memory.stride)
                .and_then(|span| size.checked_add(span))
        })
    }

    /// Whether the logical dimensions tile every memory dimension exactly once.
    pub fn covers_memory_exactly(&self) -> bool {
        self.memory.iter().enumerate().all(|(m, memory)| {
            let mut walking: Vec<&DescriptorDim> =
                self.dims.iter().filter(|dim| dim.memory_dim == m).collect();
            walking.sort_by_key(|dim| dim.step);

            let mut expected_step = 1;
            for dim in walking {
                if dim.step != expected_step {
                    return false;
                }
                expected_step *= dim.length;
            }

            expected_step == memory.length
        })
    }

    /// Whether this descriptor addresses exactly the memory region of `parent`, only with a
    /// different logical decomposition.
    pub fn is_refinement_of(&self, parent: &TensorDescriptor) -> bool {
        self.memory == parent.memory && self.covers_memory_exactly() && parent.covers_memory_exactly()
    }
}

impl Display for TensorDescriptor {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("[")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}={}", dim.name, dim.length)?;
        }
        f.write_str("] over ")?;
        for (i, memory) in self.memory.iter().enumerate() {
            if i > 0 {
                f.write_str(" x ")?;
            }
            write!(f, "{}/{}@{}", memory.valid, memory.length, memory.stride)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn row_major(m: usize, k: usize, stride: usize) -> TensorDescriptor {
        TensorDescriptor::naive(["M", "K"], [m, k], [stride, 1])
    }

    #[test_log::test]
    fn row_major_linearization() {
        let desc = row_major(4, 8, 10);

        assert_eq!(desc.to_linear(&[0, 0]), Some(0));
        assert_eq!(desc.to_linear(&[1, 3]), Some(13));
        assert_eq!(desc.to_linear(&[3, 7]), Some(37));
        assert_eq!(desc.to_linear(&[4, 0]), None);
        assert_eq!(desc.checked_element_space_size(), Some(38));
    }

    #[test_log::test]
    fn round_trip_every_index() {
        let descs = [
            row_major(5, 7, 7),
            row_major(5, 7, 9),
            TensorDescriptor::naive(["M", "K"], [6, 3], [1, 8]),
            TensorDescriptor::naive_padded(["M", "K"], [5, 7], [8, 8], [7, 1]),
        ];

        for desc in descs {
            for m in 0..desc.length(0) {
                for k in 0..desc.length(1) {
                    let index = [m, k];
                    match desc.to_linear(&index) {
                        Some(offset) => assert_eq!(desc.from_linear(offset), Some(index.to_vec())),
                        None => assert!(desc.is_padding(&index)),
                    }
                }
            }
        }
    }

    #[test_log::test]
    fn overflowing_strides_have_no_element_space() {
        let desc = row_major(128, 32, usize::MAX / 64);

        assert_eq!(desc.checked_element_space_size(), None);
        assert_eq!(desc.to_linear(&[127, 0]), None);
        assert_eq!(desc.to_linear(&[0, 31]), Some(31));
    }

    #[test_log::test]
    fn padding_is_never_addressed() {
        let desc = TensorDescriptor::naive_padded(["M", "K"], [5, 7], [8, 8], [7, 1]);

        assert_eq!(desc.lengths(), vec![8, 8]);
        assert_eq!(desc.valid_length(0), 5);
        assert_eq!(desc.valid_length(1), 7);
        assert!(desc.is_padding(&[5, 0]));
        assert!(desc.is_padding(&[0, 7]));
        assert!(!desc.is_padding(&[4, 6]));
        assert_eq!(desc.to_linear(&[5, 0]), None);
        assert_eq!(desc.checked_element_space_size(), Some(35));
    }

    #[test_log::test]
    fn right_pad_matches_padded_construction() {
        let desc = row_major(5, 7, 7).right_pad(0, 4).right_pad(1, 8);

        assert_eq!(
            desc,
            TensorDescriptor::naive_padded(["M", "K"], [5, 7], [8, 8], [7, 1])
        );
        assert_eq!(row_major(8, 8, 8).right_pad(0, 4), row_major(8, 8, 8));
    }

    #[test_log::test]
    fn right_pad_skips_split_dimensions() {
        let split = row_major(4, 16, 16)
            .unmerge(1, &[("K0", 2), ("K1", 8)])
            .unwrap();

        assert_eq!(split.clone().right_pad(2, 32), split);
    }

    #[test_log::test]
    fn unmerge_then_reorder_is_a_refinement() {
        let desc = row_major(4, 16, 16);
        let refined = desc
            .clone()
            .unmerge(1, &[("K0", 2), ("K1", 8)])
            .unwrap()
            .reorder(&[1, 0, 2])
            .unwrap();

        assert_eq!(refined.lengths(), vec![2, 4, 8]);
        assert!(refined.is_refinement_of(&desc));

        for m in 0..4 {
            for k in 0..16 {
                assert_eq!(
                    refined.to_linear(&[k / 8, m, k % 8]),
                    desc.to_linear(&[m, k])
                );
            }
        }
    }

    #[test_log::test]
    fn invalid_transforms_are_rejected() {
        let desc = row_major(4, 16, 16);

        assert_eq!(
            desc.clone().unmerge(1, &[("K0", 3), ("K1", 8)]),
            Err(DescriptorError::NotDivisible {
                name: "K",
                length: 16,
                product: 24
            })
        );
        assert!(matches!(
            desc.clone().unmerge(2, &[("X", 1)]),
            Err(DescriptorError::DimOutOfRange { dim: 2, rank: 2 })
        ));
        assert!(matches!(
            desc.reorder(&[0, 0]),
            Err(DescriptorError::InvalidOrder { .. })
        ));
    }

    #[test_log::test]
    fn partial_decomposition_is_not_a_refinement() {
        let desc = row_major(4, 16, 16);
        let other = row_major(4, 8, 16);

        assert!(!other.is_refinement_of(&desc));
    }
}
