use crate::components::{
    BlockTile, FusedMatmulBlueprint, FusedMatmulProblem, GemmSpecialization, MatrixLayout,
    OperandGroup, OperandIdent,
};

use super::{DescriptorError, TensorDescriptor, try_map_array};

/// `M x K` descriptor of an A operand, padded to the block tile where the specialization
/// asks for it.
pub fn make_a_grid_descriptor_m_k(
    m: usize,
    k: usize,
    stride: usize,
    layout: MatrixLayout,
    specialization: GemmSpecialization,
    tile: &BlockTile,
) -> TensorDescriptor {
    let strides = match layout {
        MatrixLayout::RowMajor => [stride, 1],
        MatrixLayout::ColMajor => [1, stride],
    };
    let desc = TensorDescriptor::naive(["M", "K"], [m, k], strides);
    let desc = pad(desc, 0, tile.m_per_block, specialization.pad_m());

    pad(desc, 1, tile.k_per_block, specialization.pad_k())
}

/// `N x K` descriptor of a B operand.
///
/// B is a `K x N` matrix: row-major B is contiguous along N, column-major B along K.
pub fn make_b_grid_descriptor_n_k(
    n: usize,
    k: usize,
    stride: usize,
    layout: MatrixLayout,
    specialization: GemmSpecialization,
    tile: &BlockTile,
) -> TensorDescriptor {
    let strides = match layout {
        MatrixLayout::RowMajor => [1, stride],
        MatrixLayout::ColMajor => [stride, 1],
    };
    let desc = TensorDescriptor::naive(["N", "K"], [n, k], strides);
    let desc = pad(desc, 0, tile.n_per_block, specialization.pad_n());

    pad(desc, 1, tile.k_per_block, specialization.pad_k())
}

/// `M x N` descriptor of a D operand or of the output.
pub fn make_e_grid_descriptor_m_n(
    m: usize,
    n: usize,
    stride: usize,
    layout: MatrixLayout,
    specialization: GemmSpecialization,
    tile: &BlockTile,
) -> TensorDescriptor {
    let strides = match layout {
        MatrixLayout::RowMajor => [stride, 1],
        MatrixLayout::ColMajor => [1, stride],
    };
    let desc = TensorDescriptor::naive(["M", "N"], [m, n], strides);
    let desc = pad(desc, 0, tile.m_per_block, specialization.pad_m());

    pad(desc, 1, tile.n_per_block, specialization.pad_n())
}

/// Splits K of an `M x K` descriptor into `[AK0, M, AK1]`, AK1 being the contiguous part
/// written to shared memory at once.
pub fn make_a_grid_descriptor_ak0_m_ak1(
    a_grid_desc_m_k: &TensorDescriptor,
    ak1: u32,
) -> Result<TensorDescriptor, DescriptorError> {
    split_k(a_grid_desc_m_k, ["AK0", "AK1"], ak1 as usize)
}

/// Splits K of an `N x K` descriptor into `[BK0, N, BK1]`.
pub fn make_b_grid_descriptor_bk0_n_bk1(
    b_grid_desc_n_k: &TensorDescriptor,
    bk1: u32,
) -> Result<TensorDescriptor, DescriptorError> {
    split_k(b_grid_desc_n_k, ["BK0", "BK1"], bk1 as usize)
}

/// Splits an `M x N` descriptor into `[MBlock, MPerBlock, NBlock, NPerBlock]`.
pub fn make_e_grid_descriptor_mblock_mperblock_nblock_nperblock(
    e_grid_desc_m_n: &TensorDescriptor,
    m_per_block: u32,
    n_per_block: u32,
) -> Result<TensorDescriptor, DescriptorError> {
    let m_per_block = m_per_block as usize;
    let n_per_block = n_per_block as usize;
    let m_blocks = e_grid_desc_m_n.length(0) / m_per_block.max(1);
    let n_blocks = e_grid_desc_m_n.length(1) / n_per_block.max(1);

    e_grid_desc_m_n
        .clone()
        .unmerge(1, &[("NBlock", n_blocks), ("NPerBlock", n_per_block)])?
        .unmerge(0, &[("MBlock", m_blocks), ("MPerBlock", m_per_block)])
}

fn split_k(
    desc_mn_k: &TensorDescriptor,
    names: [&'static str; 2],
    k1: usize,
) -> Result<TensorDescriptor, DescriptorError> {
    let k0 = desc_mn_k.length(1) / k1.max(1);

    desc_mn_k
        .clone()
        .unmerge(1, &[(names[0], k0), (names[1], k1)])?
        .reorder(&[1, 0, 2])
}

fn pad(desc: TensorDescriptor, dim: usize, per_block: u32, enabled: bool) -> TensorDescriptor {
    match enabled {
        true => desc.right_pad(dim, per_block as usize),
        false => desc,
    }
}

/// Problem level descriptors of every operand.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProblemDescriptors<const NA: usize, const NB: usize, const ND: usize> {
    pub as_grid_desc_m_k: [TensorDescriptor; NA],
    pub bs_grid_desc_n_k: [TensorDescriptor; NB],
    pub ds_grid_desc_m_n: [TensorDescriptor; ND],
    pub e_grid_desc_m_n: TensorDescriptor,
}

impl<const NA: usize, const NB: usize, const ND: usize> ProblemDescriptors<NA, NB, ND> {
    pub fn new(
        problem: &FusedMatmulProblem<NA, NB, ND>,
        blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    ) -> Self {
        let spec = blueprint.specialization;
        let tile = &blueprint.tile;
        let layouts = &blueprint.layouts;

        Self {
            as_grid_desc_m_k: core::array::from_fn(|i| {
                make_a_grid_descriptor_m_k(
                    problem.m,
                    problem.k,
                    problem.stride_as[i],
                    layouts.a[i],
                    spec,
                    tile,
                )
            }),
            bs_grid_desc_n_k: core::array::from_fn(|i| {
                make_b_grid_descriptor_n_k(
                    problem.n,
                    problem.k,
                    problem.stride_bs[i],
                    layouts.b[i],
                    spec,
                    tile,
                )
            }),
            ds_grid_desc_m_n: core::array::from_fn(|i| {
                make_e_grid_descriptor_m_n(
                    problem.m,
                    problem.n,
                    problem.stride_ds[i],
                    layouts.d[i],
                    spec,
                    tile,
                )
            }),
            e_grid_desc_m_n: make_e_grid_descriptor_m_n(
                problem.m,
                problem.n,
                problem.stride_e,
                layouts.e,
                spec,
                tile,
            ),
        }
    }
}

/// Block level descriptors handed to the kernel body.
///
/// Only built for problems that pass validation, so every split is exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockDescriptors<const NA: usize, const NB: usize, const ND: usize> {
    pub as_grid_desc_ak0_m_ak1: [TensorDescriptor; NA],
    pub bs_grid_desc_bk0_n_bk1: [TensorDescriptor; NB],
    pub ds_grid_desc_mblock_mperblock_nblock_nperblock: [TensorDescriptor; ND],
    pub e_grid_desc_mblock_mperblock_nblock_nperblock: TensorDescriptor,
}

impl<const NA: usize, const NB: usize, const ND: usize> BlockDescriptors<NA, NB, ND> {
    pub fn new(
        problem: &ProblemDescriptors<NA, NB, ND>,
        blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    ) -> Result<Self, DescriptorError> {
        let tile = &blueprint.tile;
        let split_mn = |desc: &TensorDescriptor| {
            make_e_grid_descriptor_mblock_mperblock_nblock_nperblock(
                desc,
                tile.m_per_block,
                tile.n_per_block,
            )
        };

        Ok(Self {
            as_grid_desc_ak0_m_ak1: try_map_array(&problem.as_grid_desc_m_k, |desc| {
                make_a_grid_descriptor_ak0_m_ak1(desc, tile.ak1)
            })?,
            bs_grid_desc_bk0_n_bk1: try_map_array(&problem.bs_grid_desc_n_k, |desc| {
                make_b_grid_descriptor_bk0_n_bk1(desc, tile.bk1)
            })?,
            ds_grid_desc_mblock_mperblock_nblock_nperblock: try_map_array(
                &problem.ds_grid_desc_m_n,
                split_mn,
            )?,
            e_grid_desc_mblock_mperblock_nblock_nperblock: split_mn(&problem.e_grid_desc_m_n)?,
        })
    }

    /// Whether every block descriptor addresses exactly the memory of its problem level
    /// descriptor.
    pub fn refines(&self, problem: &ProblemDescriptors<NA, NB, ND>) -> bool {
        self.first_unrefined(problem).is_none()
    }

    /// First operand whose block descriptor is not a refinement of its problem level
    /// descriptor.
    pub fn first_unrefined(
        &self,
        problem: &ProblemDescriptors<NA, NB, ND>,
    ) -> Option<OperandIdent> {
        let ident = |group, index| OperandIdent::new(group, index);
        let a = self
            .as_grid_desc_ak0_m_ak1
            .iter()
            .zip(&problem.as_grid_desc_m_k)
            .enumerate()
            .map(|(i, pair)| (ident(OperandGroup::A, i), pair));
        let b = self
            .bs_grid_desc_bk0_n_bk1
            .iter()
            .zip(&problem.bs_grid_desc_n_k)
            .enumerate()
            .map(|(i, pair)| (ident(OperandGroup::B, i), pair));
        let d = self
            .ds_grid_desc_mblock_mperblock_nblock_nperblock
            .iter()
            .zip(&problem.ds_grid_desc_m_n)
            .enumerate()
            .map(|(i, pair)| (ident(OperandGroup::D, i), pair));
        let e = core::iter::once((
            OperandIdent::OUTPUT,
            (
                &self.e_grid_desc_mblock_mperblock_nblock_nperblock,
                &problem.e_grid_desc_m_n,
            ),
        ));

        a.chain(b)
            .chain(d)
            .chain(e)
            .find(|(_, (block, parent))| !block.is_refinement_of(parent))
            .map(|(ident, _)| ident)
    }
}
