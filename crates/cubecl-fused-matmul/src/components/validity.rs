use alloc::format;

use super::{
    BlockToETileMap, Element, FusedMatmulBlueprint, FusedMatmulInvalidProblem,
    FusedMatmulPrecision, MatmulDim, MatrixLayout, OperandGroup, OperandIdent, OperandLayouts,
    VectorAxis,
    descriptor::{ProblemDescriptors, TensorDescriptor},
    elementwise::{ElementwiseOperation, ElementwiseOps, FusionOperation},
};

/// Largest tensor, in bytes, addressable with the 32-bit offsets of the kernel body.
pub const MAX_TENSOR_BYTES: usize = 1 << 31;

/// D and E are read and written along N by the epilogue, so they must be row-major.
pub fn check_layout_support<const NA: usize, const NB: usize, const ND: usize>(
    layouts: &OperandLayouts<NA, NB, ND>,
) -> Result<(), FusedMatmulInvalidProblem> {
    for (index, layout) in layouts.d.iter().enumerate() {
        if *layout != MatrixLayout::RowMajor {
            return Err(FusedMatmulInvalidProblem::UnsupportedLayout {
                ident: OperandIdent::new(OperandGroup::D, index),
                layout: *layout,
            });
        }
    }

    if layouts.e != MatrixLayout::RowMajor {
        return Err(FusedMatmulInvalidProblem::UnsupportedLayout {
            ident: OperandIdent::OUTPUT,
            layout: layouts.e,
        });
    }

    Ok(())
}

/// Checks that every vectorized global access is legal for the raw extents.
///
/// When the contiguous axis of an operand is its vectorized axis, the raw extent along it
/// must be a multiple of the vector width. Otherwise, accesses must be scalar.
pub fn check_vector_access<const NA: usize, const NB: usize, const ND: usize>(
    blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    m: usize,
    n: usize,
    k: usize,
) -> Result<(), FusedMatmulInvalidProblem> {
    let a_vector = blueprint.a_transfer.src_scalar_per_vector;
    for (index, layout) in blueprint.layouts.a.iter().enumerate() {
        let ident = OperandIdent::new(OperandGroup::A, index);
        match (layout, blueprint.a_transfer.src_vector_axis) {
            (MatrixLayout::RowMajor, VectorAxis::K) => {
                check_divisible(ident, MatmulDim::K, k, a_vector)?
            }
            (MatrixLayout::ColMajor, VectorAxis::MN) => {
                check_divisible(ident, MatmulDim::M, m, a_vector)?
            }
            _ => check_scalar(ident, a_vector)?,
        }
    }

    let b_vector = blueprint.b_transfer.src_scalar_per_vector;
    for (index, layout) in blueprint.layouts.b.iter().enumerate() {
        let ident = OperandIdent::new(OperandGroup::B, index);
        match (layout, blueprint.b_transfer.src_vector_axis) {
            (MatrixLayout::ColMajor, VectorAxis::K) => {
                check_divisible(ident, MatmulDim::K, k, b_vector)?
            }
            (MatrixLayout::RowMajor, VectorAxis::MN) => {
                check_divisible(ident, MatmulDim::N, n, b_vector)?
            }
            _ => check_scalar(ident, b_vector)?,
        }
    }

    // The epilogue reads D and writes E with the same vector width along N.
    let cde_vector = blueprint.cshuffle.scalar_per_vector;
    for index in 0..ND {
        check_divisible(
            OperandIdent::new(OperandGroup::D, index),
            MatmulDim::N,
            n,
            cde_vector,
        )?;
    }
    check_divisible(OperandIdent::OUTPUT, MatmulDim::N, n, cde_vector)
}

fn check_divisible(
    ident: OperandIdent,
    dim: MatmulDim,
    extent: usize,
    scalar_per_vector: u32,
) -> Result<(), FusedMatmulInvalidProblem> {
    match scalar_per_vector != 0 && extent % scalar_per_vector as usize == 0 {
        true => Ok(()),
        false => Err(FusedMatmulInvalidProblem::InvalidVectorAccess {
            ident,
            dim,
            extent,
            scalar_per_vector,
        }),
    }
}

fn check_scalar(ident: OperandIdent, scalar_per_vector: u32) -> Result<(), FusedMatmulInvalidProblem> {
    match scalar_per_vector == 1 {
        true => Ok(()),
        false => Err(FusedMatmulInvalidProblem::ScalarAccessRequired {
            ident,
            scalar_per_vector,
        }),
    }
}

/// Checks that the descriptors describe a problem the tiled kernel body can run.
///
/// Extents are compared on the padded descriptors: all A operands share `M x K`, all B
/// operands share `N x K`, D operands and the output share `M x N`, every extent is a multiple
/// of the block tile, the pipeline supports the number of K blocks and every tensor fits in
/// 32-bit offsets.
pub fn check_gridwise<MP: FusedMatmulPrecision, const NA: usize, const NB: usize, const ND: usize>(
    blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    descriptors: &ProblemDescriptors<NA, NB, ND>,
    tile_map: &BlockToETileMap,
) -> Result<(), FusedMatmulInvalidProblem> {
    let (Some(first_a), Some(_)) = (
        descriptors.as_grid_desc_m_k.first(),
        descriptors.bs_grid_desc_n_k.first(),
    ) else {
        return Err(FusedMatmulInvalidProblem::MissingOperand);
    };

    let e = &descriptors.e_grid_desc_m_n;
    let (m, n, k) = (e.length(0), e.length(1), first_a.length(1));

    let (raw_m, raw_n, raw_k) = (e.valid_length(0), e.valid_length(1), first_a.valid_length(1));
    if raw_m == 0 || raw_n == 0 || raw_k == 0 {
        return Err(FusedMatmulInvalidProblem::EmptyProblem {
            m: raw_m,
            n: raw_n,
            k: raw_k,
        });
    }

    for (index, a) in descriptors.as_grid_desc_m_k.iter().enumerate() {
        let ident = OperandIdent::new(OperandGroup::A, index);
        check_extent(ident, MatmulDim::M, m, a.length(0))?;
        check_extent(ident, MatmulDim::K, k, a.length(1))?;
    }
    for (index, b) in descriptors.bs_grid_desc_n_k.iter().enumerate() {
        let ident = OperandIdent::new(OperandGroup::B, index);
        check_extent(ident, MatmulDim::N, n, b.length(0))?;
        check_extent(ident, MatmulDim::K, k, b.length(1))?;
    }
    for (index, d) in descriptors.ds_grid_desc_m_n.iter().enumerate() {
        let ident = OperandIdent::new(OperandGroup::D, index);
        check_extent(ident, MatmulDim::M, m, d.length(0))?;
        check_extent(ident, MatmulDim::N, n, d.length(1))?;
    }

    let tile = &blueprint.tile;
    for (dim, extent, block) in [
        (MatmulDim::M, m, tile.m_per_block),
        (MatmulDim::N, n, tile.n_per_block),
        (MatmulDim::K, k, tile.k_per_block),
    ] {
        if extent % block as usize != 0 {
            return Err(FusedMatmulInvalidProblem::IndivisibleExtent { dim, extent, block });
        }
    }

    let num_k_loop = k / tile.k_per_block as usize;
    if !blueprint.pipeline.is_supported(num_k_loop) {
        return Err(FusedMatmulInvalidProblem::PipelineUnsupported {
            pipeline: format!(
                "{} ({} prefetch stages)",
                blueprint.pipeline.version, blueprint.pipeline.prefetch_stages
            ),
            num_k_loop,
        });
    }

    if !tile_map.check_validity(e) {
        let (m_blocks, n_blocks) = tile_map.tile_counts();
        return Err(FusedMatmulInvalidProblem::InvalidTileMap { m_blocks, n_blocks });
    }

    for (index, a) in descriptors.as_grid_desc_m_k.iter().enumerate() {
        check_size::<MP::A>(OperandIdent::new(OperandGroup::A, index), a)?;
    }
    for (index, b) in descriptors.bs_grid_desc_n_k.iter().enumerate() {
        check_size::<MP::B>(OperandIdent::new(OperandGroup::B, index), b)?;
    }
    for (index, d) in descriptors.ds_grid_desc_m_n.iter().enumerate() {
        check_size::<MP::D>(OperandIdent::new(OperandGroup::D, index), d)?;
    }
    check_size::<MP::E>(OperandIdent::OUTPUT, e)
}

fn check_extent(
    ident: OperandIdent,
    dim: MatmulDim,
    expected: usize,
    actual: usize,
) -> Result<(), FusedMatmulInvalidProblem> {
    match expected == actual {
        true => Ok(()),
        false => Err(FusedMatmulInvalidProblem::InconsistentExtent {
            ident,
            dim,
            expected,
            actual,
        }),
    }
}

fn check_size<E: Element>(
    ident: OperandIdent,
    desc: &TensorDescriptor,
) -> Result<(), FusedMatmulInvalidProblem> {
    let bytes = desc
        .checked_element_space_size()
        .and_then(|elements| elements.checked_mul(E::size()))
        .unwrap_or(usize::MAX);
    match bytes <= MAX_TENSOR_BYTES {
        true => Ok(()),
        false => Err(FusedMatmulInvalidProblem::TensorTooLarge { ident, bytes }),
    }
}

/// Checks that a buffer holds every element its descriptor addresses.
pub fn check_buffer(
    ident: OperandIdent,
    desc: &TensorDescriptor,
    available: usize,
) -> Result<(), FusedMatmulInvalidProblem> {
    // A size that overflows can never be backed by a buffer.
    let required = desc.checked_element_space_size().unwrap_or(usize::MAX);
    match required <= available {
        true => Ok(()),
        false => Err(FusedMatmulInvalidProblem::BufferTooSmall {
            ident,
            required,
            available,
        }),
    }
}

/// Checks that each transform can combine the operands of its group.
pub fn check_operations<AOp, BOp, CdeOp>(
    ops: &ElementwiseOps<AOp, BOp, CdeOp>,
    num_a: usize,
    num_b: usize,
    num_d: usize,
) -> Result<(), FusedMatmulInvalidProblem>
where
    AOp: ElementwiseOperation,
    BOp: ElementwiseOperation,
    CdeOp: FusionOperation,
{
    for (accepted, arity, name) in [
        (ops.a_op.accepts_arity(num_a), num_a, ops.a_op.name()),
        (ops.b_op.accepts_arity(num_b), num_b, ops.b_op.name()),
        (ops.cde_op.accepts_arity(num_d), num_d, ops.cde_op.name()),
    ] {
        if !accepted {
            return Err(FusedMatmulInvalidProblem::InvalidArity { op: name, arity });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{
        BlockTile, BlockTransfer, ColMajor, GemmSpecialization, RowMajor, TileOrder,
        elementwise::{Add, PassThrough},
    };

    type Blueprint = FusedMatmulBlueprint<1, 1, 1>;

    fn make_blueprint<A: crate::components::LayoutTag, B: crate::components::LayoutTag>(
        a_axis: VectorAxis,
        b_axis: VectorAxis,
        vector: u32,
    ) -> Blueprint {
        FusedMatmulBlueprint::builder(OperandLayouts::new::<A, B, RowMajor, RowMajor>())
            .a_transfer(BlockTransfer::new([4, 64, 1], a_axis, vector, 8, true))
            .b_transfer(BlockTransfer::new([4, 64, 1], b_axis, vector, 8, true))
            .specialization(GemmSpecialization::MNKPadding)
            .build()
            .unwrap()
    }

    #[test_log::test]
    fn alignment_gate_on_matching_axis() {
        let blueprint = make_blueprint::<RowMajor, ColMajor>(VectorAxis::K, VectorAxis::K, 8);

        for k in 1..=64 {
            let result = check_vector_access(&blueprint, 256, 256, k);
            assert_eq!(result.is_ok(), k % 8 == 0, "k={k}");
        }
    }

    #[test_log::test]
    fn alignment_gate_on_mn_axis() {
        let blueprint = make_blueprint::<ColMajor, RowMajor>(VectorAxis::MN, VectorAxis::MN, 4);
        let mut cde = blueprint;
        cde.cshuffle.scalar_per_vector = 1;

        for extent in 1..=32 {
            assert_eq!(
                check_vector_access(&cde, extent, 64, 64).is_ok(),
                extent % 4 == 0,
                "m={extent}"
            );
            assert_eq!(
                check_vector_access(&cde, 64, extent, 64).is_ok(),
                extent % 4 == 0,
                "n={extent}"
            );
        }
    }

    #[test_log::test]
    fn mismatched_axis_requires_scalar_access() {
        for vector in [2, 4, 8] {
            let blueprint = make_blueprint::<RowMajor, ColMajor>(VectorAxis::MN, VectorAxis::K, vector);
            assert_eq!(
                check_vector_access(&blueprint, 256, 256, 64),
                Err(FusedMatmulInvalidProblem::ScalarAccessRequired {
                    ident: OperandIdent::new(OperandGroup::A, 0),
                    scalar_per_vector: vector,
                })
            );
        }

        let mut blueprint = make_blueprint::<RowMajor, ColMajor>(VectorAxis::MN, VectorAxis::K, 8);
        blueprint.a_transfer.src_scalar_per_vector = 1;
        assert_eq!(check_vector_access(&blueprint, 256, 256, 64), Ok(()));
    }

    #[test_log::test]
    fn output_width_must_divide_n() {
        let blueprint = make_blueprint::<RowMajor, ColMajor>(VectorAxis::K, VectorAxis::K, 8);

        assert_eq!(
            check_vector_access(&blueprint, 256, 255, 64),
            Err(FusedMatmulInvalidProblem::InvalidVectorAccess {
                ident: OperandIdent::new(OperandGroup::D, 0),
                dim: MatmulDim::N,
                extent: 255,
                scalar_per_vector: 8,
            })
        );
    }

    #[test_log::test]
    fn epilogue_operands_must_be_row_major() {
        let mut layouts = OperandLayouts::<1, 1, 2>::new::<RowMajor, RowMajor, RowMajor, RowMajor>();
        assert_eq!(check_layout_support(&layouts), Ok(()));

        layouts.d[1] = MatrixLayout::ColMajor;
        assert_eq!(
            check_layout_support(&layouts),
            Err(FusedMatmulInvalidProblem::UnsupportedLayout {
                ident: OperandIdent::new(OperandGroup::D, 1),
                layout: MatrixLayout::ColMajor,
            })
        );

        let layouts = OperandLayouts::<1, 1, 0>::new::<RowMajor, RowMajor, RowMajor, ColMajor>();
        assert!(check_layout_support(&layouts).is_err());
    }

    #[test_log::test]
    fn unpadded_extents_must_fill_tiles() {
        let blueprint = FusedMatmulBlueprint::<1, 1, 0>::builder(OperandLayouts::new::<
            RowMajor,
            ColMajor,
            RowMajor,
            RowMajor,
        >())
        .tile(BlockTile::new(128, 128, 32, 8, 8))
        .build()
        .unwrap();
        let problem = crate::components::FusedMatmulProblem::new(200, 256, 64, [64], [64], [], 256);
        let descriptors = ProblemDescriptors::new(&problem, &blueprint);
        let tile_map = BlockToETileMap::new(&descriptors.e_grid_desc_m_n, 128, 128, TileOrder::RowMajor);

        assert_eq!(
            check_gridwise::<f32, 1, 1, 0>(&blueprint, &descriptors, &tile_map),
            Err(FusedMatmulInvalidProblem::IndivisibleExtent {
                dim: MatmulDim::M,
                extent: 200,
                block: 128,
            })
        );
    }

    #[test_log::test]
    fn oversized_tensors_are_rejected() {
        let blueprint = FusedMatmulBlueprint::<1, 1, 0>::builder(OperandLayouts::new::<
            RowMajor,
            ColMajor,
            RowMajor,
            RowMajor,
        >())
        .build()
        .unwrap();
        let problem =
            crate::components::FusedMatmulProblem::new(1 << 16, 1 << 14, 64, [64], [64], [], 1 << 14);
        let descriptors = ProblemDescriptors::new(&problem, &blueprint);
        let tile_map = BlockToETileMap::new(&descriptors.e_grid_desc_m_n, 128, 128, TileOrder::RowMajor);

        assert!(matches!(
            check_gridwise::<f32, 1, 1, 0>(&blueprint, &descriptors, &tile_map),
            Err(FusedMatmulInvalidProblem::TensorTooLarge {
                ident: OperandIdent::OUTPUT,
                ..
            })
        ));
    }

    #[test_log::test]
    fn transforms_must_accept_operand_counts() {
        let ops = ElementwiseOps::new(PassThrough, PassThrough, Add);
        assert_eq!(check_operations(&ops, 1, 1, 2), Ok(()));
        assert_eq!(
            check_operations(&ops, 2, 1, 2),
            Err(FusedMatmulInvalidProblem::InvalidArity {
                op: "PassThrough".into(),
                arity: 2,
            })
        );
    }

    #[test_log::test]
    fn buffer_must_hold_the_element_space() {
        let desc = TensorDescriptor::naive(["M", "N"], [4, 8], [8, 1]);
        let ident = OperandIdent::new(OperandGroup::D, 0);

        assert_eq!(check_buffer(ident, &desc, 32), Ok(()));
        assert_eq!(
            check_buffer(ident, &desc, 31),
            Err(FusedMatmulInvalidProblem::BufferTooSmall {
                ident,
                required: 32,
                available: 31,
            })
        );

        let overflowing = TensorDescriptor::naive(["M", "N"], [4, 8], [usize::MAX / 2, 1]);
        assert_eq!(
            check_buffer(ident, &overflowing, usize::MAX - 1),
            Err(FusedMatmulInvalidProblem::BufferTooSmall {
                ident,
                required: usize::MAX,
                available: usize::MAX - 1,
            })
        );
    }
}
