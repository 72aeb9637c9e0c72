use crate::components::{
    BlockToETileMap, Element, FusedMatmulBlueprint, FusedMatmulInvalidProblem,
    FusedMatmulPrecision, check_gridwise, descriptor::ProblemDescriptors,
};

/// Host side contract of a tiled kernel body.
///
/// The body itself runs on the device and is provided by the launcher. This trait only
/// exposes what the host must know before dispatching it.
pub trait GridwiseFusedMatmul: Send + Sync + 'static {
    /// Name of the kernel body, used to select it on the launcher side.
    const NAME: &'static str;

    /// Shared memory, in bytes, each cube needs for `blueprint`.
    ///
    /// The A and B stage tiles are live during the main loop and the output shuffle tile
    /// during the epilogue, so they share the same allocation.
    fn shared_memory_bytes<MP: FusedMatmulPrecision, const NA: usize, const NB: usize, const ND: usize>(
        blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
    ) -> usize {
        let tile = &blueprint.tile;
        let align = lcm(tile.ak1 as usize, tile.bk1 as usize);

        let a_tile = stage_tile_size(
            tile.k_per_block,
            tile.m_per_block,
            tile.ak1,
            blueprint.a_transfer.lds_extra,
        );
        let b_tile = stage_tile_size(
            tile.k_per_block,
            tile.n_per_block,
            tile.bk1,
            blueprint.b_transfer.lds_extra,
        );
        let ab_bytes =
            (a_tile.next_multiple_of(align) + b_tile.next_multiple_of(align)) * MP::Compute::size();

        let (m_waves, n_waves) = blueprint.waves();
        let xdl = &blueprint.xdl;
        let shuffle = &blueprint.cshuffle;
        let c_tile = (shuffle.m_xdl_per_wave_per_shuffle * m_waves * xdl.m_per_xdl) as usize
            * (shuffle.n_xdl_per_wave_per_shuffle * n_waves * xdl.n_per_xdl) as usize;
        let c_bytes = c_tile * MP::CShuffle::size();

        usize::max(ab_bytes, c_bytes)
    }

    /// Checks the problem against the constraints of the kernel body.
    fn check_validity<MP: FusedMatmulPrecision, const NA: usize, const NB: usize, const ND: usize>(
        blueprint: &FusedMatmulBlueprint<NA, NB, ND>,
        descriptors: &ProblemDescriptors<NA, NB, ND>,
        tile_map: &BlockToETileMap,
    ) -> Result<(), FusedMatmulInvalidProblem> {
        check_gridwise::<MP, NA, NB, ND>(blueprint, descriptors, tile_map)
    }
}

/// Xdl multiply-accumulate over shared memory stages, with the output staged through shared
/// memory so D operands are read and E written with vectorized accesses.
pub struct XdlCShuffle;

impl GridwiseFusedMatmul for XdlCShuffle {
    const NAME: &'static str = "gemm_multiple_abd_xdl_cshuffle";
}

// Elements of a `[K0, MN, K1]` stage tile. With the extra row, each K0 slice is padded by
// one K1 vector to avoid bank conflicts.
fn stage_tile_size(k_per_block: u32, mn_per_block: u32, k1: u32, lds_extra: bool) -> usize {
    let k0 = (k_per_block / k1.max(1)) as usize;
    let mn = mn_per_block as usize;
    let k1 = k1 as usize;
    let row = match lds_extra {
        true => mn + 1,
        false => mn,
    };

    match k0 {
        0 => 0,
        _ => (k0 - 1) * row * k1 + mn * k1,
    }
}

fn gcd(a: usize, b: usize) -> usize {
    match b {
        0 => a,
        _ => gcd(b, a % b),
    }
}

fn lcm(a: usize, b: usize) -> usize {
    match a == 0 || b == 0 {
        true => 1,
        false => a / gcd(a, b) * b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{BlockTransfer, OperandLayouts, RowMajor, VectorAxis};
    use half::f16;

    #[test_log::test]
    fn shared_memory_of_default_blueprint() {
        let blueprint = FusedMatmulBlueprint::<1, 1, 1>::builder(OperandLayouts::new::<
            RowMajor,
            RowMajor,
            RowMajor,
            RowMajor,
        >())
        .b_transfer(BlockTransfer::new([4, 64, 1], VectorAxis::MN, 8, 8, true))
        .build()
        .unwrap();

        // 4 x 129 x 8 rows minus the trailing padding, for A and B.
        let stage = 3 * 129 * 8 + 128 * 8;
        assert_eq!(
            XdlCShuffle::shared_memory_bytes::<f16, 1, 1, 1>(&blueprint),
            2 * stage * 2
        );
        assert_eq!(
            XdlCShuffle::shared_memory_bytes::<f32, 1, 1, 1>(&blueprint),
            2 * stage * 4
        );
    }

    #[test_log::test]
    fn shuffle_tile_can_dominate() {
        let mut blueprint = FusedMatmulBlueprint::<1, 1, 0>::builder(OperandLayouts::new::<
            RowMajor,
            RowMajor,
            RowMajor,
            RowMajor,
        >())
        .b_transfer(BlockTransfer::new([4, 64, 1], VectorAxis::MN, 8, 8, true))
        .build()
        .unwrap();
        blueprint.tile.k_per_block = 8;
        blueprint.a_transfer.lds_extra = false;
        blueprint.b_transfer.lds_extra = false;
        blueprint.cshuffle.m_xdl_per_wave_per_shuffle = 2;
        blueprint.cshuffle.n_xdl_per_wave_per_shuffle = 2;

        // A and B stages are 128 x 8 each, the shuffle tile is the whole 128 x 128 output.
        assert_eq!(
            XdlCShuffle::shared_memory_bytes::<f32, 1, 1, 0>(&blueprint),
            128 * 128 * 4
        );
    }

    #[test_log::test]
    fn lds_alignment() {
        assert_eq!(lcm(8, 4), 8);
        assert_eq!(lcm(4, 6), 12);
        assert_eq!(lcm(0, 6), 1);
    }
}
