use core::fmt::Display;

use alloc::string::ToString;

use super::{
    GemmSpecialization, InvalidConfigError, OperandLayouts, PipelineConfig, PipelineVersion,
    TileOrder,
};

/// Output and reduction extents handled by one cube.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockTile {
    pub m_per_block: u32,
    pub n_per_block: u32,
    pub k_per_block: u32,
    /// Contiguous K elements of A written to shared memory at once.
    pub ak1: u32,
    /// Contiguous K elements of B written to shared memory at once.
    pub bk1: u32,
}

/// Matrix core instruction shape and how many of them each wave issues.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct XdlTiling {
    pub m_per_xdl: u32,
    pub n_per_xdl: u32,
    pub m_xdl_per_wave: u32,
    pub n_xdl_per_wave: u32,
}

/// Axis along which an A or B operand is read with vector loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VectorAxis {
    /// Along M for A, along N for B.
    MN,
    /// Along K.
    K,
}

/// How a cube copies an A or B tile from global to shared memory.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockTransfer {
    /// Threads along `[K0, M or N, K1]`.
    pub thread_cluster: [u32; 3],
    pub src_vector_axis: VectorAxis,
    pub src_scalar_per_vector: u32,
    /// Elements written per store along K1.
    pub dst_scalar_per_vector: u32,
    /// Pads each shared memory row to dodge bank conflicts.
    pub lds_extra: bool,
}

/// Epilogue shuffling the accumulator through shared memory before the fusion.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CShuffleEpilogue {
    pub m_xdl_per_wave_per_shuffle: u32,
    pub n_xdl_per_wave_per_shuffle: u32,
    /// Threads along `[1, M per shuffle, 1, N per shuffle]`.
    pub thread_cluster: [u32; 4],
    /// Elements of D and E read or written at once, always along N.
    pub scalar_per_vector: u32,
}

/// Compile-time configuration of one fused matmul kernel variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FusedMatmulBlueprint<const NA: usize, const NB: usize, const ND: usize> {
    pub specialization: GemmSpecialization,
    /// Threads per cube.
    pub block_size: u32,
    /// Threads per wave.
    pub wave_size: u32,
    pub tile: BlockTile,
    pub xdl: XdlTiling,
    pub a_transfer: BlockTransfer,
    pub b_transfer: BlockTransfer,
    pub cshuffle: CShuffleEpilogue,
    pub pipeline: PipelineConfig,
    pub layouts: OperandLayouts<NA, NB, ND>,
    pub tile_order: TileOrder,
}

impl<const NA: usize, const NB: usize, const ND: usize> FusedMatmulBlueprint<NA, NB, ND> {
    pub fn builder(layouts: OperandLayouts<NA, NB, ND>) -> FusedMatmulBlueprintBuilder<NA, NB, ND> {
        FusedMatmulBlueprintBuilder::new(layouts)
    }

    /// Waves along M and N.
    pub fn waves(&self) -> (u32, u32) {
        (
            self.tile.m_per_block / (self.xdl.m_per_xdl * self.xdl.m_xdl_per_wave),
            self.tile.n_per_block / (self.xdl.n_per_xdl * self.xdl.n_xdl_per_wave),
        )
    }

    /// Checks that the configuration describes a kernel that can exist.
    pub fn validate(&self) -> Result<(), InvalidConfigError> {
        let tile = &self.tile;
        let xdl = &self.xdl;

        for (name, value) in [
            ("block_size", self.block_size),
            ("wave_size", self.wave_size),
            ("m_per_block", tile.m_per_block),
            ("n_per_block", tile.n_per_block),
            ("k_per_block", tile.k_per_block),
            ("ak1", tile.ak1),
            ("bk1", tile.bk1),
            ("m_per_xdl", xdl.m_per_xdl),
            ("n_per_xdl", xdl.n_per_xdl),
            ("m_xdl_per_wave", xdl.m_xdl_per_wave),
            ("n_xdl_per_wave", xdl.n_xdl_per_wave),
            ("a_src_scalar_per_vector", self.a_transfer.src_scalar_per_vector),
            ("a_dst_scalar_per_vector", self.a_transfer.dst_scalar_per_vector),
            ("b_src_scalar_per_vector", self.b_transfer.src_scalar_per_vector),
            ("b_dst_scalar_per_vector", self.b_transfer.dst_scalar_per_vector),
            ("cshuffle_m_xdl_per_wave_per_shuffle", self.cshuffle.m_xdl_per_wave_per_shuffle),
            ("cshuffle_n_xdl_per_wave_per_shuffle", self.cshuffle.n_xdl_per_wave_per_shuffle),
            ("cde_scalar_per_vector", self.cshuffle.scalar_per_vector),
            ("prefetch_stages", self.pipeline.prefetch_stages),
        ] {
            if value == 0 {
                return Err(InvalidConfigError::Zero { name });
            }
        }

        divisible("k_per_block", tile.k_per_block, "ak1", tile.ak1)?;
        divisible("k_per_block", tile.k_per_block, "bk1", tile.bk1)?;
        divisible(
            "m_per_block",
            tile.m_per_block,
            "m_per_xdl * m_xdl_per_wave",
            xdl.m_per_xdl * xdl.m_xdl_per_wave,
        )?;
        divisible(
            "n_per_block",
            tile.n_per_block,
            "n_per_xdl * n_xdl_per_wave",
            xdl.n_per_xdl * xdl.n_xdl_per_wave,
        )?;

        let (m_waves, n_waves) = self.waves();
        equal(
            "m_waves * n_waves * wave_size",
            m_waves * n_waves * self.wave_size,
            "block_size",
            self.block_size,
        )?;

        self.validate_transfer(&self.a_transfer, tile.m_per_block, tile.ak1)?;
        self.validate_transfer(&self.b_transfer, tile.n_per_block, tile.bk1)?;

        divisible(
            "m_xdl_per_wave",
            xdl.m_xdl_per_wave,
            "cshuffle_m_xdl_per_wave_per_shuffle",
            self.cshuffle.m_xdl_per_wave_per_shuffle,
        )?;
        divisible(
            "n_xdl_per_wave",
            xdl.n_xdl_per_wave,
            "cshuffle_n_xdl_per_wave_per_shuffle",
            self.cshuffle.n_xdl_per_wave_per_shuffle,
        )?;
        equal(
            "cshuffle_thread_cluster",
            self.cshuffle.thread_cluster.iter().product(),
            "block_size",
            self.block_size,
        )?;

        let stages_supported = match self.pipeline.version {
            PipelineVersion::V1 => true,
            PipelineVersion::V2 => self.pipeline.prefetch_stages == 2,
        };
        if !stages_supported {
            return Err(InvalidConfigError::PrefetchStages {
                version: self.pipeline.version.to_string(),
                stages: self.pipeline.prefetch_stages,
            });
        }

        if let TileOrder::Grouped { group_m: 0 } = self.tile_order {
            return Err(InvalidConfigError::Zero { name: "group_m" });
        }

        Ok(())
    }

    fn validate_transfer(
        &self,
        transfer: &BlockTransfer,
        mn_per_block: u32,
        k1: u32,
    ) -> Result<(), InvalidConfigError> {
        let [cluster_k0, cluster_mn, cluster_k1] = transfer.thread_cluster;

        equal(
            "transfer_thread_cluster",
            cluster_k0 * cluster_mn * cluster_k1,
            "block_size",
            self.block_size,
        )?;
        divisible(
            "k0_per_block",
            self.tile.k_per_block / k1,
            "transfer_thread_cluster_k0",
            cluster_k0,
        )?;
        divisible("mn_per_block", mn_per_block, "transfer_thread_cluster_mn", cluster_mn)?;
        divisible("k1", k1, "transfer_thread_cluster_k1", cluster_k1)?;
        divisible("k1", k1, "dst_scalar_per_vector", transfer.dst_scalar_per_vector)
    }
}

fn divisible(
    name: &'static str,
    value: u32,
    divisor_name: &'static str,
    divisor: u32,
) -> Result<(), InvalidConfigError> {
    if divisor == 0 || value % divisor != 0 {
        return Err(InvalidConfigError::NotDivisible {
            name,
            value,
            divisor_name,
            divisor,
        });
    }
    Ok(())
}

fn equal(
    name: &'static str,
    value: u32,
    expected_name: &'static str,
    expected: u32,
) -> Result<(), InvalidConfigError> {
    if value != expected {
        return Err(InvalidConfigError::Mismatch {
            name,
            value,
            expected_name,
            expected,
        });
    }
    Ok(())
}

impl<const NA: usize, const NB: usize, const ND: usize> Display for FusedMatmulBlueprint<NA, NB, ND> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "<{}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}, {}> LoopScheduler: {}, PipelineVersion: {}, PrefetchStages: {}, TileOrder: {}",
            self.block_size,
            self.tile.m_per_block,
            self.tile.n_per_block,
            self.tile.k_per_block,
            self.tile.ak1,
            self.tile.bk1,
            self.xdl.m_per_xdl,
            self.xdl.n_per_xdl,
            self.xdl.m_xdl_per_wave,
            self.xdl.n_xdl_per_wave,
            self.a_transfer.src_scalar_per_vector,
            self.b_transfer.src_scalar_per_vector,
            self.cshuffle.scalar_per_vector,
            self.cshuffle.m_xdl_per_wave_per_shuffle,
            self.cshuffle.n_xdl_per_wave_per_shuffle,
            self.specialization,
            self.pipeline.scheduler,
            self.pipeline.version,
            self.pipeline.prefetch_stages,
            self.tile_order,
        )
    }
}

/// Builder for [FusedMatmulBlueprint].
///
/// Starts from a 256 threads, 128x128x32 configuration reading 8 elements at a time, which
/// suits 16-bit inputs on 64 wide waves.
pub struct FusedMatmulBlueprintBuilder<const NA: usize, const NB: usize, const ND: usize> {
    blueprint: FusedMatmulBlueprint<NA, NB, ND>,
}

impl<const NA: usize, const NB: usize, const ND: usize> FusedMatmulBlueprintBuilder<NA, NB, ND> {
    fn new(layouts: OperandLayouts<NA, NB, ND>) -> Self {
        Self {
            blueprint: FusedMatmulBlueprint {
                specialization: GemmSpecialization::Default,
                block_size: 256,
                wave_size: 64,
                tile: BlockTile::new(128, 128, 32, 8, 8),
                xdl: XdlTiling::new(32, 32, 2, 2),
                a_transfer: BlockTransfer::new([4, 64, 1], VectorAxis::K, 8, 8, true),
                b_transfer: BlockTransfer::new([4, 64, 1], VectorAxis::K, 8, 8, true),
                cshuffle: CShuffleEpilogue::new(1, 1, [1, 32, 1, 8], 8),
                pipeline: PipelineConfig::default(),
                layouts,
                tile_order: TileOrder::RowMajor,
            },
        }
    }

    pub fn specialization(mut self, specialization: GemmSpecialization) -> Self {
        self.blueprint.specialization = specialization;
        self
    }

    pub fn block_size(mut self, block_size: u32) -> Self {
        self.blueprint.block_size = block_size;
        self
    }

    pub fn wave_size(mut self, wave_size: u32) -> Self {
        self.blueprint.wave_size = wave_size;
        self
    }

    pub fn tile(mut self, tile: BlockTile) -> Self {
        self.blueprint.tile = tile;
        self
    }

    pub fn xdl(mut self, xdl: XdlTiling) -> Self {
        self.blueprint.xdl = xdl;
        self
    }

    pub fn a_transfer(mut self, transfer: BlockTransfer) -> Self {
        self.blueprint.a_transfer = transfer;
        self
    }

    pub fn b_transfer(mut self, transfer: BlockTransfer) -> Self {
        self.blueprint.b_transfer = transfer;
        self
    }

    pub fn cshuffle(mut self, cshuffle: CShuffleEpilogue) -> Self {
        self.blueprint.cshuffle = cshuffle;
        self
    }

    pub fn pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.blueprint.pipeline = pipeline;
        self
    }

    pub fn tile_order(mut self, tile_order: TileOrder) -> Self {
        self.blueprint.tile_order = tile_order;
        self
    }

    pub fn build(self) -> Result<FusedMatmulBlueprint<NA, NB, ND>, InvalidConfigError> {
        self.blueprint.validate()?;
        Ok(self.blueprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{LoopScheduler, RowMajor};

    type Layouts = OperandLayouts<1, 1, 1>;

    fn layouts() -> Layouts {
        Layouts::new::<RowMajor, RowMajor, RowMajor, RowMajor>()
    }

    #[test_log::test]
    fn default_configuration_is_valid() {
        let blueprint = FusedMatmulBlueprint::builder(layouts()).build().unwrap();

        assert_eq!(blueprint.waves(), (2, 2));
    }

    #[test_log::test]
    fn wave_count_must_fill_the_block() {
        let result = FusedMatmulBlueprint::builder(layouts())
            .block_size(128)
            .build();

        assert!(matches!(result, Err(InvalidConfigError::Mismatch { .. })));
    }

    #[test_log::test]
    fn k_per_block_must_hold_whole_k1_vectors() {
        let result = FusedMatmulBlueprint::builder(layouts())
            .tile(BlockTile::new(128, 128, 36, 8, 4))
            .build();

        assert_eq!(
            result,
            Err(InvalidConfigError::NotDivisible {
                name: "k_per_block",
                value: 36,
                divisor_name: "ak1",
                divisor: 8,
            })
        );
    }

    #[test_log::test]
    fn zero_vector_width_is_rejected() {
        let result = FusedMatmulBlueprint::builder(layouts())
            .cshuffle(CShuffleEpilogue::new(1, 1, [1, 32, 1, 8], 0))
            .build();

        assert_eq!(
            result,
            Err(InvalidConfigError::Zero {
                name: "cde_scalar_per_vector"
            })
        );
    }

    #[test_log::test]
    fn double_buffered_pipeline_needs_two_stages() {
        let result = FusedMatmulBlueprint::builder(layouts())
            .pipeline(PipelineConfig::new(1, PipelineVersion::V2, LoopScheduler::Default))
            .build();

        assert!(matches!(
            result,
            Err(InvalidConfigError::PrefetchStages { stages: 1, .. })
        ));
    }

    #[test_log::test]
    fn describe_lists_tiles_and_pipeline() {
        let blueprint = FusedMatmulBlueprint::builder(layouts())
            .specialization(GemmSpecialization::MNKPadding)
            .build()
            .unwrap();

        assert_eq!(
            blueprint.to_string(),
            "<256, 128, 128, 32, 8, 8, 32, 32, 2, 2, 8, 8, 8, 1, 1, MNKPadding> LoopScheduler: Default, PipelineVersion: v1, PrefetchStages: 1, TileOrder: RowMajor"
        );
    }
}
