use alloc::format;
use core::{marker::PhantomData, time::Duration};

use crate::{
    components::{
        CubeCount, CubeDim, FusedMatmulBlueprint, FusedMatmulInvalidProblem,
        FusedMatmulSetupError, FusedMatmulSpec, KernelId, LaunchGeometry, StreamConfig,
    },
    config::{dispatch::DispatchLogLevel, log_dispatch},
};

use super::{FusedMatmulArgument, GridwiseFusedMatmul, KernelLaunch, KernelLauncher};

/// Executes arguments.
pub trait Invoker<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>:
    Send + Sync
{
    /// Validates `argument` again, then launches it once through `launcher`.
    ///
    /// Returns the time reported by the launcher. Nothing is launched when the argument is
    /// invalid, and launcher failures are returned as is.
    fn run(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
        launcher: &dyn KernelLauncher<S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, FusedMatmulSetupError>;
}

/// Invoker of kernel body `G` configured with a blueprint.
pub struct FusedMatmulInvoker<S, G, const NA: usize, const NB: usize, const ND: usize> {
    blueprint: FusedMatmulBlueprint<NA, NB, ND>,
    _phantom: PhantomData<(S, G)>,
}

impl<S, G, const NA: usize, const NB: usize, const ND: usize> FusedMatmulInvoker<S, G, NA, NB, ND>
where
    S: FusedMatmulSpec,
    G: GridwiseFusedMatmul,
{
    pub fn new(blueprint: FusedMatmulBlueprint<NA, NB, ND>) -> Self {
        Self {
            blueprint,
            _phantom: PhantomData,
        }
    }

    /// How `argument` is dispatched: one cube per output tile, `block_size` units per cube.
    ///
    /// The loop structure only depends on the padded K extent.
    pub fn launch_geometry(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
    ) -> Result<LaunchGeometry, FusedMatmulInvalidProblem> {
        let tile_map = argument.tile_map();
        let grid_size = tile_map.grid_size();
        let Ok(num_cubes) = u32::try_from(grid_size) else {
            let (m_blocks, n_blocks) = tile_map.tile_counts();
            return Err(FusedMatmulInvalidProblem::InvalidTileMap { m_blocks, n_blocks });
        };

        let first_a = argument
            .problem_descriptors()
            .as_grid_desc_m_k
            .first()
            .ok_or(FusedMatmulInvalidProblem::MissingOperand)?;
        let num_k_loop = first_a.length(1) / self.blueprint.tile.k_per_block as usize;

        Ok(LaunchGeometry {
            cube_count: CubeCount::new_1d(num_cubes),
            cube_dim: CubeDim::new_1d(self.blueprint.block_size),
            shared_memory_bytes: G::shared_memory_bytes::<S::Precision, NA, NB, ND>(
                &self.blueprint,
            ),
            loop_structure: self.blueprint.pipeline.loop_structure(num_k_loop),
        })
    }
}

impl<S, G, const NA: usize, const NB: usize, const ND: usize> Invoker<S, NA, NB, ND>
    for FusedMatmulInvoker<S, G, NA, NB, ND>
where
    S: FusedMatmulSpec,
    G: GridwiseFusedMatmul,
{
    fn run(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
        launcher: &dyn KernelLauncher<S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, FusedMatmulSetupError> {
        let checked = argument
            .check::<G>(&self.blueprint)
            .and_then(|descriptors| Ok((descriptors, self.launch_geometry(argument)?)));

        let (descriptors, geometry) = match checked {
            Ok(checked) => checked,
            Err(reason) => {
                log_dispatch(DispatchLogLevel::Basic, || {
                    format!("[{}] Refusing to launch {}: {reason}", G::NAME, argument.problem())
                });
                return Err(reason.into());
            }
        };

        let kernel = KernelId {
            body: G::NAME,
            loop_structure: geometry.loop_structure,
        };

        log_dispatch(DispatchLogLevel::Full, || {
            let mut msg = format!("[{kernel}] Block descriptors");
            for desc in descriptors.as_grid_desc_ak0_m_ak1.iter() {
                msg += &format!("\n  A {desc}");
            }
            for desc in descriptors.bs_grid_desc_bk0_n_bk1.iter() {
                msg += &format!("\n  B {desc}");
            }
            for desc in descriptors.ds_grid_desc_mblock_mperblock_nblock_nperblock.iter() {
                msg += &format!("\n  D {desc}");
            }
            msg += &format!(
                "\n  E {}",
                descriptors.e_grid_desc_mblock_mperblock_nblock_nperblock
            );
            msg
        });

        let launch = KernelLaunch {
            kernel,
            geometry,
            argument,
            descriptors,
        };
        let elapsed = launcher.launch(&launch, stream)?;

        log_dispatch(DispatchLogLevel::Basic, || {
            format!(
                "[{kernel}] {} cubes of {} units, {} bytes of shared memory, {} => {elapsed:?}",
                geometry.cube_count.num_cubes(),
                geometry.cube_dim.num_elems(),
                geometry.shared_memory_bytes,
                argument.problem(),
            )
        });

        Ok(elapsed)
    }
}
