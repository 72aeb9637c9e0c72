use std::{sync::Mutex, time::Duration};

use cubecl_fused_matmul::{
    components::{
        EG, Element, FusedMatmulSpec, KernelId, LaunchError, LaunchGeometry, StreamConfig,
        time_launch,
    },
    kernels::{KernelLaunch, KernelLauncher},
};

/// A launch as the dummy device saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedLaunch {
    pub kernel: KernelId,
    pub geometry: LaunchGeometry,
}

/// Device that does no math: every cube marks the output elements it owns with its index.
///
/// Good enough to check which cube writes where without a reference matmul.
#[derive(Default)]
pub struct MarkingLauncher {
    launches: Mutex<Vec<RecordedLaunch>>,
}

impl MarkingLauncher {
    pub fn launches(&self) -> Vec<RecordedLaunch> {
        self.launches.lock().unwrap().clone()
    }
}

impl<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
    KernelLauncher<S, NA, NB, ND> for MarkingLauncher
{
    fn launch(
        &self,
        launch: &KernelLaunch<'_, '_, S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, LaunchError> {
        self.launches.lock().unwrap().push(RecordedLaunch {
            kernel: launch.kernel,
            geometry: launch.geometry,
        });

        time_launch(stream, || {
            mark(launch);
            Ok(())
        })
    }
}

fn mark<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>(
    launch: &KernelLaunch<'_, '_, S, NA, NB, ND>,
) {
    let tile_map = launch.argument.tile_map();
    let e_desc = &launch.descriptors.e_grid_desc_mblock_mperblock_nblock_nperblock;
    let e_grid = unsafe { launch.argument.inputs().e_grid.as_mut_ptr() };
    let (m_per_block, n_per_block) = (e_desc.length(1), e_desc.length(3));

    for block_id in 0..launch.geometry.cube_count.num_cubes() as usize {
        let (m_block, n_block) = tile_map.calculate_bottom_index(block_id);

        for mi in 0..m_per_block {
            for ni in 0..n_per_block {
                if let Some(offset) = e_desc.to_linear(&[m_block, mi, n_block, ni]) {
                    unsafe {
                        *e_grid.add(offset) = EG::<S>::from_f32(block_id as f32);
                    }
                }
            }
        }
    }
}
