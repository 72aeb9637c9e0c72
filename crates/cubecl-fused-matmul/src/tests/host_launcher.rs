use core::time::Duration;
use std::sync::Mutex;

use hashbrown::HashMap;

use crate::{
    components::{
        Element, FusedMatmulSpec, KernelId, LaunchError, StreamConfig, time_launch,
        elementwise::{ElementwiseOperation, FusionOperation},
    },
    kernels::{KernelLaunch, KernelLauncher},
};

/// Runs the fused matmul on the host, one cube after the other.
///
/// Each cube only uses its tile from the block to tile map and the block level descriptors,
/// like the kernel body does, so the output is only right when those are.
#[derive(Default)]
pub struct HostLauncher {
    /// Kernels launched, in order.
    pub launches: Mutex<Vec<KernelId>>,
    /// Number of writes to each output offset, over every launch.
    pub writes: Mutex<HashMap<usize, u32>>,
}

impl HostLauncher {
    pub fn launched(&self) -> Vec<KernelId> {
        self.launches.lock().unwrap().clone()
    }

    pub fn writes(&self) -> HashMap<usize, u32> {
        self.writes.lock().unwrap().clone()
    }
}

impl<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
    KernelLauncher<S, NA, NB, ND> for HostLauncher
{
    fn launch(
        &self,
        launch: &KernelLaunch<'_, '_, S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, LaunchError> {
        self.launches.lock().unwrap().push(launch.kernel);

        time_launch(stream, || {
            execute(launch, &mut self.writes.lock().unwrap());
            Ok(())
        })
    }
}

fn execute<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>(
    launch: &KernelLaunch<'_, '_, S, NA, NB, ND>,
    writes: &mut HashMap<usize, u32>,
) {
    let argument = launch.argument;
    let descriptors = launch.descriptors;
    let inputs = argument.inputs();
    let ops = argument.ops();
    let tile_map = argument.tile_map();

    let as_grid: [&[_]; NA] =
        core::array::from_fn(|i| unsafe { inputs.as_grid[i].as_host_slice() });
    let bs_grid: [&[_]; NB] =
        core::array::from_fn(|i| unsafe { inputs.bs_grid[i].as_host_slice() });
    let ds_grid: [&[_]; ND] =
        core::array::from_fn(|i| unsafe { inputs.ds_grid[i].as_host_slice() });
    let e_grid = unsafe { inputs.e_grid.as_mut_ptr() };

    let a_descs = &descriptors.as_grid_desc_ak0_m_ak1;
    let b_descs = &descriptors.bs_grid_desc_bk0_n_bk1;
    let d_descs = &descriptors.ds_grid_desc_mblock_mperblock_nblock_nperblock;
    let e_desc = &descriptors.e_grid_desc_mblock_mperblock_nblock_nperblock;

    let (ak0, ak1) = (a_descs[0].length(0), a_descs[0].length(2));
    let bk1 = b_descs[0].length(2);
    let (m_per_block, n_per_block) = (e_desc.length(1), e_desc.length(3));

    for block_id in 0..launch.geometry.cube_count.num_cubes() as usize {
        let (m_block, n_block) = tile_map.calculate_bottom_index(block_id);

        for mi in 0..m_per_block {
            for ni in 0..n_per_block {
                let e_index = [m_block, mi, n_block, ni];
                // Padded rows and columns are never written.
                let Some(e_offset) = e_desc.to_linear(&e_index) else {
                    continue;
                };

                let m = m_block * m_per_block + mi;
                let n = n_block * n_per_block + ni;

                let mut acc = 0.0f32;
                for k in 0..ak0 * ak1 {
                    let a: [f32; NA] = core::array::from_fn(|i| {
                        load(as_grid[i], a_descs[i].to_linear(&[k / ak1, m, k % ak1]))
                    });
                    let b: [f32; NB] = core::array::from_fn(|i| {
                        load(bs_grid[i], b_descs[i].to_linear(&[k / bk1, n, k % bk1]))
                    });
                    acc += ops.a_op.apply(&a) * ops.b_op.apply(&b);
                }

                let ds: [f32; ND] = core::array::from_fn(|i| {
                    load(ds_grid[i], d_descs[i].to_linear(&e_index))
                });
                let value = ops.cde_op.apply(acc, &ds);

                unsafe {
                    *e_grid.add(e_offset) = Element::from_f32(value);
                }
                *writes.entry(e_offset).or_insert(0) += 1;
            }
        }
    }
}

// Padding reads as zero.
fn load<E: Element>(buffer: &[E], offset: Option<usize>) -> f32 {
    match offset {
        Some(offset) => buffer[offset].to_f32(),
        None => 0.0,
    }
}
