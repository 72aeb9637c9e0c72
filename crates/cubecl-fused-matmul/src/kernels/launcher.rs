use core::time::Duration;

use crate::components::{
    FusedMatmulSpec, KernelId, LaunchError, LaunchGeometry, StreamConfig,
    descriptor::BlockDescriptors,
};

use super::FusedMatmulArgument;

/// A validated kernel dispatch.
///
/// Only built by an invoker, after the argument passed validation, so the block level
/// descriptors always exist.
pub struct KernelLaunch<'r, 'a, S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
{
    /// Kernel body and loop structure to run.
    pub kernel: KernelId,
    pub geometry: LaunchGeometry,
    /// Operands, transforms and problem level descriptors.
    pub argument: &'r FusedMatmulArgument<'a, S, NA, NB, ND>,
    pub descriptors: &'r BlockDescriptors<NA, NB, ND>,
}

/// Dispatches kernel bodies on a device.
///
/// Implementations own the device, its streams and the compiled kernel bodies. They must only
/// return once the kernel completed, or with the failure the device reported.
pub trait KernelLauncher<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>:
    Send + Sync
{
    /// Runs `launch` as `stream` asks, see [time_launch](crate::components::time_launch).
    fn launch(
        &self,
        launch: &KernelLaunch<'_, '_, S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, LaunchError>;
}
