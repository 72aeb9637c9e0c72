use core::time::Duration;

use crate::{
    components::{
        FusedMatmulProblem, FusedMatmulSetupError, FusedMatmulSpec, StreamConfig,
        elementwise::ElementwiseOps,
    },
    kernels::{FusedMatmulInputs, FusedMatmulOperation, KernelLauncher},
};

/// Launch a fused matmul with `variant`, timed as the global configuration asks.
///
/// Will fail if the variant does not support the problem.
#[allow(clippy::result_large_err)]
pub fn launch<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>(
    variant: &dyn FusedMatmulOperation<S, NA, NB, ND>,
    inputs: FusedMatmulInputs<'_, S, NA, NB, ND>,
    problem: FusedMatmulProblem<NA, NB, ND>,
    ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    launcher: &dyn KernelLauncher<S, NA, NB, ND>,
) -> Result<Duration, FusedMatmulSetupError> {
    launch_with_stream(
        variant,
        inputs,
        problem,
        ops,
        launcher,
        &StreamConfig::default(),
    )
}

/// Launch a fused matmul with `variant`, timed as `stream` asks.
#[allow(clippy::result_large_err)]
pub fn launch_with_stream<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>(
    variant: &dyn FusedMatmulOperation<S, NA, NB, ND>,
    inputs: FusedMatmulInputs<'_, S, NA, NB, ND>,
    problem: FusedMatmulProblem<NA, NB, ND>,
    ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    launcher: &dyn KernelLauncher<S, NA, NB, ND>,
    stream: &StreamConfig,
) -> Result<Duration, FusedMatmulSetupError> {
    let argument = variant.make_argument(inputs, problem, ops);
    variant.check_argument(&argument)?;

    variant.run(&argument, launcher, stream)
}
