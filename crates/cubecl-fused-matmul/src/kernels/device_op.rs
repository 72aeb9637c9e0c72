use alloc::{boxed::Box, format, string::String};
use core::{marker::PhantomData, time::Duration};

use crate::{
    components::{
        FusedMatmulBlueprint, FusedMatmulInvalidProblem, FusedMatmulProblem,
        FusedMatmulSetupError, FusedMatmulSpec, LaunchGeometry, StreamConfig,
        elementwise::ElementwiseOps,
    },
    config::{dispatch::DispatchLogLevel, log_dispatch},
};

use super::{
    FusedMatmulArgument, FusedMatmulInputs, FusedMatmulInvoker, GridwiseFusedMatmul, Invoker,
    KernelLauncher,
};

/// A fused matmul kernel variant, with its compile-time configuration hidden.
///
/// Callers hold variants behind this trait to probe many of them with
/// [is_supported_argument](FusedMatmulOperation::is_supported_argument) and run the one they
/// select, without knowing their concrete type.
pub trait FusedMatmulOperation<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>:
    Send + Sync
{
    /// Builds and validates the argument of this variant for one dispatch.
    fn make_argument<'a>(
        &self,
        inputs: FusedMatmulInputs<'a, S, NA, NB, ND>,
        problem: FusedMatmulProblem<NA, NB, ND>,
        ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    ) -> FusedMatmulArgument<'a, S, NA, NB, ND>;

    fn make_invoker(&self) -> Box<dyn Invoker<S, NA, NB, ND>>;

    /// Why this variant cannot execute `argument`, if it can't.
    fn check_argument(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
    ) -> Result<(), FusedMatmulInvalidProblem>;

    /// Whether this variant can execute `argument`.
    ///
    /// Has no side effect, so many variants can be probed concurrently.
    fn is_supported_argument(&self, argument: &FusedMatmulArgument<'_, S, NA, NB, ND>) -> bool {
        self.check_argument(argument).is_ok()
    }

    /// How `argument` would be dispatched.
    fn launch_geometry(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
    ) -> Result<LaunchGeometry, FusedMatmulInvalidProblem>;

    fn run(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
        launcher: &dyn KernelLauncher<S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, FusedMatmulSetupError> {
        self.make_invoker().run(argument, launcher, stream)
    }

    /// Tile sizes, vector widths and pipeline of the variant, for diagnostics only.
    fn describe(&self) -> String;
}

/// Kernel body `G` with a fixed blueprint.
pub struct FusedMatmulVariant<S, G, const NA: usize, const NB: usize, const ND: usize> {
    blueprint: FusedMatmulBlueprint<NA, NB, ND>,
    _phantom: PhantomData<(S, G)>,
}

impl<S, G, const NA: usize, const NB: usize, const ND: usize> FusedMatmulVariant<S, G, NA, NB, ND>
where
    S: FusedMatmulSpec,
    G: GridwiseFusedMatmul,
{
    /// Creates the variant, failing when the blueprint is inconsistent.
    pub fn new(blueprint: FusedMatmulBlueprint<NA, NB, ND>) -> Result<Self, FusedMatmulSetupError> {
        blueprint.validate()?;

        Ok(Self {
            blueprint,
            _phantom: PhantomData,
        })
    }

    pub fn blueprint(&self) -> &FusedMatmulBlueprint<NA, NB, ND> {
        &self.blueprint
    }

    fn invoker(&self) -> FusedMatmulInvoker<S, G, NA, NB, ND> {
        FusedMatmulInvoker::new(self.blueprint)
    }
}

impl<S, G, const NA: usize, const NB: usize, const ND: usize> FusedMatmulOperation<S, NA, NB, ND>
    for FusedMatmulVariant<S, G, NA, NB, ND>
where
    S: FusedMatmulSpec,
    G: GridwiseFusedMatmul,
{
    fn make_argument<'a>(
        &self,
        inputs: FusedMatmulInputs<'a, S, NA, NB, ND>,
        problem: FusedMatmulProblem<NA, NB, ND>,
        ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    ) -> FusedMatmulArgument<'a, S, NA, NB, ND> {
        let argument = FusedMatmulArgument::new::<G>(self.blueprint, inputs, problem, ops);

        if let Some(reason) = argument.rejection() {
            log_dispatch(DispatchLogLevel::Basic, || {
                format!(
                    "[{}] Argument for {} rejected: {reason}",
                    G::NAME,
                    argument.problem()
                )
            });
        }

        argument
    }

    fn make_invoker(&self) -> Box<dyn Invoker<S, NA, NB, ND>> {
        Box::new(self.invoker())
    }

    fn check_argument(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
    ) -> Result<(), FusedMatmulInvalidProblem> {
        argument.check::<G>(&self.blueprint).map(|_| ())
    }

    fn launch_geometry(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
    ) -> Result<LaunchGeometry, FusedMatmulInvalidProblem> {
        self.check_argument(argument)?;
        self.invoker().launch_geometry(argument)
    }

    fn run(
        &self,
        argument: &FusedMatmulArgument<'_, S, NA, NB, ND>,
        launcher: &dyn KernelLauncher<S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<Duration, FusedMatmulSetupError> {
        self.invoker().run(argument, launcher, stream)
    }

    fn describe(&self) -> String {
        format!("{}{}", G::NAME, self.blueprint)
    }
}
