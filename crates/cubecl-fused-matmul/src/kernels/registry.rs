use alloc::{format, string::String, sync::Arc, vec::Vec};
use core::time::Duration;

use crate::{
    components::{
        FusedMatmulProblem, FusedMatmulSetupError, FusedMatmulSpec, StreamConfig,
        elementwise::ElementwiseOps,
    },
    config::{dispatch::DispatchLogLevel, log_dispatch},
};

use super::{FusedMatmulInputs, FusedMatmulOperation, KernelLauncher};

/// Ordered set of variants computing the same fused matmul.
///
/// Variants are probed in insertion order, so the preferred ones should be registered first.
pub struct FusedMatmulRegistry<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize> {
    variants: Vec<Arc<dyn FusedMatmulOperation<S, NA, NB, ND>>>,
}

impl<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize> Default
    for FusedMatmulRegistry<S, NA, NB, ND>
{
    fn default() -> Self {
        Self {
            variants: Vec::new(),
        }
    }
}

impl<S: FusedMatmulSpec, const NA: usize, const NB: usize, const ND: usize>
    FusedMatmulRegistry<S, NA, NB, ND>
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a variant.
    pub fn with<O: FusedMatmulOperation<S, NA, NB, ND> + 'static>(mut self, variant: O) -> Self {
        self.variants.push(Arc::new(variant));
        self
    }

    pub fn push(&mut self, variant: Arc<dyn FusedMatmulOperation<S, NA, NB, ND>>) {
        self.variants.push(variant);
    }

    pub fn len(&self) -> usize {
        self.variants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variants.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Arc<dyn FusedMatmulOperation<S, NA, NB, ND>>> {
        self.variants.get(index)
    }

    pub fn describe_all(&self) -> Vec<String> {
        self.variants.iter().map(|variant| variant.describe()).collect()
    }

    /// Indices of the variants supporting the problem.
    pub fn supported(
        &self,
        inputs: &mut FusedMatmulInputs<'_, S, NA, NB, ND>,
        problem: &FusedMatmulProblem<NA, NB, ND>,
        ops: &ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
    ) -> Vec<usize> {
        self.variants
            .iter()
            .enumerate()
            .filter(|(_, variant)| {
                let argument =
                    variant.make_argument(inputs.reborrow(), problem.clone(), ops.clone());
                variant.is_supported_argument(&argument)
            })
            .map(|(index, _)| index)
            .collect()
    }

    /// Runs the first variant supporting the problem.
    ///
    /// Returns its index and the launch duration. Launch failures are returned as is, the
    /// next variants are only tried when a variant rejects the problem.
    pub fn launch_first_supported(
        &self,
        mut inputs: FusedMatmulInputs<'_, S, NA, NB, ND>,
        problem: FusedMatmulProblem<NA, NB, ND>,
        ops: ElementwiseOps<S::AOp, S::BOp, S::CdeOp>,
        launcher: &dyn KernelLauncher<S, NA, NB, ND>,
        stream: &StreamConfig,
    ) -> Result<(usize, Duration), FusedMatmulSetupError> {
        for (index, variant) in self.variants.iter().enumerate() {
            let argument = variant.make_argument(inputs.reborrow(), problem.clone(), ops.clone());

            if let Err(reason) = variant.check_argument(&argument) {
                log_dispatch(DispatchLogLevel::Basic, || {
                    format!("Variant {index} can't run {problem} ({reason}), trying the next one")
                });
                continue;
            }

            let elapsed = variant.run(&argument, launcher, stream)?;
            return Ok((index, elapsed));
        }

        Err(FusedMatmulSetupError::NoSupportedVariant {
            num_variants: self.variants.len(),
        })
    }
}
