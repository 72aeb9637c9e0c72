use core::{fmt::Debug, marker::PhantomData};

use half::{bf16, f16};

use super::elementwise::{ElementwiseOperation, FusionOperation};

/// Scalar type stored in one of the fused matmul tensors.
///
/// The host side never does arithmetic on device data; the conversions exist for reference
/// implementations and tests.
pub trait Element: bytemuck::Pod + Debug + Send + Sync + 'static {
    /// Short name used in diagnostics.
    const NAME: &'static str;

    /// Size of one element in bytes.
    fn size() -> usize {
        core::mem::size_of::<Self>()
    }

    fn to_f32(self) -> f32;
    fn from_f32(value: f32) -> Self;
}

impl Element for f32 {
    const NAME: &'static str = "f32";

    fn to_f32(self) -> f32 {
        self
    }

    fn from_f32(value: f32) -> Self {
        value
    }
}

impl Element for f16 {
    const NAME: &'static str = "f16";

    fn to_f32(self) -> f32 {
        f16::to_f32(self)
    }

    fn from_f32(value: f32) -> Self {
        f16::from_f32(value)
    }
}

impl Element for bf16 {
    const NAME: &'static str = "bf16";

    fn to_f32(self) -> f32 {
        bf16::to_f32(self)
    }

    fn from_f32(value: f32) -> Self {
        bf16::from_f32(value)
    }
}

/// Fused matrix multiplication precisions.
pub trait FusedMatmulPrecision: Send + Sync + Copy + 'static {
    /// Element type of the A tensors in global memory.
    type A: Element;
    /// Element type of the B tensors in global memory.
    type B: Element;
    /// Element type A and B are converted to before being staged in shared memory.
    type Compute: Element;
    /// Element type of the accumulator.
    type Acc: Element;
    /// Element type of the accumulator tile once shuffled through shared memory.
    type CShuffle: Element;
    /// Element type of the D tensors.
    type D: Element;
    /// Element type of the output.
    type E: Element;
}

impl FusedMatmulPrecision for f16 {
    type A = f16;
    type B = f16;
    type Compute = f16;
    type Acc = f32;
    type CShuffle = f16;
    type D = f16;
    type E = f16;
}

impl FusedMatmulPrecision for bf16 {
    type A = bf16;
    type B = bf16;
    type Compute = bf16;
    type Acc = f32;
    type CShuffle = bf16;
    type D = bf16;
    type E = bf16;
}

impl FusedMatmulPrecision for f32 {
    type A = f32;
    type B = f32;
    type Compute = f32;
    type Acc = f32;
    type CShuffle = f32;
    type D = f32;
    type E = f32;
}

/// Compile-time parameters shared by a family of fused matmul variants.
pub trait FusedMatmulSpec: Send + Sync + 'static {
    /// Element types of every tensor.
    type Precision: FusedMatmulPrecision;
    /// Transform combining the A operands.
    type AOp: ElementwiseOperation;
    /// Transform combining the B operands.
    type BOp: ElementwiseOperation;
    /// Transform fusing the accumulator with the D operands.
    type CdeOp: FusionOperation;
}

/// Stock [FusedMatmulSpec] built from its parts.
pub struct FusedSpec<MP, AOp, BOp, CdeOp> {
    _phantom: PhantomData<(MP, AOp, BOp, CdeOp)>,
}

impl<MP, AOp, BOp, CdeOp> FusedMatmulSpec for FusedSpec<MP, AOp, BOp, CdeOp>
where
    MP: FusedMatmulPrecision,
    AOp: ElementwiseOperation,
    BOp: ElementwiseOperation,
    CdeOp: FusionOperation,
{
    type Precision = MP;
    type AOp = AOp;
    type BOp = BOp;
    type CdeOp = CdeOp;
}

pub type AsG<S> = <<S as FusedMatmulSpec>::Precision as FusedMatmulPrecision>::A;
pub type BsG<S> = <<S as FusedMatmulSpec>::Precision as FusedMatmulPrecision>::B;
pub type DsG<S> = <<S as FusedMatmulSpec>::Precision as FusedMatmulPrecision>::D;
pub type EG<S> = <<S as FusedMatmulSpec>::Precision as FusedMatmulPrecision>::E;
