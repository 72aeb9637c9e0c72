use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    components::{
        BlockTransfer, FusedMatmulBlueprint, FusedMatmulProblem, FusedMatmulSpec, FusedSpec,
        GemmSpecialization, MatrixLayout, OperandLayouts, RowMajor, VectorAxis,
        elementwise::{Add, ElementwiseOperation, ElementwiseOps, FusionOperation, PassThrough},
    },
    kernels::{FusedMatmulInputs, GlobalBuffer, GlobalBufferMut},
};

/// `E = A * B + D0 + D1 + ..` in f32.
pub type AddSpec = FusedSpec<f32, PassThrough, PassThrough, Add>;

/// Value written in the output before launching, to spot elements that are never written.
pub const SENTINEL: f32 = -1024.0;

// All random values are multiples of 1/4 in [-2, 2], so f32 sums are exact.
const PRECISION: i32 = 4;

/// Blueprint reading row-major A along K and row-major B along N, 8 elements at a time.
pub fn row_major_blueprint<const NA: usize, const NB: usize, const ND: usize>(
    specialization: GemmSpecialization,
) -> FusedMatmulBlueprint<NA, NB, ND> {
    FusedMatmulBlueprint::builder(OperandLayouts::new::<RowMajor, RowMajor, RowMajor, RowMajor>())
        .b_transfer(BlockTransfer::new([4, 64, 1], VectorAxis::MN, 8, 8, true))
        .specialization(specialization)
        .build()
        .unwrap()
}

pub fn add_ops() -> ElementwiseOps<PassThrough, PassThrough, Add> {
    ElementwiseOps::new(PassThrough, PassThrough, Add)
}

/// Problem with packed operands: the stride of each operand is its contiguous extent.
pub fn packed_problem<const NA: usize, const NB: usize, const ND: usize>(
    m: usize,
    n: usize,
    k: usize,
    layouts: &OperandLayouts<NA, NB, ND>,
) -> FusedMatmulProblem<NA, NB, ND> {
    FusedMatmulProblem::new(
        m,
        n,
        k,
        layouts.a.map(|layout| match layout {
            MatrixLayout::RowMajor => k,
            MatrixLayout::ColMajor => m,
        }),
        layouts.b.map(|layout| match layout {
            MatrixLayout::RowMajor => n,
            MatrixLayout::ColMajor => k,
        }),
        [n; ND],
        n,
    )
}

/// Host memory of every operand of a problem.
pub struct TestCase<const NA: usize, const NB: usize, const ND: usize> {
    pub problem: FusedMatmulProblem<NA, NB, ND>,
    pub layouts: OperandLayouts<NA, NB, ND>,
    pub as_data: [Vec<f32>; NA],
    pub bs_data: [Vec<f32>; NB],
    pub ds_data: [Vec<f32>; ND],
    pub e_data: Vec<f32>,
}

impl<const NA: usize, const NB: usize, const ND: usize> TestCase<NA, NB, ND> {
    pub fn new(
        problem: FusedMatmulProblem<NA, NB, ND>,
        layouts: OperandLayouts<NA, NB, ND>,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let (m, n, k) = (problem.m, problem.n, problem.k);

        let as_data = core::array::from_fn(|i| {
            let outer = match layouts.a[i] {
                MatrixLayout::RowMajor => m,
                MatrixLayout::ColMajor => k,
            };
            random_values(&mut rng, outer * problem.stride_as[i])
        });
        let bs_data = core::array::from_fn(|i| {
            let outer = match layouts.b[i] {
                MatrixLayout::RowMajor => k,
                MatrixLayout::ColMajor => n,
            };
            random_values(&mut rng, outer * problem.stride_bs[i])
        });
        let ds_data =
            core::array::from_fn(|i| random_values(&mut rng, m * problem.stride_ds[i]));
        let e_data = vec![SENTINEL; m * problem.stride_e];

        Self {
            problem,
            layouts,
            as_data,
            bs_data,
            ds_data,
            e_data,
        }
    }

    pub fn inputs<S: FusedMatmulSpec<Precision = f32>>(&mut self) -> FusedMatmulInputs<'_, S, NA, NB, ND> {
        FusedMatmulInputs::new(
            core::array::from_fn(|i| GlobalBuffer::from_host_slice(&self.as_data[i])),
            core::array::from_fn(|i| GlobalBuffer::from_host_slice(&self.bs_data[i])),
            core::array::from_fn(|i| GlobalBuffer::from_host_slice(&self.ds_data[i])),
            GlobalBufferMut::from_host_slice(&mut self.e_data),
        )
    }

    /// Output expected after the launch, computed straight from the raw matrices.
    pub fn expected<AOp, BOp, CdeOp>(&self, ops: &ElementwiseOps<AOp, BOp, CdeOp>) -> Vec<f32>
    where
        AOp: ElementwiseOperation,
        BOp: ElementwiseOperation,
        CdeOp: FusionOperation,
    {
        let problem = &self.problem;
        let mut expected = vec![SENTINEL; self.e_data.len()];

        for m in 0..problem.m {
            for n in 0..problem.n {
                let mut acc = 0.0f32;
                for k in 0..problem.k {
                    let a: [f32; NA] = core::array::from_fn(|i| {
                        let offset = match self.layouts.a[i] {
                            MatrixLayout::RowMajor => m * problem.stride_as[i] + k,
                            MatrixLayout::ColMajor => m + k * problem.stride_as[i],
                        };
                        self.as_data[i][offset]
                    });
                    let b: [f32; NB] = core::array::from_fn(|i| {
                        let offset = match self.layouts.b[i] {
                            MatrixLayout::RowMajor => k * problem.stride_bs[i] + n,
                            MatrixLayout::ColMajor => k + n * problem.stride_bs[i],
                        };
                        self.bs_data[i][offset]
                    });
                    acc += ops.a_op.apply(&a) * ops.b_op.apply(&b);
                }

                let ds: [f32; ND] =
                    core::array::from_fn(|i| self.ds_data[i][m * problem.stride_ds[i] + n]);
                expected[m * problem.stride_e + n] = ops.cde_op.apply(acc, &ds);
            }
        }

        expected
    }

    /// Offsets of the output elements holding real data.
    pub fn valid_output_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        let problem = &self.problem;
        (0..problem.m)
            .flat_map(move |m| (0..problem.n).map(move |n| m * problem.stride_e + n))
    }
}

pub fn random_values(rng: &mut StdRng, len: usize) -> Vec<f32> {
    (0..len)
        .map(|_| rng.random_range(-2 * PRECISION..=2 * PRECISION) as f32 / PRECISION as f32)
        .collect()
}
