use core::fmt::Display;

use serde::{Deserialize, Serialize};

#[derive(new, Clone, Debug, PartialEq, Eq, Hash)]
/// Raw shape of a fused matmul problem, regardless of actual data.
///
/// Strides are the leading dimension of each operand: the distance between two consecutive
/// rows of a row-major operand, or two consecutive columns of a column-major one.
pub struct FusedMatmulProblem<const NA: usize, const NB: usize, const ND: usize> {
    pub m: usize,
    pub n: usize,
    pub k: usize,
    pub stride_as: [usize; NA],
    pub stride_bs: [usize; NB],
    pub stride_ds: [usize; ND],
    pub stride_e: usize,
}

impl<const NA: usize, const NB: usize, const ND: usize> FusedMatmulProblem<NA, NB, ND> {
    /// Kind of multiplication the shapes describe.
    pub fn kind(&self) -> MatmulKind {
        MatmulKind::from_extents(self.m, self.n, self.k)
    }
}

impl<const NA: usize, const NB: usize, const ND: usize> Display for FusedMatmulProblem<NA, NB, ND> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "m={} n={} k={} stride_as={:?} stride_bs={:?} stride_ds={:?} stride_e={}",
            self.m, self.n, self.k, self.stride_as, self.stride_bs, self.stride_ds, self.stride_e
        )
    }
}

/// Interpretation of matrix multiplication based on input shapes.
#[derive(Hash, Eq, PartialEq, Debug, Clone, Copy, Serialize, Deserialize)]
pub enum MatmulKind {
    /// (M, K) @ (K, N) → (M, N), with M, K, N > 1
    General,

    /// (M, K) @ (K, 1) → (M, 1)
    MatVec,

    /// (1, K) @ (K, N) → (1, N)
    VecMat,

    /// (1, 1) @ (1, N) → (1, N)
    ScalarVec,

    /// (M, 1) @ (1, 1) → (M, 1)
    VecScalar,

    /// (1, K) @ (K, 1) → (1, 1)
    InnerProduct,

    /// (M, 1) @ (1, N) → (M, N)
    OuterProduct,

    /// (1, 1) @ (1, 1) → (1, 1)
    ScalarProduct,
}

impl MatmulKind {
    /// Classify the problem from its extents.
    pub fn from_extents(m: usize, n: usize, k: usize) -> Self {
        let scalar = |x: usize| x == 1;

        match (scalar(m), scalar(n), scalar(k)) {
            (true, true, true) => MatmulKind::ScalarProduct,
            (true, true, false) => MatmulKind::InnerProduct,
            (true, false, true) => MatmulKind::ScalarVec,
            (true, false, false) => MatmulKind::VecMat,
            (false, true, true) => MatmulKind::VecScalar,
            (false, true, false) => MatmulKind::MatVec,
            (false, false, true) => MatmulKind::OuterProduct,
            (false, false, false) => MatmulKind::General,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn kind_is_classified_from_extents() {
        assert_eq!(MatmulKind::from_extents(256, 256, 64), MatmulKind::General);
        assert_eq!(MatmulKind::from_extents(256, 1, 64), MatmulKind::MatVec);
        assert_eq!(MatmulKind::from_extents(1, 256, 64), MatmulKind::VecMat);
        assert_eq!(MatmulKind::from_extents(1, 1, 64), MatmulKind::InnerProduct);
        assert_eq!(MatmulKind::from_extents(64, 64, 1), MatmulKind::OuterProduct);
    }
}
