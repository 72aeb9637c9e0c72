use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Memory layout of a matrix operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatrixLayout {
    /// Elements of a row are contiguous.
    RowMajor,
    /// Elements of a column are contiguous.
    ColMajor,
}

impl Display for MatrixLayout {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MatrixLayout::RowMajor => f.write_str("RowMajor"),
            MatrixLayout::ColMajor => f.write_str("ColMajor"),
        }
    }
}

/// Zero sized marker fixing the layout of an operand at compile time.
pub trait LayoutTag: Send + Sync + 'static {
    /// The layout this tag stands for.
    const LAYOUT: MatrixLayout;
}

/// Row-major layout tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct RowMajor;

/// Column-major layout tag.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColMajor;

impl LayoutTag for RowMajor {
    const LAYOUT: MatrixLayout = MatrixLayout::RowMajor;
}

impl LayoutTag for ColMajor {
    const LAYOUT: MatrixLayout = MatrixLayout::ColMajor;
}

/// Layout of every operand of a fused matmul.
///
/// A operands are `M x K`, B operands are `K x N` and D operands as well as E are `M x N`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandLayouts<const NA: usize, const NB: usize, const ND: usize> {
    /// Layout of each A operand.
    pub a: [MatrixLayout; NA],
    /// Layout of each B operand.
    pub b: [MatrixLayout; NB],
    /// Layout of each D operand.
    pub d: [MatrixLayout; ND],
    /// Layout of the output.
    pub e: MatrixLayout,
}

impl<const NA: usize, const NB: usize, const ND: usize> OperandLayouts<NA, NB, ND> {
    /// Every operand of a group shares the layout of its tag.
    pub const fn new<ALayout: LayoutTag, BLayout: LayoutTag, DLayout: LayoutTag, ELayout: LayoutTag>()
    -> Self {
        Self {
            a: [ALayout::LAYOUT; NA],
            b: [BLayout::LAYOUT; NB],
            d: [DLayout::LAYOUT; ND],
            e: ELayout::LAYOUT,
        }
    }
}
