use core::fmt::Display;

/// One of the operand groups of a fused matmul.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandGroup {
    /// Left-hand operands, combined by the A-side transform.
    A,
    /// Right-hand operands, combined by the B-side transform.
    B,
    /// Auxiliary operands read by the fusion.
    D,
    /// Output.
    E,
}

/// Identifies a single operand.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperandIdent {
    /// Group the operand belongs to.
    pub group: OperandGroup,
    /// Position of the operand in its group.
    pub index: usize,
}

impl OperandIdent {
    /// The output operand.
    pub const OUTPUT: Self = Self {
        group: OperandGroup::E,
        index: 0,
    };
}

impl Display for OperandIdent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.group {
            OperandGroup::A => write!(f, "A{}", self.index),
            OperandGroup::B => write!(f, "B{}", self.index),
            OperandGroup::D => write!(f, "D{}", self.index),
            OperandGroup::E => f.write_str("E"),
        }
    }
}

/// Logical dimensions of the problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatmulDim {
    /// Rows of A and E.
    M,
    /// Columns of B and E.
    N,
    /// Reduction dimension.
    K,
}

impl Display for MatmulDim {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MatmulDim::M => f.write_str("M"),
            MatmulDim::N => f.write_str("N"),
            MatmulDim::K => f.write_str("K"),
        }
    }
}
