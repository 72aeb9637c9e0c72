//! Elementwise transforms applied around the multiplication.
//!
//! The A-side and B-side transforms combine the operands of their group into the single value
//! fed to the multiply-accumulate. The fusion combines the accumulated value with the D
//! operands into the output value. Transforms are pure, owned by value and shared read-only by
//! every thread of the kernel body.

use core::fmt::Debug;

use alloc::{format, string::String};
use num_traits::Float;

/// Transform combining the operands of the A or B group.
pub trait ElementwiseOperation: Clone + Debug + Send + Sync + 'static {
    /// Combine one element of every operand of the group.
    fn apply<T: Float>(&self, inputs: &[T]) -> T;

    /// Whether the transform can combine `arity` operands.
    fn accepts_arity(&self, arity: usize) -> bool {
        arity > 0
    }

    fn name(&self) -> String;
}

/// Transform fusing the accumulated value with the D operands.
pub trait FusionOperation: Clone + Debug + Send + Sync + 'static {
    /// Combine one accumulated value with one element of every D operand.
    fn apply<T: Float>(&self, acc: T, ds: &[T]) -> T;

    /// Whether the transform can read `arity` D operands.
    fn accepts_arity(&self, _arity: usize) -> bool {
        true
    }

    fn name(&self) -> String;
}

fn cast<T: Float>(value: f32) -> T {
    T::from(value).unwrap_or_else(T::nan)
}

/// Forwards its single input untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassThrough;

impl ElementwiseOperation for PassThrough {
    fn apply<T: Float>(&self, inputs: &[T]) -> T {
        inputs[0]
    }

    fn accepts_arity(&self, arity: usize) -> bool {
        arity == 1
    }

    fn name(&self) -> String {
        "PassThrough".into()
    }
}

impl FusionOperation for PassThrough {
    fn apply<T: Float>(&self, acc: T, _ds: &[T]) -> T {
        acc
    }

    fn accepts_arity(&self, arity: usize) -> bool {
        arity == 0
    }

    fn name(&self) -> String {
        "PassThrough".into()
    }
}

/// Sum of every input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Add;

impl ElementwiseOperation for Add {
    fn apply<T: Float>(&self, inputs: &[T]) -> T {
        inputs.iter().fold(T::zero(), |acc, x| acc + *x)
    }

    fn name(&self) -> String {
        "Add".into()
    }
}

impl FusionOperation for Add {
    fn apply<T: Float>(&self, acc: T, ds: &[T]) -> T {
        ds.iter().fold(acc, |acc, d| acc + *d)
    }

    fn name(&self) -> String {
        "Add".into()
    }
}

/// Product of every input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Multiply;

impl ElementwiseOperation for Multiply {
    fn apply<T: Float>(&self, inputs: &[T]) -> T {
        inputs.iter().fold(T::one(), |acc, x| acc * *x)
    }

    fn name(&self) -> String {
        "Multiply".into()
    }
}

impl FusionOperation for Multiply {
    fn apply<T: Float>(&self, acc: T, ds: &[T]) -> T {
        ds.iter().fold(acc, |acc, d| acc * *d)
    }

    fn name(&self) -> String {
        "Multiply".into()
    }
}

/// Scales its single input.
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub scale: f32,
}

impl ElementwiseOperation for Scale {
    fn apply<T: Float>(&self, inputs: &[T]) -> T {
        inputs[0] * cast(self.scale)
    }

    fn accepts_arity(&self, arity: usize) -> bool {
        arity == 1
    }

    fn name(&self) -> String {
        format!("Scale({})", self.scale)
    }
}

/// `max(acc + sum(ds), 0)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AddRelu;

impl FusionOperation for AddRelu {
    fn apply<T: Float>(&self, acc: T, ds: &[T]) -> T {
        let sum = ds.iter().fold(acc, |acc, d| acc + *d);
        sum.max(T::zero())
    }

    fn name(&self) -> String {
        "AddRelu".into()
    }
}

/// `alpha * acc + beta * d0`.
#[derive(new, Debug, Clone, Copy, PartialEq)]
pub struct Bilinear {
    pub alpha: f32,
    pub beta: f32,
}

impl FusionOperation for Bilinear {
    fn apply<T: Float>(&self, acc: T, ds: &[T]) -> T {
        acc * cast(self.alpha) + ds[0] * cast(self.beta)
    }

    fn accepts_arity(&self, arity: usize) -> bool {
        arity == 1
    }

    fn name(&self) -> String {
        format!("Bilinear({}, {})", self.alpha, self.beta)
    }
}

/// The three transforms of one dispatch.
#[derive(new, Debug, Clone)]
pub struct ElementwiseOps<AOp, BOp, CdeOp> {
    pub a_op: AOp,
    pub b_op: BOp,
    pub cde_op: CdeOp,
}
