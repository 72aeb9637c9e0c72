//! Runtime dispatch of fused matmul kernel variants.

mod argument;
mod device_op;
mod gridwise;
mod invoker;
mod launcher;
mod registry;

pub use argument::*;
pub use device_op::*;
pub use gridwise::*;
pub use invoker::*;
pub use launcher::*;
pub use registry::*;
