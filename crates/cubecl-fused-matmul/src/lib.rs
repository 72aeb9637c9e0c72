//! Fused multiple A/B/D matrix multiplication.
//!
//! Computes `E = cde_op(a_op(A0, A1, ..) * b_op(B0, B1, ..), D0, D1, ..)` with one tiled
//! kernel. This crate owns the host side of that kernel: the tensor descriptors handed to the
//! kernel body, the block to output tile mapping, the legality checks and the runtime
//! polymorphic dispatch over many compile-time variants.

extern crate alloc;

#[macro_use]
extern crate derive_new;

mod base;

/// Global configuration and logging.
pub mod config;
/// Building blocks shared by every fused matmul variant.
pub mod components;
/// Argument, invoker and device operation wiring.
pub mod kernels;

#[cfg(test)]
mod tests;

pub use base::*;
