use alloc::string::String;
use core::fmt::Debug;

use thiserror::Error;

use super::{MatmulDim, MatrixLayout, OperandIdent};

/// Errors that can occur while setting up or launching a fused matmul.
#[derive(Error, Clone)]
pub enum FusedMatmulSetupError {
    /// The blueprint of a variant is inconsistent.
    #[error("Unable to create the fused matmul variant because the config is invalid\nCaused by:\n  {0}")]
    InvalidConfig(#[from] InvalidConfigError),

    /// An argument that does not pass validation was handed to `run`.
    #[error("Refusing to launch an argument the kernel variant cannot execute\nCaused by:\n  {0}")]
    InvalidArgument(#[from] FusedMatmulInvalidProblem),

    /// The launch collaborator reported a failure.
    #[error("The fused matmul launch failed\nCaused by:\n  {0}")]
    Launch(#[from] LaunchError),

    /// No registered variant accepts the problem.
    #[error("None of the {num_variants} registered fused matmul variants supports the problem")]
    NoSupportedVariant {
        /// How many variants were probed.
        num_variants: usize,
    },
}

impl Debug for FusedMatmulSetupError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

/// Reasons why a kernel variant cannot execute a problem.
///
/// This is never fatal on its own: the caller may try another variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FusedMatmulInvalidProblem {
    /// One of M, N or K is zero.
    #[error("Empty problem, every extent must be positive (m={m}, n={n}, k={k})")]
    EmptyProblem { m: usize, n: usize, k: usize },

    /// An operand group without any operand.
    #[error("At least one A and one B operand are required")]
    MissingOperand,

    /// The layout of an operand is not supported by the epilogue.
    #[error("Operand {ident} must be row-major, got {layout}")]
    UnsupportedLayout {
        ident: OperandIdent,
        layout: MatrixLayout,
    },

    /// The extent along the vectorized axis is not a multiple of the vector width.
    #[error(
        "Operand {ident} is read {scalar_per_vector} elements at a time along {dim}, but {dim}={extent} is not divisible"
    )]
    InvalidVectorAccess {
        ident: OperandIdent,
        dim: MatmulDim,
        extent: usize,
        scalar_per_vector: u32,
    },

    /// The vectorized axis is not contiguous in memory, so only scalar access is allowed.
    #[error(
        "Operand {ident} is not contiguous along its vectorized axis and requires scalar access, got {scalar_per_vector} elements per vector"
    )]
    ScalarAccessRequired {
        ident: OperandIdent,
        scalar_per_vector: u32,
    },

    /// Operands disagree on a shared extent.
    #[error("Operand {ident} has {dim}={actual}, expected {expected}")]
    InconsistentExtent {
        ident: OperandIdent,
        dim: MatmulDim,
        expected: usize,
        actual: usize,
    },

    /// A (padded) extent is not a multiple of the block tile.
    #[error("{dim}={extent} is not a multiple of the block tile {block}, a padding specialization is required")]
    IndivisibleExtent {
        dim: MatmulDim,
        extent: usize,
        block: u32,
    },

    /// The pipeline cannot run this many K iterations.
    #[error("The {pipeline} pipeline does not support {num_k_loop} K iterations")]
    PipelineUnsupported {
        pipeline: String,
        num_k_loop: usize,
    },

    /// The tile map can not cover the output.
    #[error("No valid block to tile mapping for a {m_blocks}x{n_blocks} tile grid")]
    InvalidTileMap { m_blocks: usize, n_blocks: usize },

    /// An operand is too big to be addressed with 32-bit offsets.
    #[error("Operand {ident} spans {bytes} bytes, the maximum is 2GB")]
    TensorTooLarge { ident: OperandIdent, bytes: usize },

    /// A buffer is smaller than the memory its descriptor addresses.
    #[error("Operand {ident} addresses {required} elements, but its buffer holds {available}")]
    BufferTooSmall {
        ident: OperandIdent,
        required: usize,
        available: usize,
    },

    /// A derived descriptor is not a refinement of the problem level descriptor.
    #[error("Descriptor of operand {ident} is inconsistent: {reason}")]
    InvalidDescriptor { ident: OperandIdent, reason: String },

    /// A transform cannot combine the number of operands of its group.
    #[error("Transform {op} cannot combine {arity} operands")]
    InvalidArity { op: String, arity: usize },

    /// The argument was made by another kernel variant.
    #[error("The argument was built for a different kernel variant")]
    ArgumentMismatch,
}

/// Errors raised by an internally inconsistent blueprint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidConfigError {
    /// A size that must be positive is zero.
    #[error("{name} must be positive")]
    Zero { name: &'static str },

    /// A size is not a multiple of another.
    #[error("{name}={value} must be divisible by {divisor_name}={divisor}")]
    NotDivisible {
        name: &'static str,
        value: u32,
        divisor_name: &'static str,
        divisor: u32,
    },

    /// Two values that must be equal differ.
    #[error("{name}={value} must equal {expected_name}={expected}")]
    Mismatch {
        name: &'static str,
        value: u32,
        expected_name: &'static str,
        expected: u32,
    },

    /// Prefetch depth outside what the pipeline supports.
    #[error("Pipeline {version} does not support {stages} prefetch stages")]
    PrefetchStages { version: String, stages: u32 },
}

/// Kernel launch errors reported by the launch collaborator.
#[derive(Error, Clone)]
pub enum LaunchError {
    /// The kernel body is not available on the device.
    #[error("The kernel body is unavailable\nCaused by:\n  {reason}")]
    Unavailable {
        /// The cause of the error.
        reason: String,
    },

    /// Too many resources were requested.
    #[error("Too many resources were requested during launch\n{0}")]
    TooManyResources(#[from] ResourceLimitError),

    /// Unknown launch error.
    #[error("An unknown error happened during launch\nCaused by:\n  {reason}")]
    Unknown {
        /// The cause of the unknown error.
        reason: String,
    },
}

/// Resource limit errors.
#[derive(Error, Clone)]
pub enum ResourceLimitError {
    /// Shared memory exceeds maximum.
    #[error(
        "Too much shared memory requested.\nRequested {requested} bytes, maximum {max} bytes available."
    )]
    SharedMemory {
        /// Value requested.
        requested: usize,
        /// Maximum value.
        max: usize,
    },
    /// Grid exceeds maximum.
    #[error("Cube count exceeds maximum.\nRequested {requested} cubes, max is {max}.")]
    CubeCount {
        /// Value requested.
        requested: u32,
        /// Maximum value.
        max: u32,
    },
}

impl Debug for LaunchError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}

impl Debug for ResourceLimitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_fmt(format_args!("{self}"))
    }
}
