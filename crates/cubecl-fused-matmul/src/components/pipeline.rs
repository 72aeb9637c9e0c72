use core::fmt::Display;

use serde::{Deserialize, Serialize};

/// Software pipeline used by the kernel body to overlap global reads with compute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PipelineVersion {
    /// Prefetches a configurable number of K blocks ahead.
    #[default]
    V1,
    /// Double buffered, always two K blocks in flight.
    V2,
}

/// How instructions are interleaved in the main loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopScheduler {
    #[default]
    Default,
    Interwave,
}

/// Which of the two kernel body specializations handles the K loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoopStructure {
    /// Enough K blocks for at least one steady-state pipelined iteration.
    MainLoop,
    /// Only the pipeline fill and drain run.
    TailOnly,
}

impl LoopStructure {
    pub fn has_main_k_block_loop(&self) -> bool {
        matches!(self, LoopStructure::MainLoop)
    }
}

/// Pipelining configuration of a kernel variant.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineConfig {
    /// Number of K blocks in flight.
    pub prefetch_stages: u32,
    pub version: PipelineVersion,
    pub scheduler: LoopScheduler,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            prefetch_stages: 1,
            version: PipelineVersion::V1,
            scheduler: LoopScheduler::Default,
        }
    }
}

impl PipelineConfig {
    /// Whether the pipeline can run `num_k_loop` iterations over K blocks.
    pub fn is_supported(&self, num_k_loop: usize) -> bool {
        match self.version {
            PipelineVersion::V1 => {
                num_k_loop >= 1 && num_k_loop % self.prefetch_stages as usize == 0
            }
            PipelineVersion::V2 => num_k_loop >= 2 && num_k_loop % 2 == 0,
        }
    }

    /// Selects the loop specialization for `num_k_loop` iterations over K blocks.
    pub fn loop_structure(&self, num_k_loop: usize) -> LoopStructure {
        let has_main_loop = match self.version {
            PipelineVersion::V1 => num_k_loop > self.prefetch_stages as usize,
            PipelineVersion::V2 => num_k_loop / 2 > 1,
        };

        match has_main_loop {
            true => LoopStructure::MainLoop,
            false => LoopStructure::TailOnly,
        }
    }
}

impl Display for PipelineVersion {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PipelineVersion::V1 => f.write_str("v1"),
            PipelineVersion::V2 => f.write_str("v2"),
        }
    }
}

impl Display for LoopScheduler {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoopScheduler::Default => f.write_str("Default"),
            LoopScheduler::Interwave => f.write_str("Interwave"),
        }
    }
}

impl Display for LoopStructure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LoopStructure::MainLoop => f.write_str("main_loop"),
            LoopStructure::TailOnly => f.write_str("tail_only"),
        }
    }
}
