use core::time::Duration;

use web_time::Instant;

use crate::config::GlobalConfig;

use super::{LaunchError, LoopStructure};

/// Number of cubes to dispatch along x, y and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CubeCount {
    /// Dispatch a known count of x, y, z cubes.
    Static(u32, u32, u32),
}

impl CubeCount {
    /// Create a new static cube count with the given x = y = z = 1.
    pub fn new_single() -> Self {
        CubeCount::Static(1, 1, 1)
    }

    /// Create a new static cube count with the given x, and y = z = 1.
    pub fn new_1d(x: u32) -> Self {
        CubeCount::Static(x, 1, 1)
    }

    /// Total number of cubes.
    pub fn num_cubes(&self) -> u64 {
        match self {
            CubeCount::Static(x, y, z) => *x as u64 * *y as u64 * *z as u64,
        }
    }
}

/// Number of units in a cube along x, y and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CubeDim {
    /// The number of units in the x axis.
    pub x: u32,
    /// The number of units in the y axis.
    pub y: u32,
    /// The number of units in the z axis.
    pub z: u32,
}

impl CubeDim {
    /// Create a new cube dim with x = y = z = 1.
    pub const fn new_single() -> Self {
        Self { x: 1, y: 1, z: 1 }
    }

    /// Create a new cube dim with the given x, and y = z = 1.
    pub const fn new_1d(x: u32) -> Self {
        Self { x, y: 1, z: 1 }
    }

    /// Total number of units per cube.
    pub const fn num_elems(&self) -> u32 {
        self.x * self.y * self.z
    }
}

/// How a launch is timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamConfig {
    /// Measure the execution time. When disabled the kernel runs once and the reported
    /// duration is zero.
    pub time_kernel: bool,
    /// Untimed launches done before measuring.
    pub cold_iterations: u32,
    /// Launches averaged into the reported duration.
    pub timed_iterations: u32,
}

impl StreamConfig {
    /// Run once without measuring.
    pub const fn untimed() -> Self {
        Self {
            time_kernel: false,
            cold_iterations: 0,
            timed_iterations: 1,
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        let config = GlobalConfig::get();
        Self {
            time_kernel: config.launch.time_kernel,
            cold_iterations: config.launch.cold_iterations,
            timed_iterations: config.launch.timed_iterations,
        }
    }
}

/// Runs `launch` as `stream` asks and returns the mean duration of the timed launches.
///
/// `launch` must only return once the kernel completed.
pub fn time_launch<F>(stream: &StreamConfig, mut launch: F) -> Result<Duration, LaunchError>
where
    F: FnMut() -> Result<(), LaunchError>,
{
    if !stream.time_kernel {
        launch()?;
        return Ok(Duration::ZERO);
    }

    for _ in 0..stream.cold_iterations {
        launch()?;
    }

    let iterations = stream.timed_iterations.max(1);
    let start = Instant::now();
    for _ in 0..iterations {
        launch()?;
    }

    Ok(start.elapsed() / iterations)
}

/// Everything the launcher needs to know about how to dispatch a kernel body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchGeometry {
    pub cube_count: CubeCount,
    pub cube_dim: CubeDim,
    /// Shared memory used by each cube.
    pub shared_memory_bytes: usize,
    pub loop_structure: LoopStructure,
}

/// Selects a kernel body specialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelId {
    /// Name of the kernel body.
    pub body: &'static str,
    pub loop_structure: LoopStructure,
}

impl core::fmt::Display for KernelId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}::{}", self.body, self.loop_structure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test_log::test]
    fn untimed_launch_runs_once() {
        let mut count = 0;
        let elapsed = time_launch(&StreamConfig::untimed(), || {
            count += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 1);
        assert_eq!(elapsed, Duration::ZERO);
    }

    #[test_log::test]
    fn timed_launch_runs_cold_and_timed_iterations() {
        let stream = StreamConfig {
            time_kernel: true,
            cold_iterations: 2,
            timed_iterations: 3,
        };
        let mut count = 0;
        time_launch(&stream, || {
            count += 1;
            Ok(())
        })
        .unwrap();

        assert_eq!(count, 5);
    }

    #[test_log::test]
    fn launch_errors_stop_the_loop() {
        let stream = StreamConfig {
            time_kernel: true,
            cold_iterations: 2,
            timed_iterations: 3,
        };
        let mut count = 0;
        let result = time_launch(&stream, || {
            count += 1;
            Err(LaunchError::Unknown {
                reason: "device lost".to_string(),
            })
        });

        assert!(result.is_err());
        assert_eq!(count, 1);
    }

    #[test_log::test]
    fn kernel_id_names_the_specialization() {
        let id = KernelId {
            body: "gemm",
            loop_structure: LoopStructure::TailOnly,
        };

        assert_eq!(id.to_string(), "gemm::tail_only");
    }
}
