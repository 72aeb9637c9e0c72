use super::logger::{LogLevel, LoggerConfig};

/// Configuration of the messages emitted while probing and launching variants.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct DispatchConfig {
    #[serde(default)]
    pub logger: LoggerConfig<DispatchLogLevel>,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum DispatchLogLevel {
    #[serde(rename = "disabled")]
    Disabled,
    /// Rejections with their reason and launches with their duration.
    #[default]
    #[serde(rename = "basic")]
    Basic,
    /// Also every descriptor handed to the kernel body.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for DispatchLogLevel {}

/// Default timing of launches.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LaunchConfig {
    #[serde(default)]
    pub time_kernel: bool,
    #[serde(default = "cold_iterations_default")]
    pub cold_iterations: u32,
    #[serde(default = "timed_iterations_default")]
    pub timed_iterations: u32,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            time_kernel: false,
            cold_iterations: cold_iterations_default(),
            timed_iterations: timed_iterations_default(),
        }
    }
}

fn cold_iterations_default() -> u32 {
    5
}

fn timed_iterations_default() -> u32 {
    50
}
