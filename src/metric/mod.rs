//! Metrics exposed through the actuator.
//!
//! This module handles:
//! - Singular and dimensional metric definitions
//! - Runtime introspection for CPU, memory and uptime
//! - The built-in metric set

pub mod builtin;
pub mod runtime;
pub mod types;

pub use builtin::{default_metrics, CPU_USED, MEMORY_USED, UPTIME};
pub use runtime::{CpuTimes, MemoryUsage, ProcessRuntimeStats, RuntimeStats, StaticRuntimeStats};
pub use types::{Dimension, Metric, MetricKind, Reading};
