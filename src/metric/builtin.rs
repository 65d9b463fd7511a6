//! Built-in metrics registered by default.

use std::sync::Arc;

use tracing::warn;

use super::runtime::RuntimeStats;
use super::types::Metric;

/// Name of the built-in memory metric.
pub const MEMORY_USED: &str = "memory.used";
/// Name of the built-in CPU metric.
pub const CPU_USED: &str = "cpu.used";
/// Name of the built-in uptime metric.
pub const UPTIME: &str = "uptime";

/// Query the provider on the blocking pool; `/proc` and sysinfo reads block.
async fn query(stats: Arc<dyn RuntimeStats>, read: fn(&dyn RuntimeStats) -> f64) -> f64 {
    match tokio::task::spawn_blocking(move || read(stats.as_ref())).await {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Runtime stats query failed");
            0.0
        }
    }
}

/// Resident memory, split into anonymous, file-backed and shared pages.
pub fn memory_metric(stats: Arc<dyn RuntimeStats>) -> Metric {
    let anonymous = stats.clone();
    let file = stats.clone();
    let shared = stats;

    Metric::dimensional("Total memory used", "bytes")
        .with_dimension("anonymous", "Anonymous memory (heap and stacks)", move || {
            query(anonymous.clone(), |s| s.memory().anonymous as f64)
        })
        .with_dimension("file", "File-backed memory (binary and mapped files)", move || {
            query(file.clone(), |s| s.memory().file as f64)
        })
        .with_dimension("shared", "Shared memory", move || {
            query(shared.clone(), |s| s.memory().shared as f64)
        })
}

/// CPU time consumed, split into user and system mode.
pub fn cpu_metric(stats: Arc<dyn RuntimeStats>) -> Metric {
    let user = stats.clone();
    let system = stats;

    Metric::dimensional("Total CPU usage", "microseconds")
        .with_dimension("user", "CPU time spent in user mode", move || {
            query(user.clone(), |s| s.cpu().user_micros as f64)
        })
        .with_dimension("system", "CPU time spent in system mode", move || {
            query(system.clone(), |s| s.cpu().system_micros as f64)
        })
}

/// Seconds since the process started.
pub fn uptime_metric(stats: Arc<dyn RuntimeStats>) -> Metric {
    Metric::singular("Application uptime", "seconds", move || {
        query(stats.clone(), |s| s.uptime_seconds())
    })
}

/// The default metric set, in registration order.
pub fn default_metrics(stats: Arc<dyn RuntimeStats>) -> Vec<(String, Metric)> {
    vec![
        (MEMORY_USED.to_string(), memory_metric(stats.clone())),
        (CPU_USED.to_string(), cpu_metric(stats.clone())),
        (UPTIME.to_string(), uptime_metric(stats)),
    ]
}
