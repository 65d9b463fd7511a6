//! Process runtime introspection behind the built-in metrics.
//!
//! Figures are re-queried on every read; nothing is snapshotted at startup.

use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use sysinfo::{Pid, System};
use tracing::debug;

/// CPU time consumed by the process.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuTimes {
    /// Time spent in user mode, in microseconds.
    pub user_micros: u64,
    /// Time spent in kernel mode, in microseconds.
    pub system_micros: u64,
}

/// Resident memory of the process, split by backing.
///
/// The three parts sum to the resident set size.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MemoryUsage {
    /// Anonymous pages (heap, stacks), in bytes.
    pub anonymous: u64,
    /// File-backed pages (binary, mapped files), in bytes.
    pub file: u64,
    /// Shared memory pages, in bytes.
    pub shared: u64,
}

impl MemoryUsage {
    /// Total resident set size in bytes.
    pub fn resident(&self) -> u64 {
        self.anonymous + self.file + self.shared
    }
}

/// Source of CPU, memory and uptime figures.
pub trait RuntimeStats: Send + Sync {
    /// CPU time consumed so far.
    fn cpu(&self) -> CpuTimes;

    /// Current memory usage.
    fn memory(&self) -> MemoryUsage;

    /// Seconds since the process started.
    fn uptime_seconds(&self) -> f64;
}

/// Live figures for the current process.
pub struct ProcessRuntimeStats {
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl ProcessRuntimeStats {
    /// Create a provider for the current process.
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            debug!("Current pid unavailable; process figures will read as zero");
        }
        Self {
            pid,
            system: Mutex::new(System::new()),
        }
    }

    fn with_process<T: Default>(&self, f: impl FnOnce(&sysinfo::Process) -> T) -> T {
        let Some(pid) = self.pid else {
            return T::default();
        };
        let Ok(mut system) = self.system.lock() else {
            return T::default();
        };
        if !system.refresh_process(pid) {
            return T::default();
        }
        system.process(pid).map(f).unwrap_or_default()
    }
}

impl Default for ProcessRuntimeStats {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ProcessRuntimeStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessRuntimeStats")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

impl RuntimeStats for ProcessRuntimeStats {
    fn cpu(&self) -> CpuTimes {
        rusage_cpu_times()
    }

    fn memory(&self) -> MemoryUsage {
        if let Some(usage) = proc_status_memory() {
            return usage;
        }
        // No per-backing breakdown on this platform.
        MemoryUsage {
            anonymous: self.with_process(|p| p.memory()),
            ..MemoryUsage::default()
        }
    }

    fn uptime_seconds(&self) -> f64 {
        match self.with_process(|p| p.start_time()) {
            0 => 0.0,
            started => seconds_since(started, SystemTime::now()),
        }
    }
}

/// Fractional seconds from a unix start time to `now`, never negative.
fn seconds_since(started_unix_secs: u64, now: SystemTime) -> f64 {
    let now = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or_default();
    (now - started_unix_secs as f64).max(0.0)
}

#[cfg(unix)]
fn rusage_cpu_times() -> CpuTimes {
    fn micros(tv: libc::timeval) -> u64 {
        (tv.tv_sec as u64) * 1_000_000 + tv.tv_usec as u64
    }

    // SAFETY: getrusage only writes into the zeroed struct we pass it.
    let usage = unsafe {
        let mut usage: libc::rusage = std::mem::zeroed();
        if libc::getrusage(libc::RUSAGE_SELF, &mut usage) != 0 {
            return CpuTimes::default();
        }
        usage
    };

    CpuTimes {
        user_micros: micros(usage.ru_utime),
        system_micros: micros(usage.ru_stime),
    }
}

#[cfg(not(unix))]
fn rusage_cpu_times() -> CpuTimes {
    CpuTimes::default()
}

#[cfg(target_os = "linux")]
fn proc_status_memory() -> Option<MemoryUsage> {
    let status = std::fs::read_to_string("/proc/self/status").ok()?;
    parse_proc_status(&status)
}

#[cfg(not(target_os = "linux"))]
fn proc_status_memory() -> Option<MemoryUsage> {
    None
}

/// Parse `RssAnon`, `RssFile` and `RssShmem` from `/proc/<pid>/status`.
fn parse_proc_status(status: &str) -> Option<MemoryUsage> {
    let mut anonymous = None;
    let mut file = None;
    let mut shared = None;

    for line in status.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let slot = match key {
            "RssAnon" => &mut anonymous,
            "RssFile" => &mut file,
            "RssShmem" => &mut shared,
            _ => continue,
        };
        // Values are reported as "<n> kB".
        let kib: u64 = rest.split_whitespace().next()?.parse().ok()?;
        *slot = Some(kib * 1024);
    }

    Some(MemoryUsage {
        anonymous: anonymous?,
        file: file?,
        shared: shared?,
    })
}

/// Fixed figures, for tests and demos.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StaticRuntimeStats {
    /// CPU times to report.
    pub cpu: CpuTimes,
    /// Memory usage to report.
    pub memory: MemoryUsage,
    /// Uptime to report.
    pub uptime_seconds: f64,
}

impl RuntimeStats for StaticRuntimeStats {
    fn cpu(&self) -> CpuTimes {
        self.cpu
    }

    fn memory(&self) -> MemoryUsage {
        self.memory
    }

    fn uptime_seconds(&self) -> f64 {
        self.uptime_seconds
    }
}
