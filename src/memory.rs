//! Resident-memory sampling for the ingestion loop.
//!
//! Three escalating thresholds map the current RSS to a [`MemoryPressure`]
//! level. The ingestion pipeline reacts to each level at batch boundaries; the
//! monitor itself only measures.

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

use crate::config::MemoryConfig;

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressure {
    Normal,
    /// Caches should be cleared
    Elevated,
    /// Storage should be compacted and its connections reopened
    High,
    /// Nothing left to reclaim automatically
    Critical,
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MemoryPressure::Normal => "normal",
            MemoryPressure::Elevated => "elevated",
            MemoryPressure::High => "high",
            MemoryPressure::Critical => "critical",
        };
        write!(f, "{}", s)
    }
}

pub struct MemoryMonitor {
    warning_mb: u64,
    high_mb: u64,
    critical_mb: u64,
    pid: Option<Pid>,
    system: Mutex<System>,
}

impl MemoryMonitor {
    pub fn new(config: &MemoryConfig) -> Self {
        Self {
            warning_mb: config.warning_mb,
            high_mb: config.high_mb,
            critical_mb: config.critical_mb,
            pid: sysinfo::get_current_pid().ok(),
            system: Mutex::new(System::new()),
        }
    }

    pub fn classify(&self, rss_mb: u64) -> MemoryPressure {
        if rss_mb >= self.critical_mb {
            MemoryPressure::Critical
        } else if rss_mb >= self.high_mb {
            MemoryPressure::High
        } else if rss_mb >= self.warning_mb {
            MemoryPressure::Elevated
        } else {
            MemoryPressure::Normal
        }
    }

    /// Resident set size of this process in megabytes, when the platform
    /// reports it
    pub fn resident_mb(&self) -> Option<u64> {
        let pid = self.pid?;
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            ProcessRefreshKind::new().with_memory(),
        );
        system.process(pid).map(|p| p.memory() / BYTES_PER_MB)
    }

    /// Current pressure level; `Normal` when RSS cannot be read
    pub fn sample(&self) -> MemoryPressure {
        self.resident_mb()
            .map(|mb| self.classify(mb))
            .unwrap_or(MemoryPressure::Normal)
    }
}
