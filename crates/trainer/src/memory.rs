//! Process Memory Reporting
//!
//! Resident memory of the training process, logged between pipeline stages.

use sysinfo::{Pid, ProcessExt, System, SystemExt};
use tracing::{debug, info};

const MIB: f64 = 1024.0 * 1024.0;

/// Reads this process's resident set size
pub struct MemoryMonitor {
    system: System,
    pid: Option<Pid>,
}

impl MemoryMonitor {
    pub fn new() -> Self {
        Self {
            system: System::new(),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Resident memory in MiB, `None` where the platform does not report it
    pub fn resident_mb(&mut self) -> Option<f64> {
        let pid = self.pid?;
        if !self.system.refresh_process(pid) {
            return None;
        }
        self.system
            .process(pid)
            .map(|process| process.memory() as f64 / MIB)
    }

    /// Log resident memory at info level
    pub fn log(&mut self, stage: &str) {
        match self.resident_mb() {
            Some(mb) => info!("Memory usage after {}: {:.2} MB", stage, mb),
            None => debug!("Memory usage unavailable after {}", stage),
        }
    }

    /// Log resident memory at debug level
    pub fn log_debug(&mut self, stage: &str) {
        if let Some(mb) = self.resident_mb() {
            debug!("Memory usage after {}: {:.2} MB", stage, mb);
        }
    }
}

impl Default for MemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}
