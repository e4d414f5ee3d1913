use std::time::{Duration, Instant};

#[cfg(feature = "cli")]
use sysinfo::{Pid, System};

#[derive(Debug, Clone)]
pub struct OperationStats {
    pub operation: String,
    pub elapsed: Duration,
    pub memory_usage_mb: Option<u64>,
}

/// Times named operations and, with the `cli` feature, samples process memory.
pub struct OperationMonitor {
    enabled: bool,
    started: Instant,
    #[cfg(feature = "cli")]
    system: Option<(System, Pid)>,
}

impl OperationMonitor {
    pub fn new(enabled: bool) -> Self {
        #[cfg(feature = "cli")]
        let system = if enabled {
            sysinfo::get_current_pid().ok().map(|pid| {
                let mut system = System::new();
                system.refresh_all();
                (system, pid)
            })
        } else {
            None
        };

        Self {
            enabled,
            started: Instant::now(),
            #[cfg(feature = "cli")]
            system,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Runs `f`, logging how long it took when monitoring is on.
    pub fn track<T>(&mut self, operation: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        if self.enabled {
            let stats = OperationStats {
                operation: operation.to_string(),
                elapsed: start.elapsed(),
                memory_usage_mb: self.memory_mb(),
            };
            log_stats(&stats);
        }
        result
    }

    pub fn log_final_stats(&mut self) {
        if !self.enabled {
            return;
        }
        let stats = OperationStats {
            operation: "total".to_string(),
            elapsed: self.started.elapsed(),
            memory_usage_mb: self.memory_mb(),
        };
        log_stats(&stats);
    }

    #[cfg(feature = "cli")]
    fn memory_mb(&mut self) -> Option<u64> {
        let (system, pid) = self.system.as_mut()?;
        system.refresh_all();
        system.process(*pid).map(|p| p.memory() / 1024 / 1024)
    }

    #[cfg(not(feature = "cli"))]
    fn memory_mb(&mut self) -> Option<u64> {
        None
    }
}

impl Default for OperationMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

fn log_stats(stats: &OperationStats) {
    match stats.memory_usage_mb {
        Some(mb) => tracing::info!(
            "📊 {} took {:.2?} (memory: {}MB)",
            stats.operation,
            stats.elapsed,
            mb
        ),
        None => tracing::info!("📊 {} took {:.2?}", stats.operation, stats.elapsed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_returns_closure_value() {
        let mut monitor = OperationMonitor::new(false);
        assert_eq!(monitor.track("calculate", || 2 + 2), 4);
        assert!(!monitor.is_enabled());
    }

    #[test]
    fn test_enabled_monitor_still_passes_through() {
        let mut monitor = OperationMonitor::new(true);
        let value = monitor.track("render", || "done");
        assert_eq!(value, "done");
        monitor.log_final_stats();
    }
}
