use pipebench_report::sample::ResourceUsage;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tracing::debug;

/// CPU and memory usage of this process, read through sysinfo.
pub(crate) struct ResourceMonitor {
    system: System,
    pid: Pid,
}

impl ResourceMonitor {
    /// `None` where sysinfo cannot identify the current process.
    pub fn new() -> Option<Self> {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => pid,
            Err(e) => {
                debug!("Resource sampling is not available: {e}");
                return None;
            }
        };
        let mut monitor = Self {
            system: System::new(),
            pid,
        };
        // CPU usage is a difference between two refreshes.
        monitor.refresh();
        Some(monitor)
    }

    fn refresh(&mut self) {
        self.system.refresh_cpu_all();
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
    }

    /// Usage since the previous call.
    pub fn sample(&mut self) -> Option<ResourceUsage> {
        self.refresh();
        let process = self.system.process(self.pid)?;
        Some(ResourceUsage {
            process_cpu_percent: f64::from(process.cpu_usage()),
            process_rss_bytes: process.memory(),
            system_cpu_percent: f64::from(self.system.global_cpu_usage()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_process_should_report_resident_memory() {
        let Some(mut monitor) = ResourceMonitor::new() else {
            return;
        };
        let _ballast = vec![1u8; 8 * 1024 * 1024];
        let usage = monitor.sample().unwrap();

        assert!(usage.process_rss_bytes > 0);
        assert!(usage.process_cpu_percent >= 0.0);
        assert!(usage.system_cpu_percent >= 0.0);
    }
}
