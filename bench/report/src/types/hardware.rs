use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Debug, Serialize, Deserialize, Clone, derive_new::new, PartialEq, Default)]
pub struct BenchmarkHardware {
    pub identifier: Option<String>,
    pub cpu_name: String,
    pub cpu_frequency_mhz: u64,
    pub cpu_cores: usize,
    pub total_memory_mb: u64,
    pub os_name: String,
    pub kernel_version: String,
}

impl BenchmarkHardware {
    /// Probes the local machine. Unknown values are reported as "unknown".
    pub fn detect(identifier: Option<String>) -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_all();
        sys.refresh_memory();

        let (cpu_name, cpu_frequency_mhz) = sys
            .cpus()
            .first()
            .map(|cpu| (cpu.brand().trim().to_string(), cpu.frequency()))
            .unwrap_or_else(|| (String::from("unknown"), 0));

        Self {
            identifier,
            cpu_name,
            cpu_frequency_mhz,
            cpu_cores: sys.cpus().len(),
            total_memory_mb: sys.total_memory() / 1024 / 1024,
            os_name: System::name().unwrap_or_else(|| String::from("unknown")),
            kernel_version: System::kernel_version().unwrap_or_else(|| String::from("unknown")),
        }
    }
}
