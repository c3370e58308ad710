//! System Diagnostics and Status Reporting
//!
//! Runtime environment information for debugging recording setups: the
//! machine a session runs on matters when chasing dropped transfers or
//! display problems on lab computers.

use sysinfo::System;
use tracing::info;

/// System information for diagnostics
#[derive(Debug, Clone)]
pub struct SystemInfo {
    /// Operating system name (e.g., "Linux", "Ubuntu")
    pub os_name: String,

    /// Operating system version string
    pub os_version: String,

    /// Kernel version string
    pub kernel_version: String,

    /// Number of logical CPU cores
    pub cpu_count: usize,

    /// Total system memory in megabytes
    pub total_memory_mb: u64,

    /// System hostname
    pub hostname: String,
}

impl SystemInfo {
    /// Gather system information
    pub fn gather() -> Self {
        let mut sys = System::new_all();
        sys.refresh_all();

        Self {
            os_name: System::name().unwrap_or_else(|| "Unknown".to_string()),
            os_version: System::os_version().unwrap_or_else(|| "Unknown".to_string()),
            kernel_version: System::kernel_version().unwrap_or_else(|| "Unknown".to_string()),
            cpu_count: sys.cpus().len(),
            total_memory_mb: sys.total_memory() / 1024 / 1024,
            hostname: System::host_name().unwrap_or_else(|| "Unknown".to_string()),
        }
    }

    /// Log system information
    pub fn log(&self) {
        info!("=== System Information ===");
        info!("  OS: {} {}", self.os_name, self.os_version);
        info!("  Kernel: {}", self.kernel_version);
        info!("  Hostname: {}", self.hostname);
        info!("  CPUs: {}", self.cpu_count);
        info!("  Memory: {} MB", self.total_memory_mb);
    }

    /// Print system information to stdout
    pub fn print(&self, developer: bool) {
        println!("gazetrack {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("System");
        println!("  OS:       {} {}", self.os_name, self.os_version);
        println!("  Kernel:   {}", self.kernel_version);
        println!("  Hostname: {}", self.hostname);
        println!("  CPUs:     {}", self.cpu_count);
        println!("  Memory:   {} MB", self.total_memory_mb);
        if developer {
            println!();
            println!("Build");
            println!("  Profile:  {}", if cfg!(debug_assertions) { "debug" } else { "release" });
            println!("  Config:   {}", crate::config::Config::default_path().display());
        }
    }
}

/// Log the startup diagnostics banner
pub fn log_startup_diagnostics() {
    SystemInfo::gather().log();
}
