use std::sync::Arc;

use sysinfo::{CpuRefreshKind, MemoryRefreshKind, RefreshKind, System};
use tokio::sync::RwLock;
use tracing::trace;

use crate::models::PerformanceMetric;

/// Samples host CPU and memory usage.
pub struct SystemSampler {
    system: Arc<RwLock<System>>,
}

impl SystemSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing()
                .with_cpu(CpuRefreshKind::everything())
                .with_memory(MemoryRefreshKind::everything()),
        );

        Self {
            system: Arc::new(RwLock::new(system)),
        }
    }

    /// Host usage combined with the caller's view of latency and frame rate.
    pub async fn sample(&self, latency_ms: u64, fps: f32) -> PerformanceMetric {
        let mut system = self.system.write().await;

        system.refresh_cpu_all();
        system.refresh_memory();

        let cpu_percent = system.global_cpu_usage();
        let memory_used_mb = system.used_memory() / 1024 / 1024;
        let memory_total_mb = system.total_memory() / 1024 / 1024;

        trace!(
            cpu_percent,
            memory_used_mb,
            memory_total_mb,
            latency_ms,
            "host metrics sampled"
        );

        PerformanceMetric::new(cpu_percent, memory_used_mb, memory_total_mb)
            .with_latency(latency_ms)
            .with_fps(fps)
    }

    pub async fn cpu_count(&self) -> usize {
        self.system.read().await.cpus().len()
    }

    pub fn host_name(&self) -> Option<String> {
        System::host_name()
    }
}

impl Default for SystemSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for SystemSampler {
    fn clone(&self) -> Self {
        Self {
            system: Arc::clone(&self.system),
        }
    }
}
