use crate::models::PerformanceMetric;

const MEMORY_TOTAL_MB: u64 = 16_384;
const SPIKE_EVERY: u64 = 17;

/// Deterministic synthetic metric series.
///
/// Values oscillate around a steady baseline with a load spike every
/// seventeenth sample, so a long enough run crosses the default alert
/// thresholds.
#[derive(Debug, Clone, Default)]
pub struct MockMetrics {
    step: u64,
}

impl MockMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the series at `step`.
    pub fn starting_at(step: u64) -> Self {
        Self { step }
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn next_metric(&mut self) -> PerformanceMetric {
        let n = self.step;
        self.step += 1;

        let t = n as f32 * 0.5;
        let spike = n > 0 && n % SPIKE_EVERY == 0;

        let cpu = if spike { 92.0 } else { 35.0 + 20.0 * t.sin() };
        let memory_fraction = if spike { 0.9 } else { 0.55 + 0.1 * (t * 0.3).cos() };
        let latency = if spike {
            650
        } else {
            (80.0 + 40.0 * (t * 0.7).sin()).round() as u64
        };
        let fps = if spike { 24.0 } else { 58.0 + 2.0 * t.cos() };

        PerformanceMetric::new(
            cpu.clamp(0.0, 100.0),
            (MEMORY_TOTAL_MB as f32 * memory_fraction) as u64,
            MEMORY_TOTAL_MB,
        )
        .with_latency(latency)
        .with_fps(fps)
    }

    pub fn take(&mut self, count: usize) -> Vec<PerformanceMetric> {
        (0..count).map(|_| self.next_metric()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_is_deterministic() {
        let a: Vec<_> = MockMetrics::new()
            .take(40)
            .into_iter()
            .map(|m| (m.cpu_percent, m.memory_used_mb, m.latency_ms))
            .collect();
        let b: Vec<_> = MockMetrics::new()
            .take(40)
            .into_iter()
            .map(|m| (m.cpu_percent, m.memory_used_mb, m.latency_ms))
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_values_in_range() {
        for metric in MockMetrics::new().take(100) {
            assert!((0.0..=100.0).contains(&metric.cpu_percent));
            assert!(metric.memory_used_mb <= metric.memory_total_mb);
            assert!(metric.fps > 0.0);
        }
    }

    #[test]
    fn test_spike_crosses_defaults() {
        let mut mock = MockMetrics::starting_at(SPIKE_EVERY);
        let spike = mock.next_metric();
        assert!(spike.cpu_percent > 80.0);
        assert!(spike.latency_ms > 500);
        assert_eq!(mock.step(), SPIKE_EVERY + 1);
    }
}
