mod mock;
mod sampler;

pub use mock::MockMetrics;
pub use sampler::SystemSampler;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::{PerformanceAlert, PerformanceMetric};
use crate::store::Store;

const DEFAULT_INTERVAL_SECS: u64 = 5;

/// Where performance samples come from.
#[derive(Clone)]
pub enum MetricsFeed {
    System(SystemSampler),
    Mock(MockMetrics),
}

impl MetricsFeed {
    pub async fn next_metric(&mut self) -> PerformanceMetric {
        match self {
            MetricsFeed::System(sampler) => sampler.sample(0, 60.0).await,
            MetricsFeed::Mock(mock) => mock.next_metric(),
        }
    }
}

/// Records samples into the store on a fixed interval.
pub struct MetricsRecorder {
    store: Arc<Store>,
    feed: Arc<Mutex<MetricsFeed>>,
    interval: Duration,
    is_running: Arc<AtomicBool>,
    task_handle: Mutex<Option<JoinHandle<()>>>,
}

impl MetricsRecorder {
    pub fn new(store: Arc<Store>, feed: MetricsFeed) -> Self {
        Self {
            store,
            feed: Arc::new(Mutex::new(feed)),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            is_running: Arc::new(AtomicBool::new(false)),
            task_handle: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub async fn record_once(&self) -> (PerformanceMetric, Vec<PerformanceAlert>) {
        let metric = self.feed.lock().await.next_metric().await;
        let alerts = self.store.record_metric(metric.clone());
        (metric, alerts)
    }

    pub async fn start(&self) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("metrics recorder is already running");
            return;
        }
        info!(
            interval_ms = self.interval.as_millis() as u64,
            "starting metrics recorder"
        );

        let is_running = Arc::clone(&self.is_running);
        let feed = Arc::clone(&self.feed);
        let store = Arc::clone(&self.store);
        let interval = self.interval;

        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.tick().await;

            while is_running.load(Ordering::SeqCst) {
                timer.tick().await;
                if !is_running.load(Ordering::SeqCst) {
                    break;
                }
                let metric = feed.lock().await.next_metric().await;
                let alerts = store.record_metric(metric);
                debug!(alerts = alerts.len(), "background metric recorded");
            }
        });

        *self.task_handle.lock().await = Some(handle);
    }

    pub async fn stop(&self) {
        if !self.is_running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self.task_handle.lock().await.take() {
            handle.abort();
        }
        info!("metrics recorder stopped");
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PulseConfig;
    use crate::store::MemoryStorage;

    fn store() -> Arc<Store> {
        Arc::new(Store::new(
            &PulseConfig::default(),
            Arc::new(MemoryStorage::new()),
        ))
    }

    #[tokio::test]
    async fn test_record_once_with_mock_feed() {
        let store = store();
        let recorder = MetricsRecorder::new(store.clone(), MetricsFeed::Mock(MockMetrics::new()));

        let (metric, alerts) = recorder.record_once().await;
        assert!(alerts.is_empty());
        assert_eq!(store.latest_metric.get(), Some(metric));
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_recording() {
        let store = store();
        let recorder = MetricsRecorder::new(store.clone(), MetricsFeed::Mock(MockMetrics::new()))
            .with_interval(Duration::from_millis(100));

        recorder.start().await;
        assert!(recorder.is_running());
        tokio::time::sleep(Duration::from_millis(350)).await;
        recorder.stop().await;
        assert!(!recorder.is_running());

        let recorded = store.snapshot().performance.metrics.len();
        assert_eq!(recorded, 3);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.snapshot().performance.metrics.len(), recorded);
    }
}
