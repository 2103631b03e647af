use chrono::Utc;
use tracing::{info, warn};

use super::state::{FeatureFlags, Settings, SettingsPatch, SocketState};
use super::Store;
use crate::error::{PulseError, PulseResult};
use crate::models::{
    AlertKind, DebugLog, ErrorRecord, LogLevel, PerformanceAlert, PerformanceMetric,
    SecurityEvent, Theme,
};

impl Store {
    // Settings

    /// Applies a partial update. A patch that would leave any setting out of
    /// range is rejected whole. Returns whether anything changed.
    pub fn update_settings(&self, patch: SettingsPatch) -> PulseResult<bool> {
        self.try_commit("update_settings", |s| patch.apply(&mut s.settings))
    }

    /// Sets one setting from its textual form, e.g. `theme = dark`.
    pub fn set_setting(&self, key: &str, value: &str) -> PulseResult<()> {
        self.try_commit("set_setting", |s| s.settings.set_field(key, value))?;
        Ok(())
    }

    pub fn set_theme(&self, theme: Theme) -> bool {
        self.commit("set_theme", |s| s.settings.theme = theme)
    }

    pub fn reset_settings(&self) -> bool {
        self.commit("reset_settings", |s| s.settings = Settings::default())
    }

    // Performance

    /// Appends a sample and raises an alert for every threshold it exceeds.
    /// Returns the alerts raised.
    pub fn record_metric(&self, metric: PerformanceMetric) -> Vec<PerformanceAlert> {
        let thresholds = self.with(|s| s.settings.thresholds.clone());
        let mut alerts = Vec::new();
        if metric.cpu_percent > thresholds.cpu_percent {
            alerts.push(PerformanceAlert::new(
                AlertKind::Cpu,
                f64::from(metric.cpu_percent),
                f64::from(thresholds.cpu_percent),
            ));
        }
        if metric.memory_percent() > thresholds.memory_percent {
            alerts.push(PerformanceAlert::new(
                AlertKind::Memory,
                f64::from(metric.memory_percent()),
                f64::from(thresholds.memory_percent),
            ));
        }
        if metric.latency_ms > thresholds.latency_ms {
            alerts.push(PerformanceAlert::new(
                AlertKind::Latency,
                metric.latency_ms as f64,
                thresholds.latency_ms as f64,
            ));
        }
        for alert in &alerts {
            warn!(kind = %alert.kind, value = alert.value, threshold = alert.threshold, "performance threshold exceeded");
        }

        let raised = alerts.clone();
        self.commit("record_metric", |s| {
            s.performance.metrics.push(metric);
            for alert in alerts {
                s.performance.alerts.push(alert);
            }
        });
        raised
    }

    pub fn clear_metrics(&self) -> bool {
        self.commit("clear_metrics", |s| {
            s.performance.metrics.clear();
            s.performance.alerts.clear();
        })
    }

    /// Acknowledging an unknown or already acknowledged alert is a no-op.
    pub fn acknowledge_alert(&self, alert_id: &str) -> bool {
        self.commit("acknowledge_alert", |s| {
            for alert in s.performance.alerts.iter_mut() {
                if alert.id == alert_id {
                    alert.acknowledged = true;
                }
            }
        })
    }

    // Security

    pub fn record_security_event(&self, event: SecurityEvent) {
        info!(kind = ?event.kind, severity = ?event.severity, "security event");
        self.commit("record_security_event", |s| {
            s.security.events.push(event);
        });
    }

    pub fn clear_security_events(&self) -> bool {
        self.commit("clear_security_events", |s| s.security.events.clear())
    }

    // Feature flags

    /// Creates the flag if it does not exist yet.
    pub fn set_flag(&self, name: &str, enabled: bool) -> bool {
        self.commit("set_flag", |s| {
            s.feature_flags.set(name, enabled);
        })
    }

    /// Returns the new value.
    pub fn toggle_flag(&self, name: &str) -> PulseResult<bool> {
        let mut enabled = false;
        self.try_commit("toggle_flag", |s| {
            if !s.feature_flags.contains(name) {
                return Err(PulseError::UnknownFeatureFlag(name.to_string()));
            }
            enabled = !s.feature_flags.is_enabled(name);
            s.feature_flags.set(name, enabled);
            Ok(())
        })?;
        Ok(enabled)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.with(|s| s.feature_flags.is_enabled(name))
    }

    pub fn reset_flags(&self) -> bool {
        self.commit("reset_flags", |s| s.feature_flags = FeatureFlags::default())
    }

    // Connectivity

    pub fn set_online(&self, online: bool) -> bool {
        self.commit("set_online", |s| s.connectivity.online = online)
    }

    pub fn set_socket_state(&self, socket: SocketState) -> bool {
        self.commit("set_socket_state", |s| s.connectivity.socket = socket)
    }

    pub fn record_latency(&self, latency_ms: u64) -> bool {
        self.commit("record_latency", |s| {
            s.connectivity.latency_ms = Some(latency_ms)
        })
    }

    /// Returns the attempt number.
    pub fn record_reconnect_attempt(&self) -> u32 {
        let mut attempt = 0;
        self.commit("record_reconnect_attempt", |s| {
            attempt = s.connectivity.reconnect_attempts.saturating_add(1);
            s.connectivity.reconnect_attempts = attempt;
            s.connectivity.socket = SocketState::Reconnecting;
        });
        attempt
    }

    pub fn mark_connected(&self) {
        self.commit("mark_connected", |s| {
            s.connectivity.online = true;
            s.connectivity.socket = SocketState::Connected;
            s.connectivity.reconnect_attempts = 0;
            s.connectivity.last_connected_at = Some(Utc::now());
        });
    }

    // Debug

    pub fn set_debug_enabled(&self, enabled: bool) -> bool {
        self.commit("set_debug_enabled", |s| s.debug.enabled = enabled)
    }

    /// Appends to the debug log. Dropped while debug mode is off.
    pub fn log(&self, level: LogLevel, target: &str, message: impl Into<String>) -> bool {
        let entry = DebugLog::new(level, target, message);
        self.commit("log", |s| {
            if s.debug.enabled {
                s.debug.logs.push(entry);
            }
        })
    }

    pub fn record_error(&self, record: ErrorRecord) {
        self.commit("record_error", |s| {
            s.debug.errors.push(record);
        });
    }

    pub fn clear_logs(&self) -> bool {
        self.commit("clear_logs", |s| {
            s.debug.logs.clear();
            s.debug.errors.clear();
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PulseConfig;
    use crate::models::{SecurityEventKind, Severity};
    use crate::store::{DashboardState, MemoryStorage};
    use std::sync::Arc;

    fn store() -> Store {
        Store::new(&PulseConfig::default(), Arc::new(MemoryStorage::new()))
    }

    #[test]
    fn test_metrics_capped_at_limit() {
        let store = store();
        for i in 0..150 {
            store.record_metric(PerformanceMetric::new(10.0, 100, 1000).with_latency(i));
        }
        let state = store.snapshot();
        assert_eq!(state.performance.metrics.len(), 100);
        assert_eq!(state.performance.metrics.oldest().unwrap().latency_ms, 50);
        assert!(state.performance.alerts.is_empty());
    }

    #[test]
    fn test_thresholds_raise_alerts() {
        let store = store();
        let alerts = store.record_metric(PerformanceMetric::new(95.0, 900, 1000).with_latency(800));
        let kinds: Vec<_> = alerts.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![AlertKind::Cpu, AlertKind::Memory, AlertKind::Latency]);

        let at_threshold = store.record_metric(PerformanceMetric::new(80.0, 100, 1000));
        assert!(at_threshold.is_empty());
    }

    #[test]
    fn test_alerts_capped_at_limit() {
        let store = store();
        for _ in 0..30 {
            store.record_metric(PerformanceMetric::new(99.0, 0, 1000));
        }
        assert_eq!(store.snapshot().performance.alerts.len(), 20);
    }

    #[test]
    fn test_acknowledge_alert_is_idempotent() {
        let store = store();
        let alert = store
            .record_metric(PerformanceMetric::new(99.0, 0, 1000))
            .remove(0);

        assert!(store.acknowledge_alert(&alert.id));
        let version = store.version();
        assert!(!store.acknowledge_alert(&alert.id));
        assert!(!store.acknowledge_alert("missing"));
        assert_eq!(store.version(), version);
        assert_eq!(store.snapshot().performance.unacknowledged_alerts(), 0);
    }

    #[test]
    fn test_derived_performance_views() {
        let store = store();
        assert!(store.latest_metric.get().is_none());
        store.record_metric(PerformanceMetric::new(10.0, 0, 1000));
        store.record_metric(PerformanceMetric::new(30.0, 0, 1000));

        assert_eq!(store.latest_metric.get().unwrap().cpu_percent, 30.0);
        assert_eq!(store.metric_averages.get().unwrap().cpu_percent, 20.0);

        store.clear_metrics();
        assert!(store.metric_averages.get().is_none());
    }

    #[test]
    fn test_security_events_capped() {
        let store = store();
        for _ in 0..120 {
            store.record_security_event(SecurityEvent::new(
                SecurityEventKind::Login,
                Severity::Low,
                "login",
            ));
        }
        assert_eq!(store.snapshot().security.events.len(), 100);
        assert_eq!(store.severity_counts.get().get(&Severity::Low), Some(&100));

        assert!(store.clear_security_events());
        assert!(store.severity_counts.get().is_empty());
    }

    #[test]
    fn test_flags() {
        let store = store();
        assert!(store.is_enabled("vnc_viewer"));
        assert!(!store.toggle_flag("vnc_viewer").unwrap());
        assert!(!store.is_enabled("vnc_viewer"));

        assert!(matches!(
            store.toggle_flag("hyperdrive"),
            Err(PulseError::UnknownFeatureFlag(_))
        ));
        assert!(store.set_flag("hyperdrive", true));
        assert!(store.toggle_flag("hyperdrive").is_ok());

        store.reset_flags();
        assert!(store.is_enabled("vnc_viewer"));
        assert!(!store.snapshot().feature_flags.contains("hyperdrive"));
    }

    #[test]
    fn test_settings_actions() {
        let store = store();
        assert!(store.set_theme(Theme::Dark));
        assert!(!store.set_theme(Theme::Dark));

        store.set_setting("language", "pt").unwrap();
        assert!(store.set_setting("language", "").is_err());
        assert_eq!(store.snapshot().settings.language, "pt");

        assert!(store
            .update_settings(SettingsPatch {
                compact_mode: Some(true),
                ..SettingsPatch::default()
            })
            .unwrap());
        assert!(store.snapshot().settings.compact_mode);

        assert!(store.reset_settings());
        assert_eq!(store.snapshot().settings, Settings::default());
    }

    #[test]
    fn test_invalid_patch_rejected_whole() {
        let store = store();
        let version = store.version();
        let err = store
            .update_settings(SettingsPatch {
                compact_mode: Some(true),
                refresh_interval_secs: Some(0),
                ..SettingsPatch::default()
            })
            .unwrap_err();

        assert!(matches!(err, PulseError::InvalidSetting { .. }));
        assert_eq!(store.version(), version);
        assert!(!store.snapshot().settings.compact_mode);
    }

    #[test]
    fn test_toggle_returns_committed_value() {
        let store = store();
        let flipped = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = flipped.clone();
        let _sub = store.atom().observe(move |s: &DashboardState| {
            sink.lock().unwrap().push(s.feature_flags.is_enabled("debug_panel"));
        });

        assert!(store.toggle_flag("debug_panel").unwrap());
        assert!(!store.toggle_flag("debug_panel").unwrap());
        assert_eq!(*flipped.lock().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_reconnect_attempts_saturate() {
        let store = store();
        store.commit("seed", |s| s.connectivity.reconnect_attempts = u32::MAX - 1);
        assert_eq!(store.record_reconnect_attempt(), u32::MAX);
        assert_eq!(store.record_reconnect_attempt(), u32::MAX);
    }

    #[test]
    fn test_connectivity() {
        let store = store();
        store.set_socket_state(SocketState::Connecting);
        assert_eq!(store.record_reconnect_attempt(), 1);
        assert_eq!(store.record_reconnect_attempt(), 2);
        assert_eq!(store.snapshot().connectivity.socket, SocketState::Reconnecting);

        store.record_latency(42);
        store.mark_connected();
        let connectivity = store.snapshot().connectivity;
        assert_eq!(connectivity.socket, SocketState::Connected);
        assert_eq!(connectivity.reconnect_attempts, 0);
        assert_eq!(connectivity.latency_ms, Some(42));
        assert!(connectivity.last_connected_at.is_some());

        assert!(store.set_online(false));
        assert!(!store.snapshot().connectivity.online);
    }

    #[test]
    fn test_debug_log_only_when_enabled() {
        let store = store();
        assert!(!store.log(LogLevel::Info, "test", "ignored"));

        store.set_debug_enabled(true);
        for i in 0..250 {
            store.log(LogLevel::Debug, "test", format!("line {i}"));
        }
        let logs = store.snapshot().debug.logs;
        assert_eq!(logs.len(), 200);
        assert_eq!(logs.latest().unwrap().message, "line 249");
    }

    #[test]
    fn test_debug_errors_capped() {
        let store = store();
        for i in 0..60 {
            store.record_error(ErrorRecord::new("E9001", format!("e{i}"), "test"));
        }
        assert_eq!(store.snapshot().debug.errors.len(), 50);

        assert!(store.clear_logs());
        assert!(store.snapshot().debug.errors.is_empty());
    }
}
