use std::path::PathBuf;

use colored::Colorize;
use pulse_core::{Dashboard, HydrateOutcome, PulseConfig, PulseError, PulseResult};

/// Loaded configuration plus the dashboard opened from it.
pub struct CliContext {
    pub config: PulseConfig,
    pub dashboard: Dashboard,
    pub hydrate: HydrateOutcome,
}

/// Loads configuration without touching the store. `storage_dir` overrides
/// the configured storage directory.
pub fn load_config(storage_dir: Option<PathBuf>) -> PulseResult<PulseConfig> {
    let mut config = PulseConfig::load().map_err(PulseError::from)?;
    if let Some(dir) = storage_dir {
        config.storage.dir = dir.display().to_string();
    }
    Ok(config)
}

impl CliContext {
    pub fn open(config: PulseConfig) -> Self {
        let storage = Dashboard::storage_for(&config);
        let (dashboard, hydrate) = Dashboard::open(&config, storage);
        Self {
            config,
            dashboard,
            hydrate,
        }
    }

    pub fn storage_path(&self) -> Option<PathBuf> {
        self.config
            .storage_dir()
            .map(|dir| dir.join(format!("{}.json", self.config.storage.key)))
    }

    /// Prints a one-line warning when saved state had to be discarded.
    pub fn warn_if_discarded(&self) {
        if let HydrateOutcome::Discarded(reason) = &self.hydrate {
            eprintln!(
                "{} {}",
                "!".yellow().bold(),
                format!("Saved dashboard state was ignored: {}", reason).yellow()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::Theme;
    use tempfile::TempDir;

    fn config_in(dir: &TempDir) -> PulseConfig {
        let mut config = PulseConfig::default();
        config.storage.dir = dir.path().display().to_string();
        config
    }

    #[test]
    fn test_state_survives_reopen() {
        let temp_dir = TempDir::new().unwrap();

        let first = CliContext::open(config_in(&temp_dir));
        assert_eq!(first.hydrate, HydrateOutcome::Empty);
        first.dashboard.store.set_theme(Theme::Dark);
        assert!(first.storage_path().unwrap().exists());

        let second = CliContext::open(config_in(&temp_dir));
        assert_eq!(second.hydrate, HydrateOutcome::Restored);
        assert_eq!(second.dashboard.store.snapshot().settings.theme, Theme::Dark);
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let temp_dir = TempDir::new().unwrap();
        let config = config_in(&temp_dir);
        std::fs::write(
            temp_dir.path().join("pulse-dashboard-store.json"),
            "{ not json",
        )
        .unwrap();

        let ctx = CliContext::open(config);
        assert!(matches!(ctx.hydrate, HydrateOutcome::Discarded(_)));
        assert_eq!(ctx.dashboard.store.snapshot().settings.theme, Theme::System);
    }
}
