pub mod demo;
pub mod flags;
pub mod metrics;
pub mod settings;
pub mod store;

pub use demo::handle_demo_command;
pub use flags::{handle_flags_command, FlagsCommand};
pub use metrics::{handle_metrics_command, MetricsCommand};
pub use settings::{handle_settings_command, SettingsCommand};
pub use store::{handle_store_command, StoreCommand};
