use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use pulse_core::Settings;

use crate::context::CliContext;

#[derive(Subcommand)]
pub enum SettingsCommand {
    #[command(about = "Show current settings")]
    Show {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Change one setting (e.g. 'theme dark')")]
    Set {
        #[arg(help = "Setting key, see 'pulse settings show'")]
        key: String,

        #[arg(help = "New value")]
        value: String,
    },

    #[command(about = "Restore default settings")]
    Reset,
}

pub fn handle_settings_command(
    ctx: &CliContext,
    cmd: Option<SettingsCommand>,
) -> anyhow::Result<()> {
    ctx.warn_if_discarded();

    match cmd.unwrap_or(SettingsCommand::Show {
        format: "text".to_string(),
    }) {
        SettingsCommand::Show { format } => cmd_settings_show(ctx, &format),
        SettingsCommand::Set { key, value } => cmd_settings_set(ctx, &key, &value),
        SettingsCommand::Reset => cmd_settings_reset(ctx),
    }
}

fn cmd_settings_show(ctx: &CliContext, format: &str) -> anyhow::Result<()> {
    let settings = ctx.dashboard.store.with(|s| s.settings.clone());

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    println!("{}", "Dashboard Settings".cyan().bold());
    println!();
    println!("{}", settings_table(&settings));

    Ok(())
}

fn settings_table(settings: &Settings) -> Table {
    let defaults = Settings::default().entries();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Key").fg(Color::White),
            Cell::new("Value").fg(Color::White),
            Cell::new("Default").fg(Color::White),
        ]);

    for ((key, value), (_, default)) in settings.entries().into_iter().zip(defaults) {
        let value_cell = if value == default {
            Cell::new(&value)
        } else {
            Cell::new(&value).fg(Color::Yellow)
        };
        table.add_row(vec![Cell::new(key), value_cell, Cell::new(default).fg(Color::DarkGrey)]);
    }

    table
}

fn cmd_settings_set(ctx: &CliContext, key: &str, value: &str) -> anyhow::Result<()> {
    ctx.dashboard.store.set_setting(key, value)?;

    println!(
        "{} Set {} = {}",
        "✓".green().bold(),
        key.bold(),
        value.cyan()
    );
    Ok(())
}

fn cmd_settings_reset(ctx: &CliContext) -> anyhow::Result<()> {
    if ctx.dashboard.store.reset_settings() {
        println!("{} Settings restored to defaults", "✓".green().bold());
    } else {
        println!("{}", "Settings already at defaults.".dimmed());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{PulseConfig, Theme};

    #[test]
    fn test_table_lists_every_setting() {
        let rendered = settings_table(&Settings::default()).to_string();
        for key in pulse_core::store::SETTING_KEYS {
            assert!(rendered.contains(key), "missing {key}");
        }
    }

    #[test]
    fn test_set_and_reset() {
        let mut config = PulseConfig::default();
        config.persist.enabled = false;
        let ctx = CliContext::open(config);

        cmd_settings_set(&ctx, "theme", "dark").unwrap();
        assert_eq!(ctx.dashboard.store.snapshot().settings.theme, Theme::Dark);
        assert!(cmd_settings_set(&ctx, "theme", "plaid").is_err());

        cmd_settings_reset(&ctx).unwrap();
        assert_eq!(ctx.dashboard.store.snapshot().settings.theme, Theme::System);
    }
}
