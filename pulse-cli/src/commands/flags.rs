use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use pulse_core::FeatureFlags;

use crate::context::CliContext;

#[derive(Subcommand)]
pub enum FlagsCommand {
    #[command(about = "List feature flags")]
    List {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Enable a feature flag, creating it if needed")]
    Enable {
        #[arg(help = "Flag name")]
        name: String,
    },

    #[command(about = "Disable a feature flag, creating it if needed")]
    Disable {
        #[arg(help = "Flag name")]
        name: String,
    },

    #[command(about = "Flip an existing feature flag")]
    Toggle {
        #[arg(help = "Flag name")]
        name: String,
    },

    #[command(about = "Restore the default flag set")]
    Reset,
}

pub fn handle_flags_command(ctx: &CliContext, cmd: Option<FlagsCommand>) -> anyhow::Result<()> {
    ctx.warn_if_discarded();

    match cmd.unwrap_or(FlagsCommand::List {
        format: "text".to_string(),
    }) {
        FlagsCommand::List { format } => cmd_flags_list(ctx, &format),
        FlagsCommand::Enable { name } => cmd_flags_set(ctx, &name, true),
        FlagsCommand::Disable { name } => cmd_flags_set(ctx, &name, false),
        FlagsCommand::Toggle { name } => cmd_flags_toggle(ctx, &name),
        FlagsCommand::Reset => cmd_flags_reset(ctx),
    }
}

fn cmd_flags_list(ctx: &CliContext, format: &str) -> anyhow::Result<()> {
    let flags = ctx.dashboard.store.with(|s| s.feature_flags.clone());

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&flags)?);
        return Ok(());
    }

    println!("{}", "Feature Flags".cyan().bold());
    println!();

    if flags.is_empty() {
        println!("{}", "No feature flags defined.".yellow());
        return Ok(());
    }

    println!("{}", flags_table(&flags));
    println!();
    let enabled = flags.iter().filter(|(_, on)| *on).count();
    println!(
        "{}",
        format!("{} of {} enabled", enabled, flags.len()).dimmed()
    );

    Ok(())
}

fn flags_table(flags: &FeatureFlags) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Flag").fg(Color::White),
            Cell::new("Status").fg(Color::White),
        ]);

    for (name, enabled) in flags.iter() {
        let status = if enabled {
            Cell::new("● enabled").fg(Color::Green)
        } else {
            Cell::new("○ disabled").fg(Color::DarkGrey)
        };
        table.add_row(vec![Cell::new(name), status]);
    }

    table
}

fn cmd_flags_set(ctx: &CliContext, name: &str, enabled: bool) -> anyhow::Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("Flag name must not be empty");
    }

    let changed = ctx.dashboard.store.set_flag(name, enabled);
    let state = if enabled { "enabled".green() } else { "disabled".red() };
    if changed {
        println!("{} {} {}", "✓".green().bold(), name.bold(), state);
    } else {
        println!("{}", format!("{} already {}", name, state).dimmed());
    }
    Ok(())
}

fn cmd_flags_toggle(ctx: &CliContext, name: &str) -> anyhow::Result<()> {
    let enabled = ctx.dashboard.store.toggle_flag(name)?;
    let state = if enabled { "enabled".green() } else { "disabled".red() };
    println!("{} {} {}", "✓".green().bold(), name.bold(), state);
    Ok(())
}

fn cmd_flags_reset(ctx: &CliContext) -> anyhow::Result<()> {
    if ctx.dashboard.store.reset_flags() {
        println!("{} Feature flags restored to defaults", "✓".green().bold());
    } else {
        println!("{}", "Feature flags already at defaults.".dimmed());
    }
    Ok(())
}
