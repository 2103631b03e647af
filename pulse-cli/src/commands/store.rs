use clap::Subcommand;
use colored::Colorize;
use pulse_core::{HydrateOutcome, PersistedSnapshot};

use crate::context::CliContext;

#[derive(Subcommand)]
pub enum StoreCommand {
    #[command(about = "Print where the store is saved")]
    Path,

    #[command(about = "Print the persisted blob")]
    Show {
        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Delete the persisted blob")]
    Clear,
}

pub fn handle_store_command(ctx: &CliContext, cmd: Option<StoreCommand>) -> anyhow::Result<()> {
    match cmd.unwrap_or(StoreCommand::Show {
        format: "text".to_string(),
    }) {
        StoreCommand::Path => cmd_store_path(ctx),
        StoreCommand::Show { format } => cmd_store_show(ctx, &format),
        StoreCommand::Clear => cmd_store_clear(ctx),
    }
}

fn cmd_store_path(ctx: &CliContext) -> anyhow::Result<()> {
    match ctx.storage_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("{}", "No storage directory; state lives in memory.".yellow()),
    }
    Ok(())
}

fn cmd_store_show(ctx: &CliContext, format: &str) -> anyhow::Result<()> {
    let store = &ctx.dashboard.store;
    let raw = store.storage().get_item(store.storage_key())?;

    if format == "json" {
        println!("{}", raw.as_deref().unwrap_or("null"));
        return Ok(());
    }

    println!("{}", "Persisted Store".cyan().bold());
    println!("  {:<12} {}", "Backend:".bold(), store.storage().describe());
    println!("  {:<12} {}", "Key:".bold(), store.storage_key());
    println!(
        "  {:<12} {}",
        "Fields:".bold(),
        store
            .persisted_fields()
            .iter()
            .map(|f| f.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("  {:<12} {}", "Loaded:".bold(), describe_outcome(&ctx.hydrate));
    println!();

    let Some(raw) = raw else {
        println!("{}", "Nothing saved yet.".yellow());
        return Ok(());
    };

    match PersistedSnapshot::parse(&raw) {
        Ok(snapshot) => {
            println!(
                "{}",
                format!("version {}", snapshot.version).dimmed()
            );
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::Value::Object(snapshot.state))?
            );
        }
        Err(e) => {
            println!("{} {}", "!".yellow().bold(), e.to_string().yellow());
            println!("{}", raw.dimmed());
        }
    }

    Ok(())
}

fn cmd_store_clear(ctx: &CliContext) -> anyhow::Result<()> {
    ctx.dashboard.store.clear_persisted()?;
    println!("{} Persisted dashboard state removed", "✓".green().bold());
    Ok(())
}

fn describe_outcome(outcome: &HydrateOutcome) -> String {
    match outcome {
        HydrateOutcome::Empty => "nothing to restore".to_string(),
        HydrateOutcome::Restored => "restored".green().to_string(),
        HydrateOutcome::Discarded(reason) => format!("discarded ({})", reason).yellow().to_string(),
        HydrateOutcome::Disabled => "persistence disabled".dimmed().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulse_core::{PulseConfig, Theme};
    use tempfile::TempDir;

    #[test]
    fn test_clear_removes_file() {
        let temp_dir = TempDir::new().unwrap();
        let mut config = PulseConfig::default();
        config.storage.dir = temp_dir.path().display().to_string();

        let ctx = CliContext::open(config);
        ctx.dashboard.store.set_theme(Theme::Dark);
        let path = ctx.storage_path().unwrap();
        assert!(path.exists());

        cmd_store_clear(&ctx).unwrap();
        assert!(!path.exists());
        assert!(cmd_store_show(&ctx, "text").is_ok());
    }

    #[test]
    fn test_describe_outcome() {
        assert_eq!(describe_outcome(&HydrateOutcome::Empty), "nothing to restore");
        assert!(describe_outcome(&HydrateOutcome::Discarded("bad".into())).contains("bad"));
    }
}
