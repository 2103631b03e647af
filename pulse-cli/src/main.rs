use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use colored::Colorize;
use pulse_core::{CliErrorDisplay, PulseConfig, PulseError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

mod commands;
mod context;

use commands::{
    handle_demo_command, handle_flags_command, handle_metrics_command, handle_settings_command,
    handle_store_command, FlagsCommand, MetricsCommand, SettingsCommand, StoreCommand,
};
use context::{load_config, CliContext};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const NAME: &str = env!("CARGO_PKG_NAME");

#[derive(Parser)]
#[command(name = "pulse")]
#[command(version = VERSION)]
#[command(about = "Pulse - reactive state layer for the product dashboard")]
#[command(long_about = r#"
Pulse holds the client-side state of the product dashboard: local reactive
atoms for chat, remote desktop, agents, UI and user, plus a global store whose
settings and feature flags survive restarts.

Use 'pulse demo' to run the demo dashboard, 'pulse settings show' and
'pulse flags list' to inspect persisted state.
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    #[arg(
        long,
        global = true,
        env = "PULSE_STORAGE_DIR",
        help = "Directory holding the persisted dashboard state"
    )]
    storage_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the demo dashboard against mock data")]
    Demo {
        #[arg(short, long, default_value_t = 12, help = "Number of metric samples to record")]
        ticks: usize,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Show or change persisted settings")]
    Settings {
        #[command(subcommand)]
        action: Option<SettingsCommand>,
    },

    #[command(about = "Manage feature flags")]
    Flags {
        #[command(subcommand)]
        action: Option<FlagsCommand>,
    },

    #[command(about = "Sample performance metrics")]
    Metrics {
        #[command(subcommand)]
        action: Option<MetricsCommand>,
    },

    #[command(about = "Inspect or clear the persisted store")]
    Store {
        #[command(subcommand)]
        action: Option<StoreCommand>,
    },

    #[command(about = "Show version information")]
    Version {
        #[arg(short, long)]
        detailed: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = load_config(cli.storage_dir.clone());
    match &config {
        Ok(config) => init_logging(cli.verbose, &config.logging.level, config.logging.json_format),
        Err(_) => init_logging(cli.verbose, "warn", false),
    }

    match run(cli, config).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<PulseError>() {
                Some(pulse_err) => {
                    eprint!("{}: {}", "Error".red().bold(), CliErrorDisplay::new(pulse_err))
                }
                None => eprintln!("{}: {}", "Error".red().bold(), e),
            }
            ExitCode::FAILURE
        }
    }
}

/// `--verbose` wins over the configured level, which already folds in
/// `PULSE_LOG_LEVEL` and `RUST_LOG`.
fn log_directive(verbose: bool, configured: &str) -> &str {
    if verbose {
        "debug"
    } else {
        configured
    }
}

fn init_logging(verbose: bool, level: &str, json: bool) {
    let filter = EnvFilter::try_new(log_directive(verbose, level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let layer = if json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };

    tracing_subscriber::registry().with(layer).with(filter).init();
}

async fn run(cli: Cli, config: pulse_core::PulseResult<PulseConfig>) -> anyhow::Result<()> {
    let config = config?;
    if let Commands::Version { detailed } = cli.command {
        return cmd_version(&config, detailed);
    }

    let ctx = CliContext::open(config);
    match cli.command {
        Commands::Demo { ticks, format } => handle_demo_command(&ctx, ticks, &format).await,
        Commands::Settings { action } => handle_settings_command(&ctx, action),
        Commands::Flags { action } => handle_flags_command(&ctx, action),
        Commands::Metrics { action } => handle_metrics_command(&ctx, action).await,
        Commands::Store { action } => handle_store_command(&ctx, action),
        Commands::Version { .. } => Ok(()),
    }
}

fn cmd_version(config: &PulseConfig, detailed: bool) -> anyhow::Result<()> {
    if detailed {
        println!("{}", "Pulse Version Information".cyan().bold());
        println!("{}", "═".repeat(40).dimmed());
        println!("  {:<15} {}", "Version:".bold(), VERSION);
        println!("  {:<15} {}", "Name:".bold(), NAME);
        println!("  {:<15} Apache-2.0", "License:".bold());
        println!();
        println!("  {}", "Endpoints:".bold());
        println!("    API:          {}", config.endpoints.api_base_url);
        println!("    WebSocket:    {}", config.endpoints.ws_url);
        println!("    VNC path:     {}", pulse_core::VNC_WS_PATH);
        println!("    Agent path:   {}", pulse_core::AGENT_API_PATH);
        println!();
        println!("  {}", "Build Information:".bold());
        println!("    Rust Edition: 2021");
        #[cfg(debug_assertions)]
        println!("    Build:        Debug");
        #[cfg(not(debug_assertions))]
        println!("    Build:        Release");
    } else {
        println!("pulse {}", VERSION);
    }

    Ok(())
}
