use std::time::Duration;

use clap::Subcommand;
use colored::Colorize;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};
use pulse_core::{
    MetricAverages, MetricsFeed, MockMetrics, PerformanceAlert, PerformanceMetric, SystemSampler,
};
use serde::Serialize;

use crate::context::CliContext;

#[derive(Subcommand)]
pub enum MetricsCommand {
    #[command(about = "Sample this machine's CPU and memory")]
    Sample {
        #[arg(short, long, default_value_t = 3, help = "Number of samples")]
        count: usize,

        #[arg(
            short,
            long,
            default_value_t = 500,
            help = "Delay between samples in milliseconds"
        )]
        interval_ms: u64,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },

    #[command(about = "Record synthetic samples")]
    Mock {
        #[arg(short, long, default_value_t = 20, help = "Number of samples")]
        count: usize,

        #[arg(
            short,
            long,
            default_value = "text",
            help = "Output format (text, json)"
        )]
        format: String,
    },
}

#[derive(Serialize)]
struct MetricsReport {
    samples: Vec<PerformanceMetric>,
    alerts: Vec<PerformanceAlert>,
    averages: Option<MetricAverages>,
}

pub async fn handle_metrics_command(
    ctx: &CliContext,
    cmd: Option<MetricsCommand>,
) -> anyhow::Result<()> {
    ctx.warn_if_discarded();

    match cmd.unwrap_or(MetricsCommand::Sample {
        count: 3,
        interval_ms: 500,
        format: "text".to_string(),
    }) {
        MetricsCommand::Sample {
            count,
            interval_ms,
            format,
        } => {
            let sampler = SystemSampler::new();
            if format != "json" {
                println!(
                    "{} {}",
                    "Sampling".cyan().bold(),
                    sampler.host_name().unwrap_or_else(|| "localhost".to_string())
                );
            }
            let feed = MetricsFeed::System(sampler);
            let report = record(ctx, feed, count, Duration::from_millis(interval_ms)).await;
            print_report(&report, &format)
        }
        MetricsCommand::Mock { count, format } => {
            let feed = MetricsFeed::Mock(MockMetrics::new());
            let report = record(ctx, feed, count, Duration::ZERO).await;
            print_report(&report, &format)
        }
    }
}

async fn record(
    ctx: &CliContext,
    mut feed: MetricsFeed,
    count: usize,
    interval: Duration,
) -> MetricsReport {
    let store = &ctx.dashboard.store;
    let mut samples = Vec::with_capacity(count);
    let mut alerts = Vec::new();

    for i in 0..count {
        if i > 0 && !interval.is_zero() {
            tokio::time::sleep(interval).await;
        }
        let metric = feed.next_metric().await;
        alerts.extend(store.record_metric(metric.clone()));
        samples.push(metric);
    }

    MetricsReport {
        samples,
        alerts,
        averages: store.with(|s| s.performance.averages()),
    }
}

fn print_report(report: &MetricsReport, format: &str) -> anyhow::Result<()> {
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!();
    if report.samples.is_empty() {
        println!("{}", "No samples recorded.".yellow());
        return Ok(());
    }

    println!("{}", samples_table(&report.samples));
    println!();

    if let Some(avg) = &report.averages {
        println!("  {}", "Averages".yellow().bold());
        println!("    CPU:        {:.1}%", avg.cpu_percent);
        println!("    Memory:     {:.1}%", avg.memory_percent);
        println!("    Latency:    {:.0}ms", avg.latency_ms);
        println!("    FPS:        {:.1}", avg.fps);
        println!("    Samples:    {}", avg.samples);
        println!();
    }

    if report.alerts.is_empty() {
        println!("{}", "No thresholds crossed.".green());
    } else {
        println!("  {}", "Alerts".red().bold());
        for alert in &report.alerts {
            println!("    {} {}", "▲".red(), alert.message());
        }
    }

    Ok(())
}

fn samples_table(samples: &[PerformanceMetric]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Time").fg(Color::White),
            Cell::new("CPU").fg(Color::White),
            Cell::new("Memory").fg(Color::White),
            Cell::new("Latency").fg(Color::White),
            Cell::new("FPS").fg(Color::White),
        ]);

    for metric in samples {
        table.add_row(vec![
            Cell::new(metric.timestamp.format("%H:%M:%S%.3f").to_string()),
            Cell::new(format!("{:.1}%", metric.cpu_percent)).fg(load_color(metric.cpu_percent)),
            Cell::new(format!(
                "{:.1}% ({} MB)",
                metric.memory_percent(),
                metric.memory_used_mb
            ))
            .fg(load_color(metric.memory_percent())),
            Cell::new(format!("{}ms", metric.latency_ms)),
            Cell::new(format!("{:.0}", metric.fps)),
        ]);
    }

    table
}

fn load_color(percent: f32) -> Color {
    if percent >= 80.0 {
        Color::Red
    } else if percent >= 50.0 {
        Color::Yellow
    } else {
        Color::Green
    }
}
