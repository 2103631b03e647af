use std::time::Duration;

use colored::Colorize;
use pulse_core::{
    effects, AgentCapability, AiAgent, DashboardSummary, LogLevel, MessageRole, MockMetrics,
    ModalKind, Notification, Participant, PulseResult, Role, SecurityEvent, SecurityEventKind,
    Severity, Toast, ToastLevel, User,
};
use tracing::{debug, info};

use crate::context::CliContext;

const AGENT_REPLY_DELAY: Duration = Duration::from_millis(40);

/// Drives every part of the dashboard once with canned data and prints the
/// resulting summary.
pub async fn handle_demo_command(ctx: &CliContext, ticks: usize, format: &str) -> anyhow::Result<()> {
    ctx.warn_if_discarded();

    if let Err(e) = run_demo(ctx, ticks).await {
        ctx.dashboard.report_error(&e, "demo");
        return Err(e.into());
    }

    let summary = ctx.dashboard.summary();
    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        print_toasts(ctx);
    }
    Ok(())
}

async fn run_demo(ctx: &CliContext, ticks: usize) -> PulseResult<()> {
    let atoms = &ctx.dashboard.atoms;
    let store = &ctx.dashboard.store;

    store.set_debug_enabled(true);
    store.log(LogLevel::Info, "demo", "demo run started");

    let user = User::new("Ada Operator", "ada@example.com").with_roles(vec![Role::Operator]);
    let user_id = user.id.clone();
    atoms.user.sign_in(user);
    atoms.user.add_role(Role::Admin)?;
    store.record_security_event(SecurityEvent::new(
        SecurityEventKind::Login,
        Severity::Low,
        "operator signed in",
    ));

    // Socket comes up after a few failed attempts.
    store.set_socket_state(pulse_core::SocketState::Connecting);
    for _ in 0..2 {
        store.record_reconnect_attempt();
    }
    let rtt = effects::simulate_latency(20..80).await;
    store.record_latency(rtt.as_millis() as u64);
    store.mark_connected();
    info!(latency_ms = rtt.as_millis() as u64, "demo socket connected");

    let assistant = AiAgent::new("Assistant", "gpt-4o")
        .with_capabilities(vec![AgentCapability::Chat, AgentCapability::CodeGeneration]);
    let operator = AiAgent::new("Operator", "computer-use")
        .with_capabilities(vec![AgentCapability::ComputerUse, AgentCapability::Vision]);
    let assistant_id = atoms.agent.register(assistant);
    let operator_id = atoms.agent.register(operator);
    atoms.agent.select(Some(&assistant_id))?;

    let session_id = atoms.chat.create_session(
        "Release checklist",
        vec![
            Participant::human(&user_id, "Ada Operator"),
            Participant::agent(&assistant_id, "Assistant"),
        ],
    );
    atoms.chat.set_active_session(Some(&session_id))?;

    let prompt = "Summarize today's deploys";
    atoms
        .chat
        .send_message(&session_id, &user_id, MessageRole::User, prompt)?;
    let reply =
        effects::simulate_agent_reply(&atoms.agent, &assistant_id, prompt, AGENT_REPLY_DELAY)
            .await?;
    atoms.chat.send_message(
        &session_id,
        &assistant_id,
        MessageRole::Agent,
        reply.response.as_str(),
    )?;
    debug!(entry_id = %reply.id, "agent reply recorded");

    atoms.vnc.connect("10.0.0.42", 5900);
    effects::simulate_latency(10..30).await;
    atoms.vnc.mark_connected()?;
    atoms.vnc.record_frames(120);
    effects::simulate_agent_reply(
        &atoms.agent,
        &operator_id,
        "Open the deploy dashboard",
        AGENT_REPLY_DELAY,
    )
    .await?;

    let mut mock = MockMetrics::new();
    let mut alerts = 0;
    for metric in mock.take(ticks) {
        for alert in store.record_metric(metric) {
            alerts += 1;
            ctx.dashboard
                .notify(atoms.ui.toast(ToastLevel::Warning, alert.message()).with_title("Performance"));
        }
    }
    store.log(
        LogLevel::Info,
        "demo",
        format!("recorded {} samples, {} alerts", ticks, alerts),
    );

    atoms.ui.add_notification(Notification::new(
        ToastLevel::Info,
        "Deploy finished",
        "api-gateway rolled out to 3/3 regions",
    ));
    atoms.ui.open_modal(ModalKind::Confirm, "Promote build to production?");
    atoms.ui.set_active_view("agents");
    ctx.dashboard
        .notify(Toast::success("Demo dashboard ready").with_duration_ms(2_000));

    Ok(())
}

fn print_summary(summary: &DashboardSummary) {
    let atoms = &summary.atoms;

    println!("{}", "Pulse Dashboard".cyan().bold());
    println!("{}", "═".repeat(40).dimmed());

    println!("  {}", "Session".yellow().bold());
    println!(
        "    User:            {}",
        atoms.user.as_deref().unwrap_or("Guest")
    );
    println!("    Theme:           {}", summary.theme);
    println!(
        "    Network:         {} ({})",
        if summary.online { "online".green() } else { "offline".red() },
        summary.socket
    );
    if let Some(latency) = summary.latency_ms {
        println!("    Latency:         {}ms", latency);
    }
    println!();

    println!("  {}", "Workspace".yellow().bold());
    println!("    Chat sessions:   {}", atoms.active_chat_sessions);
    println!("    Unread messages: {}", atoms.unread_messages);
    println!(
        "    Remote desktop:  {}",
        if atoms.vnc_connected { "connected".green() } else { "disconnected".dimmed() }
    );
    println!("    Agents:          {} ({} busy)", atoms.agents, atoms.busy_agents);
    println!("    Notifications:   {} unread", atoms.unread_notifications);
    println!("    Open modals:     {}", atoms.open_modals);
    println!();

    println!("  {}", "Performance".yellow().bold());
    match &summary.averages {
        Some(avg) => {
            println!("    Samples:         {}", avg.samples);
            println!("    Avg CPU:         {:.1}%", avg.cpu_percent);
            println!("    Avg memory:      {:.1}%", avg.memory_percent);
            println!("    Avg latency:     {:.0}ms", avg.latency_ms);
        }
        None => println!("    {}", "No samples yet.".dimmed()),
    }
    let alerts = format!("{}", summary.open_alerts);
    println!(
        "    Open alerts:     {}",
        if summary.open_alerts > 0 { alerts.red() } else { alerts.green() }
    );
    println!("    Security events: {}", summary.security_events);
    println!();

    println!("  {}", "Feature Flags".yellow().bold());
    for (name, enabled) in &summary.flags {
        let mark = if *enabled { "●".green() } else { "○".dimmed() };
        println!("    {} {}", mark, name);
    }

    if summary.errors > 0 {
        println!();
        println!(
            "  {} {} error(s) recorded",
            "!".red().bold(),
            summary.errors
        );
    }
}

fn print_toasts(ctx: &CliContext) {
    let toasts = ctx.dashboard.atoms.ui.snapshot().visible_toasts();
    if toasts.is_empty() {
        return;
    }

    println!();
    println!("  {}", "Toasts".yellow().bold());
    for toast in toasts {
        let title = toast.title.as_deref().unwrap_or("");
        let line = format!("{} {} {}", toast.level.icon(), title, toast.message);
        let line = match toast.level {
            ToastLevel::Error => line.red(),
            ToastLevel::Warning => line.yellow(),
            ToastLevel::Success => line.green(),
            ToastLevel::Info => line.normal(),
        };
        println!("    {}", line);
    }
}
