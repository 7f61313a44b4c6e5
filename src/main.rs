use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use probewatch::{
    Backend, Command, Dashboard, DashboardConfig, HttpBackend, PollLoop, ProbeFilter, Projections,
    Range,
};

#[derive(Parser, Debug)]
#[command(name = "probewatch")]
#[command(about = "Live console view of a field-sensor telemetry backend")]
struct Args {
    /// Backend base URL (overrides the config file)
    #[arg(short, long)]
    url: Option<String>,

    /// Path to a config file; PROBEWATCH_* environment variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Probe whose series feed the charts (defaults to the first visible)
    #[arg(short, long)]
    probe: Option<String>,

    /// Chart range: 1h, 12h, 24h, 7d or 30d
    #[arg(short, long, default_value = "24h")]
    range: Range,

    /// Restrict the view to these probes (repeatable; default: all)
    #[arg(long = "only")]
    only: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = DashboardConfig::load(args.config.as_deref())?;
    if let Some(url) = args.url {
        config.base_url = url;
    }

    let backend = Arc::new(HttpBackend::new(&config.base_url)?);
    info!(backend = backend.description(), "starting poll loop");

    let dashboard = Dashboard::new(config.thresholds());
    let (poll_loop, handle) = PollLoop::new(backend, dashboard, &config);

    // Apply the startup selection before the first ticks land.
    handle.commands.send(Command::SetRange(args.range)).await?;
    if let Some(probe) = args.probe {
        handle.commands.send(Command::SelectProbe(probe)).await?;
    }
    if !args.only.is_empty() {
        handle
            .commands
            .send(Command::SetFilter(ProbeFilter::select(args.only)))
            .await?;
    }

    let poll_task = tokio::spawn(poll_loop.run());

    // Minimal presentation adapter: print a summary whenever the
    // projected state actually changes.
    let mut projections = handle.projections.clone();
    let mut last = Projections::default();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = projections.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = projections.borrow_and_update().clone();
                if snapshot != last {
                    render(&snapshot);
                    last = snapshot;
                }
            }
        }
    }

    handle.commands.send(Command::Shutdown).await.ok();
    poll_task.await??;
    Ok(())
}

fn render(projections: &Projections) {
    let connectivity = if projections.degraded {
        "  [backend unreachable]"
    } else {
        ""
    };
    println!("probes ({}){}", projections.status.len(), connectivity);
    for row in &projections.status {
        let last_seen = row
            .last_seen
            .map(format_ts)
            .unwrap_or_else(|| "no data".to_string());
        println!("  {:<14} {:<8} {}", row.probe_id, row.presence.symbol(), last_seen);
    }

    if let Some(probe) = &projections.chart_probe {
        println!("charts: {} over {}", probe, projections.range);
        for chart in &projections.charts {
            let staleness = if chart.fetch_failed { " (stale)" } else { "" };
            println!("  {:<20} {} points{}", chart.title, chart.points.len(), staleness);
        }
    }

    if !projections.active_alerts.is_empty() {
        println!("active alerts ({})", projections.active_alerts.len());
        for alert in &projections.active_alerts {
            println!(
                "  [{}] {} {}: {} (last seen {})",
                alert.severity.symbol(),
                alert.key.probe_id,
                alert.key.code,
                alert.message,
                format_ts(alert.last_seen),
            );
        }
    }
    println!();
}

fn format_ts(ts: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => "--".to_string(),
    }
}
