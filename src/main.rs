//! MCU Input - surface monitor
//!
//! Shows VU meter and control state decoded from Mackie Control MIDI input,
//! either live from MIDI ports or replayed from a sniffer log.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mcu_input::config::AppConfig;
use mcu_input::monitor::{self, Monitor};
use mcu_input::replay::Replay;
use mcu_input::surface::Surface;
use mcu_input::timer::{ManualClock, SystemClock};

/// MCU Input - decode VU meters and controls from a Mackie Control surface
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// List available MIDI input ports
    #[arg(long)]
    list_ports: bool,

    /// Replay a sniffer log instead of reading live input
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Keep ticking this long after the last replayed message (ms)
    #[arg(long, default_value = "1000")]
    replay_tail_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    if args.list_ports {
        list_ports_formatted()?;
        return Ok(());
    }

    info!("Starting MCU Input...");
    info!("Configuration file: {}", args.config);
    let config = AppConfig::load(&args.config).await?;

    if let Some(path) = args.replay {
        return run_replay(&config, &path, args.replay_tail_ms);
    }

    let mut surface = Surface::from_config(&config, SystemClock::new())?;
    monitor::log_dirty(&mut surface);

    let monitor = Monitor::connect(&config.midi.input_ports)?;
    monitor
        .run(
            &mut surface,
            Duration::from_millis(config.tick_interval_ms),
            shutdown_signal(),
        )
        .await?;

    info!("MCU Input shutdown complete");
    Ok(())
}

fn run_replay(config: &AppConfig, path: &std::path::Path, tail_ms: u64) -> Result<()> {
    use colored::*;

    let clock = ManualClock::new();
    let mut surface = Surface::from_config(config, clock.clone())?;
    surface.registry_mut().take_dirty();

    let replay = Replay::new(clock, config.tick_interval_ms, config.midi.input_ports.clone());
    let stats = replay.run_file(&mut surface, path, tail_ms)?;

    println!("\n{}", "=== Replay Summary ===".bold().cyan());
    println!("  Lines:    {}", stats.lines.to_string().green());
    println!("  Messages: {}", stats.messages.to_string().green());
    println!("  Matched:  {}", stats.matched.to_string().green());
    if stats.skipped > 0 {
        println!("  Skipped:  {}", stats.skipped.to_string().yellow());
    }

    println!("\n{}", "Final State:".bold());
    for (name, element) in surface.registry().iter() {
        println!("  {:<16} {}", name.yellow(), element.describe());
    }
    println!();

    Ok(())
}

fn list_ports_formatted() -> Result<()> {
    use colored::*;

    println!("\n{}", "=== Available MIDI Input Ports ===".bold().cyan());

    let ports = monitor::list_input_ports()?;
    if ports.is_empty() {
        println!("  {}", "No input ports found".dimmed());
    } else {
        for (index, name) in ports.iter().enumerate() {
            println!("  {} {}", format!("[{}]", index).green(), name);
        }
    }
    println!();

    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for CTRL+C: {}", e);
        std::future::pending::<()>().await;
    }
}
