// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/glowbarn-rs

//! Millwright - simulated industrial fleet with predictive maintenance
//!
//! Subcommands:
//! - `run` drives the configured fleet and logs assessments and alerts
//! - `analyze` scores a single sensor snapshot and prints the report
//! - `init-config` writes the default configuration file

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use millwright::core::{EventPayload, EventType};
use millwright::decision::synthetic_load_history;
use millwright::{BaselineModels, Config, DecisionEngine, Engine, SensorSnapshot, NAME, VERSION};

/// Millwright - industrial machine simulation and decision engine
#[derive(Parser, Debug)]
#[command(name = "millwright")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Physics-driven machine simulation with model-backed health assessment")]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Simulate the configured fleet until Ctrl+C
    Run {
        /// Stop after this many seconds instead of waiting for Ctrl+C
        #[arg(long)]
        duration_secs: Option<u64>,
    },

    /// Assess one sensor snapshot and print the maintenance report
    Analyze {
        #[arg(long, default_value = "machine-01")]
        machine_id: String,

        #[arg(long, default_value_t = 1500.0)]
        rpm: f64,

        /// mm/s
        #[arg(long, default_value_t = 0.3)]
        vibration: f64,

        /// °C
        #[arg(long, default_value_t = 40.0)]
        temperature: f64,

        /// A
        #[arg(long, default_value_t = 5.0)]
        current: f64,

        /// Load in percent
        #[arg(long, default_value_t = 50.0)]
        load: f64,

        /// Current power draw in kW, used to synthesize a load history
        #[arg(long, default_value_t = 5.0)]
        load_kw: f64,

        #[arg(long, default_value_t = 75.0)]
        target_load: f64,

        /// Print the result as JSON instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);

    if let Command::InitConfig { force } = args.command {
        init_logging(&args, "info")?;
        if config_path.exists() && !force {
            anyhow::bail!("{:?} already exists (use --force to overwrite)", config_path);
        }
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Config::default().save(&config_path)?;
        info!("Wrote default configuration to {:?}", config_path);
        return Ok(());
    }

    let config = Config::load_or_create(&config_path)?;
    init_logging(&args, &config.log_level)?;

    info!("{} v{}", NAME, VERSION);
    info!("Configuration loaded from {:?}", config_path);

    let rt = tokio::runtime::Runtime::new()?;
    match args.command {
        Command::Run { duration_secs } => rt.block_on(run(config, duration_secs.map(Duration::from_secs))),
        Command::Analyze {
            machine_id,
            rpm,
            vibration,
            temperature,
            current,
            load,
            load_kw,
            target_load,
            json,
        } => {
            let snapshot = SensorSnapshot {
                rpm,
                vibration,
                temperature,
                current,
                load,
                timestamp: Utc::now(),
            };
            rt.block_on(analyze(config, &machine_id, snapshot, load_kw, target_load, json))
        }
        Command::InitConfig { .. } => Ok(()),
    }
}

/// Flags win over `RUST_LOG`, which wins over the configured level
fn init_logging(args: &Args, configured: &str) -> Result<()> {
    let filter = if args.trace {
        EnvFilter::new("trace")
    } else if args.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(configured))
    };

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

async fn run(config: Config, duration: Option<Duration>) -> Result<()> {
    let models = Arc::new(BaselineModels::new(&config.models));
    let mut engine = Engine::new(config, models)?;
    let mut events = engine.event_bus().subscribe_events();

    engine.start().await?;
    info!("{} running", NAME);
    info!("   Press Ctrl+C to shutdown");

    let reporter = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(event.event_type, &event.payload),
                Err(RecvError::Lagged(skipped)) => warn!("Event log lagged, {} event(s) skipped", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => info!("Run duration elapsed"),
                res = tokio::signal::ctrl_c() => res?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    info!("Shutdown signal received after {}s, cleaning up...", engine.uptime());
    engine.stop().await;
    reporter.abort();
    info!("{} shutdown complete", NAME);
    Ok(())
}

fn log_event(event_type: EventType, payload: &EventPayload) {
    match payload {
        EventPayload::Assessment(result) => info!(
            "[{}] health {}/100 risk {}/100 alert {} -> {}",
            result.machine_id, result.health_score, result.risk_score, result.alert_level, result.recommended_action
        ),
        EventPayload::Alert { machine_id, level, message } => {
            warn!("[{}] {} alert: {}", machine_id, level, message)
        }
        EventPayload::Error { machine_id, message } => warn!("[{}] error: {}", machine_id, message),
        EventPayload::Update(_) => tracing::trace!("{:?} event", event_type),
    }
}

async fn analyze(
    config: Config,
    machine_id: &str,
    snapshot: SensorSnapshot,
    load_kw: f64,
    target_load: f64,
    json: bool,
) -> Result<()> {
    let models = Arc::new(BaselineModels::new(&config.models));
    let engine = DecisionEngine::new(models, config.decision.clone());

    let check = engine.quick_check(&snapshot);
    for issue in &check.critical_issues {
        warn!("{}", issue);
    }

    let history = synthetic_load_history(load_kw, config.simulation.history_capacity, &mut rand::thread_rng());
    let result = engine.analyze(machine_id, &snapshot, &history, target_load).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("{}", engine.generate_report(&result));
    }
    Ok(())
}
