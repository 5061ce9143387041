//! `canguard` – command line front end for the CAN safety engine.
//!
//! 1. Loads `~/.canguard/config.toml` (or `--config <path>`), applying
//!    `CANGUARD_*` environment overrides.
//! 2. Initialises `tracing` (`RUST_LOG`, `CANGUARD_LOG_FORMAT=json`).
//! 3. Runs one subcommand:
//!    - `modes` – list the safety modes and their ids;
//!    - `replay <log>` – feed a frame log through the engine and print every
//!      decision;
//!    - `soak` – run the CAN-FD loopback soak in-process;
//!    - `init` – write the effective configuration to the config file.

mod config;
mod replay;
mod soak;
mod telemetry;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use canguard_hal::{SimTimer, gm_database};
use canguard_kernel::SafetyEngine;
use canguard_types::SafetyMode;
use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing::info;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "CAN bus safety policy engine")]
struct Cli {
    /// Config file (default: ~/.canguard/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List safety modes and their numeric ids
    Modes,
    /// Replay a frame log through the engine
    Replay {
        /// Log file, one `<ts_us> <rx|tx|tick> <bus> <addr_hex>#<data_hex>` per line
        log: PathBuf,
        /// Print one JSON object per line instead of a table
        #[arg(long)]
        json: bool,
        /// Override the configured safety mode (name or id)
        #[arg(long)]
        mode: Option<String>,
        /// Override the configured safety param
        #[arg(long)]
        param: Option<u16>,
    },
    /// Run the CAN-FD loopback soak
    Soak {
        #[arg(long, default_value_t = 100)]
        batches: usize,
        #[arg(long, default_value_t = 200)]
        rounds: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the effective configuration to the config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config.clone().unwrap_or_else(config::config_path);
    let cfg = config::load_from(&path)
        .with_context(|| format!("loading {}", path.display()))?
        .unwrap_or_else(|| {
            let mut cfg = Config::default();
            config::apply_env_overrides(&mut cfg);
            cfg
        });

    telemetry::init_tracing(cfg.log_format);
    info!(config = %path.display(), mode = %cfg.safety_mode, "canguard starting");

    match cli.command {
        Command::Modes => print_modes(),
        Command::Replay { log, json, mode, param } => run_replay(&cfg, &log, json, mode.as_deref(), param)?,
        Command::Soak { batches, rounds, seed, json } => run_soak(batches, rounds, seed, json)?,
        Command::Init { force } => run_init(&cfg, &path, force)?,
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Subcommands
// ─────────────────────────────────────────────────────────────────────────────

fn print_modes() {
    println!("  {:<12} {}", "MODE".bold(), "ID".bold());
    for mode in SafetyMode::ALL {
        println!("  {:<12} {}", mode.to_string().cyan(), mode.id());
    }
}

fn run_replay(cfg: &Config, log: &Path, json: bool, mode: Option<&str>, param: Option<u16>) -> Result<()> {
    let mode = match mode {
        Some(raw) => match config::parse_safety_mode(raw) {
            Some(mode) => mode,
            None => bail!("unknown safety mode {raw:?}"),
        },
        None => cfg.safety_mode,
    };
    let param = param.unwrap_or(cfg.safety_param);

    let text = std::fs::read_to_string(log).with_context(|| format!("reading {}", log.display()))?;
    let lines = replay::parse_log(&text)?;

    let timer = SimTimer::new();
    if let Some(first) = lines.first() {
        timer.set(first.ts_us);
    }
    let mut engine = SafetyEngine::new(gm_database(), timer.clone());
    engine.set_safety_hooks(mode.id(), param)?;
    engine.set_alternative_experience(cfg.alternative_experience);
    info!(%mode, param, events = lines.len(), "replaying");

    let records = replay::replay(&mut engine, &timer, &lines);
    for record in &records {
        if json {
            println!("{}", serde_json::to_string(record)?);
            continue;
        }
        let verdict = match record.accepted {
            Some(true) => "ok".green(),
            Some(false) => "DENY".red().bold(),
            None => "-".dimmed(),
        };
        let frame = match (record.bus, record.address) {
            (Some(bus), Some(address)) => format!("bus {bus} {address:#x}"),
            _ => String::new(),
        };
        let forward = record.forward.map(|b| format!("-> bus {b}")).unwrap_or_default();
        let state = if record.relay_malfunction {
            "RELAY FAULT".red().bold()
        } else if record.controls_allowed {
            "engaged".green()
        } else {
            "disengaged".dimmed()
        };
        println!(
            "  {:>10}  {:<4} {:<18} {:<5} {:<10} {}",
            record.ts_us, record.kind, frame, verdict, forward, state
        );
    }
    Ok(())
}

fn run_soak(batches: usize, rounds: usize, seed: u64, json: bool) -> Result<()> {
    let report = soak::run(soak::SoakSettings { batches, rounds, seed })?;
    if json {
        println!("{}", serde_json::to_string(&report)?);
        if !report.passed() {
            bail!("soak detected lost or duplicated frames");
        }
        return Ok(());
    }
    println!(
        "  {} batches, {} frames sent, {} received",
        report.batches, report.frames_sent, report.frames_received
    );
    if !report.passed() {
        println!("  {} failed batches: {:?}", "✗".red().bold(), report.failed_batches);
        bail!("soak detected lost or duplicated frames");
    }
    println!("  {} no loss, no duplication", "✓".green().bold());
    Ok(())
}

fn run_init(cfg: &Config, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::save_to(cfg, path)?;
    println!("  {} Config saved to {}", "✓".green().bold(), path.display().to_string().bold());
    Ok(())
}
