//! CardioPredict - Main CLI Entry Point

use anyhow::{Context, Result};
use cardiopredict::{
    cli::{Args, Commands, Verbosity},
    config::Config,
    doctor::Doctor,
    logging::init_logging,
    models::SlotStatus,
    service::InferenceService,
    telemetry::TelemetryDisplay,
};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncReadExt;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(message) = args.validate() {
        eprintln!("{}", message);
        std::process::exit(2);
    }

    let config = load_config(&args)?;
    init_logging(&config.logging, args.verbosity())?;

    match &args.command {
        Some(Commands::Predict { input, pretty }) => {
            run_predict(&args, &config, input.as_deref(), *pretty).await?;
        }
        Some(Commands::Batch { input, summary }) => {
            run_batch(&args, &config, input.as_deref(), *summary).await?;
        }
        Some(Commands::Health { json }) => {
            run_health(&args, &config, *json).await?;
        }
        Some(Commands::Slots) => {
            list_slots(&args, &config).await?;
        }
        Some(Commands::Config { init }) => {
            show_config(&args, &config, *init)?;
        }
        None => {}
    }

    Ok(())
}

/// File config, then environment, then command-line flags
fn load_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.clone())?;
    config.apply_env_overrides()?;

    if let Some(dir) = &args.model_dir {
        config.models.dir = dir.display().to_string();
    }
    if let Some(schema) = &args.schema {
        config.models.schema = schema.parse()?;
    }

    config.validate()?;
    Ok(config)
}

async fn start_service(args: &Args, config: &Config) -> Result<InferenceService> {
    let spinner = if args.verbosity().show_progress() {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            pb.set_style(style);
        }
        pb.set_message("Loading ensemble models...");
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let service = InferenceService::start(config).await?;

    if let Some(pb) = spinner {
        let registry = service.registry();
        pb.finish_with_message(format!(
            "Loaded {}/{} models",
            registry.loaded_count(),
            registry.total_slots()
        ));
    }

    Ok(service)
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    match input {
        Some(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut buffer = String::new();
            tokio::io::stdin()
                .read_to_string(&mut buffer)
                .await
                .context("Failed to read stdin")?;
            Ok(buffer)
        }
    }
}

async fn run_predict(args: &Args, config: &Config, input: Option<&Path>, pretty: bool) -> Result<()> {
    let payload = read_input(input).await?;
    let service = start_service(args, config).await?;

    match service.predict_json(&payload).await {
        Ok(outcome) => {
            let rendered = if pretty {
                serde_json::to_string_pretty(&outcome)?
            } else {
                serde_json::to_string(&outcome)?
            };
            println!("{}", rendered);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", "Error:".red(), e);
            std::process::exit(if e.is_client_error() { 2 } else { 1 });
        }
    }
}

async fn run_batch(args: &Args, config: &Config, input: Option<&Path>, summary: bool) -> Result<()> {
    let payload = read_input(input).await?;
    let service = start_service(args, config).await?;

    for result in service.predict_json_lines(&payload).await {
        let line = match result {
            Ok(outcome) => serde_json::to_string(&outcome)?,
            Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
        };
        println!("{}", line);
    }

    if summary {
        TelemetryDisplay::new(service.telemetry().clone(), args.verbosity()).display_summary();
    }

    Ok(())
}

async fn run_health(args: &Args, config: &Config, json: bool) -> Result<()> {
    let service = start_service(args, config).await?;
    let report = service.health();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let checks = Doctor::run_diagnostics(service.registry());
    Doctor::display_results(&checks);
    println!(
        "Status: {} ({}/{} models loaded)",
        format!("{:?}", report.status).to_uppercase().bold(),
        report.loaded_count,
        report.total_slots
    );

    std::process::exit(if Doctor::overall_status(&checks) { 0 } else { 1 });
}

async fn list_slots(args: &Args, config: &Config) -> Result<()> {
    let service = start_service(args, config).await?;
    let registry = service.registry();

    println!("\nEnsemble slots ({} schema, {})\n", registry.schema(), registry.source_description());
    println!("{:<10} {:<22} {:<12} Artifact", "Slot", "Model", "Status");
    println!("{}", "=".repeat(80));

    for slot in registry.slots() {
        let status = match slot.status() {
            SlotStatus::Loaded => "loaded".green(),
            SlotStatus::Unloaded => "unloaded".yellow(),
            SlotStatus::LoadFailed { .. } => "failed".red(),
        };
        println!(
            "{:<10} {:<22} {:<12} {}",
            slot.id().key(),
            slot.display_name(),
            status,
            slot.location()
        );
        if let (SlotStatus::LoadFailed { reason }, true) = (slot.status(), args.verbosity().show_events()) {
            println!("{:<10} {}", "", reason.dimmed());
        }
    }
    println!();

    Ok(())
}

fn show_config(args: &Args, config: &Config, init: bool) -> Result<()> {
    if init {
        let path: PathBuf = match args.config.clone().or_else(Config::default_path) {
            Some(path) => path,
            None => anyhow::bail!("Could not determine config path; pass --config"),
        };
        config.save(&path)?;
        if args.verbosity() != Verbosity::Quiet {
            eprintln!("{} {}", "Wrote".green(), path.display());
        }
    }

    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    println!("{}", rendered);

    Ok(())
}
