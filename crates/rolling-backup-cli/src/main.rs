mod commands;
mod logging;
mod progress;

use std::process;

use anyhow::Context;
use chrono::Local;
use clap::Parser;
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use progress::CliReporter;
use rolling_backup_core::config::load_configuration;
use rolling_backup_core::{AppConfig, BackupEngine};
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();
    let code = dispatch(Cli::parse());

    // process::exit skips destructors, so flush the log writer first.
    drop(guard);
    process::exit(code);
}

fn dispatch(args: Cli) -> i32 {
    let config = match load_configuration(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            return 1;
        }
    };

    match args.command.unwrap_or(Commands::Run) {
        Commands::Run => run_backup(config, args.quiet),
        Commands::Plan => match run_plan(config) {
            Ok(()) => 0,
            Err(err) => {
                error!("Error: {:#}", err);
                1
            }
        },
        Commands::PrintConfig => {
            println!("Configuration: {:#?}", config.redacted());
            0
        }
    }
}

fn run_backup(config: AppConfig, quiet: bool) -> i32 {
    let engine = BackupEngine::new(config).with_console_log(!quiet);
    let reporter = CliReporter::new();

    match engine.run(&reporter) {
        Ok(report) => {
            for failure in &report.failures {
                warn!("{:?}: {}", failure.kind, failure.message);
            }
            if report.log_retained {
                info!("Run log kept at {}", report.log_file.display());
            }
            0
        }
        Err(err) => {
            error!("Backup aborted: {}", err);
            err.kind.exit_code()
        }
    }
}

fn run_plan(config: AppConfig) -> anyhow::Result<()> {
    let retention_days = config.retention_days;
    let backup_root = config.backup_root.clone();
    let engine = BackupEngine::new(config);
    let plan = engine
        .plan_on(Local::now().date_naive())
        .with_context(|| format!("Can not inspect {}", backup_root.display()))?;

    println!(
        "Required: {} bytes, free: {} bytes",
        format!("{}", plan.budget.required_bytes).cyan(),
        format!("{}", plan.budget.free_bytes).cyan(),
    );
    for planned in &plan.entries {
        let size = planned
            .size_bytes
            .map_or_else(|| "?".to_string(), |s| s.to_string());
        let status = if planned.expired {
            format!("expired (> {} days)", retention_days).red()
        } else {
            "kept".green()
        };
        println!(
            "  {}  {:>5} days  {:>14} bytes  {}",
            planned.entry.path.display(),
            planned.age_days,
            size,
            status
        );
    }
    for stray in &plan.strays {
        println!("  {}  {}", stray.path.display(), "ignored".dimmed());
    }
    if plan.budget.needs_reclaim() {
        println!("{}", "A run now would reclaim space from the oldest backups.".yellow());
    }

    Ok(())
}
