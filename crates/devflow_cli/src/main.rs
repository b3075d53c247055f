//! Operator CLI for the DevFlow core.
//!
//! # Responsibility
//! - Probe core linkage (`ping`).
//! - Open and migrate the configured store (`migrate`).
//! - Report or repair cached counter drift (`audit`, `reconcile`).

use clap::{Parser, Subcommand};
use devflow_core::db::migrations::latest_version;
use devflow_core::{
    init_logging_from, CoreConfig, ReconcileReport, ReconcileService, ServiceContext, Store,
};
use log::{error, info};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "devflow", version, about = "DevFlow core maintenance tool")]
struct Cli {
    /// JSON config file; environment overrides apply on top.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core linkage and version.
    Ping,
    /// Open the store, apply pending migrations and print the schema version.
    Migrate,
    /// Report counters that disagree with their records.
    Audit,
    /// Rewrite drifted counters from their records.
    Reconcile,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            error!("event=cli_exit module=cli status=error error={message}");
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), String> {
    if let Command::Ping = cli.command {
        println!("devflow_core ping={}", devflow_core::ping());
        println!("devflow_core version={}", devflow_core::core_version());
        return Ok(());
    }

    let config = load_config(cli.config.as_ref())?;
    if let Some(settings) = init_logging_from(&config.logging)? {
        info!("event=cli_start module=cli status=ok {settings}");
    }
    let store = Store::open(&config.store).map_err(|err| err.to_string())?;

    match cli.command {
        Command::Ping => {}
        Command::Migrate => {
            println!(
                "store={} schema_version={}",
                store.path().display(),
                latest_version()
            );
        }
        Command::Audit => {
            let conn = store.connect().map_err(|err| err.to_string())?;
            let report = ReconcileService::new(ServiceContext::from_config(&config))
                .audit_counters(&conn)
                .map_err(|err| err.to_string())?;
            print_report(&report);
        }
        Command::Reconcile => {
            let mut conn = store.connect().map_err(|err| err.to_string())?;
            let report = ReconcileService::new(ServiceContext::from_config(&config))
                .reconcile_counters(&mut conn)
                .map_err(|err| err.to_string())?;
            print_report(&report);
        }
    }

    store.close().map_err(|err| err.to_string())
}

fn load_config(path: Option<&PathBuf>) -> Result<CoreConfig, String> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|err| format!("failed to read config `{}`: {err}", path.display()))?;
            CoreConfig::from_json_str(&raw)?
        }
        None => CoreConfig::default(),
    };
    let config = config.with_env_overrides()?;
    config.validate()?;
    Ok(config)
}

fn print_report(report: &ReconcileReport) {
    for entry in &report.corrections {
        println!(
            "target={} field={} cached={} actual={}",
            entry.target,
            entry.field.column(),
            entry.cached,
            entry.actual
        );
    }
    let verb = if report.applied { "corrected" } else { "drifted" };
    println!("{verb}={}", report.corrections.len());
}
