mod commands;
mod logging;
mod progress;

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands, ProcessArgs};
use dedupe_core::storage::Database;
use dedupe_core::{AppConfig, ScanEngine};
use dotenv::dotenv;
use progress::CliReporter;
use tracing::{error, info};

fn main() {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match dedupe_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();

    let outcome = match args.command {
        Some(Commands::Process(process_args)) => run_process(config, &process_args),
        Some(Commands::Stats(index_args)) => run_stats(&index_args.db_path(&config)),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        Some(Commands::TruncateDb(index_args)) => run_truncate(&index_args.db_path(&config)),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn run_process(config: AppConfig, args: &ProcessArgs) -> anyhow::Result<()> {
    let config = args.apply(config);

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown_flag);
    ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            eprintln!("\nForce shutdown requested. Exiting immediately...");
            process::exit(1);
        }
        eprintln!("\nShutdown requested. Finishing files in progress... (Ctrl+C again to force quit)");
    })
    .context("failed to install Ctrl+C handler")?;

    let engine = ScanEngine::new(config).with_cancel_flag(shutdown_flag);
    let reporter = CliReporter::new();
    let result = engine.scan(&reporter)?;

    println!();
    info!(
        "{} files processed in {}",
        format!("{}", result.files_processed).green(),
        format!("{:.2}s", result.duration.as_secs_f64()).green(),
    );
    info!(
        "{} originals indexed, {} already indexed, {} refreshed",
        format!("{}", result.originals).cyan(),
        format!("{}", result.already_indexed).cyan(),
        format!("{}", result.refreshed).cyan(),
    );
    info!(
        "{} duplicates quarantined, {} bytes reclaimable",
        format!("{}", result.duplicates_quarantined).red(),
        format!("{}", result.quarantined_bytes).red(),
    );
    if result.error_count() > 0 {
        info!(
            "{} read errors, {} index errors, {} move errors (see log)",
            format!("{}", result.read_errors).yellow(),
            format!("{}", result.storage_errors).yellow(),
            format!("{}", result.move_errors).yellow(),
        );
    }
    if result.cancelled {
        info!("{}", "Run was cancelled before every file was processed".yellow());
    }

    Ok(())
}

fn run_stats(db_path: &Path) -> anyhow::Result<()> {
    let db = Database::open(db_path)
        .with_context(|| format!("failed to open index {}", db_path.display()))?;
    let records = db.record_count()?;
    let bytes = db.total_indexed_bytes()?;
    info!(
        "{} indexed originals, {} bytes in {}",
        format!("{}", records).cyan(),
        format!("{}", bytes).cyan(),
        db_path.display(),
    );
    Ok(())
}

fn run_truncate(db_path: &Path) -> anyhow::Result<()> {
    let question = format!(
        "Delete every record in {}? Quarantined files are not touched",
        db_path.display()
    );
    if !confirm(&question, &mut io::stdin().lock(), &mut io::stdout())? {
        println!("Index left unchanged");
        return Ok(());
    }

    let db = Database::open(db_path)
        .with_context(|| format!("failed to open index {}", db_path.display()))?;
    let removed = db.truncate_all()?;
    println!("{} records removed", removed);
    Ok(())
}

/// Ask a yes/no question; anything but an explicit yes (including EOF) is no.
fn confirm<R: BufRead, W: Write>(question: &str, input: &mut R, output: &mut W) -> io::Result<bool> {
    write!(output, "{} [y/N]: ", question)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes"
    ))
}
