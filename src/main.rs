//! sharelog-to-parquet - BEAM share log converter
//!
//! Entry point for the CLI application.

use anyhow::{Context, Result};
use clap::Parser;
use sharelog_to_parquet::config::{CliArgs, ConvertConfig};
use sharelog_to_parquet::parquet::{convert_sharelog_to_parquet, ProgressCallback};
use sharelog_to_parquet::progress::{print_header, print_summary, ProgressReporter};
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let args = CliArgs::parse();

    setup_logging(args.verbose)?;

    let config = ConvertConfig::from_args(args).context("Invalid configuration")?;

    if config.show_progress {
        print_header(
            &config.input_path.display().to_string(),
            &config.output_path.display().to_string(),
            config.options.writer.row_group_size,
        );
    }

    // Setup signal handler for graceful shutdown
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&shutdown_flag);
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, flushing and closing output...");
        handler_flag.store(true, Ordering::SeqCst);
    })
    .context("Failed to set signal handler")?;

    let progress = if config.show_progress {
        Some(Arc::new(ProgressReporter::new()))
    } else {
        None
    };

    let callback: Option<ProgressCallback> = progress.as_ref().map(|p| {
        let p = Arc::clone(p);
        Box::new(move |read, written| p.update(read, written)) as ProgressCallback
    });

    if let Some(ref p) = progress {
        p.set_status("Reading share log...");
    }

    let stats = convert_sharelog_to_parquet(
        &config.input_path,
        &config.output_path,
        &config.options,
        Some(shutdown_flag),
        callback,
    )
    .context("Conversion failed")?;

    if let Some(ref p) = progress {
        if stats.completed {
            p.finish("Conversion completed");
        } else {
            p.finish("Conversion interrupted");
        }
        print_summary(&stats, &config.output_path.display().to_string());
    }

    if !stats.completed {
        info!("Conversion was interrupted before the end of the share log");
    }

    if stats.skipped() > 0 {
        info!(skipped = stats.skipped(), "Conversion skipped records");
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("sharelog_to_parquet=debug,warn")
    } else {
        EnvFilter::new("sharelog_to_parquet=info,warn")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    Ok(())
}
