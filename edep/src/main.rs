// edep/src/main.rs
use std::fs;
use std::process;

use clap::Parser;
use colored::Colorize;
use edep_common::config::Config;
use edep_common::error::EdepError;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;
use cli::CliArgs;

fn init_logging(config: &Config, verbose: u8) {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("EDEP_LOG")
        .from_env_lossy();

    if verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let log_dir = config.layout().logs_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Warning:".yellow().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr.with_max_level(max_log_level))
            .with_ansi(true)
            .without_time()
            .try_init();
        return;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, "edep.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    Box::leak(Box::new(guard)); // Keep guard alive

    debug!(
        "Verbose logging enabled. Writing logs to: {}/edep.log",
        log_dir.display()
    );
}

fn fail(e: &EdepError) -> ! {
    error!("Command failed: {:#}", e);
    eprintln!("{} ({}): {:#}", "Error".red().bold(), e.kind(), e);
    process::exit(1);
}

#[tokio::main]
async fn main() {
    let cli_args = CliArgs::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} ({}): Could not load configuration: {:#}",
                "Error".red().bold(),
                e.kind(),
                e
            );
            process::exit(1);
        }
    };
    if let Some(dir) = &cli_args.directory {
        config.project_dir = dir.clone();
    }

    init_logging(&config, cli_args.verbose);
    debug!("Running {:?} in {}", cli_args.command, config.project_dir.display());

    if let Err(e) = cli_args.command.run(&config).await {
        fail(&e);
    }

    debug!("Command completed successfully.");
}
