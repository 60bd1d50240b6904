//! Pharmacy invoice matching CLI.

use std::io::{self, IsTerminal};

use clap::{ColorChoice, Parser};
use pharm_cli::logging::{LogConfig, LogFormat, init_logging};
use pharm_cli::pipeline::Settings;
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;
mod summary;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg};
use crate::commands::{run_export, run_forget, run_learn, run_match, run_stats};
use crate::summary::{
    print_export_summary, print_learn_summary, print_match_summary, print_store_stats,
};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        std::process::exit(1);
    }
    let exit_code = match run(&cli) {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let settings = Settings::load(cli.config.as_deref(), cli.vocabulary.as_deref())?;
    match &cli.command {
        Command::Match(args) => {
            let outcome = run_match(&settings, args)?;
            print_match_summary(&outcome, args.review_limit);
        }
        Command::Learn(args) => {
            let (summary, stats) = run_learn(&settings, args)?;
            print_learn_summary(&summary, &stats);
            if summary.failed > 0 {
                return Ok(1);
            }
        }
        Command::Export(args) => {
            let export = run_export(&settings, args)?;
            print_export_summary(&export, &args.output);
        }
        Command::Stats(args) => {
            let stats = run_stats(&settings, args)?;
            print_store_stats(&stats);
        }
        Command::Forget(args) => {
            if run_forget(&settings, args)? {
                println!("Forgot learned mapping for {:?}", args.item);
            } else {
                println!("No learned mapping for {:?}", args.item);
            }
        }
    }
    Ok(0)
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: cli.verbosity.tracing_level_filter(),
        ..LogConfig::default()
    };
    config.use_env_filter = !(cli.verbosity.is_present() || cli.log_level.is_some());
    if let Some(level) = cli.log_level {
        config.level_filter = match level {
            LogLevelArg::Error => LevelFilter::ERROR,
            LogLevelArg::Warn => LevelFilter::WARN,
            LogLevelArg::Info => LevelFilter::INFO,
            LogLevelArg::Debug => LevelFilter::DEBUG,
            LogLevelArg::Trace => LevelFilter::TRACE,
        };
    }
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.log_file = cli.log_file.clone();
    config.log_data = cli.log_data;
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
