//! app-launcher: prepare, self-update and launch the bundled application.

use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::{ColorChoice, Parser};
use launcher_cli::logging::{LogConfig, LogFormat, init_logging};
use launcher_cli::{progress, relaunch_args};
use launcher_core::{Bootstrap, PhaseError, UpdateMode, status_channel};
use tracing::level_filters::LevelFilter;

mod cli;
mod commands;

use crate::cli::{Cli, Command, LogFormatArg, LogLevelArg, RunArgs};

fn main() -> ExitCode {
    let cli = Cli::parse();
    cli.color.write_global();
    let log_config = log_config_from_cli(&cli);
    if let Err(error) = init_logging(&log_config) {
        eprintln!("error: failed to initialize logging: {error}");
        return ExitCode::FAILURE;
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(error) => {
            eprintln!("error: failed to start async runtime: {error}");
            return ExitCode::FAILURE;
        }
    };

    ExitCode::from(runtime.block_on(run_command(cli)))
}

async fn run_command(cli: Cli) -> u8 {
    let command = cli.command.unwrap_or(Command::Run(RunArgs::default()));
    let (mut config, root) = match commands::load_config(cli.root.as_deref(), cli.config.as_deref())
    {
        Ok(loaded) => loaded,
        Err(error) => return report_phase_error(&error),
    };
    if let Command::Run(args) = &command {
        if args.yes {
            config.updates.mode = UpdateMode::Auto;
        } else if args.no_update {
            config.updates.mode = UpdateMode::Off;
        }
    }

    let (status, events) = status_channel();
    let display = progress::spawn_display(events);
    let flow = Bootstrap::new(config, root, status).with_relaunch_args(relaunch_args(
        cli.root.as_deref(),
        cli.config.as_deref(),
    ));

    let result = match &command {
        Command::Run(args) => commands::run(&flow, args).await,
        Command::Prepare => commands::prepare(&flow).await,
        Command::Check => commands::check(&flow).await,
        Command::Update => commands::update(&flow).await,
        Command::Launch => commands::launch(&flow),
        Command::Status => commands::status(&flow),
    };

    // The display task ends once the last sender is gone.
    drop(flow);
    if let Err(error) = display.await {
        tracing::debug!("Status display task ended abnormally: {error}");
    }

    match result {
        Ok(()) => 0,
        Err(error) => match error.downcast_ref::<PhaseError>() {
            Some(phase) => report_phase_error(phase),
            None => {
                eprintln!("error: {error:#}");
                1
            }
        },
    }
}

/// Prints the machine-readable error line and returns the exit code.
fn report_phase_error(error: &PhaseError) -> u8 {
    tracing::error!("{error}");
    eprintln!("{}", error.to_json());
    u8::try_from(error.exit_code()).unwrap_or(1)
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
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => cli.log_file.is_none() && io::stderr().is_terminal(),
    };
    config
}
