// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! pmr-sync CLI entry point.
//!
//! Each invocation runs one command against the cluster state and exits;
//! the periodic trigger lives outside this process.

mod cli_parser;
mod runtime_init;

use std::process::ExitCode;

use pmr_sync::cli::{commands, CommandOptions};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let (command, rest) = cli_parser::resolve_command(&args);

    match command {
        "help" | "--help" | "-h" => {
            if let Some(sub) = rest.first() {
                cli_parser::print_command_help(sub);
            } else {
                cli_parser::print_usage();
            }
            ExitCode::SUCCESS
        }
        "version" | "--version" | "-V" => {
            println!("pmr-sync {}", env!("CARGO_PKG_VERSION"));
            ExitCode::SUCCESS
        }
        "config" => run_config_cmd(rest).await,
        "reconcile" | "plan" | "list-stale" | "delete-stale" | "revoke-stale"
        | "prune-grants" => run_engine_cmd(command, rest).await,
        _ => {
            eprintln!("Unknown command: {}", command);
            cli_parser::print_usage();
            ExitCode::FAILURE
        }
    }
}

fn parse_or_exit(command: &str, rest: &[String]) -> Result<(CommandOptions, Vec<String>), ExitCode> {
    cli_parser::parse_options(rest).map_err(|e| {
        eprintln!("{}", e);
        cli_parser::print_command_help(command);
        ExitCode::from(commands::EXIT_CONFIG_ERROR as u8)
    })
}

async fn run_engine_cmd(command: &str, rest: &[String]) -> ExitCode {
    let (options, names) = match parse_or_exit(command, rest) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    if command != "delete-stale" && !names.is_empty() {
        eprintln!("Unexpected arguments: {}", names.join(" "));
        cli_parser::print_command_help(command);
        return ExitCode::from(commands::EXIT_CONFIG_ERROR as u8);
    }

    let session = match runtime_init::open_session(&options) {
        Ok(session) => session,
        Err(e) => return runtime_init::finish(Err(e)),
    };

    let result = match command {
        "reconcile" => {
            let cancel = runtime_init::cancel_on_signal();
            session.reconcile(&cancel).await
        }
        "plan" => session.plan(),
        "list-stale" => session.list_stale().await,
        "delete-stale" => session.delete_stale(&names).await,
        "prune-grants" => session.prune_grants().await,
        _ => session.revoke_stale().await,
    };
    runtime_init::finish(result)
}

async fn run_config_cmd(rest: &[String]) -> ExitCode {
    let sub = rest.first().map(|s| s.as_str()).unwrap_or("show");
    let (options, _) = match parse_or_exit("config", rest.get(1..).unwrap_or_default()) {
        Ok(parsed) => parsed,
        Err(code) => return code,
    };
    match sub {
        "show" => {
            let result = pmr_sync::SyncConfig::load(options.config_path.as_deref())
                .map_err(Into::into)
                .and_then(|config| commands::run_config_show(&config));
            runtime_init::finish(result)
        }
        "defaults" => runtime_init::finish(commands::run_config_defaults()),
        "validate" => ExitCode::from(commands::run_config_validate(&options) as u8),
        _ => {
            eprintln!("Unknown config subcommand: {}", sub);
            cli_parser::print_command_help("config");
            ExitCode::FAILURE
        }
    }
}
