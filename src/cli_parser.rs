// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! CLI argument parsing and help text for pmr-sync.

use std::path::PathBuf;

use pmr_sync::cli::CommandOptions;

/// Split the process arguments into the command word and what follows it.
///
/// With no command word, or when the first argument is an option other
/// than `--help` or `--version`, the command is `reconcile`.
pub fn resolve_command(args: &[String]) -> (&str, &[String]) {
    match args.get(1).map(String::as_str) {
        Some(first) if first.starts_with("--") && !matches!(first, "--help" | "--version") => {
            ("reconcile", &args[1..])
        }
        Some(first) => (first, args.get(2..).unwrap_or_default()),
        None => ("reconcile", args.get(1..).unwrap_or_default()),
    }
}

/// Split `args` (after the command words) into shared options and
/// positional arguments.
pub fn parse_options(args: &[String]) -> Result<(CommandOptions, Vec<String>), String> {
    let mut options = CommandOptions::default();
    let mut positional = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "--pmr" | "--state" => {
                let flag = args[i].as_str();
                let Some(value) = args.get(i + 1) else {
                    return Err(format!("Missing value for {}", flag));
                };
                let path = Some(PathBuf::from(value));
                match flag {
                    "--config" => options.config_path = path,
                    "--pmr" => options.pmr_path = path,
                    _ => options.state_path = path,
                }
                i += 2;
            }
            "--json" => {
                options.json = true;
                i += 1;
            }
            flag if flag.starts_with("--") => {
                return Err(format!("Unknown argument: {}", flag));
            }
            _ => {
                positional.push(args[i].clone());
                i += 1;
            }
        }
    }
    Ok((options, positional))
}

/// Print general usage information.
pub fn print_usage() {
    let version = env!("CARGO_PKG_VERSION");
    eprintln!(
        "pmr-sync - Profile Management Representation reconciler v{}

USAGE:
    pmr-sync-cli [COMMAND] [OPTIONS]

COMMANDS:
    reconcile     Converge the cluster to the PMR (default when no command given)
    plan          Validate the PMR and print the desired objects
    list-stale    List managed workspaces absent from the PMR
    delete-stale  Delete named stale workspaces and their access objects
    revoke-stale  Remove contributor access from stale workspaces
    prune-grants  Remove grants of contributors no longer in the PMR
    config        Manage configuration (show, validate, defaults)
    version       Show version information
    help          Show this help message

OPTIONS:
    --config FILE  Load configuration from a TOML file
    --pmr FILE     Read the PMR from FILE instead of the configured path
    --state FILE   Back the cluster with a JSON state file
    --json         Print results as JSON
    -h, --help     Show help for command
    -V, --version  Show version information

EXAMPLES:
    pmr-sync-cli plan --pmr pmr.yaml
    pmr-sync-cli reconcile --state cluster.json
    pmr-sync-cli list-stale --state cluster.json --json
    pmr-sync-cli delete-stale ml-engineers --state cluster.json
    pmr-sync-cli prune-grants --state cluster.json
    pmr-sync-cli config validate --config pmr-sync.toml

ENVIRONMENT:
    PMR_SYNC_CONFIG  Configuration file path
    PMR_SYNC_*       Per-field overrides (e.g. PMR_SYNC_PMR_PATH)
    RUST_LOG         Log level (debug, info, warn, error)

EXIT CODES:
    0  Success / Converged
    1  Failure / Partial failure
    2  Configuration error
    3  Cluster error
",
        version
    );
}

/// Print detailed help for a specific command.
pub fn print_command_help(command: &str) {
    match command {
        "reconcile" => print_reconcile_help(),
        "plan" => print_plan_help(),
        "list-stale" => print_list_stale_help(),
        "delete-stale" => print_delete_stale_help(),
        "revoke-stale" => print_revoke_stale_help(),
        "prune-grants" => print_prune_grants_help(),
        "config" => print_config_help(),
        _ => {
            eprintln!(
                "No detailed help available for '{}'. Use 'pmr-sync-cli help' for general usage.",
                command
            );
        }
    }
}

fn print_reconcile_help() {
    eprintln!(
        "pmr-sync-cli reconcile - Converge the cluster to the PMR

USAGE:
    pmr-sync-cli reconcile [OPTIONS]

DESCRIPTION:
    Creates or updates every workspace, grant and policy the PMR implies.
    Objects the PMR no longer names are reported, never deleted.
    Ctrl-C cancels between objects; remaining objects are reported as skipped.

EXIT CODES:
    0  Converged (orphans may be reported)
    1  Partial failure or cancelled
    3  Cluster read failed, nothing mutated
"
    );
}

fn print_plan_help() {
    eprintln!(
        "pmr-sync-cli plan - Validate the PMR

USAGE:
    pmr-sync-cli plan [--pmr FILE] [--json]

DESCRIPTION:
    Parses and validates the PMR, then prints the objects a reconcile
    would apply. Does not read or write cluster state.
"
    );
}

fn print_list_stale_help() {
    eprintln!(
        "pmr-sync-cli list-stale - List stale workspaces

USAGE:
    pmr-sync-cli list-stale [OPTIONS]

DESCRIPTION:
    Lists managed workspaces absent from the PMR, orphaned grants in live
    workspaces, and managed objects outside every workspace.
"
    );
}

fn print_delete_stale_help() {
    eprintln!(
        "pmr-sync-cli delete-stale - Delete stale workspaces

USAGE:
    pmr-sync-cli delete-stale NAME... [OPTIONS]

DESCRIPTION:
    Takes a fresh stale listing, then deletes each named workspace it
    reports, dependents first. Names that are not stale are refused.

EXIT CODES:
    0  All requested deletions succeeded
    1  A name was not stale or a deletion failed
"
    );
}

fn print_revoke_stale_help() {
    eprintln!(
        "pmr-sync-cli revoke-stale - Revoke access to stale workspaces

USAGE:
    pmr-sync-cli revoke-stale [OPTIONS]

DESCRIPTION:
    Deletes every contributor grant and policy in stale workspaces. The
    workspaces and their owner access are kept. Managed grants and
    policies whose workspace no longer exists are deleted as well.
"
    );
}

fn print_prune_grants_help() {
    eprintln!(
        "pmr-sync-cli prune-grants - Remove orphaned grants

USAGE:
    pmr-sync-cli prune-grants [OPTIONS]

DESCRIPTION:
    Deletes managed grants and policies in workspaces the PMR still names
    that match none of its contributors, such as a removed contributor or
    the grant of a role they no longer hold. Reconcile never does this.

EXIT CODES:
    0  Every orphaned grant was removed
    1  A deletion failed
"
    );
}

fn print_config_help() {
    eprintln!(
        "pmr-sync-cli config - Manage configuration

USAGE:
    pmr-sync-cli config <SUBCOMMAND> [--config FILE]

SUBCOMMANDS:
    show           Show effective configuration
    validate       Validate configuration file and overrides
    defaults       Show default configuration
"
    );
}
