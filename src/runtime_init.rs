// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration, logging and signal setup for pmr-sync commands.

use std::process::ExitCode;

use pmr_sync::cli::{CommandError, CommandOptions, Session};
use pmr_sync::logging::init_logging;
use pmr_sync::SyncConfig;
use tokio_util::sync::CancellationToken;

/// Load configuration, install logging and open a session.
pub fn open_session(options: &CommandOptions) -> Result<Session, CommandError> {
    let config = SyncConfig::load(options.config_path.as_deref())?;
    init_logging(config.log_format);
    tracing::debug!(
        repository_root = %config.repository_root.display(),
        pmr_path = %config.pmr_path,
        git_revision = %config.git_revision,
        "configuration loaded"
    );
    Session::open(config, options)
}

/// Token cancelled on the first Ctrl-C.
pub fn cancel_on_signal() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received, finishing current object...");
            trigger.cancel();
        }
    });
    token
}

/// Map a command result to the process exit code.
pub fn finish(result: Result<i32, CommandError>) -> ExitCode {
    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code() as u8)
        }
    }
}
