// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command implementations behind `pmr-sync-cli`.
//!
//! The binary parses arguments and installs signal handling; everything
//! else lives here so it can be driven from tests.

pub mod commands;
pub mod report_format;

pub use commands::{
    CommandError, CommandOptions, Session, EXIT_CLUSTER_ERROR, EXIT_CONFIG_ERROR, EXIT_FAILURE,
    EXIT_SUCCESS,
};
