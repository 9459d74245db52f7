// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Command runners.
//!
//! Each runner returns the process exit code. The cluster is an in-memory
//! cluster, optionally backed by a JSON state file that is written back
//! after every mutating command.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::report_format;
use crate::config::{ConfigError, SyncConfig};
use crate::k8s::memory::{MemoryCluster, SnapshotError};
use crate::pmr::{load_pmr, Pmr, PmrLoadError};
use crate::reconcile::engine::{Reconciler, SyncError};
use crate::reconcile::report::CycleStatus;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_CLUSTER_ERROR: i32 = 3;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Pmr(#[from] PmrLoadError),

    #[error(transparent)]
    State(#[from] SnapshotError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),
}

impl CommandError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CommandError::Config(_) | CommandError::Usage(_) => EXIT_CONFIG_ERROR,
            CommandError::State(_) | CommandError::Sync(SyncError::ClusterRead(_)) => {
                EXIT_CLUSTER_ERROR
            }
            _ => EXIT_FAILURE,
        }
    }
}

/// Options shared by every command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOptions {
    pub config_path: Option<PathBuf>,
    /// Overrides `repository_root`/`pmr_path`.
    pub pmr_path: Option<PathBuf>,
    pub state_path: Option<PathBuf>,
    pub json: bool,
}

/// A loaded configuration plus an engine over the state-backed cluster.
pub struct Session {
    config: SyncConfig,
    engine: Reconciler<MemoryCluster>,
    pmr_file: PathBuf,
    state_path: Option<PathBuf>,
    json: bool,
}

impl Session {
    pub fn open(config: SyncConfig, options: &CommandOptions) -> Result<Self, CommandError> {
        let cluster = match &options.state_path {
            Some(path) => MemoryCluster::load_snapshot(path)?,
            None => MemoryCluster::new(),
        };
        let pmr_file = options
            .pmr_path
            .clone()
            .unwrap_or_else(|| config.pmr_file());
        let engine = Reconciler::new(Arc::new(cluster), config.engine_config());

        tracing::debug!(
            pmr = %pmr_file.display(),
            state = ?options.state_path,
            "session opened"
        );
        Ok(Self {
            config,
            engine,
            pmr_file,
            state_path: options.state_path.clone(),
            json: options.json,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn engine(&self) -> &Reconciler<MemoryCluster> {
        &self.engine
    }

    pub fn pmr_file(&self) -> &Path {
        &self.pmr_file
    }

    fn load_pmr(&self) -> Result<Pmr, CommandError> {
        let pmr = load_pmr(&self.pmr_file)?;
        tracing::debug!(profiles = pmr.len(), path = %self.pmr_file.display(), "PMR loaded");
        Ok(pmr)
    }

    async fn persist(&self) -> Result<(), CommandError> {
        if let Some(path) = &self.state_path {
            self.engine.client().save_snapshot(path).await?;
            tracing::debug!(path = %path.display(), "cluster state saved");
        }
        Ok(())
    }

    fn emit<T: Serialize>(&self, value: &T, human: String) -> Result<(), CommandError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            println!("{}", human);
        }
        Ok(())
    }

    /// Converge the cluster to the PMR. Exit 1 on partial failure or
    /// cancellation.
    pub async fn reconcile(&self, cancel: &CancellationToken) -> Result<i32, CommandError> {
        let pmr = self.load_pmr()?;
        let report = self.engine.reconcile(&pmr, cancel).await?;
        self.persist().await?;
        self.emit(&report, report_format::format_cycle(&report))?;

        Ok(match report.status() {
            CycleStatus::Converged | CycleStatus::ConvergedWithOrphans => EXIT_SUCCESS,
            CycleStatus::PartialFailure | CycleStatus::Cancelled => EXIT_FAILURE,
        })
    }

    pub async fn list_stale(&self) -> Result<i32, CommandError> {
        let pmr = self.load_pmr()?;
        let report = self.engine.list_stale(&pmr).await?;
        self.emit(&report, report_format::format_stale(&report))?;
        Ok(EXIT_SUCCESS)
    }

    /// Delete the named stale workspaces. The listing taken first in this
    /// process is the confirmation; names it does not report are refused.
    pub async fn delete_stale(&self, names: &[String]) -> Result<i32, CommandError> {
        if names.is_empty() {
            return Err(CommandError::Usage(
                "delete-stale needs at least one workspace name".to_string(),
            ));
        }
        let pmr = self.load_pmr()?;
        let listing = self.engine.list_stale(&pmr).await?;
        tracing::info!(
            stale = listing.orphaned_workspaces.len(),
            requested = names.len(),
            "stale listing taken before deletion"
        );

        let report = self.engine.delete_stale(&pmr, names).await?;
        self.persist().await?;
        self.emit(&report, report_format::format_delete(&report))?;

        Ok(if report.failures.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        })
    }

    pub async fn revoke_stale(&self) -> Result<i32, CommandError> {
        let pmr = self.load_pmr()?;
        let report = self.engine.revoke_stale_access(&pmr).await?;
        self.persist().await?;
        self.emit(&report, report_format::format_revoke(&report))?;

        Ok(if report.failures.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        })
    }

    /// Delete grants and policies no contributor of a desired workspace
    /// accounts for.
    pub async fn prune_grants(&self) -> Result<i32, CommandError> {
        let pmr = self.load_pmr()?;
        let report = self.engine.prune_orphaned_grants(&pmr).await?;
        self.persist().await?;
        self.emit(&report, report_format::format_prune(&report))?;

        Ok(if report.failures.is_empty() {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        })
    }

    /// Validate the PMR and print the desired objects. No cluster access.
    pub fn plan(&self) -> Result<i32, CommandError> {
        let pmr = self.load_pmr()?;
        let desired = self
            .engine
            .plan(&pmr)
            .map_err(|e| CommandError::Sync(SyncError::Schema(e)))?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&desired.objects())?);
        } else {
            println!("{}", report_format::format_plan(&desired));
        }
        Ok(EXIT_SUCCESS)
    }
}

/// Print the effective configuration.
pub fn run_config_show(config: &SyncConfig) -> Result<i32, CommandError> {
    println!("{}", config.to_toml()?);
    Ok(EXIT_SUCCESS)
}

pub fn run_config_defaults() -> Result<i32, CommandError> {
    println!("{}", SyncConfig::default().to_toml()?);
    Ok(EXIT_SUCCESS)
}

pub fn run_config_validate(options: &CommandOptions) -> i32 {
    match SyncConfig::load(options.config_path.as_deref()) {
        Ok(config) => {
            println!("Configuration valid (PMR at {})", config.pmr_file().display());
            EXIT_SUCCESS
        }
        Err(e) => {
            eprintln!("Configuration invalid: {}", e);
            EXIT_CONFIG_ERROR
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
