// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! pmr-sync: reconciles Kubeflow-style Profiles, contributor RoleBindings and
//! AuthorizationPolicies against a Profile Management Representation (PMR).
//!
//! The PMR, a YAML document kept in version control, is the single source of
//! truth. Each cycle renders it into desired cluster objects, creates or
//! updates them, and reports (never deletes) objects the PMR no longer names.
//! Stale workspaces are removed only by an explicit, confirmed operation.

pub mod cli;
pub mod config;
pub mod k8s;
pub mod logging;
pub mod pmr;
pub mod reconcile;

pub use config::{ConfigError, LogFormat, SyncConfig};
pub use k8s::{ClusterClient, ClusterError, MemoryCluster};
pub use pmr::{load_pmr, parse_pmr, Pmr, SchemaError};
pub use reconcile::{CycleReport, CycleStatus, EngineConfig, Reconciler, SyncError};
