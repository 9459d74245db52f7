// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation of a PMR against the cluster.
//!
//! Data flow: PMR + observed state -> desired state and diff -> applier.
//! The stale listing stops after the diff.

pub mod applier;
pub mod desired;
pub mod diff;
pub mod engine;
pub mod guard;
pub mod report;
pub mod state;
pub mod translator;

pub use applier::{Applier, ApplyOutcome, ClusterWriteError, ObjectResult};
pub use desired::{DesiredState, DesiredSummary};
pub use diff::{diff, Diff};
pub use engine::{EngineConfig, Reconciler, SyncError};
pub use guard::SingleFlight;
pub use report::{
    CycleReport, CycleStatus, DeleteReport, PruneReport, RevokeReport, StaleReport,
};
pub use state::{read_cluster_state, ClusterReadError, ObservedState};
pub use translator::{translate, PipelineAccess, TrustPrincipals};
