// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Structured results of each trigger.
//!
//! A cycle report always states what was desired, what was applied, what
//! failed and why, and what is orphaned.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use uuid::Uuid;

use super::applier::{ApplyOutcome, ClusterWriteError, ObjectResult};
use super::desired::DesiredSummary;
use super::diff::Diff;
use super::state::ObservedAccess;
use crate::k8s::types::{ObjectKey, ResourceKind};

fn serialize_display<T: fmt::Display, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(value)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    Converged,
    ConvergedWithOrphans,
    PartialFailure,
    Cancelled,
}

impl CycleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStatus::Converged => "converged",
            CycleStatus::ConvergedWithOrphans => "converged_with_orphans",
            CycleStatus::PartialFailure => "partial_failure",
            CycleStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedObject {
    pub key: ObjectKey,
    pub outcome: ApplyOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectFailure {
    pub key: ObjectKey,
    #[serde(serialize_with = "serialize_display")]
    pub error: ClusterWriteError,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub desired: DesiredSummary,
    pub applied: Vec<AppliedObject>,
    pub failures: Vec<ObjectFailure>,
    pub skipped: Vec<ObjectKey>,
    pub orphaned_workspaces: Vec<String>,
    pub orphaned_grants: Vec<ObservedAccess>,
    pub detached: Vec<ObservedAccess>,
    pub cancelled: bool,
}

impl CycleReport {
    pub fn new(
        cycle_id: Uuid,
        started_at: DateTime<Utc>,
        desired: DesiredSummary,
        results: Vec<(ObjectKey, ObjectResult)>,
        diff: Diff,
        detached: Vec<ObservedAccess>,
    ) -> Self {
        let mut applied = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = Vec::new();
        for (key, result) in results {
            match result {
                ObjectResult::Applied(outcome) => applied.push(AppliedObject { key, outcome }),
                ObjectResult::Failed(error) => failures.push(ObjectFailure { key, error }),
                ObjectResult::Skipped => skipped.push(key),
            }
        }

        Self {
            cycle_id,
            started_at,
            finished_at: Utc::now(),
            desired,
            applied,
            failures,
            orphaned_workspaces: diff.orphaned_workspaces,
            orphaned_grants: diff.orphaned_grants,
            detached,
            // Only a cancellation that left work undone counts.
            cancelled: !skipped.is_empty(),
            skipped,
        }
    }

    pub fn created(&self) -> usize {
        self.count(|o| o == ApplyOutcome::Created, None)
    }

    /// Updates issued, no-op ones included.
    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Updated { .. }), None)
    }

    /// Updates that actually changed the stored object.
    pub fn changed(&self) -> usize {
        self.count(|o| o == ApplyOutcome::Updated { changed: true }, None)
    }

    pub fn created_of(&self, kind: ResourceKind) -> usize {
        self.count(|o| o == ApplyOutcome::Created, Some(kind))
    }

    pub fn updated_of(&self, kind: ResourceKind) -> usize {
        self.count(|o| matches!(o, ApplyOutcome::Updated { .. }), Some(kind))
    }

    fn count(&self, pred: impl Fn(ApplyOutcome) -> bool, kind: Option<ResourceKind>) -> usize {
        self.applied
            .iter()
            .filter(|a| kind.map_or(true, |k| a.key.kind == k))
            .filter(|a| pred(a.outcome))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Orphaned workspaces, orphaned grants and detached access.
    pub fn orphan_count(&self) -> usize {
        self.orphaned_workspaces.len() + self.orphaned_grants.len() + self.detached.len()
    }

    pub fn status(&self) -> CycleStatus {
        if self.cancelled {
            CycleStatus::Cancelled
        } else if !self.failures.is_empty() {
            CycleStatus::PartialFailure
        } else if self.orphan_count() > 0 {
            CycleStatus::ConvergedWithOrphans
        } else {
            CycleStatus::Converged
        }
    }

    pub fn record_metrics(&self) {
        for applied in &self.applied {
            let outcome = match applied.outcome {
                ApplyOutcome::Created => "created",
                ApplyOutcome::Updated { changed: true } => "updated",
                ApplyOutcome::Updated { changed: false } => "unchanged",
            };
            metrics::counter!(
                "pmr_sync_objects_applied_total",
                "kind" => applied.key.kind.kind_name(),
                "outcome" => outcome
            )
            .increment(1);
        }
        for failure in &self.failures {
            metrics::counter!(
                "pmr_sync_objects_applied_total",
                "kind" => failure.key.kind.kind_name(),
                "outcome" => "failed"
            )
            .increment(1);
        }
        metrics::counter!("pmr_sync_cycles_total", "status" => self.status().as_str())
            .increment(1);
        metrics::gauge!("pmr_sync_orphans").set(self.orphan_count() as f64);
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: desired {}, created {}, updated {} ({} changed), failed {}, skipped {}, \
             orphaned workspaces {}, orphaned grants {}, detached {}",
            self.status(),
            self.desired.total(),
            self.created(),
            self.updated(),
            self.changed(),
            self.failed(),
            self.skipped.len(),
            self.orphaned_workspaces.len(),
            self.orphaned_grants.len(),
            self.detached.len()
        )
    }
}

/// Read-only stale listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StaleReport {
    pub orphaned_workspaces: Vec<String>,
    pub orphaned_grants: Vec<ObservedAccess>,
    pub detached: Vec<ObservedAccess>,
}

impl fmt::Display for StaleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stale workspaces {}, orphaned grants {}, detached {}",
            self.orphaned_workspaces.len(),
            self.orphaned_grants.len(),
            self.detached.len()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeleteReport {
    pub requested: Vec<String>,
    pub deleted_workspaces: Vec<String>,
    pub deleted_dependents: Vec<ObjectKey>,
    /// Requested names the fresh listing no longer reports as stale.
    pub no_longer_stale: Vec<String>,
    pub failures: Vec<ObjectFailure>,
    /// Grant-level orphans; reported, removed only by pruning.
    pub orphaned_grants: Vec<ObservedAccess>,
}

impl fmt::Display for DeleteReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "deleted workspaces {} (dependents {}), not stale {}, failed {}, orphaned grants {}",
            self.deleted_workspaces.len(),
            self.deleted_dependents.len(),
            self.no_longer_stale.len(),
            self.failures.len(),
            self.orphaned_grants.len()
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevokeReport {
    pub workspaces: Vec<String>,
    pub revoked: Vec<ObjectKey>,
    /// Removed access whose workspace no longer exists.
    pub detached: Vec<ObjectKey>,
    pub failures: Vec<ObjectFailure>,
}

impl fmt::Display for RevokeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "revoked {} objects across {} stale workspaces, detached {}, failed {}",
            self.revoked.len(),
            self.workspaces.len(),
            self.detached.len(),
            self.failures.len()
        )
    }
}

/// Grants and policies removed from desired workspaces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub pruned: Vec<ObjectKey>,
    pub failures: Vec<ObjectFailure>,
}

impl fmt::Display for PruneReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pruned {} orphaned grants, failed {}",
            self.pruned.len(),
            self.failures.len()
        )
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
