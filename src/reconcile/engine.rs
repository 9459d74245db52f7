// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation engine.
//!
//! Entry points:
//! - [`Reconciler::reconcile`] converges the cluster to a PMR
//! - [`Reconciler::list_stale`] reports workspaces absent from the PMR
//! - [`Reconciler::delete_stale`] deletes stale workspaces confirmed by
//!   the last listing
//! - [`Reconciler::revoke_stale_access`] strips access from stale
//!   workspaces and removes access whose workspace is gone
//! - [`Reconciler::prune_orphaned_grants`] removes grants no contributor
//!   of a desired workspace accounts for
//!
//! Mutating entry points share a single-flight guard; a trigger arriving
//! while another runs is rejected with [`SyncError::Busy`].

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::applier::Applier;
use super::desired::DesiredState;
use super::diff::{diff, Diff};
use super::guard::{FlightGuard, SingleFlight};
use super::report::{
    CycleReport, DeleteReport, ObjectFailure, PruneReport, RevokeReport, StaleReport,
};
use super::state::{read_cluster_state, ClusterReadError, ObservedState};
use super::translator::TrustPrincipals;
use crate::k8s::client::ClusterClient;
use crate::k8s::selector::ManagementMarker;
use crate::k8s::types::ObjectKey;
use crate::pmr::{parse_pmr, Pmr, SchemaError};

pub const DEFAULT_CLUSTER_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_CONCURRENT_APPLIES: usize = 4;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    ClusterRead(#[from] ClusterReadError),

    #[error("workspaces not confirmed by the last stale listing: {}", .0.join(", "))]
    OrphanConfirmationRequired(Vec<String>),

    #[error("a sync cycle is already running")]
    Busy,

    #[error("cycle cancelled before it started")]
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub trust: TrustPrincipals,
    pub marker: ManagementMarker,
    /// Budget of each individual cluster call.
    pub cluster_timeout: Duration,
    pub max_concurrent_applies: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            trust: TrustPrincipals::default(),
            marker: ManagementMarker::default(),
            cluster_timeout: DEFAULT_CLUSTER_TIMEOUT,
            max_concurrent_applies: DEFAULT_MAX_CONCURRENT_APPLIES,
        }
    }
}

pub struct Reconciler<C: ?Sized> {
    client: Arc<C>,
    config: EngineConfig,
    flight: SingleFlight,
    confirmed_stale: Mutex<BTreeSet<String>>,
}

impl<C> Reconciler<C>
where
    C: ClusterClient + ?Sized,
{
    pub fn new(client: Arc<C>, config: EngineConfig) -> Self {
        Self {
            client,
            config,
            flight: SingleFlight::new(),
            confirmed_stale: Mutex::new(BTreeSet::new()),
        }
    }

    pub fn client(&self) -> &Arc<C> {
        &self.client
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Triggers rejected because another cycle was running.
    pub fn skipped_cycles(&self) -> u64 {
        self.flight.skipped()
    }

    /// Names surfaced by the most recent stale listing and not yet deleted.
    pub fn confirmed_stale(&self) -> BTreeSet<String> {
        self.confirmed_stale.lock().clone()
    }

    fn applier(&self) -> Applier<'_, C> {
        Applier::new(
            self.client.as_ref(),
            &self.config.marker,
            self.config.cluster_timeout,
        )
    }

    fn begin(&self, operation: &'static str) -> Result<FlightGuard, SyncError> {
        self.flight.try_begin().ok_or_else(|| {
            tracing::warn!(operation, "cycle already running, trigger skipped");
            metrics::counter!("pmr_sync_cycles_total", "status" => "skipped").increment(1);
            SyncError::Busy
        })
    }

    /// Render the desired state without touching the cluster.
    pub fn plan(&self, pmr: &Pmr) -> Result<DesiredState, SchemaError> {
        DesiredState::build(pmr, &self.config.trust, &self.config.marker)
    }

    pub async fn observe(&self) -> Result<ObservedState, ClusterReadError> {
        read_cluster_state(
            self.client.as_ref(),
            &self.config.marker.selector(),
            self.config.cluster_timeout,
        )
        .await
    }

    async fn desired_and_diff(
        &self,
        pmr: &Pmr,
    ) -> Result<(DesiredState, ObservedState, Diff), SyncError> {
        let desired = self.plan(pmr)?;
        let observed = self.observe().await?;
        let diff = diff(&desired, &observed);
        Ok((desired, observed, diff))
    }

    /// Converge the cluster to `pmr`.
    ///
    /// Orphans are reported, never deleted. Cancellation takes effect
    /// between objects; objects not yet applied are reported as skipped.
    ///
    /// # Errors
    /// `Schema` and `ClusterRead` abort before any mutation. Per-object
    /// write failures are carried in the report.
    pub async fn reconcile(
        &self,
        pmr: &Pmr,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, SyncError> {
        let _flight = self.begin("reconcile")?;
        let cycle_id = Uuid::new_v4();
        let started_at = Utc::now();

        if cancel.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        tracing::info!(%cycle_id, profiles = pmr.len(), "reconcile cycle started");
        let (desired, observed, diff) = self.desired_and_diff(pmr).await?;

        let results = self
            .applier()
            .apply_desired(&desired, self.config.max_concurrent_applies, cancel)
            .await;

        let report = CycleReport::new(
            cycle_id,
            started_at,
            desired.summary(),
            results,
            diff,
            observed.detached,
        );
        report.record_metrics();

        for name in &report.orphaned_workspaces {
            tracing::info!(%cycle_id, workspace = %name, "workspace not in PMR, awaiting confirmation");
        }
        for grant in &report.orphaned_grants {
            tracing::info!(%cycle_id, object = %grant.key, "access object not in PMR");
        }
        for access in &report.detached {
            tracing::info!(%cycle_id, object = %access.key, "access object without workspace");
        }
        tracing::info!(%cycle_id, status = %report.status(), "{}", report);
        Ok(report)
    }

    /// Parse a PMR document and reconcile it. A schema error fails the
    /// cycle before any cluster access.
    pub async fn reconcile_yaml(
        &self,
        yaml: &str,
        cancel: &CancellationToken,
    ) -> Result<CycleReport, SyncError> {
        let pmr = parse_pmr(yaml)?;
        self.reconcile(&pmr, cancel).await
    }

    /// List managed workspaces absent from `pmr`. The result becomes the
    /// confirmed set consulted by [`Reconciler::delete_stale`].
    pub async fn list_stale(&self, pmr: &Pmr) -> Result<StaleReport, SyncError> {
        let (_, observed, diff) = self.desired_and_diff(pmr).await?;

        *self.confirmed_stale.lock() = diff.orphaned_workspaces.iter().cloned().collect();
        metrics::gauge!("pmr_sync_orphans").set(
            (diff.orphaned_workspaces.len() + diff.orphaned_grants.len() + observed.detached.len())
                as f64,
        );

        let report = StaleReport {
            orphaned_workspaces: diff.orphaned_workspaces,
            orphaned_grants: diff.orphaned_grants,
            detached: observed.detached,
        };
        tracing::info!("{}", report);
        Ok(report)
    }

    /// Delete the named stale workspaces.
    ///
    /// Every name must have been surfaced by the most recent
    /// [`Reconciler::list_stale`]. A fresh listing is taken before deleting
    /// and names no longer stale are left alone. Confirmations are consumed.
    pub async fn delete_stale(
        &self,
        pmr: &Pmr,
        names: &[String],
    ) -> Result<DeleteReport, SyncError> {
        let _flight = self.begin("delete-stale")?;

        let unconfirmed: Vec<String> = {
            let confirmed = self.confirmed_stale.lock();
            names
                .iter()
                .filter(|n| !confirmed.contains(*n))
                .cloned()
                .collect()
        };
        if !unconfirmed.is_empty() {
            return Err(SyncError::OrphanConfirmationRequired(unconfirmed));
        }

        let (_, observed, diff) = self.desired_and_diff(pmr).await?;
        let fresh: BTreeSet<&String> = diff.orphaned_workspaces.iter().collect();
        let applier = self.applier();

        let mut report = DeleteReport {
            requested: names.to_vec(),
            orphaned_grants: diff.orphaned_grants.clone(),
            ..Default::default()
        };

        for name in names {
            if !fresh.contains(name) {
                tracing::info!(workspace = %name, "no longer stale, not deleting");
                report.no_longer_stale.push(name.clone());
                continue;
            }
            let dependents: Vec<_> = observed
                .workspace(name)
                .map(|ws| ws.access.keys().cloned().collect())
                .unwrap_or_default();

            let outcome = applier.delete_workspace(name, &dependents).await;
            report.deleted_dependents.extend(outcome.deleted_dependents);
            report.failures.extend(
                outcome
                    .failures
                    .into_iter()
                    .map(|(key, error)| ObjectFailure { key, error }),
            );
            if outcome.workspace_deleted {
                tracing::info!(workspace = %name, "deleted stale workspace");
                report.deleted_workspaces.push(name.clone());
            }
        }

        {
            let mut confirmed = self.confirmed_stale.lock();
            for name in names {
                confirmed.remove(name);
            }
        }

        tracing::info!("{}", report);
        Ok(report)
    }

    /// Remove every contributor grant and policy from stale workspaces,
    /// keeping the workspaces and their owner access. Managed access left
    /// behind in namespaces with no managed workspace is removed too.
    pub async fn revoke_stale_access(&self, pmr: &Pmr) -> Result<RevokeReport, SyncError> {
        let _flight = self.begin("revoke-stale")?;
        let (_, observed, diff) = self.desired_and_diff(pmr).await?;
        let applier = self.applier();

        let mut report = RevokeReport::default();
        for name in &diff.orphaned_workspaces {
            let Some(ws) = observed.workspace(name) else {
                continue;
            };
            report.workspaces.push(name.clone());
            for key in ws.access.keys() {
                remove_access(&applier, key, &mut report.revoked, &mut report.failures).await;
            }
        }
        for access in &observed.detached {
            remove_access(&applier, &access.key, &mut report.detached, &mut report.failures)
                .await;
        }

        tracing::info!("{}", report);
        Ok(report)
    }

    /// Delete grants and policies in desired workspaces that match no
    /// contributor of the PMR, such as removed contributors or a role
    /// held before a change.
    ///
    /// Never part of [`Reconciler::reconcile`]. Stale workspaces and
    /// detached access are left to their own operations.
    pub async fn prune_orphaned_grants(&self, pmr: &Pmr) -> Result<PruneReport, SyncError> {
        let _flight = self.begin("prune-grants")?;
        let (_, _, diff) = self.desired_and_diff(pmr).await?;
        let applier = self.applier();

        let mut report = PruneReport::default();
        for grant in &diff.orphaned_grants {
            remove_access(&applier, &grant.key, &mut report.pruned, &mut report.failures).await;
        }

        tracing::info!("{}", report);
        Ok(report)
    }
}

/// Delete one managed access object, recording where it went.
async fn remove_access<C>(
    applier: &Applier<'_, C>,
    key: &ObjectKey,
    removed: &mut Vec<ObjectKey>,
    failures: &mut Vec<ObjectFailure>,
) where
    C: ClusterClient + ?Sized,
{
    match applier.delete(key).await {
        Ok(true) => {
            tracing::info!(object = %key, "deleted access object");
            removed.push(key.clone());
        }
        Ok(false) => {}
        Err(error) => {
            tracing::warn!(object = %key, %error, "access removal failed");
            failures.push(ObjectFailure {
                key: key.clone(),
                error,
            });
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
