// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Applies desired objects and deletes stale ones.
//!
//! Every desired object is issued as create-or-update by its deterministic
//! key. Failures are collected per object; one bad object never stops the
//! rest of the batch.

use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use super::desired::DesiredState;
use crate::k8s::client::{with_timeout, ClusterClient, ClusterError};
use crate::k8s::selector::ManagementMarker;
use crate::k8s::types::{ClusterObject, ObjectKey};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClusterWriteError {
    #[error("{0} exists but does not carry the management marker")]
    Unmanaged(ObjectKey),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyOutcome {
    Created,
    /// `changed` is false when the stored object already matched.
    Updated { changed: bool },
}

/// Result of one object in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectResult {
    Applied(ApplyOutcome),
    Failed(ClusterWriteError),
    Skipped,
}

/// Removal of a workspace and, when the cluster does not cascade, its
/// dependents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkspaceDeletion {
    pub deleted_dependents: Vec<ObjectKey>,
    pub workspace_deleted: bool,
    pub failures: Vec<(ObjectKey, ClusterWriteError)>,
}

pub struct Applier<'a, C: ?Sized> {
    client: &'a C,
    marker: &'a ManagementMarker,
    timeout: Duration,
}

impl<'a, C> Applier<'a, C>
where
    C: ClusterClient + ?Sized,
{
    pub fn new(client: &'a C, marker: &'a ManagementMarker, timeout: Duration) -> Self {
        Self {
            client,
            marker,
            timeout,
        }
    }

    /// Create `desired`, or overwrite the existing object with that key.
    ///
    /// # Errors
    /// `Unmanaged` when an object with the key exists without the marker;
    /// cluster errors otherwise.
    pub async fn apply(&self, desired: ClusterObject) -> Result<ApplyOutcome, ClusterWriteError> {
        let key = desired.key();
        match with_timeout(self.timeout, self.client.get(&key)).await? {
            None => {
                with_timeout(self.timeout, self.client.create(desired)).await?;
                Ok(ApplyOutcome::Created)
            }
            Some(existing) => {
                if !self.marker.is_marked(&existing.metadata) {
                    return Err(ClusterWriteError::Unmanaged(key));
                }
                let changed = !existing.same_content(&desired);
                let mut object = desired;
                object.metadata.resource_version = existing.metadata.resource_version;
                with_timeout(self.timeout, self.client.update(object)).await?;
                Ok(ApplyOutcome::Updated { changed })
            }
        }
    }

    /// Delete a managed object. Returns false when it was already gone.
    pub async fn delete(&self, key: &ObjectKey) -> Result<bool, ClusterWriteError> {
        let Some(existing) = with_timeout(self.timeout, self.client.get(key)).await? else {
            return Ok(false);
        };
        if !self.marker.is_marked(&existing.metadata) {
            return Err(ClusterWriteError::Unmanaged(key.clone()));
        }
        match with_timeout(self.timeout, self.client.delete(key)).await {
            Ok(()) => Ok(true),
            Err(ClusterError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply objects in order, stopping at cancellation.
    async fn apply_batch(
        &self,
        objects: Vec<ClusterObject>,
        cancel: &CancellationToken,
    ) -> Vec<(ObjectKey, ObjectResult)> {
        let mut results = Vec::with_capacity(objects.len());
        for object in objects {
            let key = object.key();
            if cancel.is_cancelled() {
                results.push((key, ObjectResult::Skipped));
                continue;
            }
            let result = match self.apply(object).await {
                Ok(outcome) => {
                    tracing::debug!(object = %key, ?outcome, "applied");
                    ObjectResult::Applied(outcome)
                }
                Err(error) => {
                    tracing::warn!(object = %key, %error, "apply failed");
                    ObjectResult::Failed(error)
                }
            };
            results.push((key, result));
        }
        results
    }

    /// Apply a desired state: every workspace first, then grant and policy
    /// per contributor. Workspaces run up to `max_concurrent` at a time;
    /// each workspace's access objects run in PMR order. Results come back
    /// in that same order.
    pub async fn apply_desired(
        &self,
        desired: &DesiredState,
        max_concurrent: usize,
        cancel: &CancellationToken,
    ) -> Vec<(ObjectKey, ObjectResult)> {
        let limit = max_concurrent.max(1);

        let workspace_batches: Vec<Vec<ClusterObject>> = desired
            .workspaces()
            .iter()
            .map(|w| vec![w.workspace.clone()])
            .collect();
        let access_batches: Vec<Vec<ClusterObject>> = desired
            .workspaces()
            .iter()
            .map(|w| w.access_objects(desired.marker()))
            .collect();

        let mut results = Vec::with_capacity(desired.summary().total());
        for batches in [workspace_batches, access_batches] {
            let done: Vec<Vec<(ObjectKey, ObjectResult)>> = stream::iter(batches)
                .map(|batch| self.apply_batch(batch, cancel))
                .buffered(limit)
                .collect()
                .await;
            results.extend(done.into_iter().flatten());
        }
        results
    }

    /// Delete a workspace. Unless the cluster cascades, `dependents` are
    /// deleted first and the workspace is kept if any of them fails.
    pub async fn delete_workspace(&self, name: &str, dependents: &[ObjectKey]) -> WorkspaceDeletion {
        let mut outcome = WorkspaceDeletion::default();

        if !self.client.supports_cascading_delete() {
            for key in dependents {
                match self.delete(key).await {
                    Ok(true) => outcome.deleted_dependents.push(key.clone()),
                    Ok(false) => {}
                    Err(error) => {
                        tracing::warn!(object = %key, %error, "dependent delete failed");
                        outcome.failures.push((key.clone(), error));
                    }
                }
            }
            if !outcome.failures.is_empty() {
                return outcome;
            }
        }

        let key = ObjectKey::workspace(name);
        match self.delete(&key).await {
            Ok(deleted) => outcome.workspace_deleted = deleted,
            Err(error) => {
                tracing::warn!(object = %key, %error, "workspace delete failed");
                outcome.failures.push((key, error));
            }
        }
        outcome
    }
}

#[cfg(test)]
#[path = "applier_tests.rs"]
mod tests;
