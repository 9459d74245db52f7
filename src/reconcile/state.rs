// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Observed cluster state.
//!
//! Lists managed objects of every kind and groups grants and policies
//! under the workspace owning their namespace. Any list failure aborts:
//! a partial view must never drive a diff.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::k8s::client::{with_timeout, ClusterClient, ClusterError};
use crate::k8s::naming::{access_annotations, is_owner_resource};
use crate::k8s::selector::LabelSelector;
use crate::k8s::types::{ClusterObject, ObjectKey, ObjectSpec, ResourceKind, Subject};
use crate::pmr::{ResourceQuota, Role};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to list {kind} objects: {source}")]
pub struct ClusterReadError {
    pub kind: ResourceKind,
    #[source]
    pub source: ClusterError,
}

/// A managed grant or policy as found in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObservedAccess {
    pub key: ObjectKey,
    /// Contributor and role from the access annotations, when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl ObservedAccess {
    fn from_object(object: &ClusterObject) -> Self {
        let (user, role) = match access_annotations(object) {
            Some((user, role)) => (Some(user), Some(role)),
            None => (None, None),
        };
        Self {
            key: object.key(),
            user,
            role,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservedWorkspace {
    pub name: String,
    pub owner: Subject,
    pub quota: ResourceQuota,
    /// Managed grants and policies in the workspace namespace, by key.
    pub access: BTreeMap<ObjectKey, ObservedAccess>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedState {
    pub workspaces: BTreeMap<String, ObservedWorkspace>,
    /// Managed grants and policies outside every managed workspace.
    pub detached: Vec<ObservedAccess>,
}

impl ObservedState {
    pub fn workspace(&self, name: &str) -> Option<&ObservedWorkspace> {
        self.workspaces.get(name)
    }

    pub fn access_count(&self) -> usize {
        self.workspaces.values().map(|w| w.access.len()).sum()
    }
}

async fn list_kind<C>(
    client: &C,
    kind: ResourceKind,
    selector: &LabelSelector,
    timeout: Duration,
) -> Result<Vec<ClusterObject>, ClusterReadError>
where
    C: ClusterClient + ?Sized,
{
    let objects = with_timeout(timeout, client.list(kind, None, selector))
        .await
        .map_err(|source| ClusterReadError { kind, source })?;

    // The selector is re-applied in case a backend ignores it.
    Ok(objects
        .into_iter()
        .filter(|o| o.kind() == kind && selector.matches(&o.metadata.labels))
        .collect())
}

/// Read every managed object matching `selector`.
///
/// # Errors
/// Returns `ClusterReadError` for the first kind that cannot be listed.
pub async fn read_cluster_state<C>(
    client: &C,
    selector: &LabelSelector,
    timeout: Duration,
) -> Result<ObservedState, ClusterReadError>
where
    C: ClusterClient + ?Sized,
{
    let mut state = ObservedState::default();

    for object in list_kind(client, ResourceKind::Workspace, selector, timeout).await? {
        let ObjectSpec::Workspace(spec) = &object.spec else {
            continue;
        };
        state.workspaces.insert(
            object.name().to_string(),
            ObservedWorkspace {
                name: object.name().to_string(),
                owner: spec.owner.clone(),
                quota: spec.resource_quota_spec.clone(),
                access: BTreeMap::new(),
            },
        );
    }

    for kind in [ResourceKind::AccessGrant, ResourceKind::NetworkPolicy] {
        for object in list_kind(client, kind, selector, timeout).await? {
            if is_owner_resource(object.name()) {
                continue;
            }
            let access = ObservedAccess::from_object(&object);
            match object
                .namespace()
                .and_then(|ns| state.workspaces.get_mut(ns))
            {
                Some(ws) => {
                    ws.access.insert(access.key.clone(), access);
                }
                None => state.detached.push(access),
            }
        }
    }

    tracing::debug!(
        workspaces = state.workspaces.len(),
        access_objects = state.access_count(),
        detached = state.detached.len(),
        "read cluster state"
    );
    Ok(state)
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
