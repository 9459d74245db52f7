// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Desired cluster state computed from a PMR.

use std::collections::{BTreeSet, HashMap};

use serde::Serialize;

use super::translator::{render_workspace, translate, GrantSpec, PolicySpec, TrustPrincipals};
use crate::k8s::selector::ManagementMarker;
use crate::k8s::types::{ClusterObject, ObjectKey};
use crate::pmr::{Contributor, Pmr, SchemaError, SchemaViolation};

/// Access objects for one contributor of a workspace.
#[derive(Debug, Clone)]
pub struct DesiredAccess {
    pub contributor: Contributor,
    pub grant: GrantSpec,
    pub policy: PolicySpec,
}

#[derive(Debug, Clone)]
pub struct DesiredWorkspace {
    pub name: String,
    pub workspace: ClusterObject,
    /// Contributors in PMR order.
    pub access: Vec<DesiredAccess>,
}

impl DesiredWorkspace {
    /// Grant then policy per contributor, rendered.
    pub fn access_objects(&self, marker: &ManagementMarker) -> Vec<ClusterObject> {
        self.access
            .iter()
            .flat_map(|a| [a.grant.to_object(marker), a.policy.to_object(marker)])
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DesiredSummary {
    pub workspaces: usize,
    pub grants: usize,
    pub policies: usize,
}

impl DesiredSummary {
    pub fn total(&self) -> usize {
        self.workspaces + self.grants + self.policies
    }
}

/// Every object a PMR asks for, in apply order.
#[derive(Debug, Clone)]
pub struct DesiredState {
    workspaces: Vec<DesiredWorkspace>,
    marker: ManagementMarker,
}

impl DesiredState {
    /// Render the PMR.
    ///
    /// # Errors
    /// Fails when two contributors of one profile map to the same object
    /// name after RFC-1123 sanitation.
    pub fn build(
        pmr: &Pmr,
        trust: &TrustPrincipals,
        marker: &ManagementMarker,
    ) -> Result<Self, SchemaError> {
        let mut workspaces = Vec::with_capacity(pmr.len());

        for (i, profile) in pmr.profiles().enumerate() {
            let mut claimed: HashMap<String, &str> = HashMap::new();
            let mut access = Vec::with_capacity(profile.contributors().len());

            for (j, contributor) in profile.contributors().iter().enumerate() {
                let (grant, policy) = translate(profile.name(), contributor, trust);
                if let Some(first) = claimed.insert(grant.name.clone(), &contributor.name) {
                    return Err(SchemaError::new(
                        format!("profiles[{}].contributors[{}].name", i, j),
                        SchemaViolation::ObjectNameCollision {
                            object: grant.name.clone(),
                            first: first.to_string(),
                            second: contributor.name.clone(),
                        },
                    ));
                }
                access.push(DesiredAccess {
                    contributor: contributor.clone(),
                    grant,
                    policy,
                });
            }

            workspaces.push(DesiredWorkspace {
                name: profile.name().to_string(),
                workspace: render_workspace(profile, marker),
                access,
            });
        }

        Ok(Self {
            workspaces,
            marker: marker.clone(),
        })
    }

    pub fn workspaces(&self) -> &[DesiredWorkspace] {
        &self.workspaces
    }

    pub fn marker(&self) -> &ManagementMarker {
        &self.marker
    }

    pub fn has_workspace(&self, name: &str) -> bool {
        self.workspaces.iter().any(|w| w.name == name)
    }

    pub fn workspace_names(&self) -> BTreeSet<String> {
        self.workspaces.iter().map(|w| w.name.clone()).collect()
    }

    /// Keys of every desired grant and policy.
    pub fn access_keys(&self) -> BTreeSet<ObjectKey> {
        self.workspaces
            .iter()
            .flat_map(|w| &w.access)
            .flat_map(|a| [a.grant.key(), a.policy.key()])
            .collect()
    }

    pub fn summary(&self) -> DesiredSummary {
        let contributors: usize = self.workspaces.iter().map(|w| w.access.len()).sum();
        DesiredSummary {
            workspaces: self.workspaces.len(),
            grants: contributors,
            policies: contributors,
        }
    }

    /// All objects: every workspace first, then grant and policy per
    /// contributor in PMR order.
    pub fn objects(&self) -> Vec<ClusterObject> {
        let mut out: Vec<ClusterObject> =
            self.workspaces.iter().map(|w| w.workspace.clone()).collect();
        for ws in &self.workspaces {
            out.extend(ws.access_objects(&self.marker));
        }
        out
    }
}

#[cfg(test)]
#[path = "desired_tests.rs"]
mod tests;
