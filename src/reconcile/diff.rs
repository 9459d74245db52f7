// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Desired vs observed comparison.
//!
//! Only orphans are computed here. Everything desired is applied as
//! create-or-update regardless of what was observed.

use serde::Serialize;

use super::desired::DesiredState;
use super::state::{ObservedAccess, ObservedState};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    /// Managed workspaces absent from the PMR.
    pub orphaned_workspaces: Vec<String>,
    /// Managed grants and policies of desired workspaces matching no
    /// desired key.
    pub orphaned_grants: Vec<ObservedAccess>,
}

impl Diff {
    pub fn is_empty(&self) -> bool {
        self.orphaned_workspaces.is_empty() && self.orphaned_grants.is_empty()
    }
}

pub fn diff(desired: &DesiredState, observed: &ObservedState) -> Diff {
    let desired_keys = desired.access_keys();

    let orphaned_workspaces = observed
        .workspaces
        .keys()
        .filter(|name| !desired.has_workspace(name))
        .cloned()
        .collect();

    let orphaned_grants = observed
        .workspaces
        .values()
        .filter(|ws| desired.has_workspace(&ws.name))
        .flat_map(|ws| ws.access.values())
        .filter(|access| !desired_keys.contains(&access.key))
        .cloned()
        .collect();

    Diff {
        orphaned_workspaces,
        orphaned_grants,
    }
}
