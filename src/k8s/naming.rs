// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Object naming and access annotations.

use std::str::FromStr;

use super::types::ClusterObject;
use super::validation::MAX_LABEL_LENGTH;
use crate::pmr::Role;

/// RoleBinding granting the owner access, created by the workspace controller.
pub const OWNER_ROLE_BINDING_NAME: &str = "namespaceAdmin";

/// AuthorizationPolicy granting the owner access, created by the workspace controller.
pub const OWNER_POLICY_NAME: &str = "ns-owner-access-istio";

/// Annotation holding the contributor identity.
pub const USER_ANNOTATION: &str = "user";

/// Annotation holding the contributor role.
pub const ROLE_ANNOTATION: &str = "role";

/// Annotation recording whether the grant includes pipeline access.
pub const PIPELINE_ACCESS_ANNOTATION: &str = "pmr-sync.io/pipeline-access";

/// Map an arbitrary string onto an RFC 1123 label.
///
/// Lowercases, replaces every character outside `[a-z0-9-]` with `-`,
/// strips leading and trailing dashes and truncates to 63 characters.
pub fn to_rfc1123_compliant(name: &str) -> String {
    let mapped: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_lowercase() || c.is_ascii_digit() {
                c
            } else {
                '-'
            }
        })
        .collect();

    // Only ASCII remains, so byte truncation is safe.
    let mut trimmed = mapped.trim_matches('-').to_string();
    trimmed.truncate(MAX_LABEL_LENGTH);
    trimmed.trim_end_matches('-').to_string()
}

/// Name of the grant and policy objects for a contributor at a role.
pub fn contributor_object_name(contributor: &str, role: Role) -> String {
    to_rfc1123_compliant(&format!("{}-{}", contributor, role))
}

/// True for the owner objects that are never treated as contributor access.
pub fn is_owner_resource(name: &str) -> bool {
    name == OWNER_ROLE_BINDING_NAME || name == OWNER_POLICY_NAME
}

/// Contributor identity and role recorded on a grant or policy.
///
/// `None` when either annotation is missing or the role is unknown.
pub fn access_annotations(object: &ClusterObject) -> Option<(String, Role)> {
    let user = object.annotation(USER_ANNOTATION)?;
    let role = Role::from_str(object.annotation(ROLE_ANNOTATION)?).ok()?;
    Some((user.to_string(), role))
}

#[cfg(test)]
#[path = "naming_tests.rs"]
mod tests;
