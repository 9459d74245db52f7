// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Role-to-grant translation.
//!
//! Pure functions turning a profile and its contributors into the objects
//! that realize their access. Identical inputs always render identical
//! objects, which is what makes create-or-update idempotent.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::k8s::naming::{
    contributor_object_name, PIPELINE_ACCESS_ANNOTATION, ROLE_ANNOTATION, USER_ANNOTATION,
};
use crate::k8s::selector::ManagementMarker;
use crate::k8s::types::{
    AccessGrantSpec, ClusterObject, NetworkPolicySpec, ObjectKey, ObjectMeta, ObjectSpec,
    PolicyRule, ResourceKind, RoleRef, RuleCondition, RuleSource, Subject, SubjectKind,
    WorkspaceSpec,
};
use crate::pmr::{Contributor, Profile, Role};

pub const DEFAULT_KFP_UI_PRINCIPAL: &str = "cluster.local/ns/kubeflow/sa/ml-pipeline-ui";
pub const DEFAULT_ISTIO_INGRESSGATEWAY_PRINCIPAL: &str =
    "cluster.local/ns/istio-system/sa/istio-ingressgateway-service-account";

/// Header carrying the authenticated user identity.
pub const USER_ID_HEADER: &str = "kubeflow-userid";

const RBAC_API_GROUP: &str = "rbac.authorization.k8s.io";

/// Condition key matching [`USER_ID_HEADER`].
pub fn user_id_condition_key() -> String {
    format!("request.headers[{}]", USER_ID_HEADER)
}

/// Platform identities allowed as request sources in every policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustPrincipals {
    pub pipeline_ui: String,
    pub ingress_gateway: String,
}

impl Default for TrustPrincipals {
    fn default() -> Self {
        Self {
            pipeline_ui: DEFAULT_KFP_UI_PRINCIPAL.to_string(),
            ingress_gateway: DEFAULT_ISTIO_INGRESSGATEWAY_PRINCIPAL.to_string(),
        }
    }
}

impl TrustPrincipals {
    pub fn new(pipeline_ui: impl Into<String>, ingress_gateway: impl Into<String>) -> Self {
        Self {
            pipeline_ui: pipeline_ui.into(),
            ingress_gateway: ingress_gateway.into(),
        }
    }

    /// The `from` principals, pipeline UI first.
    pub fn principals(&self) -> Vec<String> {
        vec![self.pipeline_ui.clone(), self.ingress_gateway.clone()]
    }
}

/// Whether a role may modify pipeline-execution resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineAccess {
    ReadOnly,
    ReadWrite,
}

impl PipelineAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineAccess::ReadOnly => "read-only",
            PipelineAccess::ReadWrite => "read-write",
        }
    }
}

impl fmt::Display for PipelineAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a role grants inside a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePermissions {
    pub role: Role,
    pub cluster_role: &'static str,
    pub pipelines: PipelineAccess,
}

/// Role lookup table, highest role first.
pub const ROLE_PERMISSIONS: [RolePermissions; 3] = [
    RolePermissions {
        role: Role::Admin,
        cluster_role: "kubeflow-admin",
        pipelines: PipelineAccess::ReadWrite,
    },
    RolePermissions {
        role: Role::Edit,
        cluster_role: "kubeflow-edit",
        pipelines: PipelineAccess::ReadWrite,
    },
    RolePermissions {
        role: Role::View,
        cluster_role: "kubeflow-view",
        pipelines: PipelineAccess::ReadOnly,
    },
];

pub fn permissions(role: Role) -> &'static RolePermissions {
    match role {
        Role::Admin => &ROLE_PERMISSIONS[0],
        Role::Edit => &ROLE_PERMISSIONS[1],
        Role::View => &ROLE_PERMISSIONS[2],
    }
}

/// Desired RoleBinding for one contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantSpec {
    pub namespace: String,
    pub name: String,
    pub user: String,
    pub role: Role,
    pub cluster_role: String,
    pub pipelines: PipelineAccess,
}

impl GrantSpec {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::namespaced(ResourceKind::AccessGrant, &self.namespace, &self.name)
    }

    pub fn to_object(&self, marker: &ManagementMarker) -> ClusterObject {
        let mut meta = contributor_meta(&self.namespace, &self.name, &self.user, self.role);
        meta.annotations.insert(
            PIPELINE_ACCESS_ANNOTATION.to_string(),
            self.pipelines.to_string(),
        );
        marker.stamp(&mut meta);

        ClusterObject::new(
            meta,
            ObjectSpec::AccessGrant(AccessGrantSpec {
                role_ref: RoleRef {
                    api_group: RBAC_API_GROUP.to_string(),
                    kind: "ClusterRole".to_string(),
                    name: self.cluster_role.clone(),
                },
                subjects: vec![Subject {
                    kind: SubjectKind::User,
                    name: self.user.clone(),
                    api_group: Some(RBAC_API_GROUP.to_string()),
                }],
            }),
        )
        .with_fingerprint()
    }
}

/// Desired AuthorizationPolicy for one contributor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySpec {
    pub namespace: String,
    pub name: String,
    pub user: String,
    pub role: Role,
    pub principals: Vec<String>,
}

impl PolicySpec {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::namespaced(ResourceKind::NetworkPolicy, &self.namespace, &self.name)
    }

    pub fn to_object(&self, marker: &ManagementMarker) -> ClusterObject {
        let mut meta = contributor_meta(&self.namespace, &self.name, &self.user, self.role);
        marker.stamp(&mut meta);

        ClusterObject::new(
            meta,
            ObjectSpec::NetworkPolicy(NetworkPolicySpec {
                rules: vec![PolicyRule {
                    from: vec![RuleSource {
                        principals: self.principals.clone(),
                    }],
                    when: vec![RuleCondition {
                        key: user_id_condition_key(),
                        values: vec![self.user.clone()],
                    }],
                }],
            }),
        )
        .with_fingerprint()
    }
}

fn contributor_meta(namespace: &str, name: &str, user: &str, role: Role) -> ObjectMeta {
    let mut meta = ObjectMeta {
        name: name.to_string(),
        namespace: Some(namespace.to_string()),
        ..Default::default()
    };
    meta.annotations
        .insert(USER_ANNOTATION.to_string(), user.to_string());
    meta.annotations
        .insert(ROLE_ANNOTATION.to_string(), role.to_string());
    meta
}

/// Grant and policy realizing `contributor`'s role in `profile_name`.
pub fn translate(
    profile_name: &str,
    contributor: &Contributor,
    trust: &TrustPrincipals,
) -> (GrantSpec, PolicySpec) {
    let perms = permissions(contributor.role);
    let name = contributor_object_name(&contributor.name, contributor.role);

    let grant = GrantSpec {
        namespace: profile_name.to_string(),
        name: name.clone(),
        user: contributor.name.clone(),
        role: contributor.role,
        cluster_role: perms.cluster_role.to_string(),
        pipelines: perms.pipelines,
    };
    let policy = PolicySpec {
        namespace: profile_name.to_string(),
        name,
        user: contributor.name.clone(),
        role: contributor.role,
        principals: trust.principals(),
    };
    (grant, policy)
}

/// Workspace object for a profile. Owner access rides on the workspace
/// spec and is never rendered as a contributor grant.
pub fn render_workspace(profile: &Profile, marker: &ManagementMarker) -> ClusterObject {
    let owner = profile.owner();
    let mut meta = ObjectMeta {
        name: profile.name().to_string(),
        ..Default::default()
    };
    marker.stamp(&mut meta);

    let api_group = match owner.kind {
        crate::pmr::OwnerKind::User => Some(RBAC_API_GROUP.to_string()),
        crate::pmr::OwnerKind::ServiceAccount => None,
    };

    ClusterObject::new(
        meta,
        ObjectSpec::Workspace(WorkspaceSpec {
            owner: Subject {
                kind: owner.kind.into(),
                name: owner.name.clone(),
                api_group,
            },
            resource_quota_spec: profile.resources().clone(),
        }),
    )
    .with_fingerprint()
}

#[cfg(test)]
#[path = "translator_tests.rs"]
mod tests;
