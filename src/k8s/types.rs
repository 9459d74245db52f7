// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Typed cluster objects managed by the engine.
//!
//! Three kinds are reconciled:
//! - Workspace: the cluster-scoped `Profile` (`kubeflow.org/v1`)
//! - AccessGrant: a namespaced `RoleBinding` (`rbac.authorization.k8s.io/v1`)
//! - NetworkPolicy: a namespaced `AuthorizationPolicy` (`security.istio.io/v1beta1`)

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::pmr::{OwnerKind, ResourceQuota};

/// Annotation carrying the fingerprint of the rendered object.
pub const SPEC_HASH_ANNOTATION: &str = "pmr-sync.io/spec-hash";

/// Kind of a reconciled object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Workspace,
    AccessGrant,
    NetworkPolicy,
}

impl ResourceKind {
    pub fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "kubeflow.org/v1",
            ResourceKind::AccessGrant => "rbac.authorization.k8s.io/v1",
            ResourceKind::NetworkPolicy => "security.istio.io/v1beta1",
        }
    }

    /// Kubernetes `kind` of the object.
    pub fn kind_name(&self) -> &'static str {
        match self {
            ResourceKind::Workspace => "Profile",
            ResourceKind::AccessGrant => "RoleBinding",
            ResourceKind::NetworkPolicy => "AuthorizationPolicy",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// Identity of an object in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    pub kind: ResourceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub name: String,
}

impl ObjectKey {
    pub fn workspace(name: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Workspace,
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespaced(
        kind: ResourceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{}", self.kind, ns, self.name),
            None => write!(f, "{}/{}", self.kind, self.name),
        }
    }
}

/// Object metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

/// RBAC subject kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SubjectKind {
    User,
    ServiceAccount,
}

impl From<OwnerKind> for SubjectKind {
    fn from(kind: OwnerKind) -> Self {
        match kind {
            OwnerKind::User => SubjectKind::User,
            OwnerKind::ServiceAccount => SubjectKind::ServiceAccount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub kind: SubjectKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
}

/// Profile spec: owner and resource quota of a workspace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceSpec {
    pub owner: Subject,
    #[serde(default, skip_serializing_if = "ResourceQuota::is_empty")]
    pub resource_quota_spec: ResourceQuota,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleRef {
    pub api_group: String,
    pub kind: String,
    pub name: String,
}

/// RoleBinding body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessGrantSpec {
    pub role_ref: RoleRef,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleSource {
    pub principals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleCondition {
    pub key: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub from: Vec<RuleSource>,
    pub when: Vec<RuleCondition>,
}

/// AuthorizationPolicy body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicySpec {
    pub rules: Vec<PolicyRule>,
}

impl NetworkPolicySpec {
    /// Principals allowed by the first rule, if the rule has the expected shape.
    pub fn principals(&self) -> Option<&[String]> {
        let source = self.rules.first()?.from.first()?;
        Some(&source.principals)
    }

    /// First value matched for `key` by the first rule.
    pub fn condition_value(&self, key: &str) -> Option<&str> {
        let cond = self.rules.first()?.when.first()?;
        if cond.key == key {
            cond.values.first().map(String::as_str)
        } else {
            None
        }
    }
}

/// Kind-specific body of a cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectSpec {
    Workspace(WorkspaceSpec),
    AccessGrant(AccessGrantSpec),
    NetworkPolicy(NetworkPolicySpec),
}

impl ObjectSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ObjectSpec::Workspace(_) => ResourceKind::Workspace,
            ObjectSpec::AccessGrant(_) => ResourceKind::AccessGrant,
            ObjectSpec::NetworkPolicy(_) => ResourceKind::NetworkPolicy,
        }
    }
}

/// A typed object as stored in the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterObject {
    pub metadata: ObjectMeta,
    pub spec: ObjectSpec,
}

impl ClusterObject {
    pub fn new(metadata: ObjectMeta, spec: ObjectSpec) -> Self {
        Self { metadata, spec }
    }

    pub fn kind(&self) -> ResourceKind {
        self.spec.kind()
    }

    pub fn api_version(&self) -> &'static str {
        self.kind().api_version()
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey {
            kind: self.kind(),
            namespace: self.metadata.namespace.clone(),
            name: self.metadata.name.clone(),
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    pub fn annotation(&self, key: &str) -> Option<&str> {
        self.metadata.annotations.get(key).map(String::as_str)
    }

    /// SHA-256 over the rendered labels, annotations and spec.
    ///
    /// `resourceVersion` and the hash annotation itself are excluded, so
    /// two renderings of the same desired state always agree.
    pub fn fingerprint(&self) -> String {
        let mut annotations = self.metadata.annotations.clone();
        annotations.remove(SPEC_HASH_ANNOTATION);

        let mut hasher = Sha256::new();
        hasher.update(self.kind().kind_name().as_bytes());
        hasher.update(self.metadata.name.as_bytes());
        hasher.update(self.metadata.namespace.as_deref().unwrap_or("").as_bytes());
        for (k, v) in self.metadata.labels.iter().chain(annotations.iter()) {
            hasher.update(k.as_bytes());
            hasher.update([0u8]);
            hasher.update(v.as_bytes());
            hasher.update([0u8]);
        }
        if let Ok(spec) = serde_json::to_vec(&self.spec) {
            hasher.update(&spec);
        }
        hex::encode(hasher.finalize())
    }

    /// Record the fingerprint in the hash annotation.
    pub fn with_fingerprint(mut self) -> Self {
        let hash = self.fingerprint();
        self.metadata
            .annotations
            .insert(SPEC_HASH_ANNOTATION.to_string(), hash);
        self
    }

    /// True when labels, annotations and spec match `other`, ignoring
    /// `resourceVersion`.
    pub fn same_content(&self, other: &ClusterObject) -> bool {
        self.metadata.name == other.metadata.name
            && self.metadata.namespace == other.metadata.namespace
            && self.metadata.labels == other.metadata.labels
            && self.metadata.annotations == other.metadata.annotations
            && self.spec == other.spec
    }
}

#[cfg(test)]
#[path = "types_tests.rs"]
mod tests;
