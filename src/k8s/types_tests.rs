// Copyright 2024-2026 pmr-sync Contributors
// SPDX-License-Identifier: Apache-2.0

//! Tests for cluster object types.

use super::*;

fn workspace(name: &str) -> ClusterObject {
    ClusterObject::new(
        ObjectMeta {
            name: name.to_string(),
            ..Default::default()
        },
        ObjectSpec::Workspace(WorkspaceSpec {
            owner: Subject {
                kind: SubjectKind::User,
                name: "admin@example.com".to_string(),
                api_group: Some("rbac.authorization.k8s.io".to_string()),
            },
            resource_quota_spec: ResourceQuota::from_hard([("limits.cpu", "1")]),
        }),
    )
}

fn policy(principals: &[&str], user: &str) -> NetworkPolicySpec {
    NetworkPolicySpec {
        rules: vec![PolicyRule {
            from: vec![RuleSource {
                principals: principals.iter().map(|p| p.to_string()).collect(),
            }],
            when: vec![RuleCondition {
                key: "request.headers[kubeflow-userid]".to_string(),
                values: vec![user.to_string()],
            }],
        }],
    }
}

#[test]
fn test_kind_metadata() {
    assert_eq!(ResourceKind::Workspace.kind_name(), "Profile");
    assert_eq!(ResourceKind::AccessGrant.kind_name(), "RoleBinding");
    assert_eq!(ResourceKind::NetworkPolicy.kind_name(), "AuthorizationPolicy");
    assert_eq!(ResourceKind::Workspace.api_version(), "kubeflow.org/v1");
    assert_eq!(
        ResourceKind::NetworkPolicy.api_version(),
        "security.istio.io/v1beta1"
    );
}

#[test]
fn test_object_key_display() {
    assert_eq!(
        ObjectKey::workspace("ml-engineers").to_string(),
        "Profile/ml-engineers"
    );
    assert_eq!(
        ObjectKey::namespaced(ResourceKind::AccessGrant, "ml-engineers", "michal-edit")
            .to_string(),
        "RoleBinding/ml-engineers/michal-edit"
    );
}

#[test]
fn test_object_key_from_object() {
    let obj = workspace("team");
    assert_eq!(obj.key(), ObjectKey::workspace("team"));
    assert_eq!(obj.kind(), ResourceKind::Workspace);
    assert!(obj.namespace().is_none());
}

#[test]
fn test_serialize_workspace() {
    let json = serde_json::to_string(&workspace("team")).unwrap();
    assert!(json.contains("resourceQuotaSpec"));
    assert!(json.contains("limits.cpu"));
    assert!(json.contains("\"apiGroup\""));
    assert!(!json.contains("resourceVersion"));

    let back: ClusterObject = serde_json::from_str(&json).unwrap();
    assert_eq!(back, workspace("team"));
}

#[test]
fn test_empty_quota_omitted() {
    let mut obj = workspace("team");
    if let ObjectSpec::Workspace(spec) = &mut obj.spec {
        spec.resource_quota_spec = ResourceQuota::default();
    }
    let json = serde_json::to_string(&obj).unwrap();
    assert!(!json.contains("resourceQuotaSpec"));
}

#[test]
fn test_policy_accessors() {
    let spec = policy(&["a", "b"], "user@example.com");
    assert_eq!(
        spec.principals().unwrap(),
        &["a".to_string(), "b".to_string()]
    );
    assert_eq!(
        spec.condition_value("request.headers[kubeflow-userid]"),
        Some("user@example.com")
    );
    assert_eq!(spec.condition_value("request.headers[other]"), None);

    let empty = NetworkPolicySpec { rules: vec![] };
    assert!(empty.principals().is_none());
}

#[test]
fn test_fingerprint_ignores_resource_version() {
    let a = workspace("team");
    let mut b = workspace("team");
    b.metadata.resource_version = Some("42".to_string());
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert!(a.same_content(&b));
}

#[test]
fn test_fingerprint_changes_with_spec() {
    let a = workspace("team");
    let mut b = workspace("team");
    if let ObjectSpec::Workspace(spec) = &mut b.spec {
        spec.resource_quota_spec = ResourceQuota::from_hard([("limits.cpu", "2")]);
    }
    assert_ne!(a.fingerprint(), b.fingerprint());
    assert!(!a.same_content(&b));
}

#[test]
fn test_with_fingerprint_is_stable() {
    let a = workspace("team").with_fingerprint();
    let b = workspace("team").with_fingerprint().with_fingerprint();
    assert_eq!(a, b);
    assert_eq!(
        a.annotation(SPEC_HASH_ANNOTATION).map(str::len),
        Some(64)
    );
}

#[test]
fn test_subject_kind_from_owner_kind() {
    assert_eq!(SubjectKind::from(OwnerKind::User), SubjectKind::User);
    assert_eq!(
        SubjectKind::from(OwnerKind::ServiceAccount),
        SubjectKind::ServiceAccount
    );
}
